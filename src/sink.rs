//! Transport seams between the routing core and the wire codec
//!
//! The listener and MySQL wire codec live outside this crate. The router
//! reaches them through these two traits: one sink per backend connection
//! and one sink back to the client. Both are async so a slow peer suspends
//! the owning session cooperatively instead of blocking a worker thread.

use async_trait::async_trait;
use bytes::Bytes;

/// Byte sink towards one backend server
#[async_trait]
pub trait BackendSink: Send {
    /// Hand a packet to the backend transport.
    ///
    /// `collect_full_response` asks the codec to deliver the complete reply
    /// in one piece instead of streaming it (used for prepare responses).
    async fn send(&mut self, payload: Bytes, collect_full_response: bool) -> std::io::Result<()>;
}

/// Byte sink back to the client connection
#[async_trait]
pub trait ClientSink: Send {
    /// Forward reply bytes to the client.
    async fn write(&mut self, payload: &Bytes) -> std::io::Result<()>;

    /// Send a MySQL error packet to the client.
    async fn error(&mut self, code: u16, sqlstate: &str, message: &str) -> std::io::Result<()>;
}

/// Error code of `ERR 1290`: the server is running with --read-only
///
/// Sent to the client instead of failing the session when
/// `master_failure_mode=error-on-write` and no master is reachable.
pub const ER_OPTION_PREVENTS_STATEMENT: u16 = 1290;

/// Message accompanying [`ER_OPTION_PREVENTS_STATEMENT`]
pub const READ_ONLY_ERROR_MESSAGE: &str =
    "The MariaDB server is running with the --read-only option so it cannot execute this statement";

/// Error code of `ERR 2013`: connection to the server was lost mid-statement
pub const ER_LOST_CONNECTION: u16 = 2013;
