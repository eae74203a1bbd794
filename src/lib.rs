//! # Read/Write Split Router
//!
//! The query routing core of a MariaDB/MySQL-compatible database proxy.
//! A session multiplexes one client connection across a replication
//! topology (one master, any number of slaves), routing every statement
//! according to its classification, the session's transactional state,
//! session history and operator-configured routing hints.
//!
//! ## Architecture
//!
//! - **server**: monitor-maintained server descriptors (role, lag, depth)
//! - **backend**: one logical connection per server with reply correlation
//!   and the per-backend session command queue
//! - **hint**: the regex→target hint filter attached ahead of the router
//! - **router**: the route decider, backend selection and the per-client
//!   session state machine
//! - **config**: TOML configuration with startup validation
//! - **sink**: the transport traits the wire codec implements
//!
//! ## Boundaries
//!
//! The TCP listener, the MySQL wire codec and the statement classifier are
//! external: packets arrive already framed and classified
//! ([`statement::Statement`]), replies are delivered through
//! [`router::RouterSession::process_reply`], and outbound bytes leave
//! through the [`sink`] traits. The monitor publishes topology by mutating
//! the shared [`server::Server`] descriptors; this crate only reads them.

pub mod args;
pub mod backend;
pub mod classify;
pub mod config;
pub mod hint;
pub mod logging;
pub mod router;
pub mod server;
pub mod session_command;
pub mod sink;
pub mod statement;
pub mod stats;
pub mod types;

pub use backend::{Backend, ReplyState, ResponseExpectation};
pub use classify::{Command, Operation, QueryType};
pub use config::{Config, RouterConfig, create_default_config, load_config};
pub use hint::{Hint, HintSession, RegexHintFilter};
pub use router::{ClientInfo, RouterSession, RwSplitService, SelectionCriteria};
pub use server::Server;
pub use sink::{BackendSink, ClientSink};
pub use statement::Statement;
pub use types::{BackendId, ServerName, SessionId};
