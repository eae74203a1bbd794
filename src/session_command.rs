//! Session commands replayed across backends
//!
//! A session command is a statement that mutates connection-level state
//! (variables, autocommit, prepares). It must reach every backend the
//! session uses so that any later slave selection observes identical
//! connection state. Commands are immutable once created and shared by
//! `Arc` between the session log and every backend's dispatch queue.

use crate::classify::Command;
use bytes::Bytes;

/// One session-state-affecting statement with its replay position
#[derive(Debug, Clone)]
pub struct SessionCommand {
    payload: Bytes,
    command: Command,
    /// Session-scoped, monotonically increasing position
    position: u64,
}

impl SessionCommand {
    #[must_use]
    pub fn new(payload: Bytes, command: Command, position: u64) -> Self {
        Self {
            payload,
            command,
            position,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Whether backends reply to this command
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        self.command.expects_response()
    }
}
