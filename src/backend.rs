//! Per-session backend connection state
//!
//! A [`Backend`] wraps the transport to a single database server for the
//! lifetime of one client session: it correlates outbound writes with
//! inbound replies through a linear reply state machine and carries the
//! per-backend queue of session commands awaiting dispatch. Backends are
//! constructed when the session opens, closed on failure or teardown, and
//! never reopened within a session.

use crate::server::Server;
use crate::session_command::SessionCommand;
use crate::sink::BackendSink;
use crate::types::BackendId;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error};

/// Where a backend is within one expected reply
///
/// Advanced by the wire codec; the router only consumes the transition back
/// to `Done`, which is the "reply complete" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyState {
    /// No reply outstanding
    #[default]
    Done,
    /// Statement written, first reply packet not yet seen
    Start,
    /// Result-set header received
    Header,
    /// Result-set rows streaming
    Rows,
    /// Terminal packet of the reply seen
    End,
}

/// Whether a write will be answered by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseExpectation {
    NoResponse,
    ExpectResponse,
}

/// COM_PING payload used for connection keepalive
const PING_PAYLOAD: &[u8] = &[0x0e];

/// One logical connection from the session to a database server
pub struct Backend {
    id: BackendId,
    server: Arc<Server>,
    sink: Box<dyn BackendSink>,
    in_use: bool,
    reply_state: ReplyState,
    /// Heartbeat tick (1/10 s) of the last read from this backend
    last_read: u64,
    /// Session commands queued for this backend, dispatched one at a time
    session_commands: VecDeque<Arc<SessionCommand>>,
    /// Total session commands ever appended to this backend
    session_command_total: u64,
    /// The outstanding reply belongs to the head session command
    sescmd_in_flight: bool,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("id", &self.id)
            .field("server", &self.server.name().as_str())
            .field("in_use", &self.in_use)
            .field("reply_state", &self.reply_state)
            .field("queued_sescmds", &self.session_commands.len())
            .finish()
    }
}

impl Backend {
    /// Open a backend over an established transport
    #[must_use]
    pub fn new(id: BackendId, server: Arc<Server>, sink: Box<dyn BackendSink>) -> Self {
        server.connection_opened();
        Self {
            id,
            server,
            sink,
            in_use: true,
            reply_state: ReplyState::Done,
            last_read: 0,
            session_commands: VecDeque::new(),
            session_command_total: 0,
            sescmd_in_flight: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> BackendId {
        self.id
    }

    #[must_use]
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    #[must_use]
    pub const fn in_use(&self) -> bool {
        self.in_use
    }

    #[must_use]
    pub const fn reply_state(&self) -> ReplyState {
        self.reply_state
    }

    /// Codec-side reply progress updates (Start → Header → Rows → End)
    pub fn set_reply_state(&mut self, state: ReplyState) {
        self.reply_state = state;
    }

    /// True while a reply is outstanding
    #[must_use]
    pub fn is_waiting_result(&self) -> bool {
        self.reply_state != ReplyState::Done
    }

    #[must_use]
    pub const fn last_read(&self) -> u64 {
        self.last_read
    }

    /// Record a read from this backend at the given heartbeat tick
    pub fn mark_read(&mut self, tick: u64) {
        self.last_read = tick;
    }

    /// Write one statement to the backend transport.
    ///
    /// Returns `true` iff the transport accepted the bytes; transport errors
    /// are logged, not propagated. On success with `ExpectResponse` the reply
    /// state moves `Done → Start` and the server's operation gauge is bumped.
    pub async fn write(
        &mut self,
        payload: Bytes,
        response: ResponseExpectation,
        collect_full_response: bool,
    ) -> bool {
        if !self.in_use {
            error!(
                "Attempt to write to closed backend '{}'",
                self.server.name()
            );
            return false;
        }

        match self.sink.send(payload, collect_full_response).await {
            Ok(()) => {
                if response == ResponseExpectation::ExpectResponse {
                    debug_assert_eq!(self.reply_state, ReplyState::Done);
                    self.reply_state = ReplyState::Start;
                    self.server.op_started();
                }
                true
            }
            Err(e) => {
                error!(
                    "Write to backend [{}]:{} failed: {}",
                    self.server.address(),
                    self.server.port(),
                    e
                );
                false
            }
        }
    }

    /// Queue a session command for this backend
    pub fn append_session_command(&mut self, cmd: Arc<SessionCommand>) {
        self.session_command_total += 1;
        self.session_commands.push_back(cmd);
    }

    /// The next session command awaiting dispatch, if any
    #[must_use]
    pub fn next_session_command(&self) -> Option<&Arc<SessionCommand>> {
        self.session_commands.front()
    }

    /// Number of session commands still queued on this backend
    #[must_use]
    pub fn session_command_count(&self) -> usize {
        self.session_commands.len()
    }

    /// Total session commands ever queued on this backend
    #[must_use]
    pub const fn session_command_total(&self) -> u64 {
        self.session_command_total
    }

    /// Whether the outstanding reply answers the head session command
    /// rather than an ordinary statement
    #[must_use]
    pub const fn session_command_in_flight(&self) -> bool {
        self.sescmd_in_flight
    }

    /// Dispatch the head of the session command queue.
    ///
    /// Only one statement may be outstanding per backend, so the head is
    /// written only when no reply is pending. Returns `true` iff a command
    /// was written to the transport. The command stays queued until its
    /// reply completes.
    pub async fn execute_session_command(&mut self) -> bool {
        if self.is_waiting_result() {
            debug!(
                "Backend '{}' busy, session command stays queued",
                self.server.name()
            );
            return false;
        }
        let Some(cmd) = self.session_commands.front().cloned() else {
            return false;
        };

        let response = if cmd.expects_response() {
            ResponseExpectation::ExpectResponse
        } else {
            ResponseExpectation::NoResponse
        };
        let collect = cmd.command().collects_result();
        let written = self.write(cmd.payload().clone(), response, collect).await;

        if written {
            if cmd.expects_response() {
                self.sescmd_in_flight = true;
            } else {
                // Nothing will come back for this one, retire it immediately
                self.session_commands.pop_front();
            }
        }
        written
    }

    /// Retire the head session command once its reply has completed
    pub fn complete_session_command(&mut self) -> Option<Arc<SessionCommand>> {
        self.sescmd_in_flight = false;
        self.session_commands.pop_front()
    }

    /// Reply finished: back to `Done`, gauge released, read stamped
    pub fn ack_reply(&mut self, tick: u64) {
        if self.reply_state != ReplyState::Done {
            self.server.op_finished();
        }
        self.reply_state = ReplyState::Done;
        self.sescmd_in_flight = false;
        self.last_read = tick;
    }

    /// Send an ignorable COM_PING. Does not touch the reply state; the codec
    /// swallows the ping response.
    pub async fn ping(&mut self) -> bool {
        match self.sink.send(Bytes::from_static(PING_PAYLOAD), false).await {
            Ok(()) => true,
            Err(e) => {
                error!("Ping to '{}' failed: {}", self.server.name(), e);
                false
            }
        }
    }

    /// Close the backend for the remainder of the session.
    ///
    /// Queued session commands are dropped; transport teardown belongs to
    /// the codec.
    pub fn close(&mut self) {
        if !self.in_use {
            return;
        }
        if self.is_waiting_result() {
            self.server.op_finished();
            self.reply_state = ReplyState::Done;
        }
        self.in_use = false;
        self.sescmd_in_flight = false;
        self.session_commands.clear();
        self.server.connection_closed();
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.close();
    }
}
