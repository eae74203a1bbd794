//! Per-client router session
//!
//! One [`RouterSession`] exists per client connection and is owned by a
//! single worker for its lifetime, so none of its state needs locking. It
//! drives the full statement lifecycle: receive a classified packet, decide
//! the target, dispatch, demultiplex backend replies back to the client and
//! keep the per-backend session command queues flowing.

use super::decider::{self, RouteTarget, RoutingContext, TrxState};
use super::select::{self, BackendKind, SelectionParams};
use crate::backend::{Backend, ReplyState, ResponseExpectation};
use crate::classify::{Operation, QueryType};
use crate::config::{MasterFailureMode, RouterConfig};
use crate::session_command::SessionCommand;
use crate::sink::{
    ClientSink, ER_LOST_CONNECTION, ER_OPTION_PREVENTS_STATEMENT, READ_ONLY_ERROR_MESSAGE,
};
use crate::statement::Statement;
use crate::stats::ServiceStats;
use crate::types::{BackendId, SessionId};
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// LOAD DATA LOCAL INFILE sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadDataState {
    #[default]
    Inactive,
    /// LOAD DATA statement seen, not yet dispatched
    Start,
    /// Statement dispatched, data stream flowing to the master
    Active,
    /// Terminating empty packet seen
    End,
}

/// Outcome of resolving the master as a routing target
enum MasterOutcome {
    Target(BackendId),
    /// error-on-write: the client got a read-only error, session continues
    ErrorSent,
    Failed,
}

/// Identity of the client behind this session, for log messages
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user: Option<String>,
    pub remote: Option<String>,
}

impl ClientInfo {
    fn user(&self) -> &str {
        self.user.as_deref().unwrap_or("<unknown>")
    }

    fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or("<unknown>")
    }
}

/// The read/write split state machine for one client connection
pub struct RouterSession {
    id: SessionId,
    /// Private copy; the history-overflow path mutates it
    config: RouterConfig,
    stats: Arc<ServiceStats>,
    client: Box<dyn ClientSink>,
    client_info: ClientInfo,
    backends: Vec<Backend>,
    /// The backend holding the master role when the session was created or
    /// last re-validated. Kept pointing at a closed backend on purpose: the
    /// failure taxonomy needs to distinguish "master lost" from "never had
    /// a master".
    current_master: Option<BackendId>,
    /// Session-scoped forced target: the multi-statement master pin or the
    /// slave of a read-only transaction
    target_node: Option<BackendId>,
    trx: TrxState,
    load_data_state: LoadDataState,
    load_data_sent: u64,
    have_tmp_tables: HashSet<String>,
    /// Ordered session command history for replaying on rejoined backends
    sescmd_log: VecDeque<Arc<SessionCommand>>,
    /// First-arrived reply per session command position
    sescmd_responses: BTreeMap<u64, Bytes>,
    /// Next session command position
    sescmd_count: u64,
    /// Position of the last session command that reached a backend
    sent_sescmd: u64,
    /// Dispatched statements awaiting a backend reply
    expected_responses: u32,
    /// Last slave-routed statement, kept for retry_failed_reads
    stored_stmt: Option<Statement>,
    /// Heartbeat epoch; ticks are 1/10 s
    epoch: Instant,
}

impl RouterSession {
    pub(crate) fn new(
        config: RouterConfig,
        stats: Arc<ServiceStats>,
        client: Box<dyn ClientSink>,
        client_info: ClientInfo,
        backends: Vec<Backend>,
        current_master: Option<BackendId>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            config,
            stats,
            client,
            client_info,
            backends,
            current_master,
            target_node: None,
            trx: TrxState::Inactive,
            load_data_state: LoadDataState::Inactive,
            load_data_sent: 0,
            have_tmp_tables: HashSet::new(),
            sescmd_log: VecDeque::new(),
            sescmd_responses: BTreeMap::new(),
            sescmd_count: 0,
            sent_sescmd: 0,
            expected_responses: 0,
            stored_stmt: None,
            epoch: Instant::now(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    #[must_use]
    pub const fn current_master(&self) -> Option<BackendId> {
        self.current_master
    }

    #[must_use]
    pub const fn target_node(&self) -> Option<BackendId> {
        self.target_node
    }

    #[must_use]
    pub const fn trx_state(&self) -> TrxState {
        self.trx
    }

    #[must_use]
    pub const fn load_data_state(&self) -> LoadDataState {
        self.load_data_state
    }

    #[must_use]
    pub const fn expected_responses(&self) -> u32 {
        self.expected_responses
    }

    #[must_use]
    pub fn session_command_log_len(&self) -> usize {
        self.sescmd_log.len()
    }

    #[must_use]
    pub fn session_command_responses_len(&self) -> usize {
        self.sescmd_responses.len()
    }

    /// Position of the last session command that reached a backend
    #[must_use]
    pub const fn sent_session_command(&self) -> u64 {
        self.sent_sescmd
    }

    #[must_use]
    pub fn has_tmp_table(&self, name: &str) -> bool {
        self.have_tmp_tables.contains(name)
    }

    /// Heartbeat ticks (1/10 s) since the session opened
    fn heartbeat(&self) -> u64 {
        (self.epoch.elapsed().as_millis() / 100) as u64
    }

    /// Route one classified client packet.
    ///
    /// Returns `true` if routing succeeded or the failure was already
    /// reported to the client; `false` is fatal and the caller must close
    /// the client connection with a terminal error packet.
    pub async fn route_query(&mut self, mut stmt: Statement) -> bool {
        let route_target = if stmt.is_empty_packet() {
            // The empty packet terminates a LOAD DATA LOCAL INFILE stream
            self.load_data_state = LoadDataState::End;
            info!(
                "LOAD DATA LOCAL INFILE finished: {} bytes sent.",
                self.load_data_sent
            );
            RouteTarget::master()
        } else {
            self.update_transaction_state(&stmt);
            self.handle_multi_temp_and_load(&mut stmt);
            decider::get_route_target(&stmt, &self.routing_context())
        };

        debug!("Route target for statement: {}", route_target);

        let mut chosen: Option<BackendId> = None;
        let succp = if route_target.is_all() {
            self.route_session_write(&stmt).await
        } else {
            let mut store_stmt = false;
            let target = if route_target.is_named_server() || route_target.is_rlag_max() {
                self.handle_hinted_target(&route_target)
            } else if route_target.is_slave() {
                store_stmt = self.config.retry_failed_reads;
                self.handle_slave_is_target()
            } else {
                match self.handle_master_is_target().await {
                    MasterOutcome::Target(id) => {
                        if !self.config.strict_multi_stmt
                            && self.target_node.is_some()
                            && self.target_node == self.current_master
                        {
                            // Relaxed mode: the multi-statement pin lasts
                            // for a single master-routed statement
                            debug!("Releasing master pin in relaxed multi-statement mode");
                            self.target_node = None;
                        }
                        Some(id)
                    }
                    MasterOutcome::ErrorSent => {
                        return true;
                    }
                    MasterOutcome::Failed => None,
                }
            };

            match target {
                Some(id) => {
                    chosen = Some(id);
                    self.handle_got_target(&stmt, id, store_stmt).await
                }
                None => false,
            }
        };

        if succp
            && self.config.connection_keepalive > 0
            && (route_target.is_slave() || route_target.is_master())
        {
            if let Some(target) = chosen {
                self.check_connection_keepalive(target).await;
            }
        }

        if succp && self.trx.is_ending() {
            self.trx = TrxState::Inactive;
        }

        succp
    }

    /// Track the client transaction from classifier flags
    fn update_transaction_state(&mut self, stmt: &Statement) {
        let qtype = stmt.classification();
        if qtype.contains(QueryType::BEGIN_TRX) {
            // The classifier marks START TRANSACTION READ ONLY with the
            // read flag alongside begin-trx
            let read_only = qtype.contains(QueryType::READ);
            self.trx = TrxState::Active { read_only };
        } else if qtype.intersects(QueryType::COMMIT | QueryType::ROLLBACK) {
            if let TrxState::Active { read_only } = self.trx {
                self.trx = TrxState::Ending { read_only };
            }
        }
    }

    /// Multi-statement pinning, temporary table bookkeeping and LOAD DATA
    /// detection, applied before the route decision
    fn handle_multi_temp_and_load(&mut self, stmt: &mut Statement) {
        let wants_pin = stmt.is_multi_statement()
            || (stmt.operation() == Operation::Call && self.config.strict_sp_calls);

        if wants_pin && (self.target_node.is_none() || self.target_node != self.current_master) {
            if self.current_master.is_some() {
                self.target_node = self.current_master;
                info!("Multi-statement query, routing all future queries to master.");
            } else {
                // No master to pin to; classify as a write so the failure
                // mode machinery reports it
                stmt.add_classification(QueryType::WRITE);
            }
        }

        if !self.have_tmp_tables.is_empty() {
            if stmt.operation() == Operation::Drop {
                for table in stmt.tables() {
                    if self.have_tmp_tables.remove(table) {
                        debug!("Temporary table '{}' dropped", table);
                    }
                }
            }
            if stmt.command().is_query() && self.reads_tmp_table(stmt) {
                stmt.add_classification(QueryType::MASTER_READ);
            }
        }
        if stmt.classification().contains(QueryType::CREATE_TMP_TABLE) {
            for table in stmt.tables() {
                debug!("Temporary table '{}' created", table);
                self.have_tmp_tables.insert(table.clone());
            }
        }

        if self.load_data_state == LoadDataState::Active {
            self.load_data_sent += stmt.payload().len() as u64;
        } else if stmt.command().is_query() && stmt.operation() == Operation::Load {
            self.load_data_state = LoadDataState::Start;
            self.load_data_sent = 0;
        }
    }

    /// Whether a read statement touches one of the session's temp tables
    fn reads_tmp_table(&self, stmt: &Statement) -> bool {
        stmt.classification().intersects(
            QueryType::READ
                | QueryType::USERVAR_READ
                | QueryType::SYSVAR_READ
                | QueryType::GSYSVAR_READ,
        ) && stmt
            .tables()
            .iter()
            .any(|table| self.have_tmp_tables.contains(table))
    }

    fn routing_context(&self) -> RoutingContext {
        RoutingContext {
            trx: self.trx,
            load_data_active: self.load_data_state != LoadDataState::Inactive,
            use_sql_variables_in: self.config.use_sql_variables_in,
            pinned_to_master: self.target_node.is_some()
                && self.target_node == self.current_master,
        }
    }

    /// The replication lag ceiling from configuration; 0 disables it
    fn config_max_rlag(&self) -> Option<i32> {
        if self.config.max_slave_replication_lag == 0 {
            None
        } else {
            Some(self.config.max_slave_replication_lag.min(i32::MAX as u64) as i32)
        }
    }

    /// The read-only-transaction pin, when one applies
    fn read_only_pin(&self) -> Option<BackendId> {
        if self.trx.is_read_only() {
            self.target_node
        } else {
            None
        }
    }

    /// Replay a session-state-affecting statement on every in-use backend.
    ///
    /// The command is appended to each backend's queue and dispatched where
    /// the backend is idle; busy backends dispatch it when their current
    /// reply completes. The first backend's reply will be forwarded to the
    /// client, the rest are discarded on arrival.
    async fn route_session_write(&mut self, stmt: &Statement) -> bool {
        let id = self.sescmd_count;
        self.sescmd_count += 1;
        let sescmd = Arc::new(SessionCommand::new(
            stmt.payload().clone(),
            stmt.command(),
            id,
        ));
        let expecting = stmt.command().expects_response();
        let mut nsucc = 0usize;
        let mut lowest_pos = id;

        info!("Session write, routing to all servers.");
        self.stats.add_all();

        for index in 0..self.backends.len() {
            if !self.backends[index].in_use() {
                continue;
            }
            self.backends[index].append_session_command(Arc::clone(&sescmd));
            if let Some(head) = self.backends[index].next_session_command() {
                lowest_pos = lowest_pos.min(head.position());
            }

            if self.backends[index].is_waiting_result() {
                // Queued behind the reply in flight; dispatched from
                // process_reply once that reply completes
                nsucc += 1;
                continue;
            }
            if self.backends[index].execute_session_command().await {
                nsucc += 1;
                if expecting {
                    self.expected_responses += 1;
                }
                let server = self.backends[index].server();
                info!(
                    "Route query to {} [{}]:{}",
                    if server.is_master() { "master" } else { "slave" },
                    server.address(),
                    server.port()
                );
            } else {
                let server = self.backends[index].server();
                error!(
                    "Failed to execute session command in [{}]:{}",
                    server.address(),
                    server.port()
                );
            }
        }

        if self.config.max_sescmd_history > 0 && self.sescmd_count >= self.config.max_sescmd_history
        {
            warn!(
                "Router session exceeded session command history limit. Slave recovery is \
                 disabled and only slave servers with consistent session state are used for the \
                 duration of the session."
            );
            self.config.disable_sescmd_history = true;
            self.config.max_sescmd_history = 0;
            self.sescmd_log.clear();
        }

        if self.config.disable_sescmd_history {
            // Keep only responses that a backend may still reply to
            self.sescmd_responses = self.sescmd_responses.split_off(&lowest_pos);
        } else {
            self.sescmd_log.push_back(sescmd);
        }

        if nsucc > 0 {
            self.sent_sescmd = id;
        }
        nsucc > 0
    }

    /// Resolve a hinted target: named server and/or lag ceiling, falling
    /// back through slave to master
    fn handle_hinted_target(&mut self, route_target: &RouteTarget) -> Option<BackendId> {
        let named_server = route_target.named_server();
        let max_rlag = route_target.max_rlag().or_else(|| self.config_max_rlag());

        let kind = if route_target.is_slave() {
            BackendKind::Slave
        } else {
            BackendKind::Master
        };
        let params = SelectionParams {
            pinned: self.read_only_pin(),
            name: named_server,
            max_rlag,
        };
        let target = select::get_target_backend(
            &self.backends,
            self.current_master,
            kind,
            params,
            self.config.slave_selection_criteria,
            self.config.master_accept_reads,
        );

        if target.is_none() {
            if let Some(name) = named_server {
                info!(
                    "Was supposed to route to named server {} but couldn't find the server in a \
                     suitable state.",
                    name
                );
            } else if route_target.is_rlag_max() {
                info!(
                    "Was supposed to route to server with replication lag at most {} but couldn't \
                     find such a slave: replication lag exceeded.",
                    max_rlag.unwrap_or_default()
                );
            }
        }
        target
    }

    /// Resolve the best slave for a read
    fn handle_slave_is_target(&mut self) -> Option<BackendId> {
        let params = SelectionParams {
            pinned: self.read_only_pin(),
            name: None,
            max_rlag: self.config_max_rlag(),
        };
        let target = select::get_target_backend(
            &self.backends,
            self.current_master,
            BackendKind::Slave,
            params,
            self.config.slave_selection_criteria,
            self.config.master_accept_reads,
        );

        match target {
            Some(id) => {
                self.stats.add_slave();
                Some(id)
            }
            None => {
                info!("Was supposed to route to slave but finding suitable one failed.");
                None
            }
        }
    }

    /// Resolve the master, applying the configured failure mode when the
    /// session's master is gone
    async fn handle_master_is_target(&mut self) -> MasterOutcome {
        let params = SelectionParams {
            pinned: self.read_only_pin(),
            name: None,
            max_rlag: None,
        };
        let target = select::get_target_backend(
            &self.backends,
            self.current_master,
            BackendKind::Master,
            params,
            self.config.slave_selection_criteria,
            self.config.master_accept_reads,
        );

        if let Some(id) = target {
            if Some(id) == self.current_master {
                self.stats.add_master();
                return MasterOutcome::Target(id);
            }
        }

        // The session's master is not available for writing
        if self.config.master_failure_mode == MasterFailureMode::ErrorOnWrite {
            let sent = self
                .client
                .error(
                    ER_OPTION_PREVENTS_STATEMENT,
                    "HY000",
                    READ_ONLY_ERROR_MESSAGE,
                )
                .await
                .is_ok();
            if let Some(master) = self.current_master {
                let backend = &mut self.backends[master.as_index()];
                if backend.in_use() {
                    backend.close();
                }
            }
            if sent {
                MasterOutcome::ErrorSent
            } else {
                MasterOutcome::Failed
            }
        } else {
            self.log_master_routing_failure(target);
            MasterOutcome::Failed
        }
    }

    /// Compose the master failure reason for the session-closing warning
    fn log_master_routing_failure(&self, found: Option<BackendId>) {
        let old_master = self.current_master.map(|id| &self.backends[id.as_index()]);
        let new_master = found.map(|id| &self.backends[id.as_index()]);

        let errmsg = match (old_master, new_master) {
            (Some(old), Some(new)) if old.id() != new.id() => format!(
                "Master server changed from '{}' to '{}'",
                old.server().name(),
                new.server().name()
            ),
            (Some(old), _) if !old.in_use() => format!(
                "The connection to master server '{}' is not available",
                old.server().name()
            ),
            (Some(old), _) => format!(
                "Could not find a valid master connection. Previous master's state: {}",
                old.server().describe_status()
            ),
            (None, _) => {
                if self.config.master_failure_mode != MasterFailureMode::FailInstantly {
                    "Session is in read-only mode because it was created when no master was \
                     available"
                        .to_string()
                } else {
                    "Was supposed to route to master but couldn't find master in a suitable state"
                        .to_string()
                }
            }
        };

        warn!(
            "Write query received from {}@{}. {}. Closing client connection.",
            self.client_info.user(),
            self.client_info.remote(),
            errmsg
        );
    }

    /// Dispatch a statement to the resolved backend and update transaction,
    /// pin and LOAD DATA bookkeeping
    async fn handle_got_target(
        &mut self,
        stmt: &Statement,
        target: BackendId,
        store: bool,
    ) -> bool {
        if self.target_node.is_none() && self.trx.is_read_only() {
            // First statement of a READ ONLY transaction pins its slave
            // until COMMIT
            self.target_node = Some(target);
            debug!(
                "Pinning READ ONLY transaction to '{}'",
                self.backends[target.as_index()].server().name()
            );
        }

        let index = target.as_index();
        {
            let server = self.backends[index].server();
            info!(
                "Route query to {} [{}]:{}",
                if server.is_master() { "master" } else { "slave" },
                server.address(),
                server.port()
            );
        }

        // The statement pipeline guarantees one outstanding statement per
        // backend; a queued session command here would break reply ordering
        debug_assert_eq!(self.backends[index].session_command_count(), 0);

        let collect = stmt.command().collects_result();
        let response = if self.load_data_state != LoadDataState::Active
            && stmt.command().expects_response()
        {
            ResponseExpectation::ExpectResponse
        } else {
            ResponseExpectation::NoResponse
        };

        if !self.backends[index]
            .write(stmt.payload().clone(), response, collect)
            .await
        {
            error!("Routing query failed.");
            return false;
        }

        if store {
            self.stored_stmt = Some(stmt.clone());
        }
        self.stats.add_query();

        if response == ResponseExpectation::ExpectResponse {
            self.expected_responses += 1;

            match self.load_data_state {
                LoadDataState::Start => {
                    // The first packet carries the LOAD DATA statement
                    // itself and the server responds to it
                    self.load_data_state = LoadDataState::Active;
                }
                LoadDataState::End => {
                    // The empty packet was routed; the server answers with
                    // OK or ERR and the stream is over
                    self.load_data_state = LoadDataState::Inactive;
                }
                _ => {}
            }
        }

        if self.target_node.is_some() && self.trx.is_read_only() && self.trx.is_ending() {
            debug!("READ ONLY transaction ends: clearing pinned target");
            self.target_node = None;
        }

        true
    }

    /// Ping idle backends so their connections survive server-side timeouts
    async fn check_connection_keepalive(&mut self, target: BackendId) {
        let keepalive_ticks = self.config.connection_keepalive * 10;
        let now = self.heartbeat();

        for backend in &mut self.backends {
            if !backend.in_use() || backend.id() == target || backend.is_waiting_result() {
                continue;
            }
            let idle = now.saturating_sub(backend.last_read());
            if idle > keepalive_ticks {
                info!(
                    "Pinging {}, idle for {} seconds",
                    backend.server().name(),
                    idle / 10
                );
                backend.ping().await;
            }
        }
    }

    /// Deliver a backend reply.
    ///
    /// Replies to session commands are demultiplexed: the first backend's
    /// reply is recorded and forwarded, later replies for the same position
    /// are status-compared and discarded. Normal replies stream straight to
    /// the client; `is_final` marks the end of the reply.
    pub async fn process_reply(&mut self, backend: BackendId, reply: Bytes, is_final: bool) {
        let index = backend.as_index();
        let tick = self.heartbeat();
        let Some(b) = self.backends.get_mut(index) else {
            error!("Reply from unknown backend {}", backend);
            return;
        };
        if !b.in_use() {
            debug!("Discarding reply from closed backend '{}'", b.server().name());
            return;
        }

        b.mark_read(tick);

        if b.session_command_in_flight() {
            if !is_final {
                // Session command replies arrive collected
                return;
            }
            self.complete_session_command(index, reply).await;
            self.dispatch_queued_session_commands(index).await;
            return;
        }

        if is_final {
            self.backends[index].ack_reply(tick);
            self.expected_responses = self.expected_responses.saturating_sub(1);
            self.stored_stmt = None;
        }
        if let Err(e) = self.client.write(&reply).await {
            error!("Failed to forward reply to client: {}", e);
        }
        if is_final {
            // Session commands that queued up behind this reply can flow now
            self.dispatch_queued_session_commands(index).await;
        }
    }

    /// Handle the reply to the head session command of a backend
    async fn complete_session_command(&mut self, index: usize, reply: Bytes) {
        let tick = self.heartbeat();
        let cmd = self.backends[index].complete_session_command();
        self.backends[index].ack_reply(tick);
        let Some(cmd) = cmd else {
            return;
        };

        if cmd.expects_response() {
            self.expected_responses = self.expected_responses.saturating_sub(1);
        }

        let position = cmd.position();
        if let Some(authoritative) = self.sescmd_responses.get(&position) {
            // A reply for this command was already forwarded; compare the
            // response status and discard
            if authoritative.first() != reply.first() {
                let server = self.backends[index].server().name().clone();
                warn!(
                    "Session command {} returned a different result on '{}' than on the first \
                     server to reply; closing '{}' for the remainder of the session",
                    position, server, server
                );
                self.backends[index].close();
            }
        } else {
            self.sescmd_responses.insert(position, reply.clone());
            if let Err(e) = self.client.write(&reply).await {
                error!("Failed to forward session command reply to client: {}", e);
            }
        }
    }

    /// Keep a backend's session command queue flowing after a reply
    async fn dispatch_queued_session_commands(&mut self, index: usize) {
        while self.backends[index].in_use()
            && !self.backends[index].is_waiting_result()
            && self.backends[index].session_command_count() > 0
        {
            let expects = self.backends[index]
                .next_session_command()
                .is_some_and(|cmd| cmd.expects_response());

            if !self.backends[index].execute_session_command().await {
                break;
            }
            if expects {
                self.expected_responses += 1;
                break;
            }
            // Commands without responses retire immediately; keep going
        }
    }

    /// Codec notification of mid-reply progress on a backend
    pub fn set_backend_reply_state(&mut self, backend: BackendId, state: ReplyState) {
        if let Some(b) = self.backends.get_mut(backend.as_index()) {
            b.set_reply_state(state);
        }
    }

    /// A backend connection died.
    ///
    /// Cancels the outstanding expectation on that backend. Reads are
    /// retried on another slave when `retry_failed_reads` is set and the
    /// statement was stored; otherwise the failure is reported to the
    /// client. Returns `false` when the session can no longer continue.
    pub async fn handle_connection_closed(&mut self, backend: BackendId) -> bool {
        let index = backend.as_index();
        let Some(b) = self.backends.get_mut(index) else {
            return true;
        };
        if !b.in_use() {
            return true;
        }

        let was_waiting = b.is_waiting_result();
        let server_name = b.server().name().clone();
        b.close();
        if was_waiting {
            self.expected_responses = self.expected_responses.saturating_sub(1);
        }

        info!("Backend connection to '{}' closed", server_name);

        let was_pin = self.target_node == Some(backend);
        if was_pin {
            self.target_node = None;
        }

        if was_pin && self.trx.is_read_only() {
            // The snapshot of the read-only transaction is gone with the
            // pinned slave; the transaction cannot continue elsewhere
            warn!(
                "Server '{}' failed during a READ ONLY transaction. Closing client connection.",
                server_name
            );
            let _ = self
                .client
                .error(
                    ER_LOST_CONNECTION,
                    "HY000",
                    &format!("Lost connection to server '{}' mid-transaction", server_name),
                )
                .await;
            return false;
        }

        if !was_waiting {
            return true;
        }

        if self.config.retry_failed_reads && Some(backend) != self.current_master {
            if let Some(stmt) = self.stored_stmt.take() {
                info!("Retrying read that failed on '{}' on another server", server_name);
                return self.route_query(stmt).await;
            }
        }

        let _ = self
            .client
            .error(
                ER_LOST_CONNECTION,
                "HY000",
                &format!("Lost connection to server '{}' during query", server_name),
            )
            .await;
        false
    }
}

impl std::fmt::Debug for RouterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterSession")
            .field("id", &self.id)
            .field("backends", &self.backends.len())
            .field("current_master", &self.current_master)
            .field("target_node", &self.target_node)
            .field("trx", &self.trx)
            .field("expected_responses", &self.expected_responses)
            .field("sescmd_count", &self.sescmd_count)
            .finish()
    }
}
