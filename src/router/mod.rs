//! Read/write split router
//!
//! The router is layered from leaves to root:
//!
//! - `criteria`: comparators behind `slave_selection_criteria`
//! - [`decider`]: the pure statement → route-target decision
//! - `select`: resolving a route target to one of the session's backends
//! - `session`: the per-client state machine driving dispatch and replies
//!
//! [`RwSplitService`] ties them together: one instance per configured
//! service, producing a [`RouterSession`] per client connection.

mod criteria;
pub mod decider;
mod select;
mod session;

pub use criteria::SelectionCriteria;
pub use decider::{RouteTarget, RoutingContext, TrxState, get_route_target};
pub use session::{ClientInfo, LoadDataState, RouterSession};

use crate::backend::Backend;
use crate::config::{MasterFailureMode, RouterConfig};
use crate::server::Server;
use crate::sink::{BackendSink, ClientSink};
use crate::stats::{ServiceStats, StatsSnapshot};
use crate::types::BackendId;
use std::sync::Arc;
use tracing::{error, info};

/// One configured read/write split service
///
/// Holds the validated router configuration, the monitor-shared server
/// descriptors and the service-wide counters. Sessions are created with one
/// backend per server over transports supplied by the codec.
#[derive(Debug)]
pub struct RwSplitService {
    name: String,
    config: RouterConfig,
    servers: Vec<Arc<Server>>,
    stats: Arc<ServiceStats>,
}

impl RwSplitService {
    /// Create a service over the shared server descriptors
    pub fn new(name: String, config: RouterConfig, servers: Vec<Arc<Server>>) -> Self {
        info!(
            "Service '{}': {} servers, slave_selection_criteria={}, master_failure_mode={}",
            name,
            servers.len(),
            config.slave_selection_criteria,
            config.master_failure_mode
        );
        Self {
            name,
            config,
            servers,
            stats: Arc::new(ServiceStats::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[must_use]
    pub fn servers(&self) -> &[Arc<Server>] {
        &self.servers
    }

    /// Service-wide counter snapshot
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Open a router session over established backend transports.
    ///
    /// `backend_sinks` must hold one transport per configured server, in
    /// server order. The current master is chosen by the root-master rule
    /// (lowest replication depth wins). Under `fail-instantly` a session
    /// cannot be created without a master; the other failure modes allow a
    /// read-only session.
    pub fn new_session(
        &self,
        client: Box<dyn ClientSink>,
        client_info: ClientInfo,
        backend_sinks: Vec<Box<dyn BackendSink>>,
    ) -> Option<RouterSession> {
        assert_eq!(
            backend_sinks.len(),
            self.servers.len(),
            "one backend transport per configured server"
        );

        let backends: Vec<Backend> = backend_sinks
            .into_iter()
            .enumerate()
            .map(|(index, sink)| {
                Backend::new(
                    BackendId::from_index(index),
                    Arc::clone(&self.servers[index]),
                    sink,
                )
            })
            .collect();

        let current_master = select::get_root_master(&backends);
        if current_master.is_none()
            && self.config.master_failure_mode == MasterFailureMode::FailInstantly
        {
            error!(
                "Service '{}': could not find a valid master connection, refusing session",
                self.name
            );
            return None;
        }

        Some(RouterSession::new(
            self.config.clone(),
            Arc::clone(&self.stats),
            client,
            client_info,
            backends,
            current_master,
        ))
    }
}
