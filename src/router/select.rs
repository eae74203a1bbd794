//! Backend selection
//!
//! Resolves a role requirement (plus optional named-server and lag-ceiling
//! hints) to one of the session's backends. Candidates are walked in the
//! stable backend order, so equal candidates tie-break by insertion order.

use super::criteria::SelectionCriteria;
use crate::backend::Backend;
use crate::server::Server;
use crate::types::BackendId;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Role requirement for a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendKind {
    Master,
    Slave,
}

/// Selection parameters beyond the role requirement
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SelectionParams<'a> {
    /// Read-only-transaction pin; returned as-is while usable
    pub pinned: Option<BackendId>,
    /// Named-server hint; falls back to a plain slave when not found
    pub name: Option<&'a str>,
    /// Replication lag ceiling in seconds
    pub max_rlag: Option<i32>,
}

/// The root master: the in-use backend with master role at the lowest
/// replication depth. Ties keep the earlier backend.
pub(crate) fn get_root_master(backends: &[Backend]) -> Option<BackendId> {
    let mut candidate: Option<&Backend> = None;
    for backend in backends {
        if !backend.in_use() || !backend.server().is_master() {
            continue;
        }
        match candidate {
            None => candidate = Some(backend),
            Some(c) if backend.server().depth() < c.server().depth() => candidate = Some(backend),
            Some(_) => {}
        }
    }
    candidate.map(Backend::id)
}

/// Whether a slave's lag satisfies the ceiling. Unmeasured lag fails any
/// ceiling.
fn rlag_ok(server: &Server, max_rlag: Option<i32>) -> bool {
    match max_rlag {
        None => true,
        Some(ceiling) => server
            .replication_lag()
            .is_some_and(|lag| lag <= ceiling),
    }
}

/// Find a backend satisfying the role requirement and parameters.
///
/// Resolution order: the read-only-transaction pin, then the named-server
/// scan (degrading to a plain slave when the name is not usable), then the
/// role-specific search. For slaves, the master connection is acceptable
/// only while it is still the session's master, and it yields to any
/// qualifying slave unless `master_accept_reads` is set.
pub(crate) fn get_target_backend(
    backends: &[Backend],
    current_master: Option<BackendId>,
    kind: BackendKind,
    params: SelectionParams<'_>,
    criteria: SelectionCriteria,
    master_accept_reads: bool,
) -> Option<BackendId> {
    if let Some(pin) = params.pinned {
        let backend = &backends[pin.as_index()];
        if backend.in_use() {
            debug!(
                "In READ ONLY transaction, using server '{}'",
                backend.server().name()
            );
            return Some(pin);
        }
    }

    let mut kind = kind;
    if let Some(name) = params.name {
        for backend in backends {
            let server = backend.server();
            if backend.in_use()
                && server.is_active()
                && server.name().matches(name)
                && (server.is_slave() || server.is_relay() || server.is_master())
            {
                return Some(backend.id());
            }
        }
        // No server of that name in a usable state, fall back to any slave
        kind = BackendKind::Slave;
    }

    match kind {
        BackendKind::Slave => {
            let mut candidate: Option<&Backend> = None;
            for backend in backends {
                let server = backend.server();
                if !backend.in_use() || !server.is_active() {
                    continue;
                }
                let is_master = server.is_master();
                if !is_master && !server.is_slave() {
                    continue;
                }
                if is_master && current_master != Some(backend.id()) {
                    // The master changed during the session; the old
                    // connection must not serve reads
                    continue;
                }
                if !is_master && !rlag_ok(server, params.max_rlag) {
                    info!(
                        "Server [{}]:{} is too much behind the master ({:?} seconds) and can't be chosen",
                        server.address(),
                        server.port(),
                        server.replication_lag()
                    );
                    continue;
                }

                candidate = Some(match candidate {
                    None => backend,
                    Some(best) => {
                        let best_is_master = best.server().is_master();
                        if best_is_master && !is_master && !master_accept_reads {
                            // A qualifying slave preempts the master
                            backend
                        } else if is_master && !best_is_master && !master_accept_reads {
                            best
                        } else if criteria.compare(server, best.server()) == Ordering::Less {
                            backend
                        } else {
                            best
                        }
                    }
                });
            }
            candidate.map(Backend::id)
        }
        BackendKind::Master => {
            let root = get_root_master(backends)?;
            let backend = &backends[root.as_index()];
            (backend.in_use() && backend.server().is_master()).then_some(root)
        }
    }
}
