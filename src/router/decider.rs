//! Route target decision
//!
//! [`get_route_target`] is a pure function from statement classification,
//! transaction state and routing hints to a route target. The decision
//! table is evaluated top-down, first match wins, and the hint list is
//! overlaid afterwards. It never touches backends; resolving the target to
//! an actual backend happens in selection.

use crate::classify::QueryType;
use crate::config::UseSqlVariablesIn;
use crate::hint::Hint;
use crate::statement::Statement;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Client transaction state, tracked by the session from classifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrxState {
    #[default]
    Inactive,
    /// An open transaction
    Active { read_only: bool },
    /// COMMIT/ROLLBACK is being routed
    Ending { read_only: bool },
}

impl TrxState {
    /// Open or ending transaction
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active { .. } | Self::Ending { .. })
    }

    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Active { read_only: true } | Self::Ending { read_only: true }
        )
    }

    #[must_use]
    pub const fn is_ending(self) -> bool {
        matches!(self, Self::Ending { .. })
    }
}

/// Session state the decider needs, snapshotted by the router session
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub trx: TrxState,
    /// LOAD DATA LOCAL INFILE in progress (any non-inactive sub-state)
    pub load_data_active: bool,
    pub use_sql_variables_in: UseSqlVariablesIn,
    /// The session pin points at the current master (multi-statement pin)
    pub pinned_to_master: bool,
}

/// The routing decision: selector flags plus optional hint payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    bits: u32,
    named_server: Option<String>,
    max_rlag: Option<i32>,
}

const TARGET_ALL: u32 = 1 << 0;
const TARGET_SLAVE: u32 = 1 << 1;
const TARGET_MASTER: u32 = 1 << 2;
const TARGET_NAMED_SERVER: u32 = 1 << 3;
const TARGET_RLAG_MAX: u32 = 1 << 4;

impl RouteTarget {
    #[must_use]
    pub(crate) const fn master() -> Self {
        Self {
            bits: TARGET_MASTER,
            named_server: None,
            max_rlag: None,
        }
    }

    const fn undefined() -> Self {
        Self {
            bits: 0,
            named_server: None,
            max_rlag: None,
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.bits & TARGET_ALL != 0
    }

    #[must_use]
    pub const fn is_slave(&self) -> bool {
        self.bits & TARGET_SLAVE != 0
    }

    #[must_use]
    pub const fn is_master(&self) -> bool {
        self.bits & TARGET_MASTER != 0
    }

    #[must_use]
    pub const fn is_named_server(&self) -> bool {
        self.bits & TARGET_NAMED_SERVER != 0
    }

    #[must_use]
    pub const fn is_rlag_max(&self) -> bool {
        self.bits & TARGET_RLAG_MAX != 0
    }

    /// Server name from a named-server hint
    #[must_use]
    pub fn named_server(&self) -> Option<&str> {
        self.named_server.as_deref()
    }

    /// Replication lag ceiling from a parameter hint, in seconds
    #[must_use]
    pub const fn max_rlag(&self) -> Option<i32> {
        self.max_rlag
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_all() {
            parts.push("all");
        }
        if self.is_slave() {
            parts.push("slave");
        }
        if self.is_master() {
            parts.push("master");
        }
        if self.is_named_server() {
            parts.push("named-server");
        }
        if self.is_rlag_max() {
            parts.push("rlag-max");
        }
        if parts.is_empty() {
            parts.push("undefined");
        }
        f.write_str(&parts.join("|"))
    }
}

/// Decide where a statement should be routed.
///
/// The decision table, top-down and first match wins:
///
/// 1. Session pinned to master (multi-statement packet seen) → master.
/// 2. Session-state-affecting statements outside LOAD DATA → all backends;
///    a read-flagged variant that is not a prepare additionally forces the
///    master with a warning.
/// 3. Plain reads outside transactions and LOAD DATA → slave.
/// 4. Read-only transaction, active or ending → slave.
/// 5. Everything else → master.
///
/// The hint list then overlays the result.
#[must_use]
pub fn get_route_target(stmt: &Statement, ctx: &RoutingContext) -> RouteTarget {
    let qtype = stmt.classification();
    let vars_in_all = ctx.use_sql_variables_in == UseSqlVariablesIn::All;
    let mut target = RouteTarget::undefined();

    if ctx.pinned_to_master {
        target.bits = TARGET_MASTER;
    } else if !ctx.load_data_active
        && (qtype.contains(QueryType::SESSION_WRITE)
            || (vars_in_all && qtype.contains(QueryType::USERVAR_WRITE))
            || qtype.contains(QueryType::GSYSVAR_WRITE)
            || qtype.contains(QueryType::ENABLE_AUTOCOMMIT)
            || qtype.contains(QueryType::DISABLE_AUTOCOMMIT))
    {
        // A read that also modifies SQL variables cannot fan out: multiple
        // result sets would reach the client. Prepares are exempt since only
        // the later execution produces results.
        if qtype.contains(QueryType::READ)
            && !qtype.intersects(QueryType::PREPARE_STMT | QueryType::PREPARE_NAMED_STMT)
        {
            warn!(
                "The query can't be routed to all backend servers because it includes SELECT and \
                 SQL variable modifications which is not supported. Set use_sql_variables_in=master \
                 or split the query to two, where SQL variable modifications are done in the first \
                 and the SELECT in the second one."
            );
            target.bits = TARGET_MASTER;
        }
        target.bits |= TARGET_ALL;
    } else if !ctx.trx.is_active()
        && !ctx.load_data_active
        && !qtype.contains(QueryType::MASTER_READ)
        && !qtype.contains(QueryType::WRITE)
        && !qtype.intersects(QueryType::PREPARE_STMT | QueryType::PREPARE_NAMED_STMT)
        && qtype.intersects(
            QueryType::READ
                | QueryType::SHOW_TABLES
                | QueryType::USERVAR_READ
                | QueryType::SYSVAR_READ
                | QueryType::GSYSVAR_READ,
        )
    {
        if qtype.contains(QueryType::USERVAR_READ) {
            if vars_in_all {
                target.bits = TARGET_SLAVE;
            }
        } else if qtype.intersects(
            QueryType::READ
                | QueryType::SHOW_TABLES
                | QueryType::SYSVAR_READ
                | QueryType::GSYSVAR_READ,
        ) {
            target.bits = TARGET_SLAVE;
        }

        // User variable reads with use_sql_variables_in=master fall through
        // to the master here
        if target.bits & (TARGET_ALL | TARGET_SLAVE | TARGET_MASTER) == 0 {
            target.bits = TARGET_MASTER;
        }
    } else if ctx.trx.is_read_only() {
        // Reads inside a READ ONLY transaction stay on the pinned slave,
        // including the ending COMMIT
        target.bits = TARGET_SLAVE;
    } else {
        target.bits = TARGET_MASTER;
    }

    apply_hints(stmt, &mut target);
    target
}

/// Overlay the statement's hint list onto the decided target
fn apply_hints(stmt: &Statement, target: &mut RouteTarget) {
    for hint in stmt.hints() {
        match hint {
            Hint::RouteToMaster => {
                target.bits = TARGET_MASTER;
                target.named_server = None;
                target.max_rlag = None;
                debug!("Hint: route to master");
                break;
            }
            Hint::RouteToSlave => {
                target.bits = TARGET_SLAVE;
                debug!("Hint: route to slave");
            }
            Hint::RouteToNamed(name) => {
                target.bits |= TARGET_NAMED_SERVER;
                if target.named_server.is_none() {
                    target.named_server = Some(name.clone());
                }
                debug!("Hint: route to named server '{}'", name);
            }
            Hint::RouteToAll => {
                // Recognized but unsupported; fail closed by ignoring it
                info!("Ignoring unsupported route-to-all hint");
            }
            Hint::Parameter { name, value } => {
                if name.eq_ignore_ascii_case(Hint::MAX_SLAVE_REPLICATION_LAG) {
                    match value.parse::<i32>() {
                        Ok(seconds) => {
                            target.bits |= TARGET_RLAG_MAX;
                            target.max_rlag = Some(seconds);
                            debug!("Hint: max_slave_replication_lag={}", seconds);
                        }
                        Err(_) => {
                            error!(
                                "Ignoring non-numeric value '{}' for hint parameter '{}'",
                                value, name
                            );
                        }
                    }
                } else {
                    error!(
                        "Unknown hint parameter '{}' when '{}' was expected",
                        name,
                        Hint::MAX_SLAVE_REPLICATION_LAG
                    );
                }
            }
        }
    }
}
