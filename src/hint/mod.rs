//! Hint-based routing filter
//!
//! Operator policy is expressed as ordered regex→target rules; the filter
//! turns the first matching rule into routing hints attached to the
//! statement before it reaches the route decider. Activation can be limited
//! to one user and/or a source address with octet wildcards.

mod filter;
mod session;
mod source;

pub use filter::RegexHintFilter;
pub use session::HintSession;
pub use source::SourceHost;

/// One routing instruction attached to a statement
///
/// Hints are walked in attachment order by the route decider; a
/// `RouteToMaster` hint overrides everything before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hint {
    /// Force routing to the current master
    RouteToMaster,
    /// Force routing to a slave
    RouteToSlave,
    /// Route to all backends. Recognized but not implemented by the router,
    /// which ignores it with a log entry.
    RouteToAll,
    /// Route to the named server if it is in a usable state
    RouteToNamed(String),
    /// Parameter hint, e.g. `max_slave_replication_lag=10`
    Parameter { name: String, value: String },
}

impl Hint {
    /// Parameter name recognized for the replication-lag ceiling hint
    pub const MAX_SLAVE_REPLICATION_LAG: &'static str = "max_slave_replication_lag";
}
