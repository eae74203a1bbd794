//! Slave selection criteria
//!
//! The configured criterion picks the comparator used to choose among
//! acceptable slave candidates. Modeled as a tagged enum with a dispatch
//! function so the comparison logic stays inspectable; ties keep the
//! earlier backend, which preserves the stable insertion order tie-break.

use crate::server::Server;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparator used to pick among acceptable slave candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionCriteria {
    /// Fewest statements currently in flight (the default)
    #[default]
    LeastConnections,
    /// Smallest replication lag; unmeasured lag sorts last
    LeastBehindMaster,
    /// Fewest connections opened by this router service
    LeastRouterConnections,
    /// Fewest connections across all services
    LeastGlobalConnections,
    /// Smallest smoothed response time
    AdaptiveRouting,
}

impl SelectionCriteria {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LeastConnections => "least-connections",
            Self::LeastBehindMaster => "least-behind-master",
            Self::LeastRouterConnections => "least-router-connections",
            Self::LeastGlobalConnections => "least-global-connections",
            Self::AdaptiveRouting => "adaptive-routing",
        }
    }

    /// Compare two candidates; `Ordering::Less` means `a` is the better pick
    #[must_use]
    pub fn compare(self, a: &Server, b: &Server) -> Ordering {
        match self {
            Self::LeastConnections => a.current_ops().cmp(&b.current_ops()),
            Self::LeastBehindMaster => {
                let lag = |s: &Server| s.replication_lag().map_or(i64::MAX, i64::from);
                lag(a).cmp(&lag(b))
            }
            Self::LeastRouterConnections => a.router_connections().cmp(&b.router_connections()),
            Self::LeastGlobalConnections => a.connections().cmp(&b.connections()),
            Self::AdaptiveRouting => a.response_time_us().cmp(&b.response_time_us()),
        }
    }
}

impl std::fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerName;

    fn server(name: &str) -> Server {
        Server::new(
            ServerName::new(name.to_string()).unwrap(),
            "127.0.0.1".to_string(),
            3306,
        )
    }

    #[test]
    fn test_least_connections_compares_current_ops() {
        let a = server("a");
        let b = server("b");
        b.op_started();
        assert_eq!(
            SelectionCriteria::LeastConnections.compare(&a, &b),
            Ordering::Less
        );
    }

    #[test]
    fn test_least_behind_master_unknown_lag_sorts_last() {
        let a = server("a");
        let b = server("b");
        b.set_replication_lag(3600);
        // a's lag is unknown, so even a very laggy b wins
        assert_eq!(
            SelectionCriteria::LeastBehindMaster.compare(&b, &a),
            Ordering::Less
        );
    }

    #[test]
    fn test_least_global_connections() {
        let a = server("a");
        let b = server("b");
        a.connection_opened();
        a.connection_opened();
        b.connection_opened();
        assert_eq!(
            SelectionCriteria::LeastGlobalConnections.compare(&b, &a),
            Ordering::Less
        );
    }

    #[test]
    fn test_adaptive_routing_prefers_faster_server() {
        let a = server("a");
        let b = server("b");
        a.set_response_time_us(900);
        b.set_response_time_us(12_000);
        assert_eq!(
            SelectionCriteria::AdaptiveRouting.compare(&a, &b),
            Ordering::Less
        );
    }

    #[test]
    fn test_equal_candidates_tie() {
        let a = server("a");
        let b = server("b");
        assert_eq!(
            SelectionCriteria::LeastConnections.compare(&a, &b),
            Ordering::Equal
        );
    }

    #[test]
    fn test_serde_kebab_case() {
        let c: SelectionCriteria = toml::from_str::<toml::Value>("x = \"least-behind-master\"")
            .unwrap()
            .get("x")
            .unwrap()
            .clone()
            .try_into()
            .unwrap();
        assert_eq!(c, SelectionCriteria::LeastBehindMaster);
    }
}
