//! Per-client hint filter session

use super::filter::RegexHintFilter;
use crate::statement::Statement;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Per-session view of a [`RegexHintFilter`]
///
/// Holds the activation decision made at session start plus the session's
/// own divert counters.
#[derive(Debug)]
pub struct HintSession {
    filter: Arc<RegexHintFilter>,
    active: bool,
    n_diverted: u64,
    n_undiverted: u64,
}

/// Session-level diagnostics
#[derive(Debug, Serialize)]
pub struct HintSessionDiagnostics {
    pub session_queries_diverted: u64,
    pub session_queries_undiverted: u64,
}

impl HintSession {
    pub(crate) fn new(filter: Arc<RegexHintFilter>, active: bool) -> Self {
        Self {
            filter,
            active,
            n_diverted: 0,
            n_undiverted: 0,
        }
    }

    /// Whether statements of this session are examined at all
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Attach routing hints to the statement if a rule matches its SQL text.
    ///
    /// Inactive sessions and non-SQL packets pass through unchanged. Hints
    /// are attached in target order.
    pub fn route_query(&mut self, stmt: &mut Statement) {
        if !self.active {
            return;
        }
        let Some(sql) = stmt.sql() else {
            return;
        };

        match self.filter.hints_for(sql) {
            Some(hints) => {
                debug!("Hint filter diverting statement, {} hint(s)", hints.len());
                for hint in hints {
                    stmt.add_hint(hint);
                }
                self.n_diverted += 1;
                self.filter.record_diverted();
            }
            None => {
                self.n_undiverted += 1;
                self.filter.record_undiverted();
            }
        }
    }

    /// Session counters for diagnostics
    #[must_use]
    pub fn diagnostics(&self) -> HintSessionDiagnostics {
        HintSessionDiagnostics {
            session_queries_diverted: self.n_diverted,
            session_queries_undiverted: self.n_undiverted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::QueryType;
    use crate::config::HintFilterConfig;
    use crate::hint::Hint;
    use crate::types::ServerName;
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    fn filter(user: Option<&str>, source: Option<&str>) -> Arc<RegexHintFilter> {
        let mut indexed = BTreeMap::new();
        indexed.insert("match01".to_string(), "^SELECT .*FROM audit".to_string());
        indexed.insert("target01".to_string(), "->master".to_string());
        let config = HintFilterConfig {
            user: user.map(str::to_string),
            source: source.map(str::to_string),
            indexed,
            ..HintFilterConfig::default()
        };
        let servers = vec![ServerName::new("server1".to_string()).unwrap()];
        Arc::new(RegexHintFilter::from_config(&config, &servers).unwrap())
    }

    #[test]
    fn test_matching_statement_gets_hint() {
        let filter = filter(None, None);
        let mut session = filter.new_session(None, None);
        assert!(session.is_active());

        let mut stmt = Statement::query("select x from audit where id=1", QueryType::READ);
        session.route_query(&mut stmt);
        assert_eq!(stmt.hints(), &[Hint::RouteToMaster]);
        assert_eq!(session.diagnostics().session_queries_diverted, 1);
    }

    #[test]
    fn test_non_matching_statement_passes_through() {
        let filter = filter(None, None);
        let mut session = filter.new_session(None, None);

        let mut stmt = Statement::query("SELECT 1", QueryType::READ);
        session.route_query(&mut stmt);
        assert!(stmt.hints().is_empty());
        assert_eq!(session.diagnostics().session_queries_undiverted, 1);
    }

    #[test]
    fn test_user_predicate() {
        let filter = filter(Some("appuser"), None);
        let mut wrong = filter.new_session(None, Some("other"));
        assert!(!wrong.is_active());

        let mut stmt = Statement::query("select x from audit", QueryType::READ);
        wrong.route_query(&mut stmt);
        assert!(stmt.hints().is_empty());

        let right = filter.new_session(None, Some("appuser"));
        assert!(right.is_active());
    }

    #[test]
    fn test_source_predicate_with_wildcards() {
        let filter = filter(None, Some("192.168.1.%"));
        let inside = filter.new_session(Some(Ipv4Addr::new(192, 168, 1, 44)), None);
        assert!(inside.is_active());

        let outside = filter.new_session(Some(Ipv4Addr::new(192, 168, 2, 44)), None);
        assert!(!outside.is_active());
    }
}
