//! Default values for configuration parameters

use super::types::PatternOption;

pub(super) fn master_accept_reads() -> bool {
    false
}

pub(super) fn strict_multi_stmt() -> bool {
    true
}

pub(super) fn strict_sp_calls() -> bool {
    false
}

pub(super) fn retry_failed_reads() -> bool {
    true
}

pub(super) fn disable_sescmd_history() -> bool {
    false
}

/// Session command history ceiling; 0 disables the ceiling
pub(super) fn max_sescmd_history() -> u64 {
    50
}

/// Keepalive interval in seconds; 0 disables pings
pub(super) fn connection_keepalive() -> u64 {
    300
}

/// Service-wide replication lag ceiling in seconds; 0 means no ceiling
pub(super) fn max_slave_replication_lag() -> u64 {
    0
}

/// Pattern options applied when the filter config names none
pub(super) fn pattern_options() -> Vec<PatternOption> {
    vec![PatternOption::Ignorecase]
}
