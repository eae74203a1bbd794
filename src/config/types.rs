//! Configuration type definitions

use super::defaults;
use crate::router::SelectionCriteria;
use crate::types::ServerName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where statements touching SQL variables may execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UseSqlVariablesIn {
    /// Variable reads may run on slaves; variable writes replay everywhere
    #[default]
    All,
    /// All variable statements stick to the master
    Master,
}

impl UseSqlVariablesIn {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Master => "master",
        }
    }
}

impl std::fmt::Display for UseSqlVariablesIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the session reacts to losing its master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MasterFailureMode {
    /// A missing master fails the session immediately
    #[default]
    FailInstantly,
    /// Read-only sessions may run without a master; writes fail
    FailOnWrite,
    /// Writes draw a read-only error and the stale master is closed
    ErrorOnWrite,
}

impl MasterFailureMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailInstantly => "fail-instantly",
            Self::FailOnWrite => "fail-on-write",
            Self::ErrorOnWrite => "error-on-write",
        }
    }
}

impl std::fmt::Display for MasterFailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-service routing configuration
///
/// Sessions take a private copy at creation: the history-overflow path
/// mutates `disable_sescmd_history`/`max_sescmd_history` for that session
/// only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub slave_selection_criteria: SelectionCriteria,

    #[serde(default)]
    pub use_sql_variables_in: UseSqlVariablesIn,

    #[serde(default)]
    pub master_failure_mode: MasterFailureMode,

    #[serde(default = "defaults::master_accept_reads")]
    pub master_accept_reads: bool,

    /// Keep the master pin after a multi-statement packet routes
    #[serde(default = "defaults::strict_multi_stmt")]
    pub strict_multi_stmt: bool,

    /// Treat CALL statements like multi-statement packets
    #[serde(default = "defaults::strict_sp_calls")]
    pub strict_sp_calls: bool,

    #[serde(default = "defaults::retry_failed_reads")]
    pub retry_failed_reads: bool,

    #[serde(default = "defaults::disable_sescmd_history")]
    pub disable_sescmd_history: bool,

    /// Session command history ceiling; 0 disables the ceiling
    #[serde(default = "defaults::max_sescmd_history")]
    pub max_sescmd_history: u64,

    /// Keepalive ping interval in seconds; 0 disables pings
    #[serde(default = "defaults::connection_keepalive")]
    pub connection_keepalive: u64,

    /// Replication lag ceiling in seconds applied to slave selection when no
    /// hint overrides it; 0 means no ceiling
    #[serde(default = "defaults::max_slave_replication_lag")]
    pub max_slave_replication_lag: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            slave_selection_criteria: SelectionCriteria::default(),
            use_sql_variables_in: UseSqlVariablesIn::default(),
            master_failure_mode: MasterFailureMode::default(),
            master_accept_reads: defaults::master_accept_reads(),
            strict_multi_stmt: defaults::strict_multi_stmt(),
            strict_sp_calls: defaults::strict_sp_calls(),
            retry_failed_reads: defaults::retry_failed_reads(),
            disable_sescmd_history: defaults::disable_sescmd_history(),
            max_sescmd_history: defaults::max_sescmd_history(),
            connection_keepalive: defaults::connection_keepalive(),
            max_slave_replication_lag: defaults::max_slave_replication_lag(),
        }
    }
}

/// One configured database server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: ServerName,
    pub address: String,
    pub port: u16,
}

/// Regex pattern compilation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOption {
    /// Case-insensitive matching (the default)
    Ignorecase,
    /// Case-sensitive matching
    Case,
    /// Ignore unescaped whitespace and `#` comments in the pattern
    Extended,
}

/// Hint filter configuration
///
/// Either the legacy `match`/`server` pair or indexed `matchNN`/`targetNN`
/// parameters (captured through the flattened map); mixing the two forms is
/// rejected when the filter is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintFilterConfig {
    /// Filter instance name, for logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy pattern, paired with `server`
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_legacy: Option<String>,

    /// Legacy target server, paired with `match`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Restrict the filter to a single username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Restrict the filter to clients from this IPv4 address; up to three
    /// trailing octets may be `%` wildcards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default = "defaults::pattern_options")]
    pub options: Vec<PatternOption>,

    /// Indexed `matchNN`/`targetNN` parameters in any order
    #[serde(flatten)]
    pub indexed: BTreeMap<String, String>,
}

impl Default for HintFilterConfig {
    fn default() -> Self {
        Self {
            name: None,
            match_legacy: None,
            server: None,
            user: None,
            source: None,
            options: defaults::pattern_options(),
            indexed: BTreeMap::new(),
        }
    }
}

/// Service section: name plus the router parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(flatten)]
    pub router: RouterConfig,
}

/// Complete configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,

    pub servers: Vec<ServerConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<HintFilterConfig>,
}
