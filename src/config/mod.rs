//! Configuration loading and management
//!
//! Service, server and filter configuration is loaded from a TOML file and
//! validated before any session is created. All configuration errors are
//! fatal at startup.

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{create_default_config, load_config};
pub use types::{
    Config, HintFilterConfig, MasterFailureMode, PatternOption, RouterConfig, ServerConfig,
    ServiceConfig, UseSqlVariablesIn,
};

use thiserror::Error;

/// Errors that reject a configuration at startup
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid regular expression '{pattern}': {reason}")]
    BadRegex { pattern: String, reason: String },

    #[error(
        "only one of 'match' and 'server' is set; if using legacy mode set both, \
         if using indexed parameters set neither and use 'match01' and 'target01' etc."
    )]
    IncompleteLegacyPair,

    #[error("found both legacy parameters and indexed parameters; use only one type")]
    MixedFilterParameters,

    #[error("indexed filter parameter '{0}' is missing its pair")]
    MissingIndexedParameter(String),

    #[error("'{0}' is not a valid server name")]
    UnknownServer(String),

    #[error("'{0}' is not a valid source address; use IPv4 with up to three trailing '%' octets")]
    InvalidSource(String),

    #[error("could not parse any 'match'-'target' pairs")]
    NoFilterRules,

    #[error("no servers configured")]
    NoServers,

    #[error("duplicate server name '{0}'")]
    DuplicateServer(String),

    #[error("server '{0}' has port 0")]
    InvalidServerPort(String),
}
