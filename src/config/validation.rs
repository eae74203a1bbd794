//! Startup configuration validation

use super::types::Config;
use super::ConfigError;

impl Config {
    /// Structural validation: server list sanity.
    ///
    /// Filter rules are validated separately when the filter instances are
    /// built, since that requires compiling the patterns against the server
    /// list anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }

        for (i, server) in self.servers.iter().enumerate() {
            if server.port == 0 {
                return Err(ConfigError::InvalidServerPort(server.name.to_string()));
            }
            if self.servers[..i]
                .iter()
                .any(|other| other.name.matches(server.name.as_str()))
            {
                return Err(ConfigError::DuplicateServer(server.name.to_string()));
            }
        }

        Ok(())
    }
}
