//! Regex→target rule compilation and matching
//!
//! A filter instance holds the compiled rule chain built from either the
//! legacy `match`/`server` pair or the indexed `matchNN`/`targetNN`
//! parameters. Rules are walked in configuration order and the first
//! matching pattern wins.

use super::source::SourceHost;
use super::{Hint, HintSession};
use crate::config::{ConfigError, HintFilterConfig, PatternOption};
use crate::types::ServerName;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Maximum number of indexed `matchNN`/`targetNN` pairs
const MAX_INDEXED_PAIRS: usize = 100;

/// Hint kind derived from a rule's target list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HintKind {
    /// Targets are server names
    NamedServer,
    /// Reserved token `->master`
    Master,
    /// Reserved token `->slave`
    Slave,
    /// Reserved token `->all`
    All,
}

/// One compiled rule: pattern plus the targets it routes to
#[derive(Debug)]
struct RegexToTargets {
    pattern: String,
    regex: Regex,
    targets: Vec<String>,
    kind: HintKind,
}

impl RegexToTargets {
    fn hints(&self) -> impl Iterator<Item = Hint> + '_ {
        self.targets.iter().map(move |target| match self.kind {
            HintKind::NamedServer => Hint::RouteToNamed(target.clone()),
            HintKind::Master => Hint::RouteToMaster,
            HintKind::Slave => Hint::RouteToSlave,
            HintKind::All => Hint::RouteToAll,
        })
    }
}

/// Serializable summary of a filter instance for diagnostics
#[derive(Debug, Serialize)]
pub struct FilterDiagnostics {
    pub mappings: Vec<MappingDiagnostics>,
    pub source: Option<String>,
    pub user: Option<String>,
    pub queries_diverted: u64,
    pub queries_undiverted: u64,
}

#[derive(Debug, Serialize)]
pub struct MappingDiagnostics {
    #[serde(rename = "match")]
    pub pattern: String,
    pub targets: Vec<String>,
}

/// A configured hint filter instance, shared by all of its sessions
#[derive(Debug)]
pub struct RegexHintFilter {
    user: Option<String>,
    source: Option<SourceHost>,
    rules: Vec<RegexToTargets>,
    total_diverted: AtomicU64,
    total_undiverted: AtomicU64,
}

impl RegexHintFilter {
    /// Build a filter instance from configuration.
    ///
    /// Rejects bad regexes, unknown server names, a half-configured legacy
    /// pair and mixing legacy with indexed parameters. `servers` is the set
    /// of configured server names used to validate rule targets.
    pub fn from_config(
        config: &HintFilterConfig,
        servers: &[ServerName],
    ) -> Result<Self, ConfigError> {
        let source = config
            .source
            .as_deref()
            .map(SourceHost::parse)
            .transpose()?;

        let legacy_mode = config.match_legacy.is_some() || config.server.is_some();
        if legacy_mode && (config.match_legacy.is_none() || config.server.is_none()) {
            return Err(ConfigError::IncompleteLegacyPair);
        }

        let mut rules = Vec::new();
        // The parameter names are generated here, per instance; indexes may
        // be sparse and in any order in the configuration.
        for index in 1..=MAX_INDEXED_PAIRS {
            let match_name = format!("match{:02}", index);
            let target_name = format!("target{:02}", index);
            let pattern = config.indexed.get(&match_name);
            let target = config.indexed.get(&target_name);

            match (pattern, target) {
                (None, None) => continue,
                (Some(_), None) => {
                    return Err(ConfigError::MissingIndexedParameter(target_name));
                }
                (None, Some(_)) => {
                    return Err(ConfigError::MissingIndexedParameter(match_name));
                }
                (Some(pattern), Some(target)) => {
                    rules.push(compile_rule(
                        pattern,
                        target,
                        &config.options,
                        servers,
                        false,
                    )?);
                }
            }
        }

        if legacy_mode && !rules.is_empty() {
            return Err(ConfigError::MixedFilterParameters);
        }
        if legacy_mode {
            warn!("Use of legacy parameters 'match' and 'server' is deprecated.");
            let pattern = config.match_legacy.as_deref().unwrap_or_default();
            let target = config.server.as_deref().unwrap_or_default();
            rules.push(compile_rule(
                pattern,
                target,
                &config.options,
                servers,
                true,
            )?);
        }
        if rules.is_empty() {
            return Err(ConfigError::NoFilterRules);
        }

        Ok(Self {
            user: config.user.clone(),
            source,
            rules,
            total_diverted: AtomicU64::new(0),
            total_undiverted: AtomicU64::new(0),
        })
    }

    /// Open a per-client filter session.
    ///
    /// The session is active iff the client address satisfies the `source`
    /// predicate and the username satisfies the `user` predicate; inactive
    /// sessions pass statements through untouched.
    #[must_use]
    pub fn new_session(
        self: &Arc<Self>,
        client_addr: Option<Ipv4Addr>,
        user: Option<&str>,
    ) -> HintSession {
        let mut active = true;
        if let (Some(source), Some(addr)) = (&self.source, client_addr) {
            active = source.matches(addr);
        }
        if let (Some(wanted), Some(user)) = (&self.user, user) {
            if wanted != user {
                active = false;
            }
        }
        HintSession::new(Arc::clone(self), active)
    }

    /// Hints of the first rule whose pattern matches the SQL text
    #[must_use]
    pub fn hints_for(&self, sql: &str) -> Option<Vec<Hint>> {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(sql))
            .map(|rule| rule.hints().collect())
    }

    pub(crate) fn record_diverted(&self) {
        self.total_diverted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undiverted(&self) {
        self.total_undiverted.fetch_add(1, Ordering::Relaxed);
    }

    /// Instance-wide diagnostics
    #[must_use]
    pub fn diagnostics(&self) -> FilterDiagnostics {
        FilterDiagnostics {
            mappings: self
                .rules
                .iter()
                .map(|rule| MappingDiagnostics {
                    pattern: rule.pattern.clone(),
                    targets: rule.targets.clone(),
                })
                .collect(),
            source: self.source.as_ref().map(|s| s.address().to_string()),
            user: self.user.clone(),
            queries_diverted: self.total_diverted.load(Ordering::Relaxed),
            queries_undiverted: self.total_undiverted.load(Ordering::Relaxed),
        }
    }
}

fn compile_rule(
    pattern: &str,
    target: &str,
    options: &[PatternOption],
    servers: &[ServerName],
    legacy_mode: bool,
) -> Result<RegexToTargets, ConfigError> {
    let mut builder = RegexBuilder::new(pattern);
    for option in options {
        match option {
            PatternOption::Ignorecase => {
                builder.case_insensitive(true);
            }
            PatternOption::Case => {
                builder.case_insensitive(false);
            }
            PatternOption::Extended => {
                builder.ignore_whitespace(true);
            }
        }
    }
    let regex = builder.build().map_err(|e| ConfigError::BadRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let (targets, kind) = parse_targets(target, servers, legacy_mode)?;
    Ok(RegexToTargets {
        pattern: pattern.to_string(),
        regex,
        targets,
        kind,
    })
}

/// Parse a rule's target string: a server name, a list of server names, or
/// one of the reserved tokens.
fn parse_targets(
    target: &str,
    servers: &[ServerName],
    legacy_mode: bool,
) -> Result<(Vec<String>, HintKind), ConfigError> {
    let names: Vec<&str> = target
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let known = |name: &str| servers.iter().any(|s| s.matches(name));

    match names.as_slice() {
        [] => Err(ConfigError::NoFilterRules),
        [single] => {
            if legacy_mode || known(single) {
                if !known(single) {
                    return Err(ConfigError::UnknownServer((*single).to_string()));
                }
                Ok((vec![(*single).to_string()], HintKind::NamedServer))
            } else {
                match *single {
                    "->master" => Ok((vec![(*single).to_string()], HintKind::Master)),
                    "->slave" => Ok((vec![(*single).to_string()], HintKind::Slave)),
                    "->all" => Ok((vec![(*single).to_string()], HintKind::All)),
                    other => Err(ConfigError::UnknownServer(other.to_string())),
                }
            }
        }
        many => {
            // A list must name valid servers only
            for name in many {
                if !known(name) {
                    return Err(ConfigError::UnknownServer((*name).to_string()));
                }
            }
            Ok((
                many.iter().map(|s| (*s).to_string()).collect(),
                HintKind::NamedServer,
            ))
        }
    }
}
