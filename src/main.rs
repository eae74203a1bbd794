use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use rwsplit_proxy::args::Args;
use rwsplit_proxy::config::load_config;
use rwsplit_proxy::hint::RegexHintFilter;
use rwsplit_proxy::logging::init_logging;
use rwsplit_proxy::router::RwSplitService;
use rwsplit_proxy::server::Server;
use rwsplit_proxy::types::ServerName;

/// Build and validate the full service stack from a configuration file.
///
/// The wire front-end embeds the returned service through the library API;
/// this binary exists to reject bad configurations before deployment and to
/// print what the router would run with.
fn build_services(config_path: &str) -> Result<(RwSplitService, Vec<Arc<RegexHintFilter>>)> {
    let config = load_config(config_path)?;

    let server_names: Vec<ServerName> = config.servers.iter().map(|s| s.name.clone()).collect();
    let servers: Vec<Arc<Server>> = config
        .servers
        .iter()
        .map(|s| Arc::new(Server::new(s.name.clone(), s.address.clone(), s.port)))
        .collect();

    let mut filters = Vec::with_capacity(config.filters.len());
    for filter_config in &config.filters {
        let filter = RegexHintFilter::from_config(filter_config, &server_names)
            .with_context(|| {
                format!(
                    "Failed to build hint filter '{}'",
                    filter_config.name.as_deref().unwrap_or("<unnamed>")
                )
            })?;
        filters.push(Arc::new(filter));
    }

    let service = RwSplitService::new(
        config.service.name.clone(),
        config.service.router.clone(),
        servers,
    );
    Ok((service, filters))
}

fn main() -> Result<()> {
    let _log_guard = init_logging();
    let args = Args::parse();

    let (service, filters) = build_services(&args.config)?;

    info!(
        "Configuration '{}' is valid: service '{}' with {} server(s) and {} hint filter(s)",
        args.config,
        service.name(),
        service.servers().len(),
        filters.len()
    );
    for server in service.servers() {
        info!(
            "  server '{}' at [{}]:{}",
            server.name(),
            server.address(),
            server.port()
        );
    }
    for filter in &filters {
        let diag = filter.diagnostics();
        for mapping in &diag.mappings {
            info!("  hint rule /{}/ -> {}", mapping.pattern, mapping.targets.join(", "));
        }
    }

    if args.check {
        println!("OK");
    }
    Ok(())
}
