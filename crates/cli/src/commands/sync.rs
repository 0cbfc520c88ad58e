use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use slate_core::config::SlateConfig;
use slate_core::models::sync::EntityKind;
use slate_core::sis::token::TokenManager;
use tracing::{error, info, warn};

use super::{build_orchestrator, open_repo, seed_credentials};

/// Run the `sync` command: pull data from the configured SIS.
pub async fn run(config_path: &str, dry_run: bool, entity: Option<&str>) -> anyhow::Result<()> {
    let config = SlateConfig::load(Path::new(config_path))?;
    config.validate()?;
    info!("Loaded configuration from {config_path}");

    if !config.sis.enabled {
        warn!("SIS integration is not enabled in the configuration");
        println!("SIS integration is disabled. Enable it in your config file first.");
        return Ok(());
    }

    let repo = open_repo(&config).await?;
    seed_credentials(&config, &repo).await?;

    if dry_run {
        println!("Dry run mode - verifying credentials only");
        println!("Base URL: {}", config.sis.base_url);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sis.request_timeout_secs))
            .build()?;
        let tokens = TokenManager::new(repo, http);
        match tokens.token().await {
            Ok(_) => {
                println!("Credential check: SUCCESS");
                info!("Dry run credential check passed");
            }
            Err(e) => {
                println!("Credential check: FAILED - {e}");
                error!("Dry run credential check failed: {e}");
            }
        }
        return Ok(());
    }

    let orchestrator = build_orchestrator(&config, Arc::clone(&repo))?;
    let start = Instant::now();

    let run = match entity {
        Some(name) => {
            let kind = EntityKind::parse(name)
                .ok_or_else(|| anyhow::anyhow!("unknown entity type: {name}"))?;
            println!("Starting {kind} sync...");
            orchestrator.sync_entity(kind).await?
        }
        None => {
            println!("Starting full sync...");
            orchestrator.sync_all().await?
        }
    };

    println!(
        "Sync completed successfully in {:.1}s",
        start.elapsed().as_secs_f64()
    );
    println!("  Run id:    {}", run.id);
    println!("  Records:   {}", run.record_count);
    println!("  Skipped:   {}", run.skipped_count);

    if run.skipped_count > 0 {
        println!("Some records were skipped; inspect the run details with `slate status`.");
    }

    Ok(())
}
