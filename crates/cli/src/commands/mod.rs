pub mod init;
pub mod serve;
pub mod status;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use slate_core::config::SlateConfig;
use slate_core::db::repository::CredentialRepository;
use slate_core::db::sqlite::SqliteRepository;
use slate_core::db::DatabasePool;
use slate_core::models::credential::SisCredential;
use slate_core::sis::client::PagedQueryClient;
use slate_core::sis::token::TokenManager;
use slate_core::sis::PowerSchoolSource;
use slate_core::sync::SyncOrchestrator;
use tracing::info;

/// Open (creating if necessary) the configured SQLite database.
pub(crate) async fn open_repo(config: &SlateConfig) -> anyhow::Result<Arc<SqliteRepository>> {
    let path = config
        .slate
        .database
        .path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("SQLite path not configured"))?;
    let connect_str = format!("sqlite:{path}?mode=rwc");
    let DatabasePool::Sqlite(pool) = DatabasePool::new_sqlite(&connect_str).await?;
    Ok(Arc::new(SqliteRepository::new(pool)))
}

/// Seed the durable credential row from the config file.
///
/// Only writes when the configured values differ from the stored ones,
/// since replacing the credential drops any cached access token.
pub(crate) async fn seed_credentials(
    config: &SlateConfig,
    repo: &SqliteRepository,
) -> anyhow::Result<()> {
    let configured = SisCredential {
        base_url: config.sis.base_url.clone(),
        client_id: config.sis.client_id.clone(),
        client_secret: config.sis.client_secret.clone(),
        access_token: None,
        token_expires_at: None,
    };
    if !configured.is_complete() {
        return Ok(());
    }

    let stored = repo.get_credential().await?;
    let changed = match &stored {
        Some(existing) => {
            existing.base_url != configured.base_url
                || existing.client_id != configured.client_id
                || existing.client_secret != configured.client_secret
        }
        None => true,
    };
    if changed {
        repo.upsert_credential(&configured).await?;
        info!("SIS credentials updated from configuration");
    }
    Ok(())
}

/// Build the PowerSchool-backed source and orchestrator from config.
pub(crate) fn build_orchestrator(
    config: &SlateConfig,
    repo: Arc<SqliteRepository>,
) -> anyhow::Result<SyncOrchestrator<SqliteRepository>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.sis.request_timeout_secs))
        .build()?;
    let tokens = Arc::new(TokenManager::new(repo.clone(), http.clone()));
    let client = PagedQueryClient::new(&config.sis.base_url, tokens, http, config.sis.page_size);
    let source = Arc::new(PowerSchoolSource::new(client));

    let mut orchestrator = SyncOrchestrator::new(repo, source);
    if let Some(secs) = config.sis.step_deadline_secs {
        orchestrator = orchestrator.with_step_deadline(Duration::from_secs(secs));
    }
    Ok(orchestrator)
}
