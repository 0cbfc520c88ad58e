//! OAuth client-credentials token lifecycle for the SIS API.
//!
//! Tokens are cached in memory and persisted through the credential
//! repository so other processes can reuse them. Refreshes are
//! single-flight: concurrent callers that find the cache stale serialize
//! on the write lock, and only the first one performs the exchange.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::db::repository::CredentialRepository;
use crate::error::{Result, SlateError};
use crate::models::credential::SisCredential;
use crate::sis::models::TokenResponse;

/// A token is treated as expired this long before its actual expiry, so
/// requests issued near the boundary do not race the server clock.
pub fn validity_skew() -> Duration {
    Duration::minutes(5)
}

const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at - validity_skew() > Utc::now()
    }
}

/// Manages the access token for the configured SIS credential.
pub struct TokenManager {
    store: Arc<dyn CredentialRepository>,
    http: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialRepository>, http: Client) -> Self {
        Self {
            store,
            http,
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, minting a new one if necessary.
    pub async fn token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_valid()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.access_token.clone());
        }

        let credential = self.load_credential().await?;

        // Reuse a still-valid token persisted by a previous process.
        if let (Some(access_token), Some(expires_at)) =
            (&credential.access_token, credential.token_expires_at)
        {
            let persisted = CachedToken {
                access_token: access_token.clone(),
                expires_at,
            };
            if persisted.is_valid() {
                debug!("Reusing persisted SIS access token");
                let token = persisted.access_token.clone();
                *cached = Some(persisted);
                return Ok(token);
            }
        }

        let minted = self.mint(&credential).await?;
        let token = minted.access_token.clone();
        *cached = Some(minted);
        Ok(token)
    }

    /// Discard any cached token and mint a fresh one.
    ///
    /// Used after the API rejects a request with 401: the persisted token
    /// is known bad, so it is not consulted.
    pub async fn fetch_new_token(&self) -> Result<String> {
        let mut cached = self.cached.write().await;
        let credential = self.load_credential().await?;
        let minted = self.mint(&credential).await?;
        let token = minted.access_token.clone();
        *cached = Some(minted);
        Ok(token)
    }

    async fn load_credential(&self) -> Result<SisCredential> {
        let credential = self
            .store
            .get_credential()
            .await?
            .ok_or_else(|| SlateError::Config("SIS credentials are not configured".to_string()))?;

        if !credential.is_complete() {
            return Err(SlateError::Config(
                "SIS credentials are incomplete: base URL, client ID, and client secret are all required".to_string(),
            ));
        }

        Ok(credential)
    }

    async fn mint(&self, credential: &SisCredential) -> Result<CachedToken> {
        let token_url = format!(
            "{}/oauth/access_token",
            credential.base_url.trim_end_matches('/')
        );
        debug!(url = %token_url, "Requesting SIS access token");

        let response = self
            .http
            .post(&token_url)
            .basic_auth(&credential.client_id, Some(&credential.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "SIS token request failed");
            return Err(SlateError::UpstreamAuth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SlateError::UpstreamAuth(format!("failed to parse token response: {e}")))?;

        let expires_in = token_response
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = Utc::now() + Duration::seconds(expires_in as i64);

        self.store
            .save_token(&token_response.access_token, expires_at)
            .await?;
        debug!("SIS access token refreshed");

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}
