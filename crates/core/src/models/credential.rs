use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single active SIS credential set, persisted for cross-process reuse.
///
/// `access_token` and `token_expires_at` are mutated only by the token
/// manager.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SisCredential {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl SisCredential {
    /// Whether the three fields required for a token exchange are present.
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty()
            && !self.client_id.trim().is_empty()
            && !self.client_secret.trim().is_empty()
    }
}

impl std::fmt::Debug for SisCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SisCredential")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}
