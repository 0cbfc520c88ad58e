//! Paginated named-query client for the PowerSchool API.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, SlateError};
use crate::sis::models::QueryResponse;
use crate::sis::token::TokenManager;

/// Retry behavior for authentication failures mid-query.
///
/// A 401 on a page request means the token went stale between issue and
/// use; the client mints a fresh token and retries the same page window.
/// A second 401 with a fresh token indicates revoked API access.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_auth_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_auth_retries: 1,
        }
    }
}

/// Executes named queries against the SIS, transparently walking pages.
pub struct PagedQueryClient {
    base_url: String,
    http: Client,
    tokens: Arc<TokenManager>,
    page_size: u64,
    retry: RetryPolicy,
}

impl PagedQueryClient {
    pub fn new(base_url: &str, tokens: Arc<TokenManager>, http: Client, page_size: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
            page_size: page_size.max(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run a named query to completion, accumulating every page's records.
    ///
    /// `params` are merged into each page request alongside the
    /// `startrow`/`endrow` window. A page shorter than the page size is the
    /// last one.
    pub async fn run_query(&self, query_name: &str, params: &Map<String, Value>) -> Result<Vec<Value>> {
        let url = format!("{}/ws/schema/query/{query_name}", self.base_url);
        let mut records: Vec<Value> = Vec::new();
        let mut startrow: u64 = 1;

        loop {
            let endrow = startrow + self.page_size - 1;
            let mut body = params.clone();
            body.insert("startrow".to_string(), Value::from(startrow));
            body.insert("endrow".to_string(), Value::from(endrow));
            debug!(query = %query_name, startrow, endrow, "Fetching query page");

            let page = self.fetch_page(&url, query_name, &body).await?;
            let page_count = page.record.len() as u64;
            records.extend(page.record);

            if page_count < self.page_size {
                debug!(query = %query_name, total = records.len(), "Query pagination complete");
                break;
            }
            startrow += self.page_size;
        }

        Ok(records)
    }

    /// Fetch one page window, refreshing the token and retrying the same
    /// window on 401 up to the retry policy's limit.
    async fn fetch_page(
        &self,
        url: &str,
        query_name: &str,
        body: &Map<String, Value>,
    ) -> Result<QueryResponse> {
        let mut auth_retries: u32 = 0;
        let mut token = self.tokens.token().await?;

        loop {
            let response = self
                .http
                .post(url)
                .bearer_auth(&token)
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                if auth_retries >= self.retry.max_auth_retries {
                    warn!(query = %query_name, "SIS rejected a freshly minted token");
                    return Err(SlateError::UpstreamAuth(format!(
                        "query {query_name} rejected after token refresh; API access may be revoked"
                    )));
                }
                warn!(query = %query_name, "Access token rejected mid-query, refreshing");
                token = self.tokens.fetch_new_token().await?;
                auth_retries += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(query = %query_name, status = %status, "Query request failed");
                return Err(SlateError::upstream_http(status.as_u16(), body));
            }

            return response.json::<QueryResponse>().await.map_err(|e| {
                SlateError::Serialization(format!("failed to parse response for {query_name}: {e}"))
            });
        }
    }
}
