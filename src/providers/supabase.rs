//! Supabase (PostgREST) token store
//!
//! Upserts one record per request:
//! `POST {base}/rest/v1/{table}?on_conflict=contract_address,blockchain`
//! with `Prefer: resolution=merge-duplicates` so a repeated key updates the row.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use crate::core::persister::TokenStore;
use crate::models::config::StoreConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::TokenRecord;
use crate::utils::constants::{DEFAULT_STORE_TIMEOUT_SECS, TOKEN_CONFLICT_COLUMNS, USER_AGENT};

/// PostgREST client for the token table
pub struct SupabaseStore {
    client: reqwest::Client,
    endpoint: String,
}

impl SupabaseStore {
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.api_key)
                .map_err(|_| AppError::invalid_config("SUPABASE_KEY", "<redacted>"))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| AppError::invalid_config("SUPABASE_KEY", "<redacted>"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorCode::StoreRequestFailed, "HTTP client build failed", e)
            })?;

        Ok(Self {
            client,
            endpoint: upsert_endpoint(&config.base_url, &config.table),
        })
    }
}

/// Upsert URL for a table
pub fn upsert_endpoint(base_url: &str, table: &str) -> String {
    format!(
        "{}/rest/v1/{}?on_conflict={}",
        base_url.trim_end_matches('/'),
        table,
        TOKEN_CONFLICT_COLUMNS
    )
}

/// Map a non-success response to an error code
pub fn status_error(status: StatusCode, body: &str) -> AppError {
    let body = body.chars().take(300).collect::<String>();
    let message = format!("store returned HTTP {}: {}", status.as_u16(), body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::new(ErrorCode::StoreRateLimited, message)
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        AppError::new(ErrorCode::StoreTimeout, message)
    } else if status.is_server_error() {
        AppError::new(ErrorCode::StoreRequestFailed, message)
    } else {
        AppError::store_rejected(message)
    }
}

#[async_trait]
impl TokenStore for SupabaseStore {
    async fn upsert(&self, record: &TokenRecord) -> AppResult<()> {
        // PostgREST bulk shape; one row per request keeps failures per record
        let response = self
            .client
            .post(&self.endpoint)
            .json(&[record])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(
                "💾 Upserted {} on {} (HTTP {})",
                record.contract_address,
                record.blockchain,
                status.as_u16()
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}
