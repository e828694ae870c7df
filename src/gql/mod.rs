use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, Credentials};

pub mod model;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response is not valid JSON: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The one remote capability the fetch loop consumes.
#[async_trait]
pub trait ModLogService: Send + Sync {
    /// Fetch one page of messages sent by `sender_id`, starting after `cursor`.
    async fn messages_by_sender(
        &self,
        sender_id: &str,
        cursor: Option<&str>,
    ) -> Result<Value, ApiError>;
}

#[derive(Clone)]
pub struct GqlClient {
    http: Client,
    endpoint: Url,
    client_id: String,
    channel_id: String,
    operation_name: String,
    query_hash: String,
    credentials: Credentials,
}

impl fmt::Debug for GqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GqlClient")
            .field("endpoint", &self.endpoint)
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

impl GqlClient {
    pub fn from_config(cfg: &Config, credentials: Credentials) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&cfg.gql.endpoint)?;
        Self::with_endpoint(cfg, credentials, endpoint)
    }

    /// Like `from_config` but pointed at an arbitrary endpoint.
    pub fn with_endpoint(
        cfg: &Config,
        credentials: Credentials,
        endpoint: Url,
    ) -> anyhow::Result<Self> {
        // No request timeout is configured.
        let http = Client::builder()
            .user_agent(concat!("follower-logs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(cfg, credentials, endpoint, http))
    }

    /// Build around a caller-supplied reqwest client (proxy or TLS settings).
    pub fn with_http_client(
        cfg: &Config,
        credentials: Credentials,
        endpoint: Url,
        http: Client,
    ) -> Self {
        Self {
            http,
            endpoint,
            client_id: cfg.gql.client_id.clone(),
            channel_id: cfg.gql.channel_id.clone(),
            operation_name: cfg.gql.operation_name.clone(),
            query_hash: cfg.gql.persisted_query_hash.clone(),
            credentials,
        }
    }

    pub fn build_request(
        &self,
        sender_id: &str,
        cursor: Option<&str>,
    ) -> Result<reqwest::Request, ApiError> {
        let body = build_messages_query(
            &self.operation_name,
            &self.query_hash,
            &self.channel_id,
            sender_id,
            cursor,
        );
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("OAuth {}", self.credentials.oauth_token))
            .header("Content-Type", "application/json")
            .header("Client-Integrity", &self.credentials.integrity_token)
            .header("X-Device-Id", &self.credentials.device_id)
            .json(&body)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl ModLogService for GqlClient {
    async fn messages_by_sender(
        &self,
        sender_id: &str,
        cursor: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(sender_id, cursor)?;
        debug!(url = %request.url(), sender_id, cursor, "sending mod log query");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { body, source })
    }
}

/// Persisted-query body for one page of a sender's messages. The API expects
/// a batch, so the operation is wrapped in a one-element array.
pub fn build_messages_query(
    operation_name: &str,
    query_hash: &str,
    channel_id: &str,
    sender_id: &str,
    cursor: Option<&str>,
) -> Value {
    json!([
        {
            "operationName": operation_name,
            "variables": {
                "senderID": sender_id,
                "channelID": channel_id,
                "cursor": cursor,
            },
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": query_hash,
                }
            }
        }
    ])
}
