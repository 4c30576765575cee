use crate::types::{RpcResponse, RpcTransaction, SignatureInfo, TokenMetadata};
use async_trait::async_trait;
use config_manager::HeliusConfig;
use flow_core::{is_valid_solana_address, RawTransaction, SourceError, TransactionSource};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum HeliusError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsingFailed(#[from] serde_json::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, HeliusError>;

impl From<HeliusError> for SourceError {
    fn from(err: HeliusError) -> Self {
        match err {
            HeliusError::JsonParsingFailed(e) => SourceError::InvalidResponse(e.to_string()),
            HeliusError::ConfigError(message) => SourceError::Disabled(message),
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

/// Helius RPC client serving an account's transaction history page by page
#[derive(Debug, Clone)]
pub struct HeliusClient {
    /// HTTP client for making requests
    http_client: Client,

    /// Helius configuration
    config: HeliusConfig,

    /// RPC endpoint with the api key applied
    endpoint: Url,

    request_id_counter: Arc<AtomicU64>,
}

impl HeliusClient {
    /// Create a new Helius client with the given configuration
    pub fn new(config: HeliusConfig) -> Result<Self> {
        if config.enabled && config.api_key.is_empty() {
            return Err(HeliusError::ConfigError(
                "Helius API key is required when Helius is enabled".to_string(),
            ));
        }

        let endpoint = if config.api_key.is_empty() {
            Url::parse(&config.rpc_url)
        } else {
            Url::parse_with_params(&config.rpc_url, &[("api-key", config.api_key.as_str())])
        }
        .map_err(|e| HeliusError::ConfigError(format!("Invalid Helius RPC url: {}", e)))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("token-flow-analyzer/1.0")
            .build()
            .map_err(|e| HeliusError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            endpoint,
            request_id_counter: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Check if Helius client is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn next_request_id(&self) -> u64 {
        self.request_id_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_enabled(&self) -> Result<()> {
        if !self.is_enabled() {
            return Err(HeliusError::ConfigError(
                "Helius client is disabled in configuration".to_string(),
            ));
        }
        Ok(())
    }

    /// Generic JSON-RPC request
    async fn rpc_request(&self, method: &str, params: Value) -> Result<RpcResponse<Value>> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": self.next_request_id(),
            "method": method,
            "params": params
        });

        debug!("Helius RPC {}", method);

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("Helius rate limit exceeded on {}", method);
            return Err(HeliusError::RateLimitExceeded);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Helius API error: {} - {}", status, message);
            return Err(HeliusError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let rpc_response: RpcResponse<Value> = serde_json::from_str(&body)?;

        if let Some(rpc_error) = rpc_response.error {
            return Err(HeliusError::Rpc {
                code: rpc_error.code,
                message: rpc_error.message,
            });
        }

        Ok(rpc_response)
    }

    /// Signatures for an address, newest first
    pub async fn get_signatures_for_address(
        &self,
        address: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<SignatureInfo>> {
        let mut options = serde_json::Map::new();
        options.insert("limit".to_string(), json!(limit));
        if let Some(before_sig) = before {
            options.insert("before".to_string(), json!(before_sig));
        }

        let response = self
            .rpc_request("getSignaturesForAddress", json!([address, options]))
            .await?;

        match response.result {
            Some(result) => Ok(serde_json::from_value(result)?),
            None => Ok(vec![]),
        }
    }

    /// Parsed transaction body; `None` when the node does not have it
    pub async fn get_transaction(&self, signature: &str) -> Result<Option<RpcTransaction>> {
        let params = json!([
            signature,
            {
                "encoding": "jsonParsed",
                "maxSupportedTransactionVersion": 0,
                "commitment": "confirmed"
            }
        ]);

        let response = self.rpc_request("getTransaction", params).await?;

        match response.result {
            Some(result) if !result.is_null() => Ok(Some(serde_json::from_value(result)?)),
            _ => Ok(None),
        }
    }

    /// One page of an account's history, newest first.
    ///
    /// Bodies of the page's signatures are fetched with bounded concurrency,
    /// keeping signature order. Signatures without a block time are dropped.
    pub async fn fetch_page(
        &self,
        address: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<RawTransaction>> {
        self.ensure_enabled()?;

        if !is_valid_solana_address(address) {
            return Err(HeliusError::InvalidAddress(address.to_string()));
        }

        if before.is_some() {
            self.apply_rate_limit().await;
        }

        let signatures = self.get_signatures_for_address(address, before, limit).await?;
        if signatures.is_empty() {
            debug!("No signatures for {} before {:?}", address, before);
            return Ok(vec![]);
        }

        let entries: Vec<(SignatureInfo, Option<RpcTransaction>)> = stream::iter(signatures)
            .map(|info| async move {
                let body = self.get_transaction(&info.signature).await?;
                Ok::<_, HeliusError>((info, body))
            })
            .buffered(self.config.max_concurrent_requests.max(1))
            .try_collect()
            .await?;

        let page = assemble_page(entries);

        debug!("Fetched page of {} transactions for {}", page.len(), address);
        Ok(page)
    }

    /// Token name, symbol and decimals via `getAsset`. Lookup failures are
    /// logged and reported as `None`.
    pub async fn fetch_token_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        if !is_valid_solana_address(mint) {
            return None;
        }

        if let Err(e) = self.ensure_enabled() {
            warn!("Cannot fetch token metadata: {}", e);
            return None;
        }

        match self.rpc_request("getAsset", json!({ "id": mint })).await {
            Ok(response) => {
                let metadata = response.result.as_ref().and_then(TokenMetadata::from_asset);
                if metadata.is_none() {
                    warn!("No asset metadata returned for {}", mint);
                }
                metadata
            }
            Err(e) => {
                error!("Failed to get token metadata for {}: {}", mint, e);
                None
            }
        }
    }

    /// Apply rate limiting between pages
    async fn apply_rate_limit(&self) {
        if self.config.rate_limit_ms > 0 {
            time::sleep(Duration::from_millis(self.config.rate_limit_ms)).await;
        }
    }
}

/// Turn a signature page and its bodies into one transaction per signature,
/// newest first. The page length must match the signature count, since the
/// collector reads a short page as the end of history.
///
/// Entries without a usable body become snapshot-less placeholders. Undated
/// entries take the block time of the newer neighbour, else of the first
/// dated entry on the page; a page with no dates at all sorts as newest.
pub(crate) fn assemble_page(
    entries: Vec<(SignatureInfo, Option<RpcTransaction>)>,
) -> Vec<RawTransaction> {
    let first_dated = entries
        .iter()
        .find_map(|(info, body)| body.as_ref().and_then(|tx| tx.block_time).or(info.block_time));

    let mut page = Vec::with_capacity(entries.len());
    let mut undated = 0usize;
    let mut newer_block_time: Option<i64> = None;

    for (info, body) in entries {
        let fallback = newer_block_time.or(first_dated).unwrap_or(i64::MAX);

        let raw = match body.and_then(|tx| tx.into_raw(&info)) {
            Some(raw) => raw,
            None => {
                if info.block_time.is_none() {
                    undated += 1;
                }
                debug!("Using placeholder for {}", info.signature);
                info.into_bodiless(fallback)
            }
        };

        newer_block_time = Some(raw.block_time);
        page.push(raw);
    }

    if undated > 0 {
        warn!(
            "{} signatures without block time kept as placeholders",
            undated
        );
    }

    page
}

#[async_trait]
impl TransactionSource for HeliusClient {
    async fn get_page(
        &self,
        account_address: &str,
        page_limit: u32,
        before: Option<&str>,
    ) -> std::result::Result<Vec<RawTransaction>, SourceError> {
        self.fetch_page(account_address, page_limit, before)
            .await
            .map_err(SourceError::from)
    }
}
