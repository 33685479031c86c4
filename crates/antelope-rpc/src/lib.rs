//! # Antelope RPC
//!
//! HTTP transport shared by the ledger side and the Ethereum side of the
//! etheraccount plugin.
//!
//! ## Features
//!
//! - HTTP client with connection reuse
//! - JSON-RPC 2.0 calls for Ethereum-compatible endpoints
//! - [`ChainApiClient`], a [`ChainApi`] over an Antelope node's `/v1/chain` API
//!
//! Requests are never retried: a failure is returned to the caller as is.
//!
//! ## Example
//!
//! ```ignore
//! use antelope_rpc::{ChainApiClient, ProviderConfig};
//! use antelope_session::{ChainApi, GetTableRowsParams};
//!
//! let client = ChainApiClient::new(ProviderConfig::new("https://eos.greymass.com"))?;
//! let rows = client
//!     .get_table_rows(&GetTableRowsParams::new("eosio", "eosio", "global"))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use antelope_session::{ChainApi, ChainApiError, GetTableRowsParams, GetTableRowsResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status with the body the server sent
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RPC error response
    #[error("RPC error: code={code}, message={message}")]
    RpcError {
        /// Error code
        code: i64,
        /// Error message
        message: String,
        /// Additional data
        data: Option<serde_json::Value>,
    },
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Configuration for an HTTP endpoint
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Endpoint URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Creates a new provider configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        if self.timeout_secs == 0 {
            return Err(ProviderError::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Joins `path` onto the endpoint URL
    pub fn endpoint(&self, path: &str) -> Result<String> {
        let base = Url::parse(&self.url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        let joined = base
            .join(path)
            .map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        Ok(joined.to_string())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new("http://localhost:8545")
    }
}

// ============================================================================
// HTTP client
// ============================================================================

const POOL_MAX_IDLE_PER_HOST: usize = 10;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn user_agent() -> String {
    format!("etheraccount/{}", env!("CARGO_PKG_VERSION"))
}

/// RPC request payload
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<T: Serialize> {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Method name
    pub method: String,
    /// Parameters
    pub params: T,
    /// Request ID
    pub id: u64,
}

impl<T: Serialize> JsonRpcRequest<T> {
    /// Creates a new JSON-RPC request
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

/// RPC response payload
///
/// A `null` or absent result is kept as [serde_json::Value::Null] so that
/// callers asking for `Option<T>` see `None` instead of an error.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    #[serde(default)]
    pub jsonrpc: String,
    /// Response ID
    #[serde(default)]
    pub id: serde_json::Value,
    /// Result (if successful)
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error (if failed)
    pub error: Option<JsonRpcError>,
}

/// RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional data
    pub data: Option<serde_json::Value>,
}

/// Pooled HTTP client speaking JSON-RPC and plain JSON
pub struct RpcClient {
    client: Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for a provider configuration
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent())
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Makes a JSON-RPC request
    pub async fn rpc_call<P, R>(&self, url: &str, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(method, params, id);
        tracing::debug!(method, id, "json-rpc request");

        let response = self.client.post(url).json(&request).send().await?;
        let rpc_response: JsonRpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            tracing::debug!(method, code = error.code, "json-rpc error response");
            return Err(ProviderError::RpcError {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        Ok(serde_json::from_value(rpc_response.result)?)
    }

    /// Makes a raw POST request with JSON body
    ///
    /// Non-success statuses are returned as [ProviderError::Status] carrying
    /// the response body.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Serialize,
    ) -> Result<T> {
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: T = response.json().await?;
        Ok(result)
    }

    /// Returns the number of JSON-RPC requests made
    pub fn request_count(&self) -> u64 {
        self.request_id.load(Ordering::SeqCst) - 1
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("request_count", &self.request_count())
            .finish()
    }
}

// ============================================================================
// Antelope chain API
// ============================================================================

/// Error body returned by nodeos on failed `/v1/chain` calls
#[derive(Debug, Deserialize)]
struct NodeosError {
    code: i64,
    message: String,
    #[serde(default)]
    error: Option<NodeosErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct NodeosErrorDetail {
    #[serde(default)]
    what: String,
}

/// [ChainApi] over an Antelope node's HTTP API
#[derive(Debug)]
pub struct ChainApiClient {
    config: ProviderConfig,
    client: RpcClient,
}

impl ChainApiClient {
    /// Creates a client for the node at `config.url`
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = RpcClient::from_provider_config(&config)?;
        Ok(Self { config, client })
    }

    /// Node URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn map_error(err: ProviderError) -> ChainApiError {
        match err {
            ProviderError::Status { status, body } => match serde_json::from_str::<NodeosError>(&body) {
                Ok(nodeos) => {
                    let detail = nodeos.error.map(|d| d.what).filter(|w| !w.is_empty());
                    ChainApiError::Api {
                        code: nodeos.code,
                        message: match detail {
                            Some(what) => format!("{}: {what}", nodeos.message),
                            None => nodeos.message,
                        },
                    }
                }
                Err(_) => ChainApiError::Api {
                    code: status as i64,
                    message: body,
                },
            },
            ProviderError::Json(e) => ChainApiError::InvalidResponse(e.to_string()),
            other => ChainApiError::Request(other.to_string()),
        }
    }
}

#[async_trait]
impl ChainApi for ChainApiClient {
    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> std::result::Result<GetTableRowsResponse, ChainApiError> {
        let url = self
            .config
            .endpoint("v1/chain/get_table_rows")
            .map_err(|e| ChainApiError::Request(e.to_string()))?;
        tracing::debug!(code = %params.code, table = %params.table, "get_table_rows");
        self.client
            .post_json(&url, params)
            .await
            .map_err(Self::map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::new("https://eos.greymass.com").with_timeout(60);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let config = ProviderConfig::new("not-a-valid-url");
        assert!(config.validate().is_err());
        assert!(ChainApiClient::new(config).is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let config = ProviderConfig::new("https://eos.greymass.com");
        assert_eq!(
            config.endpoint("v1/chain/get_table_rows").unwrap(),
            "https://eos.greymass.com/v1/chain/get_table_rows"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ProviderConfig::new("https://eos.greymass.com").with_timeout(0);
        assert!(matches!(config.validate(), Err(ProviderError::InvalidConfig(_))));
        assert!(RpcClient::from_provider_config(&config).is_err());
    }

    #[test]
    fn test_rpc_client_creation() {
        let client = RpcClient::from_provider_config(&ProviderConfig::default()).unwrap();
        assert_eq!(client.request_count(), 0);
        assert!(user_agent().starts_with("etheraccount/"));
    }

    #[test]
    fn test_json_rpc_request() {
        let request = JsonRpcRequest::new("eth_chainId", Vec::<()>::new(), 1);
        assert_eq!(request.jsonrpc, "2.0");

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("eth_chainId"));
        assert!(json.contains("\"id\":1"));
    }

    #[test]
    fn test_null_result_is_kept() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result.is_null());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_nodeos_error_mapping() {
        let body = r#"{"code":500,"message":"Internal Service Error","error":{"what":"Table does not exist"}}"#;
        let err = ChainApiClient::map_error(ProviderError::Status {
            status: 500,
            body: body.to_string(),
        });
        match err {
            ChainApiError::Api { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal Service Error: Table does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
