//! The injected wallet, as seen from the plugin.
//!
//! Hosts hand the plugin a [ProviderDetector] instead of the plugin reading
//! a global `window.ethereum`, so tests and non-browser hosts can substitute
//! their own provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// An EIP-1193 `ProviderRpcError`
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ProviderRpcError {
    /// EIP-1193 / JSON-RPC error code
    pub code: i64,
    /// Human readable message
    pub message: String,
    /// Extra data, revert payloads for example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// The user rejected the request
    pub const USER_REJECTED: i64 = 4001;
    /// The method or account is not authorized
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the method
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// Execution reverted (geth and most nodes)
    pub const EXECUTION_REVERTED: i64 = 3;

    /// Creates an error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches error data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// True when the user declined the request in the wallet
    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// True when the node reports that contract execution reverted
    pub fn is_execution_revert(&self) -> bool {
        self.code == Self::EXECUTION_REVERTED || self.message.to_ascii_lowercase().contains("revert")
    }
}

/// An EIP-1193 provider
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Whether the provider identifies as MetaMask
    fn is_metamask(&self) -> bool {
        false
    }

    /// Whether the provider exposes a usable `request` primitive
    fn supports_request(&self) -> bool {
        true
    }

    /// Sends one request to the wallet
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;
}

/// Finds the wallet injected into the execution environment
#[async_trait]
pub trait ProviderDetector: Send + Sync {
    /// The injected provider, if any
    async fn detect(&self) -> Option<Arc<dyn Eip1193Provider>>;
}

/// A detector that always yields the same provider (or none)
#[derive(Clone, Default)]
pub struct StaticDetector {
    provider: Option<Arc<dyn Eip1193Provider>>,
}

impl StaticDetector {
    /// Detector yielding `provider`
    pub fn new(provider: Arc<dyn Eip1193Provider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Detector for an environment without a wallet
    pub fn none() -> Self {
        Self::default()
    }
}

impl fmt::Debug for StaticDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticDetector")
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

#[async_trait]
impl ProviderDetector for StaticDetector {
    async fn detect(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.provider.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Eip1193Provider for Echo {
        async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderRpcError> {
            Ok(Value::String(method.to_string()))
        }
    }

    #[tokio::test]
    async fn test_static_detector() {
        assert!(StaticDetector::none().detect().await.is_none());

        let detector = StaticDetector::new(Arc::new(Echo));
        let provider = detector.detect().await.unwrap();
        assert!(!provider.is_metamask());
        assert_eq!(provider.request("eth_chainId", Value::Null).await.unwrap(), "eth_chainId");
    }

    #[test]
    fn test_error_classification() {
        assert!(ProviderRpcError::new(4001, "User denied transaction signature").is_user_rejection());
        assert!(ProviderRpcError::new(3, "execution reverted").is_execution_revert());
        assert!(ProviderRpcError::new(-32000, "Execution Reverted: stale rp").is_execution_revert());
        assert!(!ProviderRpcError::new(-32603, "Internal error").is_execution_revert());
    }
}
