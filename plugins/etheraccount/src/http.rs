//! An EIP-1193 provider backed by a JSON-RPC HTTP endpoint.
//!
//! Lets hosts without a browser wallet drive the plugin against a node that
//! manages its own accounts (a dev node or a signing proxy).

use crate::provider::{Eip1193Provider, ProviderRpcError};

use alloy::primitives::Address;
use antelope_rpc::{ProviderConfig, ProviderError, RpcClient};
use async_trait::async_trait;
use serde_json::{json, Value};

/// JSON-RPC "internal error", used for transport failures
const INTERNAL_ERROR: i64 = -32603;

/// Forwards provider requests to a JSON-RPC endpoint
#[derive(Debug)]
pub struct HttpEthereumProvider {
    client: RpcClient,
    url: String,
    account: Option<Address>,
    is_metamask: bool,
}

impl HttpEthereumProvider {
    /// Provider for the endpoint in `config`
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: RpcClient::from_provider_config(config)?,
            url: config.url.clone(),
            account: None,
            is_metamask: false,
        })
    }

    /// Answers `eth_requestAccounts` with `account` instead of asking the node
    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    /// Identify as MetaMask
    pub fn with_metamask_identity(mut self, is_metamask: bool) -> Self {
        self.is_metamask = is_metamask;
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn to_rpc_error(err: ProviderError) -> ProviderRpcError {
    match err {
        ProviderError::RpcError { code, message, data } => ProviderRpcError { code, message, data },
        other => ProviderRpcError::new(INTERNAL_ERROR, other.to_string()),
    }
}

#[async_trait]
impl Eip1193Provider for HttpEthereumProvider {
    fn is_metamask(&self) -> bool {
        self.is_metamask
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        if let (Some(account), "eth_requestAccounts" | "eth_accounts") = (self.account, method) {
            return Ok(json!([account]));
        }
        self.client
            .rpc_call(&self.url, method, params)
            .await
            .map_err(to_rpc_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_errors_keep_code() {
        let err = to_rpc_error(ProviderError::RpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!("0x08c379a0")),
        });
        assert_eq!(err.code, 3);
        assert!(err.is_execution_revert());
        assert_eq!(err.data, Some(json!("0x08c379a0")));
    }

    #[test]
    fn test_transport_errors_are_internal() {
        let err = to_rpc_error(ProviderError::ConnectionFailed("refused".into()));
        assert_eq!(err.code, INTERNAL_ERROR);
        assert!(err.message.contains("refused"));
    }

    #[tokio::test]
    async fn test_fixed_account() {
        let provider = HttpEthereumProvider::new(&ProviderConfig::new("http://127.0.0.1:1"))
            .unwrap()
            .with_account(Address::repeat_byte(0x11));
        let accounts = provider.request("eth_requestAccounts", json!([])).await.unwrap();
        assert_eq!(accounts, json!(["0x1111111111111111111111111111111111111111"]));
    }
}
