use crate::provider::{Eip1193Provider, ProviderDetector};
use crate::Error;

use alloy::primitives::{Address, U64};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// A provider found by [ProviderGateway::detect], valid for one call
#[derive(Clone)]
pub struct ProviderHandle {
    provider: Arc<dyn Eip1193Provider>,
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("is_metamask", &self.provider.is_metamask())
            .finish()
    }
}

/// Detects the injected wallet and talks to it
///
/// Every operation is one round-trip to the wallet. Nothing is retried.
#[derive(Clone)]
pub struct ProviderGateway {
    detector: Arc<dyn ProviderDetector>,
    must_be_metamask: bool,
}

impl ProviderGateway {
    /// Creates a gateway over `detector`
    pub fn new(detector: Arc<dyn ProviderDetector>, must_be_metamask: bool) -> Self {
        Self {
            detector,
            must_be_metamask,
        }
    }

    /// Finds a usable provider
    pub async fn detect(&self) -> Result<ProviderHandle, Error> {
        let provider = self.detector.detect().await.ok_or_else(|| {
            Error::ProviderNotFound("Metamask is required to use this plugin.".to_string())
        })?;
        if self.must_be_metamask && !provider.is_metamask() {
            return Err(Error::ProviderNotFound(
                "Metamask is required to use this plugin.".to_string(),
            ));
        }
        if !provider.supports_request() {
            return Err(Error::ProviderNotFound(
                "The ethereum object was not loaded.".to_string(),
            ));
        }
        tracing::debug!(is_metamask = provider.is_metamask(), "provider detected");
        Ok(ProviderHandle { provider })
    }

    /// Network id the wallet is connected to (`eth_chainId`)
    ///
    /// Accepts hex quantities, decimal strings and JSON numbers.
    pub async fn current_network_id(&self, handle: &ProviderHandle) -> Result<u64, Error> {
        let network_id: U64 = self.request(handle, "eth_chainId", json!([])).await?;
        Ok(network_id.to::<u64>())
    }

    /// Asks the wallet for its accounts, prompting the user if needed
    pub async fn request_accounts(&self, handle: &ProviderHandle) -> Result<Vec<Address>, Error> {
        let accounts: Vec<Address> = self.request(handle, "eth_requestAccounts", json!([])).await?;
        if accounts.is_empty() {
            return Err(Error::NoAccountSelected);
        }
        Ok(accounts)
    }

    /// The first account the wallet returns
    pub async fn current_address(&self, handle: &ProviderHandle) -> Result<Address, Error> {
        self.request_accounts(handle)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAccountSelected)
    }

    /// Generic passthrough; wallet errors become [Error::ProviderRequestFailure]
    pub async fn call(&self, handle: &ProviderHandle, method: &str, params: Value) -> Result<Value, Error> {
        tracing::debug!(method, "provider request");
        handle.provider.request(method, params).await.map_err(|e| {
            tracing::warn!(method, code = e.code, "provider request failed: {}", e.message);
            Error::provider(method, Some(e.code), e.message)
        })
    }

    /// [ProviderGateway::call] with the result decoded as `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        handle: &ProviderHandle,
        method: &str,
        params: Value,
    ) -> Result<T, Error> {
        let value = self.call(handle, method, params).await?;
        decode(method, value)
    }

    /// Like [ProviderGateway::request] but reverts become [Error::RelayRejected]
    pub(crate) async fn call_contract<T: DeserializeOwned>(
        &self,
        handle: &ProviderHandle,
        method: &str,
        params: Value,
    ) -> Result<T, Error> {
        tracing::debug!(method, "contract request");
        let value = handle.provider.request(method, params).await.map_err(|e| {
            if e.is_execution_revert() {
                tracing::warn!(method, "contract call reverted: {}", e.message);
                Error::RelayRejected(e.message)
            } else {
                tracing::warn!(method, code = e.code, "contract call failed: {}", e.message);
                Error::provider(method, Some(e.code), e.message)
            }
        })?;
        decode(method, value)
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, Error> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::provider(method, None, format!("unexpected response {value}: {e}")))
}

impl fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("must_be_metamask", &self.must_be_metamask)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderRpcError, StaticDetector};
    use async_trait::async_trait;

    struct Fixed {
        metamask: bool,
        chain_id: Value,
        accounts: Value,
    }

    #[async_trait]
    impl Eip1193Provider for Fixed {
        fn is_metamask(&self) -> bool {
            self.metamask
        }

        async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderRpcError> {
            match method {
                "eth_chainId" => Ok(self.chain_id.clone()),
                "eth_requestAccounts" => Ok(self.accounts.clone()),
                _ => Err(ProviderRpcError::new(4200, "unsupported")),
            }
        }
    }

    fn gateway(provider: Fixed, must_be_metamask: bool) -> ProviderGateway {
        ProviderGateway::new(Arc::new(StaticDetector::new(Arc::new(provider))), must_be_metamask)
    }

    fn fixed(accounts: Value) -> Fixed {
        Fixed {
            metamask: true,
            chain_id: json!("0x3b"),
            accounts,
        }
    }

    #[tokio::test]
    async fn test_detect_without_provider() {
        let gateway = ProviderGateway::new(Arc::new(StaticDetector::none()), true);
        assert!(matches!(gateway.detect().await, Err(Error::ProviderNotFound(_))));
    }

    #[tokio::test]
    async fn test_detect_requires_metamask() {
        let mut provider = fixed(json!([]));
        provider.metamask = false;
        assert!(matches!(gateway(provider, true).detect().await, Err(Error::ProviderNotFound(_))));

        let mut provider = fixed(json!([]));
        provider.metamask = false;
        assert!(gateway(provider, false).detect().await.is_ok());
    }

    #[tokio::test]
    async fn test_network_id() {
        for (raw, expected) in [(json!("0x3b"), 59), (json!("0x5f"), 95), (json!("59"), 59), (json!(95), 95)] {
            let mut provider = fixed(json!([]));
            provider.chain_id = raw.clone();
            let gateway = gateway(provider, true);
            let handle = gateway.detect().await.unwrap();
            assert_eq!(gateway.current_network_id(&handle).await.unwrap(), expected, "{raw}");
        }
    }

    #[tokio::test]
    async fn test_malformed_network_id() {
        let mut provider = fixed(json!([]));
        provider.chain_id = json!("0xzz");
        let gateway = gateway(provider, true);
        let handle = gateway.detect().await.unwrap();
        assert!(matches!(
            gateway.current_network_id(&handle).await,
            Err(Error::ProviderRequestFailure { ref method, code: None, .. }) if method == "eth_chainId"
        ));
    }

    #[tokio::test]
    async fn test_request_accounts() {
        let gateway = gateway(fixed(json!(["0x1111111111111111111111111111111111111111"])), true);
        let handle = gateway.detect().await.unwrap();
        let address = gateway.current_address(&handle).await.unwrap();
        assert_eq!(address, Address::repeat_byte(0x11));
    }

    #[tokio::test]
    async fn test_empty_accounts() {
        let gateway = gateway(fixed(json!([])), true);
        let handle = gateway.detect().await.unwrap();
        assert!(matches!(gateway.request_accounts(&handle).await, Err(Error::NoAccountSelected)));
    }

    #[tokio::test]
    async fn test_malformed_account() {
        let gateway = gateway(fixed(json!(["not-an-address"])), true);
        let handle = gateway.detect().await.unwrap();
        assert!(matches!(
            gateway.request_accounts(&handle).await,
            Err(Error::ProviderRequestFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_call_maps_provider_errors() {
        let gateway = gateway(fixed(json!([])), true);
        let handle = gateway.detect().await.unwrap();
        let err = gateway.call(&handle, "eth_sign", json!([])).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ProviderRequestFailure { ref method, code: Some(4200), .. } if method == "eth_sign"
        ));
    }
}
