//! The wallet plugin a session host loads.

use crate::gateway::ProviderGateway;
use crate::options::EtherAccountOptions;
use crate::provider::ProviderDetector;
use crate::registry::NetworkRegistry;
use crate::relay::TransactionRelay;
use crate::resolver::{IdentityResolver, ResolvedIdentity};
use crate::Error;

use antelope_session::{
    Action, ChainId, LoginContext, PluginResult, ResolvedSigningRequest, Signature, TransactContext,
    WalletPlugin, WalletPluginConfig, WalletPluginError, WalletPluginLoginResponse,
    WalletPluginMetadata, WalletPluginSignResponse,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Plugin id registered with the host
pub const PLUGIN_ID: &str = "wallet-plugin-etheraccount";

/// Where the adapter is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterState {
    /// No login has succeeded yet
    #[default]
    Unauthenticated,
    /// A login resolved this identity
    Authenticated(ResolvedIdentity),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<ResolvedIdentity>,
}

/// Logs into Antelope chains with an Ethereum wallet
///
/// Login binds the wallet's address to a ledger account through the
/// `etheraccount` table. Signing relays the actions through the bridge
/// contract and returns the relay transaction's signature in `SIG_K1_` form.
pub struct WalletPluginEtherAccount {
    registry: NetworkRegistry,
    gateway: ProviderGateway,
    resolver: IdentityResolver,
    relay: TransactionRelay,
    config: WalletPluginConfig,
    metadata: WalletPluginMetadata,
    state: RwLock<AdapterState>,
}

impl WalletPluginEtherAccount {
    /// Plugin with default options
    pub fn new(detector: Arc<dyn ProviderDetector>) -> Self {
        Self::build(detector, EtherAccountOptions::default())
    }

    /// Plugin with custom options
    pub fn with_options(detector: Arc<dyn ProviderDetector>, options: EtherAccountOptions) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self::build(detector, options))
    }

    fn build(detector: Arc<dyn ProviderDetector>, options: EtherAccountOptions) -> Self {
        let metadata = options.metadata();
        let config = WalletPluginConfig {
            requires_chain_select: true,
            requires_permission_select: false,
            supported_chains: options.networks.supported_chains(),
        };
        Self {
            gateway: ProviderGateway::new(detector, options.must_be_metamask),
            resolver: IdentityResolver::new(options.account_contract),
            relay: TransactionRelay::new(options.bridge_address, options.receipt_poll_interval()),
            registry: options.networks,
            config,
            metadata,
            state: RwLock::new(AdapterState::Unauthenticated),
        }
    }

    /// Network bindings this plugin accepts
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Current lifecycle state
    pub async fn state(&self) -> AdapterState {
        *self.state.read().await
    }

    /// The identity resolved by the last successful login
    pub async fn identity(&self) -> Option<ResolvedIdentity> {
        match *self.state.read().await {
            AdapterState::Authenticated(identity) => Some(identity),
            AdapterState::Unauthenticated => None,
        }
    }

    /// True once a login has succeeded
    pub async fn is_authenticated(&self) -> bool {
        self.identity().await.is_some()
    }

    /// Logs into the context's chain, resolving the wallet's ledger account
    pub async fn login_with(&self, context: &LoginContext) -> Result<(ChainId, ResolvedIdentity), Error> {
        let chain = context.chain.as_ref().ok_or(Error::ChainNotSelected)?;
        let required = self.registry.required_network_for(&chain.id)?;

        let handle = self.gateway.detect().await?;
        let provider_network = self.gateway.current_network_id(&handle).await?;
        if provider_network != required {
            tracing::warn!(chain = %chain.id, provider_network, required, "wallet on the wrong network");
            return Err(Error::ChainMismatch {
                provider: provider_network,
                required,
            });
        }

        let address = self.gateway.current_address(&handle).await?;
        let identity = self.resolver.resolve(context.client(), &address).await?;
        *self.state.write().await = AdapterState::Authenticated(identity);

        tracing::info!(
            chain = %chain.id,
            account = %identity.ledger_account(),
            address = %identity.eth_address(),
            "logged in"
        );
        Ok((chain.id, identity))
    }

    /// Relays `actions` as the logged-in identity
    pub async fn sign_actions(&self, actions: &[Action]) -> Result<Signature, Error> {
        let identity = self.identity().await.ok_or(Error::NotLoggedIn)?;
        let handle = self.gateway.detect().await?;

        let signature = self
            .relay
            .relay(&self.gateway, &handle, identity.eth_address(), actions)
            .await?;
        tracing::info!(account = %identity.ledger_account(), "transaction signed");
        Ok(signature)
    }
}

impl fmt::Debug for WalletPluginEtherAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletPluginEtherAccount")
            .field("registry", &self.registry)
            .field("gateway", &self.gateway)
            .field("resolver", &self.resolver)
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletPlugin for WalletPluginEtherAccount {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn metadata(&self) -> &WalletPluginMetadata {
        &self.metadata
    }

    fn config(&self) -> &WalletPluginConfig {
        &self.config
    }

    async fn login(&self, context: &LoginContext) -> PluginResult<WalletPluginLoginResponse> {
        let (chain, identity) = self.login_with(context).await?;
        Ok(WalletPluginLoginResponse {
            chain,
            permission_level: identity.permission_level(),
        })
    }

    async fn sign(
        &self,
        resolved: &ResolvedSigningRequest,
        _context: &TransactContext,
    ) -> PluginResult<WalletPluginSignResponse> {
        let signature = self.sign_actions(&resolved.transaction.actions).await?;
        Ok(WalletPluginSignResponse {
            signatures: vec![signature],
        })
    }

    async fn data(&self) -> Value {
        let data = PersistedData {
            identity: self.identity().await,
        };
        serde_json::to_value(data).unwrap_or(Value::Null)
    }

    async fn restore(&self, data: Value) -> PluginResult<()> {
        if data.is_null() {
            return Ok(());
        }
        let data: PersistedData =
            serde_json::from_value(data).map_err(|e| WalletPluginError::InvalidData(e.to_string()))?;
        let Some(identity) = data.identity else {
            return Ok(());
        };
        let identity = ResolvedIdentity::new(identity.ledger_account(), identity.eth_address())
            .map_err(|e| WalletPluginError::InvalidData(e.to_string()))?;
        *self.state.write().await = AdapterState::Authenticated(identity);
        tracing::debug!(account = %identity.ledger_account(), "session restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticDetector;
    use crate::registry::{NetworkBinding, EOS_MAINNET};
    use alloy::primitives::Address;
    use serde_json::json;

    fn plugin() -> WalletPluginEtherAccount {
        WalletPluginEtherAccount::new(Arc::new(StaticDetector::none()))
    }

    #[test]
    fn test_plugin_surface() {
        let plugin = plugin();
        assert_eq!(plugin.id(), "wallet-plugin-etheraccount");
        assert_eq!(plugin.metadata().name, "Metamask (etheraccount)");
        assert!(plugin.config().requires_chain_select);
        assert!(!plugin.config().requires_permission_select);
        assert_eq!(plugin.config().supported_chains.len(), 2);
        assert!(plugin.config().supported_chains.contains(&EOS_MAINNET));
    }

    #[test]
    fn test_rejects_invalid_options() {
        let options = EtherAccountOptions::default().with_networks(NetworkRegistry::new(Vec::<NetworkBinding>::new()));
        let result = WalletPluginEtherAccount::with_options(Arc::new(StaticDetector::none()), options);
        assert!(matches!(result, Err(Error::InvalidOptions(_))));
    }

    #[tokio::test]
    async fn test_starts_unauthenticated() {
        let plugin = plugin();
        assert_eq!(plugin.state().await, AdapterState::Unauthenticated);
        assert!(plugin.identity().await.is_none());
        assert_eq!(plugin.data().await, json!({}));
    }

    #[tokio::test]
    async fn test_sign_requires_login() {
        let err = plugin().sign_actions(&[]).await.unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let data = json!({
            "identity": {
                "eos_account": "alice",
                "eth_address": "0x1111111111111111111111111111111111111111"
            }
        });
        let plugin = plugin();
        plugin.restore(data).await.unwrap();

        let identity = plugin.identity().await.unwrap();
        assert_eq!(identity.ledger_account().to_string(), "alice");
        assert_eq!(identity.eth_address(), Address::repeat_byte(0x11));

        let serialized = plugin.serialize().await;
        assert_eq!(serialized.id, PLUGIN_ID);
        assert_eq!(serialized.data["identity"]["eos_account"], "alice");
    }

    #[tokio::test]
    async fn test_restore_rejects_bad_data() {
        let plugin = plugin();
        let empty_account = json!({"identity": {"eos_account": "", "eth_address": "0x1111111111111111111111111111111111111111"}});
        assert!(matches!(plugin.restore(empty_account).await, Err(WalletPluginError::InvalidData(_))));
        assert!(matches!(plugin.restore(json!({"identity": 5})).await, Err(WalletPluginError::InvalidData(_))));
        assert!(!plugin.is_authenticated().await);

        plugin.restore(Value::Null).await.unwrap();
        assert!(!plugin.is_authenticated().await);
    }
}
