//! The wallet plugin contract a session host loads plugins through.
//!
//! The host owns chain selection, UI and the ledger client. A plugin only
//! turns a [LoginContext] into a permission level and a
//! [ResolvedSigningRequest] into signatures.

use crate::action::Transaction;
use crate::checksum::ChainId;
use crate::client::ChainApi;
use crate::permission::PermissionLevel;
use crate::signature::Signature;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to the host; the message is displayed verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletPluginError {
    /// The plugin rejected the operation
    #[error("{0}")]
    Rejected(String),

    /// Persisted plugin data could not be restored
    #[error("Invalid plugin data: {0}")]
    InvalidData(String),
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, WalletPluginError>;

/// A chain the host knows how to reach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDefinition {
    /// Chain id
    pub id: ChainId,
    /// API endpoint
    pub url: String,
}

impl ChainDefinition {
    /// Creates a chain definition
    pub fn new(id: ChainId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

/// Everything the host hands a plugin at login
#[derive(Clone)]
pub struct LoginContext {
    /// Chain selected by the user, if any
    pub chain: Option<ChainDefinition>,
    client: Arc<dyn ChainApi>,
}

impl LoginContext {
    /// Context without a selected chain
    pub fn new(client: Arc<dyn ChainApi>) -> Self {
        Self { chain: None, client }
    }

    /// Selects the chain to log into
    pub fn with_chain(mut self, chain: ChainDefinition) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Ledger client for the selected chain
    pub fn client(&self) -> &dyn ChainApi {
        self.client.as_ref()
    }
}

impl fmt::Debug for LoginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginContext").field("chain", &self.chain).finish_non_exhaustive()
    }
}

/// Everything the host hands a plugin when signing
#[derive(Clone)]
pub struct TransactContext {
    /// Chain the transaction targets
    pub chain: ChainDefinition,
    /// Permission level of the session
    pub permission_level: PermissionLevel,
    client: Arc<dyn ChainApi>,
}

impl TransactContext {
    /// Creates a transact context
    pub fn new(chain: ChainDefinition, permission_level: PermissionLevel, client: Arc<dyn ChainApi>) -> Self {
        Self {
            chain,
            permission_level,
            client,
        }
    }

    /// Ledger client for the chain
    pub fn client(&self) -> &dyn ChainApi {
        self.client.as_ref()
    }
}

impl fmt::Debug for TransactContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactContext")
            .field("chain", &self.chain)
            .field("permission_level", &self.permission_level)
            .finish_non_exhaustive()
    }
}

/// A signing request whose placeholders the host already resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSigningRequest {
    /// Target chain
    pub chain_id: ChainId,
    /// Transaction to authorize
    pub transaction: Transaction,
}

/// How the host should drive the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPluginConfig {
    /// The host must ask for a chain before login
    pub requires_chain_select: bool,
    /// The host must ask for a permission before login
    pub requires_permission_select: bool,
    /// Chains the plugin works with; empty means any
    pub supported_chains: Vec<ChainId>,
}

/// Display information for the host's plugin picker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPluginMetadata {
    /// Display name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Logo, base64 or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Project homepage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Where to get the wallet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPluginLoginResponse {
    /// Chain logged into
    pub chain: ChainId,
    /// Authority to transact with
    #[serde(with = "permission_text")]
    pub permission_level: PermissionLevel,
}

/// Result of a successful sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPluginSignResponse {
    /// Ledger-native signatures
    pub signatures: Vec<Signature>,
}

/// A plugin's persisted form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedWalletPlugin {
    /// Plugin id
    pub id: String,
    /// Plugin-defined data
    pub data: serde_json::Value,
}

/// A wallet plugin
#[async_trait]
pub trait WalletPlugin: Send + Sync {
    /// URL-friendly unique id
    fn id(&self) -> &str;

    /// Display information
    fn metadata(&self) -> &WalletPluginMetadata;

    /// Host-facing configuration
    fn config(&self) -> &WalletPluginConfig;

    /// Authenticates and returns the chain and permission level to use
    async fn login(&self, context: &LoginContext) -> PluginResult<WalletPluginLoginResponse>;

    /// Authorizes a resolved transaction
    async fn sign(
        &self,
        resolved: &ResolvedSigningRequest,
        context: &TransactContext,
    ) -> PluginResult<WalletPluginSignResponse>;

    /// Plugin state worth persisting between sessions
    async fn data(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Restores state produced by [WalletPlugin::data]
    async fn restore(&self, _data: serde_json::Value) -> PluginResult<()> {
        Ok(())
    }

    /// Id plus data, for the host's session storage
    async fn serialize(&self) -> SerializedWalletPlugin {
        SerializedWalletPlugin {
            id: self.id().to_string(),
            data: self.data().await,
        }
    }
}

mod permission_text {
    use crate::permission::PermissionLevel;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(level: &PermissionLevel, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(level)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PermissionLevel, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
