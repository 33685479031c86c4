use crate::registry::NetworkRegistry;
use crate::relay::DEFAULT_BRIDGE_ADDRESS;
use crate::resolver::ETHERACCOUNT_CONTRACT;
use crate::Error;

use alloy::primitives::Address;
use antelope_session::{Name, WalletPluginMetadata};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display name shown in the host's plugin picker
pub const PLUGIN_NAME: &str = "Metamask (etheraccount)";

/// One-line description shown in the host's plugin picker
pub const PLUGIN_DESCRIPTION: &str = "Use the etheraccount smart contract with Metamask.";

/// Where to read about the EOS EVM MetaMask network
pub const PLUGIN_HOMEPAGE: &str =
    "https://forums.eoscommunity.org/t/eos-mainnet-is-now-available-on-metamask/4264";

/// Metadata used when none is configured
pub fn default_metadata() -> WalletPluginMetadata {
    WalletPluginMetadata {
        name: PLUGIN_NAME.to_string(),
        description: PLUGIN_DESCRIPTION.to_string(),
        logo: None,
        homepage: Some(PLUGIN_HOMEPAGE.to_string()),
        download: Some(PLUGIN_HOMEPAGE.to_string()),
    }
}

fn default_must_be_metamask() -> bool {
    true
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

/// Construction options for [crate::WalletPluginEtherAccount]
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EtherAccountOptions {
    /// Ledger chain id to EVM network id bindings
    pub networks: NetworkRegistry,
    /// Bridge contract relays are sent to
    pub bridge_address: Address,
    /// Contract holding the account table
    pub account_contract: Name,
    /// Only accept providers that identify as MetaMask
    #[serde(default = "default_must_be_metamask", alias = "mustBeMetaMask")]
    pub must_be_metamask: bool,
    /// Delay between receipt polls while a relay is pending
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Overrides the built-in display metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WalletPluginMetadata>,
}

impl Default for EtherAccountOptions {
    fn default() -> Self {
        Self {
            networks: NetworkRegistry::default(),
            bridge_address: DEFAULT_BRIDGE_ADDRESS,
            account_contract: ETHERACCOUNT_CONTRACT,
            must_be_metamask: default_must_be_metamask(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            metadata: None,
        }
    }
}

impl EtherAccountOptions {
    /// Parses options from JSON
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Replaces the network bindings
    pub fn with_networks(mut self, networks: NetworkRegistry) -> Self {
        self.networks = networks;
        self
    }

    /// Sets the bridge contract address
    pub fn with_bridge_address(mut self, bridge_address: Address) -> Self {
        self.bridge_address = bridge_address;
        self
    }

    /// Sets the account table contract
    pub fn with_account_contract(mut self, account_contract: Name) -> Self {
        self.account_contract = account_contract;
        self
    }

    /// Accept or reject providers that do not identify as MetaMask
    pub fn with_must_be_metamask(mut self, must_be_metamask: bool) -> Self {
        self.must_be_metamask = must_be_metamask;
        self
    }

    /// Sets the receipt poll interval
    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Overrides the display metadata
    pub fn with_metadata(mut self, metadata: WalletPluginMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Receipt poll interval as a [Duration]
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Effective display metadata
    pub fn metadata(&self) -> WalletPluginMetadata {
        self.metadata.clone().unwrap_or_else(default_metadata)
    }

    /// Rejects options that could never log in or relay
    pub fn validate(&self) -> Result<(), Error> {
        if self.networks.is_empty() {
            return Err(Error::InvalidOptions("no networks configured".to_string()));
        }
        if self.account_contract.is_empty() {
            return Err(Error::InvalidOptions("account contract is empty".to_string()));
        }
        if self.bridge_address.is_zero() {
            return Err(Error::InvalidOptions("bridge address is zero".to_string()));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(Error::InvalidOptions(
                "receipt poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EOS_MAINNET, KYLIN_TESTNET};
    use antelope_session::ChainId;

    #[test]
    fn test_defaults() {
        let options = EtherAccountOptions::default();
        assert!(options.must_be_metamask);
        assert_eq!(options.receipt_poll_interval(), Duration::from_secs(1));
        assert_eq!(options.bridge_address, DEFAULT_BRIDGE_ADDRESS);
        assert_eq!(options.account_contract.to_string(), "etheraccount");
        assert_eq!(options.metadata().name, "Metamask (etheraccount)");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EtherAccountOptions::from_json("{}").unwrap(), EtherAccountOptions::default());
    }

    #[test]
    fn test_json_overrides() {
        let json = format!(
            r#"{{
                "networks": {{ "{}": 1337 }},
                "bridgeAddress": "0x1111111111111111111111111111111111111111",
                "accountContract": "ethbinding",
                "mustBeMetaMask": false,
                "receiptPollIntervalMs": 50,
                "metadata": {{ "name": "Custom", "description": "d" }}
            }}"#,
            KYLIN_TESTNET
        );
        let options = EtherAccountOptions::from_json(&json).unwrap();
        assert_eq!(options.networks.required_network_for(&KYLIN_TESTNET).unwrap(), 1337);
        assert!(options.networks.required_network_for(&EOS_MAINNET).is_err());
        assert_eq!(options.bridge_address, Address::repeat_byte(0x11));
        assert_eq!(options.account_contract.to_string(), "ethbinding");
        assert!(!options.must_be_metamask);
        assert_eq!(options.receipt_poll_interval(), Duration::from_millis(50));
        assert_eq!(options.metadata().name, "Custom");
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            EtherAccountOptions::from_json(r#"{"networks": {}}"#),
            Err(Error::InvalidOptions(_))
        ));
        assert!(matches!(
            EtherAccountOptions::from_json(r#"{"receiptPollIntervalMs": 0}"#),
            Err(Error::InvalidOptions(_))
        ));
        assert!(matches!(
            EtherAccountOptions::from_json(r#"{"accountContract": "NOT VALID"}"#),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_builders() {
        let custom = ChainId::new([9u8; 32]);
        let options = EtherAccountOptions::default()
            .with_networks([(custom, 5)].into_iter().collect())
            .with_must_be_metamask(false)
            .with_receipt_poll_interval(Duration::from_millis(10));
        assert_eq!(options.networks.supported_chains(), vec![custom]);
        assert!(!options.must_be_metamask);
        assert_eq!(options.receipt_poll_interval_ms, 10);
    }
}
