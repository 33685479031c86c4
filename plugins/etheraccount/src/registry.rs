use crate::Error;

use antelope_session::ChainId;
use hex_literal::hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kylin testnet chain id
pub const KYLIN_TESTNET: ChainId = ChainId::new(hex!(
    "5fff1dae8dc8e2fc4d5b23b2c7665c97f9e9d8edf2b6485a86ba311c25639191"
));

/// EOS mainnet chain id
pub const EOS_MAINNET: ChainId = ChainId::new(hex!(
    "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
));

/// Built-in bindings of ledger chain ids to EVM network ids
pub const DEFAULT_NETWORKS: [NetworkBinding; 2] = [
    NetworkBinding {
        target_chain_id: KYLIN_TESTNET,
        required_network_id: 95,
    },
    NetworkBinding {
        target_chain_id: EOS_MAINNET,
        required_network_id: 59,
    },
];

/// A ledger chain and the EVM network the wallet must be connected to for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBinding {
    /// Antelope chain id
    pub target_chain_id: ChainId,
    /// EVM network id (`eth_chainId`)
    pub required_network_id: u64,
}

/// Immutable mapping from ledger chain id to required EVM network id
///
/// Each chain id maps to exactly one network id; later bindings for the same
/// chain replace earlier ones when building from a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkRegistry {
    networks: BTreeMap<ChainId, u64>,
}

impl NetworkRegistry {
    /// Builds a registry from bindings
    pub fn new(bindings: impl IntoIterator<Item = NetworkBinding>) -> Self {
        Self {
            networks: bindings
                .into_iter()
                .map(|b| (b.target_chain_id, b.required_network_id))
                .collect(),
        }
    }

    /// Network id the wallet must report for `chain_id`
    pub fn required_network_for(&self, chain_id: &ChainId) -> Result<u64, Error> {
        self.networks
            .get(chain_id)
            .copied()
            .ok_or(Error::UnsupportedChain(*chain_id))
    }

    /// Checks a wallet-reported network id against the chain's binding
    pub fn validate(&self, chain_id: &ChainId, provider_network_id: u64) -> Result<u64, Error> {
        let required = self.required_network_for(chain_id)?;
        if provider_network_id != required {
            return Err(Error::ChainMismatch {
                provider: provider_network_id,
                required,
            });
        }
        Ok(required)
    }

    /// Chain ids with a binding, in ascending order
    pub fn supported_chains(&self) -> Vec<ChainId> {
        self.networks.keys().copied().collect()
    }

    /// All bindings
    pub fn bindings(&self) -> impl Iterator<Item = NetworkBinding> + '_ {
        self.networks.iter().map(|(chain, network)| NetworkBinding {
            target_chain_id: *chain,
            required_network_id: *network,
        })
    }

    /// True if no chain is bound
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORKS)
    }
}

impl FromIterator<(ChainId, u64)> for NetworkRegistry {
    fn from_iter<I: IntoIterator<Item = (ChainId, u64)>>(iter: I) -> Self {
        Self {
            networks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let registry = NetworkRegistry::default();
        assert_eq!(registry.required_network_for(&EOS_MAINNET).unwrap(), 59);
        assert_eq!(registry.required_network_for(&KYLIN_TESTNET).unwrap(), 95);
        assert_eq!(registry.supported_chains().len(), 2);
    }

    #[test]
    fn test_chain_id_constants_match_hex() {
        assert_eq!(
            EOS_MAINNET.to_string(),
            "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
        );
    }

    #[test]
    fn test_unknown_chain() {
        let registry = NetworkRegistry::default();
        let unknown = ChainId::new([7u8; 32]);
        assert!(matches!(
            registry.required_network_for(&unknown),
            Err(Error::UnsupportedChain(id)) if id == unknown
        ));
    }

    #[test]
    fn test_validate() {
        let registry = NetworkRegistry::default();
        assert_eq!(registry.validate(&EOS_MAINNET, 59).unwrap(), 59);
        assert!(matches!(
            registry.validate(&EOS_MAINNET, 1),
            Err(Error::ChainMismatch { provider: 1, required: 59 })
        ));
    }

    #[test]
    fn test_override_replaces_defaults() {
        let custom = ChainId::new([1u8; 32]);
        let registry: NetworkRegistry = [(custom, 1337)].into_iter().collect();
        assert_eq!(registry.required_network_for(&custom).unwrap(), 1337);
        assert!(registry.required_network_for(&EOS_MAINNET).is_err());
    }

    #[test]
    fn test_json_is_a_plain_map() {
        let json = serde_json::to_value(NetworkRegistry::default()).unwrap();
        assert_eq!(json[EOS_MAINNET.to_string()], 59);

        let parsed: NetworkRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, NetworkRegistry::default());
    }
}
