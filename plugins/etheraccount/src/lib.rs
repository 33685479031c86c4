//! # Wallet Plugin: etheraccount
//!
//! Log into Antelope chains with an Ethereum wallet.
//!
//! The `etheraccount` contract binds Ethereum addresses to ledger accounts.
//! Logging in reads the wallet's address, checks that the wallet is on the
//! EVM network paired with the selected chain, and looks the address up in
//! the contract's `account` table. Signing relays the serialized actions
//! through a bridge contract on the EVM network; the relay transaction's
//! signature is returned as a `SIG_K1_` signature.
//!
//! ## Quickstart
//!
//! The host supplies a [ProviderDetector] that finds the injected wallet. In
//! a non-browser host the [HttpEthereumProvider] stands in for it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use antelope_rpc::{ChainApiClient, ProviderConfig};
//! use wallet_plugin_etheraccount::prelude::*;
//!
//! # async fn login() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = HttpEthereumProvider::new(&ProviderConfig::new("http://localhost:8545"))?
//!     .with_metamask_identity(true);
//! let plugin = WalletPluginEtherAccount::new(Arc::new(StaticDetector::new(Arc::new(provider))));
//!
//! let ledger = ChainApiClient::new(ProviderConfig::new("https://eos.greymass.com"))?;
//! let context = LoginContext::new(Arc::new(ledger))
//!     .with_chain(ChainDefinition::new(EOS_MAINNET, "https://eos.greymass.com"));
//!
//! let response = plugin.login(&context).await?;
//! println!("logged in as {}", response.permission_level);
//! # Ok(())
//! # }
//! ```
//!
//! ## Network bindings
//!
//! | chain | EVM network id |
//! |---|---|
//! | [KYLIN_TESTNET] | 95 |
//! | [EOS_MAINNET] | 59 |
//!
//! Override them through [EtherAccountOptions::with_networks].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod error;
mod gateway;
mod http;
mod options;
pub mod prelude;
mod provider;
mod registry;
mod relay;
mod resolver;

pub use adapter::{AdapterState, WalletPluginEtherAccount, PLUGIN_ID};
pub use error::Error;
pub use gateway::{ProviderGateway, ProviderHandle};
pub use http::HttpEthereumProvider;
pub use options::{default_metadata, EtherAccountOptions, PLUGIN_DESCRIPTION, PLUGIN_HOMEPAGE, PLUGIN_NAME};
pub use provider::{Eip1193Provider, ProviderDetector, ProviderRpcError, StaticDetector};
pub use registry::{NetworkBinding, NetworkRegistry, DEFAULT_NETWORKS, EOS_MAINNET, KYLIN_TESTNET};
pub use relay::{
    getRpCall, pushEosTransactionCall, signature_from_transaction, RelayState, TransactionRelay,
    DEFAULT_BRIDGE_ADDRESS,
};
pub use resolver::{address_key, IdentityResolver, ResolvedIdentity, ACCOUNT_TABLE, ETHERACCOUNT_CONTRACT};
