//! This prelude module simplifies importing the plugin's common items using a glob import.
//!
//! To use this prelude, add the following to your code:
//! ```
//! use wallet_plugin_etheraccount::prelude::*;
//! ```

pub use crate::{
    EtherAccountOptions, Error, HttpEthereumProvider, NetworkRegistry, ProviderDetector,
    ResolvedIdentity, StaticDetector, WalletPluginEtherAccount, EOS_MAINNET, KYLIN_TESTNET,
};

pub use alloy::primitives::Address;
pub use antelope_session::prelude::*;
