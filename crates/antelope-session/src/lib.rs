//! # Antelope Session
//!
//! Antelope ledger primitives and the contract between a session host and
//! its wallet plugins.
//!
//! ## Primitives
//!
//! - [`Name`] - 13-character base32 names packed into a `u64`
//! - [`ChainId`] - 32-byte chain identifiers
//! - [`PermissionLevel`] - `actor@permission` authorities
//! - [`Action`] and [`ActionSerializer`] - the canonical `action[]` encoding
//! - [`Signature`] - `SIG_K1_` secp256k1 signatures
//!
//! ## Plugin contract
//!
//! - [`WalletPlugin`] - login, sign, metadata and configuration
//! - [`ChainApi`] - the ledger client a host provides to plugins
//!
//! ## Example
//!
//! ```
//! use antelope_session::prelude::*;
//!
//! let level: PermissionLevel = "alice@active".parse().unwrap();
//! let action = Action::new(
//!     "eosio.token".parse().unwrap(),
//!     "transfer".parse().unwrap(),
//!     vec![level],
//!     vec![0u8; 4],
//! );
//! let batch = ActionSerializer::encode(&[action]).unwrap();
//! assert!(!batch.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod checksum;
pub mod client;
pub mod name;
pub mod permission;
pub mod plugin;
pub mod signature;

pub use action::{Action, ActionSerializer, CodecError, SerializedActionBatch, Transaction};
pub use checksum::{ChainId, Checksum256, ChecksumError};
pub use client::{ChainApi, ChainApiError, GetTableRowsParams, GetTableRowsResponse};
pub use name::{Name, NameError};
pub use permission::{PermissionError, PermissionLevel};
pub use plugin::{
    ChainDefinition, LoginContext, PluginResult, ResolvedSigningRequest, SerializedWalletPlugin,
    TransactContext, WalletPlugin, WalletPluginConfig, WalletPluginError, WalletPluginLoginResponse,
    WalletPluginMetadata, WalletPluginSignResponse,
};
pub use signature::{Signature, SignatureError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSerializer, ChainApi, ChainDefinition, ChainId, GetTableRowsParams,
        LoginContext, Name, PermissionLevel, ResolvedSigningRequest, SerializedActionBatch,
        Signature, TransactContext, Transaction, WalletPlugin, WalletPluginConfig,
        WalletPluginError, WalletPluginLoginResponse, WalletPluginMetadata,
        WalletPluginSignResponse,
    };
}
