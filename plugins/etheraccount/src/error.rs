use antelope_session::{ChainId, CodecError, WalletPluginError};
use thiserror::Error;

/// Custom error type for the etheraccount plugin
///
/// Every variant is terminal for the call that produced it. The display
/// text is what the host shows the user.
#[derive(Error, Debug)]
pub enum Error {
    /// Login was attempted without a selected chain
    #[error("The WalletPluginEtherAccount plugin requires a chain to be selected before logging in.")]
    ChainNotSelected,

    /// No usable injected wallet
    #[error("{0}")]
    ProviderNotFound(String),

    /// The selected chain has no network binding
    #[error("The specified chain ({0}) is not supported by the WalletPluginEtherAccount plugin.")]
    UnsupportedChain(ChainId),

    /// The wallet is connected to the wrong network
    #[error("The chainId ({provider}) does not match the networkId ({required}).")]
    ChainMismatch {
        /// Network id reported by the wallet
        provider: u64,
        /// Network id the chain requires
        required: u64,
    },

    /// The wallet returned no accounts
    #[error("Unable to get the current account during login.")]
    NoAccountSelected,

    /// No ledger account is bound to the address
    #[error("An account does not exist for this address ({0}).")]
    AccountNotFound(String),

    /// A wallet request failed or returned something unusable
    #[error("The wallet request {method} failed: {message}")]
    ProviderRequestFailure {
        /// JSON-RPC method
        method: String,
        /// EIP-1193 error code, when the wallet reported one
        code: Option<i64>,
        /// Reason
        message: String,
    },

    /// The action list could not be encoded
    #[error("Unable to serialize the transaction actions: {0}")]
    Serialization(#[from] CodecError),

    /// The bridge contract refused the relay
    #[error("The etheraccount bridge rejected the transaction: {0}")]
    RelayRejected(String),

    /// Sign was called before a successful login
    #[error("The WalletPluginEtherAccount plugin requires a login before signing.")]
    NotLoggedIn,

    /// The ledger table query failed or returned a malformed row
    #[error("Unable to read the account table: {0}")]
    LedgerRequestFailure(String),

    /// Options could not be applied
    #[error("Invalid plugin options: {0}")]
    InvalidOptions(String),
}

impl Error {
    pub(crate) fn provider(method: &str, code: Option<i64>, message: impl Into<String>) -> Self {
        Error::ProviderRequestFailure {
            method: method.to_string(),
            code,
            message: message.into(),
        }
    }
}

impl From<Error> for WalletPluginError {
    fn from(err: Error) -> Self {
        WalletPluginError::Rejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_mismatch_message() {
        let err = Error::ChainMismatch { provider: 1, required: 59 };
        assert_eq!(err.to_string(), "The chainId (1) does not match the networkId (59).");
    }

    #[test]
    fn test_plugin_error_keeps_message() {
        let err: WalletPluginError = Error::NoAccountSelected.into();
        assert_eq!(err.to_string(), "Unable to get the current account during login.");
    }

    #[test]
    fn test_serialization_from_codec() {
        let err: Error = CodecError::LengthOverflow {
            what: "action data",
            len: usize::MAX,
        }
        .into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("Unable to serialize the transaction actions: action data length"));
    }
}
