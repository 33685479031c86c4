use crate::Error;

use alloy::primitives::Address;
use antelope_session::{ChainApi, GetTableRowsParams, Name, PermissionLevel};
use serde::{Deserialize, Serialize};

/// Table holding address to account bindings
pub const ACCOUNT_TABLE: &str = "account";

/// The `etheraccount` contract account
pub const ETHERACCOUNT_CONTRACT: Name = Name::from_raw(6222474508929247120);

/// A ledger account bound to an Ethereum address
///
/// Created by a successful login and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    eos_account: Name,
    eth_address: Address,
}

impl ResolvedIdentity {
    pub(crate) fn new(eos_account: Name, eth_address: Address) -> Result<Self, Error> {
        if eos_account.is_empty() {
            return Err(Error::LedgerRequestFailure(
                "the bound account name is empty".to_string(),
            ));
        }
        Ok(Self {
            eos_account,
            eth_address,
        })
    }

    /// Bound ledger account
    pub fn ledger_account(&self) -> Name {
        self.eos_account
    }

    /// Ethereum address that owns the account
    pub fn eth_address(&self) -> Address {
        self.eth_address
    }

    /// `<account>@active`
    pub fn permission_level(&self) -> PermissionLevel {
        PermissionLevel {
            actor: self.eos_account,
            permission: Name::ACTIVE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    eos_account: String,
    eth_address: String,
}

/// Table key for an address: 40 lowercase hex digits, no prefix
pub fn address_key(address: &Address) -> String {
    hex::encode(address.as_slice())
}

/// Reads a stored `eth_address`: 40 hex digits, or the 64-digit `sha256`
/// key form holding the address in its leading 20 bytes
fn parse_row_address(stored: &str) -> Result<Address, Error> {
    let digits = stored
        .strip_prefix("0x")
        .or_else(|| stored.strip_prefix("0X"))
        .unwrap_or(stored);
    let bytes = hex::decode(digits)
        .map_err(|e| Error::LedgerRequestFailure(format!("invalid bound address {stored}: {e}")))?;
    match bytes.len() {
        20 | 32 => Ok(Address::from_slice(&bytes[..20])),
        len => Err(Error::LedgerRequestFailure(format!(
            "invalid bound address {stored}: expected 20 or 32 bytes, got {len}"
        ))),
    }
}

/// Looks up the ledger account bound to an Ethereum address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityResolver {
    contract: Name,
}

impl IdentityResolver {
    /// Resolver over `contract`'s account table
    pub fn new(contract: Name) -> Self {
        Self { contract }
    }

    /// Contract whose table is queried
    pub fn contract(&self) -> Name {
        self.contract
    }

    /// Query for exactly `address`
    pub fn query(&self, address: &Address) -> GetTableRowsParams {
        let contract = self.contract.to_string();
        GetTableRowsParams::new(contract.clone(), contract, ACCOUNT_TABLE)
            .with_index("secondary", "sha256")
            .with_exact_key(address_key(address))
            .with_limit(1)
    }

    /// Resolves `address` with one read-only table query
    pub async fn resolve(&self, client: &dyn ChainApi, address: &Address) -> Result<ResolvedIdentity, Error> {
        let params = self.query(address);
        tracing::debug!(contract = %self.contract, key = ?params.lower_bound, "resolving identity");

        let response = client
            .get_table_rows(&params)
            .await
            .map_err(|e| Error::LedgerRequestFailure(e.to_string()))?;

        let Some(row) = response.rows.into_iter().next() else {
            return Err(Error::AccountNotFound(address.to_string()));
        };
        let row: AccountRow = serde_json::from_value(row)
            .map_err(|e| Error::LedgerRequestFailure(format!("malformed account row: {e}")))?;

        let bound = parse_row_address(&row.eth_address)?;
        if bound != *address {
            // the node returned the next row past the key
            return Err(Error::AccountNotFound(address.to_string()));
        }

        let account: Name = row
            .eos_account
            .parse()
            .map_err(|e| Error::LedgerRequestFailure(format!("invalid bound account: {e}")))?;
        ResolvedIdentity::new(account, bound)
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(ETHERACCOUNT_CONTRACT)
    }
}
