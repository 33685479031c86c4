//! Boundary to the ledger's chain API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [ChainApi] implementation
#[derive(Debug, Error)]
pub enum ChainApiError {
    /// Transport failure
    #[error("Chain API request failed: {0}")]
    Request(String),

    /// The node answered with an error payload
    #[error("Chain API error {code}: {message}")]
    Api {
        /// Error code reported by the node
        code: i64,
        /// Error message reported by the node
        message: String,
    },

    /// The response did not match the expected shape
    #[error("Invalid chain API response: {0}")]
    InvalidResponse(String),
}

/// Parameters of `/v1/chain/get_table_rows`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTableRowsParams {
    /// Contract owning the table
    pub code: String,
    /// Table scope
    pub scope: String,
    /// Table name
    pub table: String,
    /// Index selector (`primary`, `secondary`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_position: Option<String>,
    /// Key type of the selected index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    /// Inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    /// Maximum rows
    pub limit: u32,
    /// Ask the node to decode rows with the contract ABI
    pub json: bool,
}

impl GetTableRowsParams {
    /// Query over `code`'s `table` in `scope`, one JSON row
    pub fn new(code: impl Into<String>, scope: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            scope: scope.into(),
            table: table.into(),
            index_position: None,
            key_type: None,
            lower_bound: None,
            upper_bound: None,
            limit: 1,
            json: true,
        }
    }

    /// Selects a secondary index and its key type
    pub fn with_index(mut self, position: impl Into<String>, key_type: impl Into<String>) -> Self {
        self.index_position = Some(position.into());
        self.key_type = Some(key_type.into());
        self
    }

    /// Restricts the range to a single key
    pub fn with_exact_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.lower_bound = Some(key.clone());
        self.upper_bound = Some(key);
        self
    }

    /// Sets the row limit
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Response of `/v1/chain/get_table_rows`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTableRowsResponse {
    /// Decoded rows
    pub rows: Vec<serde_json::Value>,
    /// More rows are available past `next_key`
    #[serde(default)]
    pub more: bool,
    /// Continuation key
    #[serde(default)]
    pub next_key: String,
}

/// Read access to a ledger node
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Reads rows from a contract table
    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> Result<GetTableRowsResponse, ChainApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_serialization() {
        let params = GetTableRowsParams::new("etheraccount", "etheraccount", "account")
            .with_index("secondary", "sha256")
            .with_exact_key("abc123");
        let json = serde_json::to_value(&params).unwrap();

        assert_eq!(json["index_position"], "secondary");
        assert_eq!(json["key_type"], "sha256");
        assert_eq!(json["lower_bound"], "abc123");
        assert_eq!(json["upper_bound"], "abc123");
        assert_eq!(json["limit"], 1);
        assert_eq!(json["json"], true);
    }

    #[test]
    fn test_unset_bounds_are_omitted() {
        let json = serde_json::to_value(GetTableRowsParams::new("a", "a", "t")).unwrap();
        assert!(json.get("lower_bound").is_none());
        assert!(json.get("index_position").is_none());
    }

    #[test]
    fn test_response_defaults() {
        let res: GetTableRowsResponse = serde_json::from_str(r#"{"rows": []}"#).unwrap();
        assert!(res.rows.is_empty());
        assert!(!res.more);
    }
}
