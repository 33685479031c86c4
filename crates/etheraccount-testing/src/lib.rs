//! # etheraccount Testing Infrastructure
//!
//! Test doubles and fixtures for the etheraccount wallet plugin:
//! - A scripted EIP-1193 provider that records every request
//! - A detector whose provider can be swapped or removed mid-test
//! - An in-memory `account` table
//! - Property-based testing strategies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use etheraccount_testing::*;
//!
//! let provider = Arc::new(MockEthereumProvider::new().with_network_id(59).with_accounts([bob()]));
//! let detector = Arc::new(MockDetector::with_provider(provider.clone()));
//! let ledger = Arc::new(MockChainApi::new().with_binding("bob", bob()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use antelope_session::{
    Action, ChainApi, ChainApiError, ChainDefinition, ChainId, GetTableRowsParams,
    GetTableRowsResponse, LoginContext, Name, PermissionLevel,
};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wallet_plugin_etheraccount::{
    address_key, pushEosTransactionCall, Eip1193Provider, ProviderDetector, ProviderRpcError,
    EOS_MAINNET, KYLIN_TESTNET,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Fixtures
// ============================================================================

/// Address bound to `alice`
pub fn alice() -> Address {
    Address::repeat_byte(0xab)
}

/// Address bound to `bob`
pub fn bob() -> Address {
    Address::repeat_byte(0x11)
}

/// Address with no binding
pub fn stranger() -> Address {
    Address::repeat_byte(0xcd)
}

/// Hash the mock provider returns for every relay
pub const RELAY_TX_HASH: B256 = B256::repeat_byte(0x77);

/// Block the mock mines every relay into
pub const RELAY_BLOCK_HASH: B256 = B256::repeat_byte(0xaa);

/// `r` of the relay transaction's signature
pub const RELAY_SIG_R: [u8; 32] = [0x11; 32];

/// `s` of the relay transaction's signature
pub const RELAY_SIG_S: [u8; 32] = [0x22; 32];

/// `yParity` of the relay transaction's signature
pub const RELAY_SIG_Y_PARITY: u8 = 1;

/// Chain definition for EOS mainnet
pub fn mainnet() -> ChainDefinition {
    ChainDefinition::new(EOS_MAINNET, "https://eos.greymass.com")
}

/// Chain definition for the Kylin testnet
pub fn kylin() -> ChainDefinition {
    ChainDefinition::new(KYLIN_TESTNET, "https://kylin.eosn.io")
}

/// Login context for `chain` over `ledger`
pub fn login_context(chain: ChainDefinition, ledger: Arc<dyn ChainApi>) -> LoginContext {
    LoginContext::new(ledger).with_chain(chain)
}

/// A row of the `account` table
pub fn account_row(account: &str, address: Address) -> Value {
    json!({
        "eos_account": account,
        "eth_address": address_key(&address),
    })
}

/// An `eosio.token::transfer` action authorized by `actor@active`
pub fn transfer_action(actor: &str) -> Action {
    let actor: Name = actor.parse().unwrap_or_default();
    Action::new(
        Name::from_raw(0x5530EA033482A600),
        Name::from_raw(0xCDCD3C2D57000000),
        vec![PermissionLevel {
            actor,
            permission: Name::ACTIVE,
        }],
        vec![0x01, 0x02, 0x03, 0x04],
    )
}

/// Decodes the `pushEosTransaction` call out of `eth_sendTransaction` params
pub fn decode_relay_call(params: &Value) -> Option<pushEosTransactionCall> {
    let request = relay_request(params)?;
    pushEosTransactionCall::abi_decode(request.input.input()?).ok()
}

/// The transaction request inside `eth_call` or `eth_sendTransaction` params
pub fn relay_request(params: &Value) -> Option<TransactionRequest> {
    serde_json::from_value(params.get(0)?.clone()).ok()
}

/// Receipt of the relay transaction `from` sent to `to`
pub fn relay_receipt(from: Address, to: Address, success: bool) -> Value {
    json!({
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x1e8b4",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "transactionHash": RELAY_TX_HASH,
        "transactionIndex": "0x0",
        "blockHash": RELAY_BLOCK_HASH,
        "blockNumber": "0x10",
        "gasUsed": "0x1e8b4",
        "effectiveGasPrice": "0x3b9aca00",
        "from": from,
        "to": to,
        "contractAddress": null
    })
}

/// The mined relay transaction, signed with `RELAY_SIG_*`
pub fn relay_transaction(from: Address, to: Address) -> Value {
    json!({
        "hash": RELAY_TX_HASH,
        "blockHash": RELAY_BLOCK_HASH,
        "blockNumber": "0x10",
        "transactionIndex": "0x0",
        "type": "0x2",
        "chainId": "0x3b",
        "nonce": "0x0",
        "from": from,
        "to": to,
        "value": "0x0",
        "gas": "0x30d40",
        "gasPrice": "0x3b9aca00",
        "maxFeePerGas": "0x3b9aca00",
        "maxPriorityFeePerGas": "0x0",
        "accessList": [],
        "input": "0x",
        "r": format!("0x{}", hex::encode(RELAY_SIG_R)),
        "s": format!("0x{}", hex::encode(RELAY_SIG_S)),
        "yParity": format!("{RELAY_SIG_Y_PARITY:#x}"),
        "v": format!("{RELAY_SIG_Y_PARITY:#x}"),
    })
}

// ============================================================================
// Mock Ethereum Provider
// ============================================================================

#[derive(Debug)]
struct ProviderState {
    network_id: Value,
    accounts: Vec<Address>,
    rp: u64,
    pending_receipts: usize,
    receipt_success: bool,
    last_relay: (Address, Address),
    scripted: HashMap<String, VecDeque<Result<Value, ProviderRpcError>>>,
    calls: Vec<(String, Value)>,
}

/// A scripted EIP-1193 provider
///
/// Unscripted requests get the behavior of a cooperative wallet connected
/// to a healthy bridge: the replay-protection counter advances after every
/// relay, and receipts are mined after the configured number of polls.
#[derive(Debug)]
pub struct MockEthereumProvider {
    is_metamask: bool,
    supports_request: bool,
    state: Mutex<ProviderState>,
}

impl MockEthereumProvider {
    /// MetaMask on mainnet's EVM network with no accounts
    pub fn new() -> Self {
        Self {
            is_metamask: true,
            supports_request: true,
            state: Mutex::new(ProviderState {
                network_id: json!("0x3b"),
                accounts: Vec::new(),
                rp: 0,
                pending_receipts: 0,
                receipt_success: true,
                last_relay: (Address::ZERO, Address::ZERO),
                scripted: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Reports `network_id` for `eth_chainId`
    pub fn with_network_id(self, network_id: u64) -> Self {
        lock(&self.state).network_id = json!(format!("{network_id:#x}"));
        self
    }

    /// Reports a raw `eth_chainId` value
    pub fn with_raw_network_id(self, network_id: Value) -> Self {
        lock(&self.state).network_id = network_id;
        self
    }

    /// Accounts returned by `eth_requestAccounts`
    pub fn with_accounts(self, accounts: impl IntoIterator<Item = Address>) -> Self {
        lock(&self.state).accounts = accounts.into_iter().collect();
        self
    }

    /// Identify as MetaMask or not
    pub fn with_metamask(mut self, is_metamask: bool) -> Self {
        self.is_metamask = is_metamask;
        self
    }

    /// Pretend the `request` primitive is missing
    pub fn without_request(mut self) -> Self {
        self.supports_request = false;
        self
    }

    /// Initial replay-protection counter
    pub fn with_rp(self, rp: u64) -> Self {
        lock(&self.state).rp = rp;
        self
    }

    /// Number of `null` receipts before the relay is mined
    pub fn with_pending_receipts(self, polls: usize) -> Self {
        lock(&self.state).pending_receipts = polls;
        self
    }

    /// Mined relays report failure
    pub fn with_failed_receipts(self) -> Self {
        lock(&self.state).receipt_success = false;
        self
    }

    /// Queues a one-shot response for `method`
    pub fn push_response(&self, method: &str, response: Result<Value, ProviderRpcError>) {
        lock(&self.state)
            .scripted
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every request in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.state).calls.clone()
    }

    /// Methods requested, in order
    pub fn methods(&self) -> Vec<String> {
        lock(&self.state).calls.iter().map(|(m, _)| m.clone()).collect()
    }

    /// How often `method` was requested
    pub fn count(&self, method: &str) -> usize {
        lock(&self.state).calls.iter().filter(|(m, _)| m == method).count()
    }

    /// Params of the most recent `method` request
    pub fn last_params(&self, method: &str) -> Option<Value> {
        lock(&self.state)
            .calls
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }

    /// Current replay-protection counter
    pub fn rp(&self) -> u64 {
        lock(&self.state).rp
    }

    fn respond(state: &mut ProviderState, method: &str, params: &Value) -> Result<Value, ProviderRpcError> {
        match method {
            "eth_chainId" => Ok(state.network_id.clone()),
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(state.accounts)),
            "eth_call" => Ok(json!(format!("0x{:064x}", state.rp))),
            "eth_sendTransaction" => {
                if let Some(request) = relay_request(params) {
                    let from = request.from.unwrap_or_default();
                    let to = request.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
                    state.last_relay = (from, to);
                }
                state.rp += 1;
                Ok(json!(RELAY_TX_HASH))
            }
            "eth_getTransactionReceipt" => {
                if state.pending_receipts > 0 {
                    state.pending_receipts -= 1;
                    return Ok(Value::Null);
                }
                let (from, to) = state.last_relay;
                Ok(relay_receipt(from, to, state.receipt_success))
            }
            "eth_getTransactionByHash" => {
                let (from, to) = state.last_relay;
                Ok(relay_transaction(from, to))
            }
            _ => Err(ProviderRpcError::new(
                ProviderRpcError::UNSUPPORTED_METHOD,
                format!("The method {method} is not supported"),
            )),
        }
    }
}

impl Default for MockEthereumProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Eip1193Provider for MockEthereumProvider {
    fn is_metamask(&self) -> bool {
        self.is_metamask
    }

    fn supports_request(&self) -> bool {
        self.supports_request
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let mut state = lock(&self.state);
        state.calls.push((method.to_string(), params.clone()));
        if let Some(response) = state.scripted.get_mut(method).and_then(VecDeque::pop_front) {
            return response;
        }
        Self::respond(&mut state, method, &params)
    }
}

// ============================================================================
// Mock Detector
// ============================================================================

/// A detector whose provider can be swapped between calls
#[derive(Default)]
pub struct MockDetector {
    provider: Mutex<Option<Arc<dyn Eip1193Provider>>>,
    detections: AtomicUsize,
}

impl MockDetector {
    /// An environment without a wallet
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment with `provider` injected
    pub fn with_provider(provider: Arc<dyn Eip1193Provider>) -> Self {
        let detector = Self::new();
        detector.set(provider);
        detector
    }

    /// Injects `provider`
    pub fn set(&self, provider: Arc<dyn Eip1193Provider>) {
        *lock(&self.provider) = Some(provider);
    }

    /// Removes the wallet
    pub fn clear(&self) {
        *lock(&self.provider) = None;
    }

    /// How often detection ran
    pub fn detections(&self) -> usize {
        self.detections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderDetector for MockDetector {
    async fn detect(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.detections.fetch_add(1, Ordering::SeqCst);
        lock(&self.provider).clone()
    }
}

// ============================================================================
// Mock Chain API
// ============================================================================

/// An in-memory `account` table keyed by lowercase address
#[derive(Debug, Default)]
pub struct MockChainApi {
    rows: Mutex<HashMap<String, Vec<Value>>>,
    failure: Mutex<Option<String>>,
    queries: Mutex<Vec<GetTableRowsParams>>,
}

impl MockChainApi {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `account` to `address`
    pub fn with_binding(self, account: &str, address: Address) -> Self {
        self.with_row(address_key(&address), account_row(account, address))
    }

    /// Returns `row` for queries on `key`
    pub fn with_row(self, key: impl Into<String>, row: Value) -> Self {
        lock(&self.rows).entry(key.into()).or_default().push(row);
        self
    }

    /// Fails every query with `message`
    pub fn failing(self, message: impl Into<String>) -> Self {
        *lock(&self.failure) = Some(message.into());
        self
    }

    /// Every query in order
    pub fn queries(&self) -> Vec<GetTableRowsParams> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl ChainApi for MockChainApi {
    async fn get_table_rows(&self, params: &GetTableRowsParams) -> Result<GetTableRowsResponse, ChainApiError> {
        lock(&self.queries).push(params.clone());
        if let Some(message) = lock(&self.failure).clone() {
            return Err(ChainApiError::Request(message));
        }
        let rows = params
            .lower_bound
            .as_ref()
            .and_then(|key| lock(&self.rows).get(key).cloned())
            .unwrap_or_default();
        let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
        Ok(GetTableRowsResponse {
            more: rows.len() > limit,
            rows: rows.into_iter().take(limit).collect(),
            next_key: String::new(),
        })
    }
}

// ============================================================================
// Property Testing Strategies
// ============================================================================

/// Arbitrary 32-byte chain ids
pub fn chain_id() -> impl Strategy<Value = ChainId> {
    prop::array::uniform32(any::<u8>()).prop_map(ChainId::new)
}

/// Chain ids with no default network binding
pub fn unsupported_chain_id() -> impl Strategy<Value = ChainId> {
    chain_id().prop_filter("bound by default", |id| *id != EOS_MAINNET && *id != KYLIN_TESTNET)
}

/// EVM network ids
pub fn network_id() -> impl Strategy<Value = u64> {
    prop_oneof![Just(1u64), Just(59u64), Just(95u64), 0u64..1_000_000u64, any::<u64>()]
}

/// Ethereum addresses
pub fn eth_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from)
}

/// Valid, non-empty ledger account names
pub fn account_name() -> impl Strategy<Value = String> {
    "[a-z1-5]{1,12}"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_addresses() {
        assert_eq!(address_key(&bob()), "1111111111111111111111111111111111111111");
        assert_ne!(alice(), stranger());
    }

    #[test]
    fn test_relay_fixtures_decode() {
        use alloy::network::ReceiptResponse;
        use alloy::rpc::types::{Transaction, TransactionReceipt};

        let receipt: TransactionReceipt = serde_json::from_value(relay_receipt(bob(), alice(), false)).unwrap();
        assert!(!receipt.status());
        assert_eq!(receipt.transaction_hash, RELAY_TX_HASH);

        let tx: Transaction = serde_json::from_value(relay_transaction(bob(), alice())).unwrap();
        let signature = tx.inner.inner().signature();
        assert_eq!(signature.r().to_be_bytes::<32>(), RELAY_SIG_R);
        assert_eq!(signature.s().to_be_bytes::<32>(), RELAY_SIG_S);
        assert_eq!(u8::from(signature.v()), RELAY_SIG_Y_PARITY);
    }

    #[test]
    fn test_transfer_action_names() {
        let action = transfer_action("alice");
        assert_eq!(action.account.to_string(), "eosio.token");
        assert_eq!(action.name.to_string(), "transfer");
        assert_eq!(action.authorization[0].to_string(), "alice@active");
    }

    #[tokio::test]
    async fn test_provider_defaults() {
        let provider = MockEthereumProvider::new().with_network_id(95).with_rp(4);
        assert_eq!(provider.request("eth_chainId", json!([])).await.unwrap(), json!("0x5f"));
        let rp = provider.request("eth_call", json!([])).await.unwrap();
        assert!(rp.as_str().unwrap().ends_with("04"));
        provider.request("eth_sendTransaction", json!([])).await.unwrap();
        assert_eq!(provider.rp(), 5);
        assert_eq!(provider.methods(), ["eth_chainId", "eth_call", "eth_sendTransaction"]);
    }

    #[tokio::test]
    async fn test_provider_script_takes_precedence() {
        let provider = MockEthereumProvider::new();
        provider.push_response("eth_chainId", Err(ProviderRpcError::new(4001, "denied")));
        assert!(provider.request("eth_chainId", json!([])).await.is_err());
        assert!(provider.request("eth_chainId", json!([])).await.is_ok());
    }

    #[tokio::test]
    async fn test_detector_swaps() {
        let detector = MockDetector::new();
        assert!(detector.detect().await.is_none());
        detector.set(Arc::new(MockEthereumProvider::new()));
        assert!(detector.detect().await.is_some());
        detector.clear();
        assert!(detector.detect().await.is_none());
        assert_eq!(detector.detections(), 3);
    }

    #[tokio::test]
    async fn test_chain_api_lookup() {
        let ledger = MockChainApi::new().with_binding("bob", bob());
        let params = GetTableRowsParams::new("etheraccount", "etheraccount", "account")
            .with_exact_key(address_key(&bob()))
            .with_limit(1);
        let response = ledger.get_table_rows(&params).await.unwrap();
        assert_eq!(response.rows, vec![account_row("bob", bob())]);
        assert_eq!(ledger.queries().len(), 1);
    }

    proptest! {
        #[test]
        fn test_unsupported_chain_ids_are_unbound(id in unsupported_chain_id()) {
            prop_assert!(id != EOS_MAINNET);
        }

        #[test]
        fn test_account_names_parse(name in account_name()) {
            prop_assert!(name.parse::<Name>().is_ok());
        }
    }
}
