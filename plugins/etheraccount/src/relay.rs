use crate::gateway::{ProviderGateway, ProviderHandle};
use crate::Error;

use alloy::network::ReceiptResponse;
use alloy::primitives::{address, Address, Bytes, B256};
use alloy::rpc::types::{
    BlockNumberOrTag, Transaction, TransactionInput, TransactionReceipt, TransactionRequest,
};
use alloy::sol_types::SolCall;
use antelope_session::{Action, ActionSerializer, SerializedActionBatch, Signature};
use serde_json::json;
use std::time::Duration;

/// Bridge contract on the EOS EVM network
pub const DEFAULT_BRIDGE_ADDRESS: Address = address!("a1050456bf9f78d485445fb43aa2c6978f3aa5d5");

mod bridge {
    #![allow(missing_docs)]

    alloy::sol! {
        function getRp() external view returns (uint64);
        function pushEosTransaction(uint64 rp, bytes actions) external returns (bool);
    }
}

pub use bridge::{getRpCall, pushEosTransactionCall};

/// Replay-protection state read from the bridge right before a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayState {
    /// Counter the next relay must carry
    pub replay_protection_counter: u64,
}

/// Relays serialized actions through the bridge contract
#[derive(Debug, Clone)]
pub struct TransactionRelay {
    bridge: Address,
    receipt_poll_interval: Duration,
}

impl TransactionRelay {
    /// Relay through `bridge`, polling receipts every `receipt_poll_interval`
    pub fn new(bridge: Address, receipt_poll_interval: Duration) -> Self {
        Self {
            bridge,
            receipt_poll_interval,
        }
    }

    /// Bridge contract address
    pub fn bridge(&self) -> Address {
        self.bridge
    }

    /// Relays `actions` as `from` and returns the ledger-native signature
    ///
    /// `handle` must come from a detection made for this call. The
    /// replay-protection counter is read fresh and never cached.
    pub async fn relay(
        &self,
        gateway: &ProviderGateway,
        handle: &ProviderHandle,
        from: Address,
        actions: &[Action],
    ) -> Result<Signature, Error> {
        let batch = ActionSerializer::encode(actions)?;
        tracing::debug!(actions = actions.len(), bytes = batch.len(), "serialized action batch");

        let state = self.read_state(gateway, handle).await?;
        let tx_hash = self.submit(gateway, handle, from, state, batch).await?;
        self.await_receipt(gateway, handle, tx_hash).await?;

        let tx: Option<Transaction> = gateway
            .request(handle, "eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        let tx = tx.ok_or_else(|| {
            Error::provider(
                "eth_getTransactionByHash",
                None,
                format!("relay transaction {tx_hash} not found"),
            )
        })?;
        let signature = signature_from_transaction(&tx)?;
        tracing::info!(%tx_hash, rp = state.replay_protection_counter, "relay confirmed");
        Ok(signature)
    }

    /// Reads `getRp()` from the bridge
    pub async fn read_state(&self, gateway: &ProviderGateway, handle: &ProviderHandle) -> Result<RelayState, Error> {
        let call = self.bridge_call(getRpCall {}.abi_encode());
        let output: Bytes = gateway
            .call_contract(handle, "eth_call", json!([call, BlockNumberOrTag::Latest]))
            .await?;
        let counter = getRpCall::abi_decode_returns(&output)
            .map_err(|e| Error::provider("eth_call", None, format!("undecodable getRp result: {e}")))?;
        tracing::debug!(rp = counter, "read replay-protection counter");
        Ok(RelayState {
            replay_protection_counter: counter,
        })
    }

    fn bridge_call(&self, data: Vec<u8>) -> TransactionRequest {
        // wallets read `data`, nodes read `input`
        TransactionRequest::default()
            .to(self.bridge)
            .input(TransactionInput::both(Bytes::from(data)))
    }

    async fn submit(
        &self,
        gateway: &ProviderGateway,
        handle: &ProviderHandle,
        from: Address,
        state: RelayState,
        batch: SerializedActionBatch,
    ) -> Result<B256, Error> {
        let call = pushEosTransactionCall {
            rp: state.replay_protection_counter,
            actions: Bytes::from(batch.into_bytes()),
        };
        let tx = self.bridge_call(call.abi_encode()).from(from);
        gateway
            .call_contract(handle, "eth_sendTransaction", json!([tx]))
            .await
    }

    async fn await_receipt(
        &self,
        gateway: &ProviderGateway,
        handle: &ProviderHandle,
        tx_hash: B256,
    ) -> Result<(), Error> {
        loop {
            let receipt: Option<TransactionReceipt> = gateway
                .request(handle, "eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            let Some(receipt) = receipt else {
                tokio::time::sleep(self.receipt_poll_interval).await;
                continue;
            };
            if !receipt.status() {
                tracing::warn!(%tx_hash, "relay transaction reverted");
                return Err(Error::RelayRejected(format!("relay transaction {tx_hash} reverted")));
            }
            return Ok(());
        }
    }
}

impl Default for TransactionRelay {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_ADDRESS, Duration::from_millis(1000))
    }
}

/// Re-encodes the ECDSA signature of a mined relay transaction as `SIG_K1_`
pub fn signature_from_transaction(tx: &Transaction) -> Result<Signature, Error> {
    let signature = tx.inner.inner().signature();
    Signature::from_rs(
        signature.r().to_be_bytes::<32>(),
        signature.s().to_be_bytes::<32>(),
        u8::from(signature.v()),
    )
    .map_err(|e| Error::provider("eth_getTransactionByHash", None, e.to_string()))
}
