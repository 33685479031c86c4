//! Actions, transactions and their canonical binary encoding.

use crate::name::Name;
use crate::permission::PermissionLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while encoding actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A length prefix does not fit in a varuint32
    #[error("{what} length {len} exceeds the varuint32 range")]
    LengthOverflow {
        /// Which field overflowed
        what: &'static str,
        /// The offending length
        len: usize,
    },
}

/// A single contract action with ABI-encoded data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Contract account
    pub account: Name,
    /// Action name
    pub name: Name,
    /// Authorizations
    pub authorization: Vec<PermissionLevel>,
    /// ABI-encoded action payload
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Action {
    /// Creates an action
    pub fn new(
        account: Name,
        name: Name,
        authorization: Vec<PermissionLevel>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            account,
            name,
            authorization,
            data: data.into(),
        }
    }
}

/// The parts of a transaction a wallet plugin sees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Expiration, seconds since epoch
    #[serde(default)]
    pub expiration: u32,
    /// Lower 16 bits of the reference block number
    #[serde(default)]
    pub ref_block_num: u16,
    /// Reference block prefix
    #[serde(default)]
    pub ref_block_prefix: u32,
    /// Ordered actions
    pub actions: Vec<Action>,
}

/// Canonical `action[]` encoding, produced once per sign call
///
/// The batch cannot be mutated after creation and is consumed by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedActionBatch(Vec<u8>);

impl SerializedActionBatch {
    /// Borrow the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of encoded bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no bytes were produced
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take ownership of the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Encodes actions in the Antelope binary format
#[derive(Debug, Default)]
pub struct ActionSerializer {
    buf: Vec<u8>,
}

impl ActionSerializer {
    /// Encodes an ordered action list as `action[]`
    ///
    /// An empty list encodes as the single count byte `0x00`.
    pub fn encode(actions: &[Action]) -> Result<SerializedActionBatch, CodecError> {
        let mut ser = Self::default();
        ser.write_varuint32("action list", actions.len())?;
        for action in actions {
            ser.write_action(action)?;
        }
        Ok(SerializedActionBatch(ser.buf))
    }

    fn write_action(&mut self, action: &Action) -> Result<(), CodecError> {
        self.write_name(action.account);
        self.write_name(action.name);
        self.write_varuint32("authorization", action.authorization.len())?;
        for level in &action.authorization {
            self.write_name(level.actor);
            self.write_name(level.permission);
        }
        self.write_varuint32("action data", action.data.len())?;
        self.buf.extend_from_slice(&action.data);
        Ok(())
    }

    fn write_name(&mut self, name: Name) {
        self.buf.extend_from_slice(&name.to_le_bytes());
    }

    fn write_varuint32(&mut self, what: &'static str, len: usize) -> Result<(), CodecError> {
        let mut value = u32::try_from(len).map_err(|_| CodecError::LengthOverflow { what, len })?;
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if value == 0 {
                return Ok(());
            }
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(data: Vec<u8>) -> Action {
        Action::new(
            "eosio".parse().unwrap(),
            "transfer".parse().unwrap(),
            vec!["alice@active".parse().unwrap()],
            data,
        )
    }

    #[test]
    fn test_encode_single_action() {
        let batch = ActionSerializer::encode(&[transfer(vec![1, 2, 3])]).unwrap();
        let bytes = batch.as_bytes();

        assert_eq!(batch.len(), 38);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &[0, 0, 0, 0, 0, 0xEA, 0x30, 0x55]);
        assert_eq!(bytes[17], 1);
        assert_eq!(&bytes[26..34], &Name::ACTIVE.to_le_bytes());
        assert_eq!(&bytes[34..], &[3, 1, 2, 3]);
    }

    #[test]
    fn test_order_is_preserved() {
        let a = transfer(vec![0xaa]);
        let b = transfer(vec![0xbb]);
        let ab = ActionSerializer::encode(&[a.clone(), b.clone()]).unwrap();
        let ba = ActionSerializer::encode(&[b, a]).unwrap();
        assert_ne!(ab, ba);
        assert_eq!(ab.as_bytes()[0], 2);
    }

    #[test]
    fn test_long_data_uses_multibyte_prefix() {
        let batch = ActionSerializer::encode(&[transfer(vec![0u8; 200])]).unwrap();
        // 200 = 0xc8 -> [0xc8, 0x01]
        assert_eq!(&batch.as_bytes()[34..36], &[0xc8, 0x01]);
        assert_eq!(batch.len(), 34 + 2 + 200);
    }

    #[test]
    fn test_empty_list_is_a_zero_count() {
        let batch = ActionSerializer::encode(&[]).unwrap();
        assert_eq!(batch.as_bytes(), &[0x00]);
    }

    #[test]
    fn test_action_json() {
        let json = r#"{
            "account": "eosio",
            "name": "transfer",
            "authorization": [{"actor": "alice", "permission": "active"}],
            "data": "0a0b"
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action, transfer(vec![0x0a, 0x0b]));
        assert!(serde_json::from_str::<Action>(&json.replace("0a0b", "0g")).is_err());
    }
}
