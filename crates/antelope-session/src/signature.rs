//! Ledger-native signatures in `SIG_K1_` text form.

use base58::{FromBase58, ToBase58};
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const K1_PREFIX: &str = "SIG_K1_";
const CHECKSUM_LEN: usize = 4;

/// Errors produced when building or parsing a [Signature]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Only secp256k1 signatures are supported
    #[error("Unsupported signature type: {0}")]
    UnsupportedType(String),

    /// The base58 payload did not decode
    #[error("Invalid base58 in signature")]
    Base58,

    /// Payload is not 65 bytes plus checksum
    #[error("Signature payload must be 69 bytes, got {0}")]
    Length(usize),

    /// RIPEMD-160 checksum mismatch
    #[error("Signature checksum mismatch")]
    Checksum,

    /// Recovery id outside 0..=3
    #[error("Invalid recovery id {0}")]
    RecoveryId(u8),
}

/// A recoverable secp256k1 signature
///
/// The first byte is `27 + 4 + recovery_id`, followed by `r` and `s`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 65]);

fn k1_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(b"K1");
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

impl Signature {
    /// Builds a signature from its ECDSA components
    pub fn from_rs(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Result<Self, SignatureError> {
        if recovery_id > 3 {
            return Err(SignatureError::RecoveryId(recovery_id));
        }
        let mut data = [0u8; 65];
        data[0] = 27 + 4 + recovery_id;
        data[1..33].copy_from_slice(&r);
        data[33..].copy_from_slice(&s);
        Ok(Self(data))
    }

    /// Raw 65-byte form
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Recovery id encoded in the header byte
    pub fn recovery_id(&self) -> u8 {
        self.0[0].wrapping_sub(31) & 0x03
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(K1_PREFIX)
            .ok_or_else(|| SignatureError::UnsupportedType(s.chars().take(7).collect()))?;
        let raw = body.from_base58().map_err(|_| SignatureError::Base58)?;
        if raw.len() != 65 + CHECKSUM_LEN {
            return Err(SignatureError::Length(raw.len()));
        }
        let (data, checksum) = raw.split_at(65);
        if k1_checksum(data) != checksum {
            return Err(SignatureError::Checksum);
        }
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(data);
        Ok(Self(bytes))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = self.0.to_vec();
        payload.extend_from_slice(&k1_checksum(&self.0));
        write!(f, "{K1_PREFIX}{}", payload.to_base58())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.to_string()).finish()
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
