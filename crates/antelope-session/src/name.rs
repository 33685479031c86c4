//! Antelope account and action names.
//!
//! A name is up to 13 characters packed into a `u64`: the first twelve take
//! five bits each, the thirteenth only four. The alphabet is
//! `.12345abcdefghijklmnopqrstuvwxyz`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Maximum length of a textual name
pub const MAX_NAME_LEN: usize = 13;

/// Errors produced when parsing a [Name]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// More than 13 characters
    #[error("Name '{0}' is longer than 13 characters")]
    TooLong(String),

    /// Character outside the name alphabet
    #[error("Name '{name}' contains invalid character '{ch}'")]
    InvalidCharacter {
        /// The rejected name
        name: String,
        /// The offending character
        ch: char,
    },

    /// Thirteenth character outside `.1-5a-j`, or trailing dots
    #[error("Name '{0}' is not in canonical form")]
    NotCanonical(String),
}

/// An Antelope name (account, permission, action or table)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

fn symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl Name {
    /// The `active` permission
    pub const ACTIVE: Name = Name::from_raw(3617214756542218240);

    /// Wraps an already-encoded value
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the packed value
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// True for the empty name
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Little-endian wire encoding
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(s.to_string()));
        }

        let mut value = 0u64;
        for i in 0..MAX_NAME_LEN {
            let c = match bytes.get(i) {
                Some(&b) => symbol(b).ok_or_else(|| NameError::InvalidCharacter {
                    name: s.to_string(),
                    ch: b as char,
                })?,
                None => 0,
            };
            if i < 12 {
                value |= (c & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if c > 0x0f {
                    return Err(NameError::NotCanonical(s.to_string()));
                }
                value |= c;
            }
        }

        let name = Name(value);
        if name.to_string() != s {
            return Err(NameError::NotCanonical(s.to_string()));
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LEN {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is ASCII
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
