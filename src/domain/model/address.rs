//! Participant addresses tracked by the allowlist.

use primitive_types::H160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the textual form: `0x` followed by 40 hex digits.
pub const ADDRESS_STR_LEN: usize = 42;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex digits after 0x, got {0} characters")]
    BadLength(usize),
    #[error("address contains non-hex characters")]
    NotHex,
}

/// A 20-byte participant identifier.
///
/// Parsing accepts any mix of upper and lower case hex digits; the canonical
/// rendering is always lowercase, so two spellings of the same address
/// compare equal and render identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(H160);

impl Address {
    pub fn from_h160(inner: H160) -> Self {
        Self(inner)
    }

    pub fn as_h160(&self) -> &H160 {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parses and returns `None` instead of an error. Used where malformed
    /// input is skipped rather than reported.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Checks the textual shape `^0x[a-fA-F0-9]{40}$` without allocating.
    pub fn is_well_formed(s: &str) -> bool {
        s.len() == ADDRESS_STR_LEN
            && s.starts_with("0x")
            && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_STR_LEN - 2 {
            return Err(AddressError::BadLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::NotHex)?;
        Ok(Self(H160::from(bytes)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
