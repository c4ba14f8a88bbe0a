//! Base-58 account address text.

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

static ADDRESS_PATTERN: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("address pattern is a valid regex")
});

/// Returns `true` if the text looks like a base-58 account address.
///
/// This is a format check only. Whether the text decodes to exactly 32 bytes
/// is decided where the address is turned into a public key.
pub fn is_valid_address(value: &str) -> bool {
    ADDRESS_PATTERN.is_match(value)
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("Invalid address: {0:?}")]
pub struct AddressError(pub String);

/// Validated base-58 address text (32 to 44 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        if is_valid_address(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(AddressError(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
