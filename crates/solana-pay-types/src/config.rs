//! Configuration helpers shared by the engine and the merchant server.
//!
//! Configuration is JSON. Any string value wrapped in [`LiteralOrEnv`] may
//! name an environment variable instead of carrying the value itself:
//!
//! ```json
//! {
//!   "endpoints": ["https://api.devnet.solana.com", "$HELIUS_RPC_URL", "${BACKUP_RPC}"]
//! }
//! ```
//!
//! Defaults that are not in the file are looked up with [`env_or`], so a
//! deployment can be tuned through `SOLANA_PAY_*` variables alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// A value given literally or as a `$VAR` / `${VAR}` reference.
///
/// References are resolved while deserializing; afterwards the wrapper
/// dereferences to the parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Returns the variable name if `s` is `$VAR` or `${VAR}`.
fn env_reference(s: &str) -> Option<&str> {
    let name = match s.strip_prefix("${") {
        Some(braced) => braced.strip_suffix('}')?,
        None => s.strip_prefix('$')?,
    };
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

impl<T> LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    /// Resolves a literal or env reference and parses it.
    pub fn resolve(raw: &str) -> Result<Self, String> {
        let value = match env_reference(raw) {
            Some(name) => std::env::var(name).map_err(|_| {
                format!("Environment variable '{name}' not found (referenced as '{raw}')")
            })?,
            None => raw.to_string(),
        };
        value
            .parse::<T>()
            .map(Self)
            .map_err(|e| format!("Failed to parse value {value:?}: {e}"))
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::resolve(&raw).map_err(serde::de::Error::custom)
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Reads and parses an environment variable, falling back to `default`
/// when it is unset or does not parse.
pub fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(variable = name, value = %raw, "Ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}
