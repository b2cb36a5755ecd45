//! Configuration loading and shared configuration types for the feed indexer.
//!
//! Deployment configuration is layered: a base file, an environment-specific
//! file, and `APP_`-prefixed environment variable overrides. The shared
//! structs under [`shared`] are plain serde types with `validate()` methods so
//! that wiring code can fail fast on nonsensical settings.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A secret string that can round-trip through serde.
///
/// [`secrecy::SecretString`] deliberately does not implement [`Serialize`];
/// configuration structs need serialization for test fixtures and config
/// dumps, so this wrapper opts in explicitly. Debug output stays redacted.
#[derive(Debug, Clone)]
pub struct SerializableSecretString(SecretString);

impl SerializableSecretString {
    /// Returns the wrapped secret value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for SerializableSecretString {
    fn from(value: String) -> Self {
        Self(SecretString::new(value))
    }
}

impl From<SerializableSecretString> for SecretString {
    fn from(value: SerializableSecretString) -> Self {
        value.0
    }
}

impl Serialize for SerializableSecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.expose_secret())
    }
}

impl<'de> Deserialize<'de> for SerializableSecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;

        Ok(Self(SecretString::new(value)))
    }
}
