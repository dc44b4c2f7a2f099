//! API key handling: zeroizing string wrapper and OS keyring storage.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEYRING_SERVICE: &str = "voicebatch";
const KEYRING_USER: &str = "speechify_api_key";

/// String that is wiped from memory on drop and redacted in `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("SecretString(<empty>)")
        } else {
            f.write_str("SecretString(***)")
        }
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

/// API key stored in the OS keyring.
pub struct KeyringStore;

impl KeyringStore {
    fn entry() -> anyhow::Result<keyring::Entry> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?)
    }

    /// Read the stored key. Missing entries and unavailable keyrings yield `None`.
    pub fn load() -> Option<SecretString> {
        let entry = Self::entry().ok()?;
        match entry.get_password() {
            Ok(key) if !key.is_empty() => Some(SecretString::new(key)),
            Ok(_) => None,
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::debug!("Keyring lookup failed: {}", e);
                None
            }
        }
    }

    pub fn store(key: &str) -> anyhow::Result<()> {
        Self::entry()?.set_password(key)?;
        Ok(())
    }

    pub fn delete() -> anyhow::Result<()> {
        Self::entry()?.delete_credential()?;
        Ok(())
    }
}
