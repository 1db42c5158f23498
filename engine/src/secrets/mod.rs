//! API key resolution
//!
//! Keys are looked up in the environment first and then in the OS keychain
//! (macOS Keychain, Windows Credential Manager, Secret Service on Linux).
//! Nothing is prompted for: a run without a key fails fast with a hint.

use keyring::Entry;
use sdk::errors::EngineError;
use std::fmt;

/// A wrapper for sensitive string data that prevents accidental logging.
///
/// `Debug` and `Display` always print `[REDACTED]`; use `unsecure()` to
/// reach the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Access the raw underlying string
    pub fn unsecure(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Looks up secrets under one keychain service name
pub struct SecretManager {
    service_name: String,
}

impl SecretManager {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Resolve a secret from `env_var`, falling back to the keychain entry `key`.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if neither source has a value.
    pub fn resolve(&self, env_var: &str, key: &str) -> Result<SecretString, EngineError> {
        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                tracing::debug!("Using secret '{}' from environment", key);
                return Ok(SecretString::new(value.trim()));
            }
        }

        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(SecretString::new(secret))
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::KeyringError(format!(
                "No value for '{}': set {} or store it in the keychain under service '{}'",
                key, env_var, self.service_name
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }
}
