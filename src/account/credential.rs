// SPDX-License-Identifier: AGPL-3.0-or-later
//! Credential encoding
//!
//! Turns a plaintext secret into a one-way crypt(3) representation that the
//! account store accepts directly (`useradd -p` / `usermod -p`). The salt is
//! drawn fresh from the OS CSPRNG for every call; the plaintext is never
//! retained, logged, or written anywhere.

use std::fmt;

use sha_crypt::{sha512_simple, Sha512Params};

use crate::error::{Result, RosterError};

/// Opaque handle to an encoded credential
///
/// Holds the SHA-512 crypt string (`$6$...`). `Debug` is redacted so the
/// hash never leaks into logs or error messages by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// The crypt(3) string, for handing to the account store
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialRef(<redacted>)")
    }
}

/// One-way encoder for account credentials
#[derive(Debug, Default)]
pub struct CredentialEncoder;

impl CredentialEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self
    }

    /// Encode a plaintext secret into a stored credential representation
    ///
    /// Fails only if the underlying randomness source or hash parameters
    /// fail, which is fatal and not retryable in practice.
    pub fn encode(&self, plaintext: &str) -> Result<CredentialRef> {
        let params = Sha512Params::default();
        let hash = sha512_simple(plaintext, &params).map_err(|e| RosterError::Encoding {
            message: format!("{e:?}"),
        })?;
        Ok(CredentialRef(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_sha512_crypt() {
        let encoder = CredentialEncoder::new();
        let credential = encoder.encode("hunter2").unwrap();
        assert!(credential.as_str().starts_with("$6$"));
    }

    #[test]
    fn test_encode_salts_per_call() {
        let encoder = CredentialEncoder::new();
        let a = encoder.encode("same-secret").unwrap();
        let b = encoder.encode("same-secret").unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_encoded_credential_does_not_contain_plaintext() {
        let encoder = CredentialEncoder::new();
        let credential = encoder.encode("hunter2").unwrap();
        assert!(!credential.as_str().contains("hunter2"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let encoder = CredentialEncoder::new();
        let credential = encoder.encode("hunter2").unwrap();
        let debug = format!("{credential:?}");
        assert_eq!(debug, "CredentialRef(<redacted>)");
        assert!(!debug.contains("$6$"));
    }
}
