// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! Per-exchange session token
//!
//! Every HTTP exchange carries a freshly generated 48-byte symmetric key,
//! wrapped under the service's RSA public key with PKCS#1 v1.5 padding and
//! transported as uppercase hex. The key never leaves the process in
//! cleartext and is zeroized on drop.

use crate::{hex, Error, Result, SESSION_KEY_BYTES};
use rand::Rng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use std::sync::Arc;
use zeroize::Zeroize;

/// Shortest acceptable wire form of a wrapped key (hex chars)
pub const TOKEN_HEX_MIN: usize = 10;

/// Longest acceptable wire form of a wrapped key (hex chars)
pub const TOKEN_HEX_MAX: usize = 600;

/// Symmetric session key for one HTTP exchange
pub struct SessionToken {
    key: [u8; SESSION_KEY_BYTES],
    public_key: Arc<RsaPublicKey>,
}

impl SessionToken {
    /// Create a token with a freshly sampled key.
    pub fn new(public_key: Arc<RsaPublicKey>) -> Self {
        let mut key = [0u8; SESSION_KEY_BYTES];
        rand::thread_rng().fill(&mut key[..]);
        Self { key, public_key }
    }

    /// Wrap the key under the service public key and return its wire form.
    pub fn emit(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        let ciphertext = self
            .public_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, &self.key)
            .map_err(|e| Error::CryptoPrimitive(e.to_string()))?;
        Ok(hex::encode(&ciphertext))
    }

    /// Unwrap a wire-form token into this key slot.
    ///
    /// Only meaningful on a peer holding the private key; retained here for
    /// symmetry and testing. Case is folded at this boundary, so both the
    /// uppercase wire form and its lowercase spelling are accepted.
    pub fn accept(&mut self, private_key: &RsaPrivateKey, text: &str) -> Result<()> {
        if text.len() < TOKEN_HEX_MIN || text.len() > TOKEN_HEX_MAX {
            return Err(Error::MalformedHex);
        }
        let ciphertext = hex::decode(&text.to_lowercase())?;
        let mut plaintext = private_key
            .decrypt(Pkcs1v15Encrypt, &ciphertext)
            .map_err(|e| Error::CryptoPrimitive(e.to_string()))?;
        if plaintext.len() != SESSION_KEY_BYTES {
            plaintext.zeroize();
            return Err(Error::CryptoPrimitive(format!(
                "unwrapped key is {} bytes, expected {}",
                plaintext.len(),
                SESSION_KEY_BYTES
            )));
        }
        self.key.copy_from_slice(&plaintext);
        plaintext.zeroize();
        Ok(())
    }

    /// The raw session key.
    pub fn key(&self) -> &[u8; SESSION_KEY_BYTES] {
        &self.key
    }

    /// Length of the session key in bytes.
    pub const fn key_len() -> usize {
        SESSION_KEY_BYTES
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs
        f.debug_struct("SessionToken").finish_non_exhaustive()
    }
}

/// Load the service's RSA public key from a PEM file.
///
/// Accepts the PKCS#1 `RSA PUBLIC KEY` form with an SPKI `PUBLIC KEY`
/// fallback. Failures are configuration errors surfaced at startup.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey> {
    let pem = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("could not read public key file {}: {}", path.display(), e))
    })?;

    RsaPublicKey::from_pkcs1_pem(&pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(&pem))
        .map_err(|e| {
            Error::Config(format!(
                "could not use public key file {}: {}",
                path.display(),
                e
            ))
        })
}
