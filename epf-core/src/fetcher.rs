// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! One-shot HTTP exchange against the remote entropy service
//!
//! A fetch drives exactly one request/response pair over a fresh connection
//! with a fresh session token. When stream encryption is engaged the body is
//! decrypted with the session key and checked against the salted SHA-256
//! fingerprint the service advertises, so a fetch either returns verified
//! plaintext or an error.

use crate::protocol::{self, HttpResponse};
use crate::stream::Transport;
use crate::token::SessionToken;
use crate::{hex, xor, Error, Result, FINGERPRINT_SALT};
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// HTTP client for one-shot entropy downloads
pub struct EntropyFetcher {
    host: String,
    port: u16,
    tls: bool,
    auth_token: String,
    stream_encrypted: bool,
    public_key: Option<Arc<RsaPublicKey>>,
}

impl EntropyFetcher {
    /// Create a fetcher for the given service endpoint.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: bool,
        auth_token: impl Into<String>,
        stream_encrypted: bool,
        public_key: Option<Arc<RsaPublicKey>>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            auth_token: auth_token.into(),
            stream_encrypted,
            public_key,
        }
    }

    /// Fetch exactly `count` verified bytes from `resource`.
    ///
    /// Opens a fresh connection and, when stream encryption is engaged,
    /// generates and wraps a fresh session key for this request only. Every
    /// failure aborts the whole exchange; the connection is released on all
    /// paths.
    pub fn fetch(&self, resource: &str, count: usize) -> Result<Vec<u8>> {
        let token = if self.stream_encrypted {
            let public_key = self.public_key.as_ref().ok_or_else(|| {
                Error::Config("stream encryption enabled without a public key".into())
            })?;
            Some(SessionToken::new(Arc::clone(public_key)))
        } else {
            None
        };
        let crypto_token = match &token {
            Some(token) => Some(token.emit()?),
            None => None,
        };

        debug!("requesting {} bytes from {}:{}{}", count, self.host, self.port, resource);

        let mut transport = Transport::connect(&self.host, self.port, self.tls)?;
        let request = protocol::build_get_request(
            resource,
            &self.host,
            &self.auth_token,
            crypto_token.as_deref(),
        );
        transport
            .write_all(request.as_bytes())
            .map_err(|e| Error::Send(e.to_string()))?;

        let response = HttpResponse::read_from(&mut transport)?;
        let code = response.status_code();
        if code != 200 {
            return Err(Error::HttpStatus(code));
        }

        let body = read_content(&mut transport, &response, token.as_ref(), count)?;
        debug!("received {} verified bytes", body.len());
        Ok(body)
    }
}

/// Read exactly `count` body bytes, decrypting and verifying when a session
/// token is present.
fn read_content(
    transport: &mut Transport,
    response: &HttpResponse,
    token: Option<&SessionToken>,
    count: usize,
) -> Result<Vec<u8>> {
    // The fingerprint must be advertised before any body byte is accepted.
    let expected = match token {
        Some(_) => Some(
            response
                .header(protocol::FINGERPRINT_HEADER)
                .ok_or(Error::MissingFingerprint)?
                .to_string(),
        ),
        None => None,
    };

    let mut buf = vec![0u8; count];
    let mut total = 0;
    while total < count {
        let n = transport
            .read(&mut buf[total..])
            .map_err(|_| Error::Truncated)?;
        if n == 0 {
            return Err(Error::Truncated);
        }
        total += n;
    }

    if let (Some(token), Some(expected)) = (token, expected) {
        xor::xor_inplace(&mut buf, token.key())?;
        if fingerprint(&buf) != expected {
            return Err(Error::FingerprintMismatch);
        }
    }

    Ok(buf)
}

/// Uppercase-hex SHA-256 over the fixed salt followed by the plaintext.
pub fn fingerprint(plaintext: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_SALT);
    hasher.update(plaintext);
    hex::encode(&hasher.finalize())
}
