// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! Error types for the entropy pool feeder
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error
//! handling. Exchange-level errors are transient (the downloader backs off
//! and retries); kernel and shared-state errors are fatal.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for feeder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is missing, malformed, or inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Host name resolution failed
    #[error("could not resolve host '{0}'")]
    Resolve(String),

    /// TCP connection to the remote service failed
    #[error("could not connect to remote host: {0}")]
    Connect(String),

    /// TLS client session could not be established
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// Request bytes could not be written in full
    #[error("could not send request: {0}")]
    Send(String),

    /// A response header line exceeded the fixed line buffer
    #[error("response header line exceeds {0} bytes")]
    HeaderOverflow(usize),

    /// Response headers could not be read or ended prematurely
    #[error("malformed HTTP response headers")]
    MalformedHeader,

    /// Remote service answered with a non-200 status
    #[error("unexpected HTTP status code {0}")]
    HttpStatus(u16),

    /// Response body ended before the requested byte count
    #[error("incomplete HTTP response body")]
    Truncated,

    /// Hex input with invalid length or digits
    #[error("malformed hex input")]
    MalformedHex,

    /// An underlying cryptographic primitive rejected its input
    #[error("cryptographic operation failed: {0}")]
    CryptoPrimitive(String),

    /// Encrypted response carried no byte stream fingerprint
    #[error("missing byte stream fingerprint")]
    MissingFingerprint,

    /// Response body did not match its advertised fingerprint
    #[error("byte stream fingerprint mismatch")]
    FingerprintMismatch,

    /// Shared queue mutex was poisoned by a panicking thread
    #[error("shared state mutex poisoned")]
    MutexPoisoned,

    /// Kernel entropy device could not be opened
    #[error("cannot open kernel entropy device: {0}")]
    KernelOpen(String),

    /// Kernel entropy count could not be queried
    #[error("cannot query kernel entropy count: {0}")]
    KernelQuery(String),

    /// Entropy could not be injected into the kernel pool
    #[error("cannot add entropy to the kernel pool: {0}")]
    KernelInject(String),
}

impl Error {
    /// Check if the error is local to a single HTTP exchange.
    ///
    /// Transient errors abort the current exchange and trigger the fixed
    /// back-off; everything else terminates both pipeline tasks.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Resolve(_)
                | Error::Connect(_)
                | Error::TlsHandshake(_)
                | Error::Send(_)
                | Error::HeaderOverflow(_)
                | Error::MalformedHeader
                | Error::HttpStatus(_)
                | Error::Truncated
                | Error::MalformedHex
                | Error::CryptoPrimitive(_)
                | Error::MissingFingerprint
                | Error::FingerprintMismatch
        )
    }
}
