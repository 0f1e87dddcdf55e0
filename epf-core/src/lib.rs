// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! EPF Core Library
//!
//! This crate provides the foundational types and pipeline for the entropy
//! pool feeder, a privileged daemon that keeps the Linux kernel entropy pool
//! topped up with true random bytes retrieved from a remote entropy service
//! over HTTP(S).
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `hex`: Bytes/ASCII-hex codec used on the token wire format
//! - `xor`: Repeating-key stream cipher over a byte buffer
//! - `token`: Per-request session key, wrapped under the service public key
//! - `protocol`: HTTP/1.0 request formatting and response header parsing
//! - `stream`: Transport polymorphism over plain TCP and TLS
//! - `fetcher`: One-shot HTTP exchange with verified body read
//! - `queue`: FIFO byte queues between the downloader and the feeder
//! - `kernel`: Privileged interface to the kernel entropy pool
//! - `pipeline`: Shared state plus the downloader and feeder loops
//! - `config`: Properties-file configuration with validation
//! - `error`: Unified error types
//!
//! # Design Principles
//!
//! 1. **Integrity first**: no byte reaches the kernel pool unless its
//!    response passed fingerprint verification
//! 2. **Scoped ownership**: sockets, TLS sessions, and the pool descriptor
//!    are released on every exit path by drop
//! 3. **Testability**: the kernel sink is a trait seam, the exchange runs
//!    against any `Read + Write` transport

pub mod config;
pub mod error;
pub mod fetcher;
pub mod hex;
pub mod kernel;
pub mod metrics;
pub mod pipeline;
pub mod protocol;
pub mod queue;
pub mod stream;
pub mod token;
pub mod xor;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard cap on bytes requested per HTTP exchange
pub const MAX_REQUEST_BYTES: u32 = 10_000;

/// Kernel entropy pools larger than this are clamped (bytes)
pub const MAX_POOL_BYTES: usize = 64 * 1024;

/// Size of the per-exchange symmetric session key
pub const SESSION_KEY_BYTES: usize = 48;

/// Fixed salt prepended to the response body before fingerprinting
pub const FINGERPRINT_SALT: &[u8] = b"2093457209837";
