//! Properties-file configuration for the feeder daemon
//!
//! The daemon is configured from a `key = value` properties file. Parsing
//! preserves the historical rules of that format: `#`/`;` comment lines,
//! trailing-only key trimming, and silent omission of entries without a
//! value. The typed [`Config`] validates every recognized property and is
//! immutable after load.

use crate::{Error, Result, MAX_REQUEST_BYTES};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HOST_KEY: &str = "entropy.host";
pub const PORT_KEY: &str = "entropy.port";
pub const RESOURCE_KEY: &str = "entropy.resource";
pub const STREAM_ENCRYPT_KEY: &str = "entropy.resource.bytestream.encrypt";
pub const PUBKEY_FILE_KEY: &str = "entropy.resource.bytestream.encrypt.pubkey.rsa.file";
pub const REQUEST_BYTES_KEY: &str = "entropy.request.byte.count";
pub const SSL_ENABLED_KEY: &str = "entropy.host.ssl.enabled";
pub const AUTH_TOKEN_KEY: &str = "entropy.auth.token";
pub const DOWNLOAD_PERIOD_KEY: &str = "entropy.download.thread.period.usecs";
pub const FEEDER_PERIOD_KEY: &str = "entropy.feeder.thread.period.usecs";
pub const MAX_QUEUE_BYTES_KEY: &str = "entropy.feeder.max.deq.size.bytes";

fn is_lead_space(c: char) -> bool {
    matches!(c, ' ' | '\x0C' | '\t' | '\x0B')
}

fn is_trim_space(c: char) -> bool {
    matches!(c, ' ' | '\x0C' | '\t' | '\x0B' | '\r' | '\n')
}

/// Raw name/value pairs from a properties file
#[derive(Debug, Default)]
pub struct Properties {
    map: HashMap<String, String>,
}

impl Properties {
    /// Load properties from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "could not load configuration from {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse properties text, one `key = value` entry per line.
    ///
    /// Lines whose first non-whitespace character is `#` or `;` are
    /// comments. Keys are trimmed of trailing whitespace only (embedded
    /// whitespace is preserved); values are trimmed on both sides. Lines
    /// with no `=`, no key, or nothing but whitespace after the `=` define
    /// no property. Later duplicates override earlier ones.
    pub fn parse(text: &str) -> Self {
        let mut map = HashMap::new();

        for line in text.lines() {
            let begin = match line.find(|c| !is_lead_space(c)) {
                Some(i) => i,
                None => continue,
            };
            if matches!(line[begin..].chars().next(), Some('#') | Some(';')) {
                continue;
            }

            let eq_idx = match line[begin..].find('=') {
                Some(i) => begin + i,
                None => continue,
            };
            let key = line[begin..eq_idx].trim_end_matches(is_trim_space);
            if key.is_empty() {
                continue;
            }
            let value = line[eq_idx + 1..].trim_matches(is_trim_space);
            if value.is_empty() {
                continue;
            }

            map.insert(key.to_string(), value.to_string());
        }

        Self { map }
    }

    /// Look up a property value by its exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Validated feeder configuration, immutable after load
#[derive(Debug, Clone)]
pub struct Config {
    /// DNS name of the remote entropy service
    pub host: String,
    /// TCP port of the service
    pub port: u16,
    /// HTTP resource path; the request byte count is appended as a decimal
    /// suffix when building the request
    pub resource: String,
    /// Bytes requested per HTTP exchange, clamped to [`MAX_REQUEST_BYTES`]
    pub request_bytes: u32,
    /// Wrap the connection in TLS
    pub ssl_enabled: bool,
    /// Authentication token header value; empty means no header
    pub auth_token: String,
    /// Engage session-key wrapping and response verification
    pub stream_encrypted: bool,
    /// PEM file with the service RSA public key; required when
    /// `stream_encrypted`
    pub pubkey_path: Option<PathBuf>,
    /// Sleep between downloader heartbeats (microseconds)
    pub download_period_us: u32,
    /// Sleep between feeder heartbeats (microseconds)
    pub feeder_period_us: u32,
    /// High watermark for each of the two byte queues
    pub max_queue_bytes: u32,
}

impl Config {
    /// Load and validate configuration from a properties file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_properties(&Properties::load(path)?)
    }

    /// Build a validated configuration from raw properties.
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let host = require(props, HOST_KEY)?.to_string();
        let port = match require_integer(props, PORT_KEY)? {
            p @ 1..=65535 => p as u16,
            _ => {
                return Err(Error::Config(format!("{} is out of range", PORT_KEY)));
            }
        };
        let resource = require(props, RESOURCE_KEY)?.to_string();

        let stream_encrypted = require_boolean(props, STREAM_ENCRYPT_KEY)?;
        let pubkey_path = if stream_encrypted {
            Some(PathBuf::from(require(props, PUBKEY_FILE_KEY)?))
        } else {
            None
        };

        let request_bytes = match require_integer(props, REQUEST_BYTES_KEY)? {
            n if n < 1 => {
                return Err(Error::Config(format!("{} is out of range", REQUEST_BYTES_KEY)));
            }
            n => (n as u64).min(MAX_REQUEST_BYTES as u64) as u32,
        };

        let ssl_enabled = require_boolean(props, SSL_ENABLED_KEY)?;
        let auth_token = props.get(AUTH_TOKEN_KEY).unwrap_or("").to_string();

        let download_period_us = require_period(props, DOWNLOAD_PERIOD_KEY)?;
        let feeder_period_us = require_period(props, FEEDER_PERIOD_KEY)?;

        let max_queue_bytes = match require_integer(props, MAX_QUEUE_BYTES_KEY)? {
            n if n < 1 || n > u32::MAX as i64 => {
                return Err(Error::Config(format!("{} is out of range", MAX_QUEUE_BYTES_KEY)));
            }
            n => n as u32,
        };

        Ok(Self {
            host,
            port,
            resource,
            request_bytes,
            ssl_enabled,
            auth_token,
            stream_encrypted,
            pubkey_path,
            download_period_us,
            feeder_period_us,
            max_queue_bytes,
        })
    }

    pub fn download_period(&self) -> Duration {
        Duration::from_micros(self.download_period_us as u64)
    }

    pub fn feeder_period(&self) -> Duration {
        Duration::from_micros(self.feeder_period_us as u64)
    }
}

fn require<'a>(props: &'a Properties, key: &str) -> Result<&'a str> {
    props
        .get(key)
        .ok_or_else(|| Error::Config(format!("could not find property {}", key)))
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c == '-' || c.is_ascii_digit())
}

fn require_integer(props: &Properties, key: &str) -> Result<i64> {
    let value = require(props, key)?;
    if !is_integer(value) {
        return Err(Error::Config(format!("{} is not an integer number", key)));
    }
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} is out of range", key)))
}

fn require_boolean(props: &Properties, key: &str) -> Result<bool> {
    match require(props, key)? {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::Config(format!("{} is not a boolean", key))),
    }
}

fn require_period(props: &Properties, key: &str) -> Result<u32> {
    match require_integer(props, key)? {
        n if n < 0 || n > u32::MAX as i64 => {
            Err(Error::Config(format!("{} is out of range", key)))
        }
        n => Ok(n as u32),
    }
}
