//! Bytes/ASCII-hex codec for the token wire format
//!
//! The encoder emits uppercase digits while the decoder accepts lowercase
//! only. The asymmetry is part of the wire contract and must not be relaxed.

use crate::{Error, Result};

/// Encode bytes as uppercase hexadecimal text.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

/// Decode hexadecimal text into bytes.
///
/// The input length must be even and every digit must be `0-9` or lowercase
/// `a-f`; anything else fails with [`Error::MalformedHex`].
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let raw = text.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(Error::MalformedHex);
    }

    let mut out = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let high = digit_value(pair[0])?;
        let low = digit_value(pair[1])?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

fn digit_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(Error::MalformedHex),
    }
}
