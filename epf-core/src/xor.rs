//! Repeating-key XOR stream cipher
//!
//! The cipher is involutive: applying it twice with the same key restores
//! the original buffer.

use crate::{Error, Result};

/// XOR every byte of `buf` with `key[i mod key.len()]`, in place.
///
/// Defined for buffers of at least two bytes and non-empty keys; anything
/// shorter fails without touching the buffer.
pub fn xor_inplace(buf: &mut [u8], key: &[u8]) -> Result<()> {
    if buf.len() < 2 {
        return Err(Error::CryptoPrimitive(
            "buffer too short for stream cipher".into(),
        ));
    }
    if key.is_empty() {
        return Err(Error::CryptoPrimitive("empty stream cipher key".into()));
    }

    for (b, k) in buf.iter_mut().zip(key.iter().cycle()) {
        *b ^= k;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let mut buf = [0x41, 0x42, 0x43, 0x44];
        let key = [0xAA, 0x55];

        xor_inplace(&mut buf, &key).unwrap();
        assert_eq!(buf, [0xEB, 0x17, 0xE9, 0x11]);

        xor_inplace(&mut buf, &key).unwrap();
        assert_eq!(buf, [0x41, 0x42, 0x43, 0x44]);
    }

    #[test]
    fn test_key_wraps_around() {
        let mut buf = [0xFF; 5];
        xor_inplace(&mut buf, &[0x0F, 0xF0]).unwrap();
        assert_eq!(buf, [0xF0, 0x0F, 0xF0, 0x0F, 0xF0]);
    }

    #[test]
    fn test_involution() {
        let original: Vec<u8> = (0..=255).collect();
        let key = [0x13, 0x37, 0x42];

        let mut buf = original.clone();
        xor_inplace(&mut buf, &key).unwrap();
        assert_ne!(buf, original);
        xor_inplace(&mut buf, &key).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn test_rejects_short_buffer() {
        let mut one = [0x01];
        assert!(xor_inplace(&mut one, &[0xAA]).is_err());
        assert_eq!(one, [0x01]);

        let mut empty: [u8; 0] = [];
        assert!(xor_inplace(&mut empty, &[0xAA]).is_err());
    }

    #[test]
    fn test_rejects_empty_key() {
        let mut buf = [0x01, 0x02];
        assert!(xor_inplace(&mut buf, &[]).is_err());
        assert_eq!(buf, [0x01, 0x02]);
    }
}
