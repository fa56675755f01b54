// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random identifiers and HMAC tags.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

use crate::error::AppError;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

fn random_bytes<const N: usize>() -> Result<[u8; N], AppError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG unavailable")))?;
    Ok(buf)
}

/// 256-bit random token, URL-safe base64 without padding.
pub fn random_token() -> Result<String, AppError> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes::<32>()?))
}

/// 128-bit random identifier, lowercase hex.
pub fn random_id() -> Result<String, AppError> {
    Ok(hex::encode(random_bytes::<16>()?))
}

/// Hex HMAC-SHA256 of `payload` under `key`.
pub fn sign(key: &[u8], payload: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex HMAC tag in constant time.
pub fn verify(key: &[u8], payload: &str, tag_hex: &str) -> bool {
    let Ok(tag) = hex::decode(tag_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = random_token().unwrap();
        let b = random_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[test]
    fn ids_are_32_hex_chars() {
        let id = random_id().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sign_then_verify() {
        let key = b"secret_key";
        let tag = sign(key, "payload").unwrap();
        assert!(verify(key, "payload", &tag));
        assert!(!verify(key, "payload2", &tag));
        assert!(!verify(b"wrong_key", "payload", &tag));
        assert!(!verify(key, "payload", "zz-not-hex"));
    }
}
