use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub(crate) type HmacSha256 = Hmac<Sha256>;

pub(crate) fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take any size key")
}

pub(crate) fn encode_digest(mac: HmacSha256) -> String {
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}

/// Base64-encoded HMAC-SHA256 digest of `body`, the form the platform sends
/// in its signature header and expects on outbound verification.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(body);
    encode_digest(mac)
}

/// Compares the computed digest against the reference digest from the
/// signature header. The comparison is over the encoded strings, byte for
/// byte and case-sensitive.
pub fn verify(secret: &str, body: &[u8], expected: &str) -> bool {
    digest_matches(&sign(secret, body), expected)
}

pub(crate) fn digest_matches(computed: &str, expected: &str) -> bool {
    constant_time_eq(computed.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
