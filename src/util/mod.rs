use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value deterministically. `serde_json` keeps object keys
/// in sorted order (BTreeMap-backed maps), so equal values always produce
/// the same string regardless of how they were built or received.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(value).expect("JSON values are always serializable")
}

/// SHA-256 over a set of JSON values.
///
/// Each value is canonicalized, the resulting strings are sorted and joined,
/// and the concatenation is hashed. Sorting makes the digest insensitive to
/// argument order, so independently built but equivalent payloads hash the
/// same on every node.
pub fn crypto_hash(values: &[Value]) -> String {
    let mut parts: Vec<String> = values.iter().map(canonical_json).collect();
    parts.sort();

    let mut hasher = Sha256::new();
    hasher.update(parts.concat().as_bytes());
    hex::encode(hasher.finalize())
}

/// SHA-256 digest of a single canonicalized JSON value, as raw bytes.
/// Used as the message for ECDSA signing and verification.
pub fn payload_digest(value: &Value) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
