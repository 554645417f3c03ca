use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::util::payload_digest;

/// Generate a fresh secp256k1 keypair.
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let secp = Secp256k1::new();
    secp.generate_keypair(&mut OsRng)
}

/// Sign a JSON payload with the given key. The payload is canonicalized and
/// hashed before signing, so structurally equal payloads sign identically.
/// Returns the DER signature as hex.
pub fn sign_payload(secret_key: &SecretKey, payload: &Value) -> String {
    let secp = Secp256k1::new();
    let message = Message::from_digest(payload_digest(payload));
    let signature = secp.sign_ecdsa(&message, secret_key);
    hex::encode(signature.serialize_der())
}

/// Verify a hex DER signature over a JSON payload against a hex compressed
/// public key. Malformed keys or signatures resolve to false, never an
/// error: inbound data is untrusted.
pub fn verify_signature(public_key_hex: &str, payload: &Value, signature_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_slice(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(&sig_bytes) else {
        return false;
    };

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(payload_digest(payload));
    secp.verify_ecdsa(&message, &signature, &public_key).is_ok()
}

/// Derive a wallet address: SHA-256 of the compressed public key bytes.
/// One-way and deterministic, so it serves as a stable identity for
/// balances and routing without exposing key structure.
pub fn derive_address(public_key_hex: &str) -> Result<String, &'static str> {
    let bytes = hex::decode(public_key_hex).map_err(|_| "invalid public key hex")?;
    let key = PublicKey::from_slice(&bytes).map_err(|_| "invalid public key bytes")?;
    Ok(address_from_key(&key))
}

/// Address for an already-parsed key.
pub fn address_from_key(public_key: &PublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key.serialize());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_then_verify_round_trip() {
        let (sk, pk) = generate_keypair();
        let payload = json!({"recipient": 25, "change": 75});
        let signature = sign_payload(&sk, &payload);
        assert!(verify_signature(&hex::encode(pk.serialize()), &payload, &signature));
    }

    #[test]
    fn verification_fails_for_different_payload() {
        let (sk, pk) = generate_keypair();
        let signature = sign_payload(&sk, &json!({"a": 1}));
        assert!(!verify_signature(
            &hex::encode(pk.serialize()),
            &json!({"a": 2}),
            &signature
        ));
    }

    #[test]
    fn verification_fails_for_foreign_key() {
        let (sk, _) = generate_keypair();
        let (_, other_pk) = generate_keypair();
        let payload = json!({"a": 1});
        let signature = sign_payload(&sk, &payload);
        assert!(!verify_signature(
            &hex::encode(other_pk.serialize()),
            &payload,
            &signature
        ));
    }

    #[test]
    fn malformed_inputs_resolve_to_false() {
        let (sk, pk) = generate_keypair();
        let payload = json!({"a": 1});
        let signature = sign_payload(&sk, &payload);
        let pk_hex = hex::encode(pk.serialize());

        assert!(!verify_signature("not-hex", &payload, &signature));
        assert!(!verify_signature("abcd", &payload, &signature));
        assert!(!verify_signature(&pk_hex, &payload, "not-hex"));
        assert!(!verify_signature(&pk_hex, &payload, "abcd"));
    }

    #[test]
    fn signature_is_order_insensitive_over_payload_keys() {
        let (sk, pk) = generate_keypair();
        let scrambled: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        let ordered = json!({"a": 1, "b": 2});
        let signature = sign_payload(&sk, &scrambled);
        assert!(verify_signature(&hex::encode(pk.serialize()), &ordered, &signature));
    }

    #[test]
    fn derive_address_is_stable() {
        let (_, pk) = generate_keypair();
        let pk_hex = hex::encode(pk.serialize());
        let first = derive_address(&pk_hex).unwrap();
        let second = derive_address(&pk_hex).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, address_from_key(&pk));
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn derive_address_rejects_garbage() {
        assert!(derive_address("zzzz").is_err());
        assert!(derive_address("abcd").is_err());
    }
}
