//! Base58 rendering for keys, signatures and chain ids found in contract data.

use super::hash::encode_check;
use crate::error::DecodeError;

const KEY_KIND: &str = "public key";

/// Encode a tagged binary public key (`00` ed25519, `01` secp256k1, `02` p256, `03` bls).
pub fn encode_public_key(data: &[u8]) -> Result<String, DecodeError> {
    let (prefix, len): (&[u8], usize) = match data.first() {
        Some(0) => (&[13, 15, 37, 217], 32),
        Some(1) => (&[3, 254, 226, 86], 33),
        Some(2) => (&[3, 178, 139, 127], 33),
        Some(3) => (&[6, 149, 135, 204], 48),
        _ => {
            return Err(DecodeError::invalid(KEY_KIND, hex::encode(data), "unknown key tag"));
        }
    };
    if data.len() != len + 1 {
        return Err(DecodeError::invalid(
            KEY_KIND,
            hex::encode(data),
            format!("expected {} key bytes, got {}", len, data.len() - 1),
        ));
    }
    Ok(encode_check(prefix, &data[1..]))
}

/// Encode a 64-byte generic signature (`sig...`).
pub fn encode_signature(data: &[u8]) -> Result<String, DecodeError> {
    if data.len() != 64 {
        return Err(DecodeError::invalid(
            "signature",
            hex::encode(data),
            format!("expected 64 bytes, got {}", data.len()),
        ));
    }
    Ok(encode_check(&[4, 130, 43], data))
}

/// Encode a 4-byte chain id (`Net...`).
pub fn encode_chain_id(data: &[u8]) -> Result<String, DecodeError> {
    if data.len() != 4 {
        return Err(DecodeError::invalid(
            "chain id",
            hex::encode(data),
            format!("expected 4 bytes, got {}", data.len()),
        ));
    }
    Ok(encode_check(&[87, 82, 0], data))
}
