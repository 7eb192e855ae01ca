use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) const BLOCK_HASH_PREFIX: [u8; 2] = [1, 52];
pub(crate) const OP_HASH_PREFIX: [u8; 2] = [5, 116];
pub(crate) const EXPR_HASH_PREFIX: [u8; 4] = [13, 44, 64, 27];

/// Base58check-encode `payload` behind a Tezos version prefix.
pub(crate) fn encode_check(prefix: &[u8], payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(prefix.len() + payload.len());
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(payload);
    bs58::encode(buf).with_check().into_string()
}

/// Decode a base58check string and strip the expected version prefix.
pub(crate) fn decode_check(
    kind: &'static str,
    s: &str,
    prefix: &[u8],
    len: usize,
) -> Result<Vec<u8>, DecodeError> {
    let invalid = |reason: String| DecodeError::invalid(kind, s, reason);
    let data = bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;
    if !data.starts_with(prefix) {
        return Err(invalid("unexpected version prefix".to_string()));
    }
    if data.len() != prefix.len() + len {
        return Err(invalid(format!(
            "expected {} payload bytes, got {}",
            len,
            data.len().saturating_sub(prefix.len())
        )));
    }
    Ok(data[prefix.len()..].to_vec())
}

macro_rules! base58_hash {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const LEN: usize = 32;

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
                let fixed: [u8; 32] = bytes.try_into().map_err(|_| {
                    DecodeError::invalid(
                        $kind,
                        hex::encode(bytes),
                        format!("expected 32 bytes, got {}", bytes.len()),
                    )
                })?;
                Ok(Self(fixed))
            }

            pub fn parse(s: &str) -> Result<Self, DecodeError> {
                let bytes = decode_check($kind, s, &$prefix, Self::LEN)?;
                Self::from_slice(&bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encode_check(&$prefix, &self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

base58_hash!(
    /// Block hash, base58 `B...`
    BlockHash,
    "block hash",
    BLOCK_HASH_PREFIX
);

base58_hash!(
    /// Operation group hash, base58 `o...`
    OpHash,
    "operation hash",
    OP_HASH_PREFIX
);

base58_hash!(
    /// Script expression hash used as big-map key hash, base58 `expr...`
    ExprHash,
    "expression hash",
    EXPR_HASH_PREFIX
);
