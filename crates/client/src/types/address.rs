use super::hash::{decode_check, encode_check};
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KIND: &str = "address";

/// Address families known to the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressType {
    Ed25519,
    Secp256k1,
    P256,
    Bls12_381,
    Contract,
    TxRollup,
    SmartRollup,
}

impl AddressType {
    const ALL: [AddressType; 7] = [
        AddressType::Ed25519,
        AddressType::Secp256k1,
        AddressType::P256,
        AddressType::Bls12_381,
        AddressType::Contract,
        AddressType::TxRollup,
        AddressType::SmartRollup,
    ];

    pub fn text_prefix(self) -> &'static str {
        match self {
            AddressType::Ed25519 => "tz1",
            AddressType::Secp256k1 => "tz2",
            AddressType::P256 => "tz3",
            AddressType::Bls12_381 => "tz4",
            AddressType::Contract => "KT1",
            AddressType::TxRollup => "txr1",
            AddressType::SmartRollup => "sr1",
        }
    }

    fn version(self) -> &'static [u8] {
        match self {
            AddressType::Ed25519 => &[6, 161, 159],
            AddressType::Secp256k1 => &[6, 161, 161],
            AddressType::P256 => &[6, 161, 164],
            AddressType::Bls12_381 => &[6, 161, 166],
            AddressType::Contract => &[2, 90, 121],
            AddressType::TxRollup => &[1, 128, 120, 31],
            AddressType::SmartRollup => &[6, 124, 117],
        }
    }

    fn from_curve_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(AddressType::Ed25519),
            1 => Some(AddressType::Secp256k1),
            2 => Some(AddressType::P256),
            3 => Some(AddressType::Bls12_381),
            _ => None,
        }
    }

    fn curve_tag(self) -> Option<u8> {
        match self {
            AddressType::Ed25519 => Some(0),
            AddressType::Secp256k1 => Some(1),
            AddressType::P256 => Some(2),
            AddressType::Bls12_381 => Some(3),
            _ => None,
        }
    }
}

/// A 20-byte hashed account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    kind: AddressType,
    hash: [u8; 20],
}

impl Address {
    pub const BINARY_LEN: usize = 22;

    pub fn new(kind: AddressType, hash: [u8; 20]) -> Self {
        Self { kind, hash }
    }

    pub fn kind(&self) -> AddressType {
        self.kind
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }

    pub fn is_contract(&self) -> bool {
        self.kind == AddressType::Contract
    }

    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        let kind = AddressType::ALL
            .into_iter()
            .find(|k| s.starts_with(k.text_prefix()))
            .ok_or_else(|| DecodeError::invalid(KIND, s, "unknown address prefix"))?;
        let bytes = decode_check(KIND, s, kind.version(), 20)?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes);
        Ok(Self { kind, hash })
    }

    /// Decode the 22-byte binary form used inside contract data, returning
    /// any trailing entrypoint suffix.
    pub fn from_binary(data: &[u8]) -> Result<(Self, Option<String>), DecodeError> {
        let invalid = |reason: &str| DecodeError::invalid(KIND, hex::encode(data), reason);
        if data.len() < Self::BINARY_LEN {
            return Err(invalid("short binary address"));
        }
        let mut hash = [0u8; 20];
        let kind = match data[0] {
            0 => {
                hash.copy_from_slice(&data[2..22]);
                AddressType::from_curve_tag(data[1]).ok_or_else(|| invalid("unknown curve tag"))?
            }
            tag @ 1..=3 => {
                hash.copy_from_slice(&data[1..21]);
                match tag {
                    1 => AddressType::Contract,
                    2 => AddressType::TxRollup,
                    _ => AddressType::SmartRollup,
                }
            }
            _ => return Err(invalid("unknown address tag")),
        };
        let entrypoint = match &data[Self::BINARY_LEN..] {
            [] => None,
            rest => Some(
                String::from_utf8(rest.to_vec()).map_err(|_| invalid("entrypoint is not UTF-8"))?,
            ),
        };
        Ok((Self { kind, hash }, entrypoint))
    }

    /// Decode the 21-byte tagged public key hash form (implicit accounts only).
    pub fn from_key_hash_binary(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() != 21 {
            return Err(DecodeError::invalid(
                KIND,
                hex::encode(data),
                format!("expected 21 bytes key hash, got {}", data.len()),
            ));
        }
        let kind = AddressType::from_curve_tag(data[0])
            .ok_or_else(|| DecodeError::invalid(KIND, hex::encode(data), "unknown curve tag"))?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[1..]);
        Ok(Self { kind, hash })
    }

    pub fn to_binary(&self) -> [u8; 22] {
        let mut out = [0u8; 22];
        match self.kind.curve_tag() {
            Some(curve) => {
                out[0] = 0;
                out[1] = curve;
                out[2..].copy_from_slice(&self.hash);
            }
            None => {
                out[0] = match self.kind {
                    AddressType::Contract => 1,
                    AddressType::TxRollup => 2,
                    _ => 3,
                };
                out[1..21].copy_from_slice(&self.hash);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_check(self.kind.version(), &self.hash))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
