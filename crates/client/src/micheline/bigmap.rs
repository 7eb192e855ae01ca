// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Big-map diff records as packed by the explorer's table API.
//!
//! Each record starts with an action byte and the big-map id (`i64`, big
//! endian), followed by an action-specific body:
//!
//! | action     | body                                   |
//! |------------|----------------------------------------|
//! | 0 update   | key hash (32), key prim, value prim    |
//! | 1 remove   | key hash (32), key prim                |
//! | 2 alloc    | key type prim, value type prim         |
//! | 3 copy     | source id (`i64`), destination id (`i64`) |

use super::prim::{Prim, Reader};
use crate::error::DecodeError;
use crate::types::ExprHash;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    #[default]
    Update,
    Remove,
    Alloc,
    Copy,
}

impl DiffAction {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Update),
            1 => Some(Self::Remove),
            2 => Some(Self::Alloc),
            3 => Some(Self::Copy),
            _ => None,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Update => 0,
            Self::Remove => 1,
            Self::Alloc => 2,
            Self::Copy => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Alloc => "alloc",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded big-map diff record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BigmapEvent {
    pub action: DiffAction,
    pub id: i64,
    /// Absent for alloc/copy and for the all-zero hash.
    pub key_hash: Option<ExprHash>,
    /// Absent for alloc/copy and for the empty-big-map placeholder key.
    pub key: Option<Prim>,
    pub value: Option<Prim>,
    pub key_type: Option<Prim>,
    pub value_type: Option<Prim>,
    pub source_id: Option<i64>,
    pub dest_id: Option<i64>,
}

impl BigmapEvent {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.action.tag());
        out.extend_from_slice(&self.id.to_be_bytes());
        let placeholder = || Prim::nullary(super::OpCode::I_EMPTY_BIG_MAP);
        match self.action {
            DiffAction::Update | DiffAction::Remove => {
                let hash = self.key_hash.unwrap_or_default();
                out.extend_from_slice(hash.as_bytes());
                self.key.clone().unwrap_or_else(placeholder).encode(out);
                if self.action == DiffAction::Update {
                    self.value.clone().unwrap_or_else(placeholder).encode(out);
                }
            }
            DiffAction::Alloc => {
                for typ in [&self.key_type, &self.value_type] {
                    typ.clone().unwrap_or_else(placeholder).encode(out);
                }
            }
            DiffAction::Copy => {
                out.extend_from_slice(&self.source_id.unwrap_or_default().to_be_bytes());
                out.extend_from_slice(&self.dest_id.unwrap_or_default().to_be_bytes());
            }
        }
    }
}

pub fn decode_bigmap_events(data: &[u8]) -> Result<Vec<BigmapEvent>, DecodeError> {
    let mut r = Reader::new(data);
    let mut events = Vec::new();
    while !r.is_empty() {
        let offset = r.position();
        let tag = r.u8()?;
        let action = DiffAction::from_tag(tag)
            .ok_or_else(|| DecodeError::binary(offset, format!("unknown big-map action {tag}")))?;
        let mut ev = BigmapEvent {
            action,
            id: r.i64_be()?,
            ..Default::default()
        };
        match action {
            DiffAction::Update | DiffAction::Remove => {
                let hash_offset = r.position();
                let hash = ExprHash::from_slice(r.take(ExprHash::LEN)?)
                    .map_err(|e| DecodeError::binary(hash_offset, e.to_string()))?;
                ev.key_hash = (!hash.is_zero()).then_some(hash);
                let key = Prim::decode(&mut r)?;
                ev.key = (!key.is_empty_bigmap()).then_some(key);
                if action == DiffAction::Update {
                    ev.value = Some(Prim::decode(&mut r)?);
                }
            }
            DiffAction::Alloc => {
                ev.key_type = Some(Prim::decode(&mut r)?);
                ev.value_type = Some(Prim::decode(&mut r)?);
            }
            DiffAction::Copy => {
                ev.source_id = Some(r.i64_be()?);
                ev.dest_id = Some(r.i64_be()?);
            }
        }
        events.push(ev);
    }
    Ok(events)
}

pub fn encode_bigmap_events(events: &[BigmapEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for ev in events {
        ev.encode(&mut out);
    }
    out
}
