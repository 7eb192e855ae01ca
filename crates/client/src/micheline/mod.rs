// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Micheline: the binary and JSON encoding of contract code and data.

mod bigmap;
mod opcode;
mod params;
mod prim;
mod types;
mod value;

pub use bigmap::{BigmapEvent, DiffAction, decode_bigmap_events, encode_bigmap_events};
pub use opcode::OpCode;
pub use params::Parameters;
pub use prim::Prim;
pub use types::{Entrypoint, Entrypoints, Type, Typedef};
pub use value::{OnError, Value};
