// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Column-driven decoding of table-mode rows.
//!
//! Table responses are arrays of positional values whose meaning is given by
//! the column list sent with the query. A [`ColumnPlan`] resolves that list to
//! typed columns once per batch; record decoders then walk each row through
//! the plan and parse values with the scalar rules in this module.

mod options;
mod plan;
mod scalar;

pub use options::DecodeOptions;
pub use plan::{Column, ColumnPlan};
pub(crate) use plan::columns;
pub(crate) use scalar::{
    parse_address, parse_bool, parse_f64, parse_hash, parse_hex, parse_i32, parse_i64, parse_str,
    parse_time, parse_u64,
};
