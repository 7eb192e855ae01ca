// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client-side decoding for the tzstats explorer.
//!
//! The explorer serves operations and blocks either as JSON objects or, in
//! table mode, as positional rows. This crate turns both into typed records,
//! decoding binary Micheline payloads (call parameters, storage, big-map
//! diffs) against contract types fetched on demand and cached per client.

pub mod client;
pub mod decode;
pub mod error;
pub mod logging;
pub mod micheline;
pub mod models;
pub mod query;
pub mod resolver;
pub mod types;

pub use client::Client;
pub use decode::{Column, ColumnPlan, DecodeOptions};
pub use error::{ClientError, DecodeError};
pub use models::{
    BigmapMeta, BigmapUpdate, BigmapValue, Block, BlockColumn, BlockId, BlockList, ContractParameters,
    ContractScript, ContractTypes, ContractValue, Op, OpColumn, OpDecoder, OpList, Script,
};
pub use query::{BlockParams, FilterMode, OpParams, Order, TableQuery};
pub use resolver::{ContractResolver, ScriptCache};
