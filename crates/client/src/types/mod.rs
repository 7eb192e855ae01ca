// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Domain value types for explorer records
//!
//! Hashes and addresses are validated base58check newtypes with controlled
//! string representation; enumerations are fail-soft.

pub mod address;
pub mod enums;
pub mod hash;
pub mod key;

pub use address::{Address, AddressType};
pub use enums::{OpStatus, OpType, VotingPeriodKind};
pub use hash::{BlockHash, ExprHash, OpHash};
