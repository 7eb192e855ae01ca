// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contract type resolution and the per-client script cache.

use crate::error::ClientError;
use crate::models::ContractTypes;
use crate::types::Address;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Source of contract type information for decoding contract calls.
///
/// Implementations return [`ClientError::NotFound`] for contracts they cannot
/// describe; callers treat that as "decode untyped". Any other error aborts
/// the batch being decoded.
pub trait ContractResolver {
    fn resolve(
        &self,
        address: &Address,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Arc<ContractTypes>, ClientError>> + Send;
}

/// Contract types by address.
///
/// Entries are never invalidated. Concurrent misses for the same address may
/// both fetch; the last insert wins.
#[derive(Debug, Default)]
pub struct ScriptCache {
    entries: RwLock<HashMap<Address, Arc<ContractTypes>>>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<Arc<ContractTypes>> {
        let entries = self.entries.read().ok()?;
        entries.get(address).cloned()
    }

    pub fn insert(&self, address: Address, types: Arc<ContractTypes>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(address, types);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// A cache on its own resolves only what was inserted up front.
impl ContractResolver for ScriptCache {
    async fn resolve(
        &self,
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<Arc<ContractTypes>, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        self.get(address)
            .ok_or_else(|| ClientError::NotFound(format!("contract {address}")))
    }
}
