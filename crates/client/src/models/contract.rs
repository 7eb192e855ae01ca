// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contract data attached to operations, and contract scripts as type sources.

use crate::micheline::{DiffAction, Entrypoints, OpCode, Prim, Type, Typedef};
use crate::types::{Address, ExprHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};

/// A decoded contract value: the projected form, the primitive tree, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prim: Option<Prim>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractParameters {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entrypoint: String,
    #[serde(flatten)]
    pub value: ContractValue,
}

/// Where and when a big-map entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigmapMeta {
    pub contract: Option<Address>,
    pub bigmap_id: i64,
    pub time: DateTime<Utc>,
    pub height: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BigmapValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ExprHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BigmapMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prim: Option<Prim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_prim: Option<Prim>,
}

/// One big-map diff entry of an operation.
///
/// `alloc` and `copy` carry type information and ids only; `update` and
/// `remove` carry the key (and for `update`, the value) in the flattened
/// [`BigmapValue`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BigmapUpdate {
    #[serde(flatten)]
    pub entry: BigmapValue,
    pub action: DiffAction,
    pub bigmap_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<Typedef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Typedef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type_prim: Option<Prim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type_prim: Option<Prim>,
    #[serde(default, rename = "source_big_map", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(default, rename = "destination_big_map", skip_serializing_if = "Option::is_none")]
    pub dest_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub code: Vec<Prim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Prim>,
}

impl Script {
    fn section(&self, op: OpCode) -> Option<&Prim> {
        self.code
            .iter()
            .find(|p| p.is(op))
            .and_then(|p| p.args().first())
    }

    pub fn param_type(&self) -> Option<Type> {
        self.section(OpCode::K_PARAMETER).cloned().map(Type::new)
    }

    pub fn storage_type(&self) -> Option<Type> {
        self.section(OpCode::K_STORAGE).cloned().map(Type::new)
    }
}

/// Response of `/explorer/contract/{address}/script`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    /// Live big-map ids by storage field name.
    #[serde(default, rename = "bigmaps", skip_serializing_if = "BTreeMap::is_empty")]
    pub bigmap_names: BTreeMap<String, i64>,
}

/// Everything needed to decode a contract's parameters, storage and big-maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractTypes {
    pub param: Option<Type>,
    pub storage: Option<Type>,
    pub entrypoints: Entrypoints,
    /// `big_map` types by id; the left arg is the key type, the right arg the value type.
    pub bigmaps: HashMap<i64, Type>,
}

impl ContractScript {
    pub fn types(&self) -> ContractTypes {
        let Some(script) = &self.script else {
            return ContractTypes::default();
        };
        let param = script.param_type();
        let storage = script.storage_type();
        let entrypoints = param.as_ref().map(Type::entrypoints).unwrap_or_default();

        let mut bigmaps = HashMap::new();
        if let Some(storage) = &storage {
            let mut found = Vec::new();
            collect_bigmaps(storage.prim(), &mut found);
            for (name, id) in &self.bigmap_names {
                let typ = found
                    .iter()
                    .find(|p| p.label() == Some(name.as_str()))
                    .or_else(|| match (found.as_slice(), self.bigmap_names.len()) {
                        ([only], 1) => Some(only),
                        _ => None,
                    });
                if let Some(typ) = typ {
                    bigmaps.insert(*id, Type::new((*typ).clone()));
                }
            }
        }
        ContractTypes {
            param,
            storage,
            entrypoints,
            bigmaps,
        }
    }
}

fn collect_bigmaps<'a>(node: &'a Prim, out: &mut Vec<&'a Prim>) {
    if node.is(OpCode::T_BIG_MAP) {
        out.push(node);
        return;
    }
    for arg in node.args() {
        collect_bigmaps(arg, out);
    }
}
