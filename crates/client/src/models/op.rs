// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Operations, in object form and table form.

use super::block::BlockId;
use super::contract::{BigmapMeta, BigmapUpdate, BigmapValue, ContractParameters, ContractTypes, ContractValue};
use crate::decode::{
    Column, ColumnPlan, DecodeOptions, columns, parse_address, parse_bool, parse_f64, parse_hash,
    parse_hex, parse_i32, parse_i64, parse_str, parse_time, parse_u64,
};
use crate::error::{ClientError, DecodeError};
use crate::micheline::{BigmapEvent, DiffAction, Parameters, Prim, Type, Value, decode_bigmap_events};
use crate::resolver::ContractResolver;
use crate::types::{Address, BlockHash, OpHash, OpStatus, OpType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Op {
    #[serde(rename = "id")]
    pub row_id: u64,
    pub hash: OpHash,
    #[serde(rename = "type")]
    pub typ: OpType,
    pub block: BlockHash,
    pub time: DateTime<Utc>,
    pub height: i64,
    pub cycle: i64,
    pub counter: i64,
    pub op_n: i32,
    pub op_p: i32,
    pub status: OpStatus,
    pub is_success: bool,
    pub is_contract: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_batch: bool,
    pub is_event: bool,
    pub is_internal: bool,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub storage_limit: i64,
    pub storage_paid: i64,
    pub volume: f64,
    pub fee: f64,
    pub reward: f64,
    pub deposit: f64,
    pub burned: f64,
    pub days_destroyed: f64,
    pub sender_id: u64,
    pub receiver_id: u64,
    pub creator_id: u64,
    pub baker_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    /// Originations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Address>,
    /// Delegations and originations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baker: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_baker: Option<Address>,
    /// Sender of the outer operation, for internal operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offender: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuser: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ContractParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<ContractValue>,
    #[serde(rename = "big_map_diff", skip_serializing_if = "Vec::is_empty")]
    pub bigmap_diff: Vec<BigmapUpdate>,
    /// Registered global constant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Prim>,
    #[serde(skip_serializing_if = "is_zero")]
    pub power: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
    pub confirmations: i64,
    pub batch_volume: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub entrypoint: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub n_ops: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub batch: Vec<Op>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub internal: Vec<Op>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Json>>,
}

columns! {
    /// Table columns of the `op` table.
    pub enum OpColumn {
        Id = "id",
        Hash = "hash",
        Type = "type",
        Block = "block",
        Time = "time",
        Height = "height",
        Cycle = "cycle",
        Counter = "counter",
        OpN = "op_n",
        OpP = "op_p",
        Status = "status",
        IsSuccess = "is_success",
        IsContract = "is_contract",
        IsBatch = "is_batch",
        IsEvent = "is_event",
        IsInternal = "is_internal",
        GasLimit = "gas_limit",
        GasUsed = "gas_used",
        StorageLimit = "storage_limit",
        StoragePaid = "storage_paid",
        Volume = "volume",
        Fee = "fee",
        Reward = "reward",
        Deposit = "deposit",
        Burned = "burned",
        DaysDestroyed = "days_destroyed",
        SenderId = "sender_id",
        ReceiverId = "receiver_id",
        CreatorId = "creator_id",
        BakerId = "baker_id",
        Sender = "sender",
        Receiver = "receiver",
        Creator = "creator",
        Baker = "baker",
        PreviousBaker = "previous_baker" @notable,
        Source = "source" @notable,
        Offender = "offender" @notable,
        Accuser = "accuser" @notable,
        Data = "data",
        Errors = "errors",
        Parameters = "parameters",
        Storage = "storage",
        BigmapDiff = "big_map_diff",
        Value = "value",
        Power = "power",
        Limit = "limit",
        Confirmations = "confirmations" @notable,
        BatchVolume = "batch_volume" @notable,
        Entrypoint = "entrypoint" @notable,
        NOps = "n_ops" @notable,
        Batch = "batch" @notable,
        Internal = "internal" @notable,
        Metadata = "metadata" @notable,
    }
}

impl Op {
    pub fn block_id(&self) -> BlockId {
        BlockId {
            height: self.height,
            hash: self.block,
            time: self.time,
        }
    }

    /// The operation and its children as a flat list.
    ///
    /// A batch is replaced by its members, each followed by its internal
    /// operations.
    pub fn content(&self) -> Vec<&Op> {
        if self.batch.is_empty() && self.internal.is_empty() {
            return vec![self];
        }
        let mut list = Vec::new();
        if self.is_batch {
            for op in &self.batch {
                list.push(op);
                list.extend(op.internal.iter());
            }
        } else {
            list.push(self);
        }
        list.extend(self.internal.iter());
        list
    }

    /// Row id of the deepest last child, used for pagination.
    pub fn cursor(&self) -> u64 {
        let op = self.batch.last().unwrap_or(self);
        op.internal.last().unwrap_or(op).row_id
    }
}

/// Decodes table rows into [`Op`]s with optional contract type information.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpDecoder<'a> {
    types: Option<&'a ContractTypes>,
    options: DecodeOptions,
}

impl<'a> OpDecoder<'a> {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            types: None,
            options,
        }
    }

    pub fn with_types(mut self, types: &'a ContractTypes) -> Self {
        self.types = Some(types);
        self
    }

    /// Decode one table row. Fails on the first malformed field.
    pub fn decode_row(&self, plan: &ColumnPlan<OpColumn>, row: &[Json]) -> Result<Op, DecodeError> {
        let mut op = Op::default();
        for (column, v) in plan.walk(row) {
            let name = column.name();
            match column {
                OpColumn::Id => op.row_id = parse_u64(name, v)?,
                OpColumn::Hash => op.hash = parse_hash(name, v)?,
                OpColumn::Type => op.typ = OpType::parse(parse_str(name, v)?),
                OpColumn::Block => op.block = parse_hash(name, v)?,
                OpColumn::Time => op.time = parse_time(name, v)?,
                OpColumn::Height => op.height = parse_i64(name, v)?,
                OpColumn::Cycle => op.cycle = parse_i64(name, v)?,
                OpColumn::Counter => op.counter = parse_i64(name, v)?,
                OpColumn::OpN => op.op_n = parse_i32(name, v)?,
                OpColumn::OpP => op.op_p = parse_i32(name, v)?,
                OpColumn::Status => op.status = OpStatus::parse(parse_str(name, v)?),
                OpColumn::IsSuccess => op.is_success = parse_bool(name, v)?,
                OpColumn::IsContract => op.is_contract = parse_bool(name, v)?,
                OpColumn::IsBatch => op.is_batch = parse_bool(name, v)?,
                OpColumn::IsEvent => op.is_event = parse_bool(name, v)?,
                OpColumn::IsInternal => op.is_internal = parse_bool(name, v)?,
                OpColumn::GasLimit => op.gas_limit = parse_i64(name, v)?,
                OpColumn::GasUsed => op.gas_used = parse_i64(name, v)?,
                OpColumn::StorageLimit => op.storage_limit = parse_i64(name, v)?,
                OpColumn::StoragePaid => op.storage_paid = parse_i64(name, v)?,
                OpColumn::Volume => op.volume = parse_f64(name, v)?,
                OpColumn::Fee => op.fee = parse_f64(name, v)?,
                OpColumn::Reward => op.reward = parse_f64(name, v)?,
                OpColumn::Deposit => op.deposit = parse_f64(name, v)?,
                OpColumn::Burned => op.burned = parse_f64(name, v)?,
                OpColumn::DaysDestroyed => op.days_destroyed = parse_f64(name, v)?,
                OpColumn::SenderId => op.sender_id = parse_u64(name, v)?,
                OpColumn::ReceiverId => op.receiver_id = parse_u64(name, v)?,
                OpColumn::CreatorId => op.creator_id = parse_u64(name, v)?,
                OpColumn::BakerId => op.baker_id = parse_u64(name, v)?,
                OpColumn::Sender => op.sender = Some(parse_address(name, v)?),
                OpColumn::Receiver => op.receiver = Some(parse_address(name, v)?),
                OpColumn::Creator => op.creator = Some(parse_address(name, v)?),
                OpColumn::Baker => op.baker = Some(parse_address(name, v)?),
                OpColumn::PreviousBaker => op.previous_baker = Some(parse_address(name, v)?),
                OpColumn::Source => op.source = Some(parse_address(name, v)?),
                OpColumn::Offender => op.offender = Some(parse_address(name, v)?),
                OpColumn::Accuser => op.accuser = Some(parse_address(name, v)?),
                OpColumn::Data => op.data = Some(v.clone()),
                OpColumn::Errors => op.errors = Some(v.clone()),
                OpColumn::Entrypoint => {
                    let entrypoint = parse_str(name, v)?;
                    op.parameters.get_or_insert_with(Default::default).entrypoint = entrypoint.to_string();
                    op.entrypoint = entrypoint.to_string();
                }
                OpColumn::Parameters => {
                    if let Some(buf) = parse_hex(name, v)? {
                        op.parameters = Some(self.decode_parameters(&buf).map_err(|e| e.in_column(name))?);
                    }
                }
                OpColumn::Storage => {
                    if let Some(buf) = parse_hex(name, v)? {
                        op.storage = Some(self.decode_storage(&buf).map_err(|e| e.in_column(name))?);
                    }
                }
                OpColumn::BigmapDiff => {
                    if let Some(buf) = parse_hex(name, v)? {
                        op.bigmap_diff = self.decode_bigmap_diff(&buf).map_err(|e| e.in_column(name))?;
                    }
                }
                OpColumn::Value => {
                    if let Some(buf) = parse_hex(name, v)? {
                        op.value = Some(Prim::from_binary(&buf).map_err(|e| e.in_column(name))?);
                    }
                }
                OpColumn::Power => op.power = parse_i32(name, v)?,
                OpColumn::Limit => op.limit = Some(parse_f64(name, v)?),
                OpColumn::Confirmations => op.confirmations = parse_i64(name, v)?,
                OpColumn::BatchVolume => op.batch_volume = parse_f64(name, v)?,
                OpColumn::NOps => op.n_ops = parse_i32(name, v)?,
                // nested children only exist in object form
                OpColumn::Batch | OpColumn::Internal | OpColumn::Metadata => {}
            }
        }
        if self.options.meta {
            for update in op.bigmap_diff.iter_mut() {
                if matches!(update.action, DiffAction::Update | DiffAction::Remove) {
                    update.entry.meta = Some(BigmapMeta {
                        contract: op.receiver,
                        bigmap_id: update.bigmap_id,
                        time: op.time,
                        height: op.height,
                    });
                }
            }
        }
        Ok(op)
    }

    fn project(&self, typ: &Type, prim: &Prim) -> Result<Json, DecodeError> {
        Value::new(typ, prim).with_on_error(self.options.on_error).map()
    }

    fn decode_parameters(&self, buf: &[u8]) -> Result<ContractParameters, DecodeError> {
        let params = Parameters::from_binary(buf)?;
        let keep_prim = self.options.prim;
        let Some((types, param_type)) = self.types.and_then(|t| t.param.as_ref().map(|p| (t, p))) else {
            return Ok(ContractParameters {
                entrypoint: params.entrypoint.clone(),
                value: ContractValue {
                    value: None,
                    prim: keep_prim.then(|| params.value.clone()),
                },
            });
        };
        let (ep, prim) = params.map_entrypoint(param_type, &types.entrypoints);
        Ok(ContractParameters {
            value: ContractValue {
                value: Some(self.project(&ep.typ, prim)?),
                prim: keep_prim.then(|| prim.clone()),
            },
            entrypoint: ep.name,
        })
    }

    fn decode_storage(&self, buf: &[u8]) -> Result<ContractValue, DecodeError> {
        let prim = Prim::from_binary(buf)?;
        let value = match self.types.and_then(|t| t.storage.as_ref()) {
            Some(storage_type) => Some(self.project(storage_type, &prim)?),
            None => None,
        };
        // without a type the tree is the only representation
        let keep_prim = self.options.prim || value.is_none();
        Ok(ContractValue {
            value,
            prim: keep_prim.then_some(prim),
        })
    }

    fn decode_bigmap_diff(&self, buf: &[u8]) -> Result<Vec<BigmapUpdate>, DecodeError> {
        decode_bigmap_events(buf)?
            .into_iter()
            .map(|ev| self.decode_bigmap_event(ev))
            .collect()
    }

    fn decode_bigmap_event(&self, ev: BigmapEvent) -> Result<BigmapUpdate, DecodeError> {
        let keep_prim = self.options.prim;
        let mut update = BigmapUpdate {
            action: ev.action,
            bigmap_id: ev.id,
            ..Default::default()
        };
        match ev.action {
            DiffAction::Alloc | DiffAction::Copy => {
                // copies carry no types of their own; borrow the source map's if known
                let source_type = ev
                    .source_id
                    .and_then(|id| self.types.and_then(|t| t.bigmaps.get(&id)));
                let key_type = ev
                    .key_type
                    .or_else(|| source_type.and_then(Type::left).map(|t| t.prim().clone()));
                let value_type = ev
                    .value_type
                    .or_else(|| source_type.and_then(Type::right).map(|t| t.prim().clone()));
                update.key_type = key_type.clone().map(|p| Type::new(p).typedef("@key"));
                update.value_type = value_type.clone().map(|p| Type::new(p).typedef("@value"));
                update.source_id = ev.source_id;
                update.dest_id = ev.dest_id;
                if keep_prim {
                    update.key_type_prim = key_type;
                    update.value_type_prim = value_type;
                }
            }
            DiffAction::Update | DiffAction::Remove => {
                let known = self.types.and_then(|t| t.bigmaps.get(&ev.id));
                let mut entry = BigmapValue::default();
                if let Some(key) = &ev.key {
                    let key_type = known
                        .and_then(Type::left)
                        .unwrap_or_else(|| Type::infer(key));
                    entry.key = Some(self.project(&key_type, key)?);
                    entry.hash = ev.key_hash;
                }
                if keep_prim {
                    entry.key_prim = ev.key.clone();
                }
                if ev.action == DiffAction::Update {
                    if let (Some(value), Some(value_type)) = (&ev.value, known.and_then(Type::right)) {
                        entry.value = Some(self.project(&value_type, value)?);
                    }
                    if keep_prim {
                        entry.value_prim = ev.value;
                    }
                }
                update.entry = entry;
            }
        }
        Ok(update)
    }
}

/// An ordered batch of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpList {
    pub rows: Vec<Op>,
}

impl OpList {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.rows.iter()
    }

    /// Cursor for the next page, `None` for an empty batch.
    pub fn cursor(&self) -> Option<u64> {
        self.rows.last().map(Op::cursor)
    }

    /// Decode a response body holding object-form or table-form rows.
    ///
    /// Contract types are resolved for table rows that call a contract; a
    /// contract the resolver does not know is decoded untyped.
    pub async fn decode<S, R>(
        data: &Json,
        columns: &[S],
        options: DecodeOptions,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<Self, ClientError>
    where
        S: AsRef<str>,
        R: ContractResolver,
    {
        let rows = match data {
            Json::Null => return Ok(Self::default()),
            Json::Array(rows) => rows,
            _ => {
                return Err(DecodeError::MalformedRow {
                    index: 0,
                    reason: "expected a JSON array of rows".to_string(),
                }
                .into());
            }
        };
        let plan = ColumnPlan::<OpColumn>::new(columns);
        let mut list = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let op = match row {
                Json::Object(_) => serde_json::from_value(row.clone()).map_err(|e| DecodeError::MalformedRow {
                    index,
                    reason: e.to_string(),
                })?,
                Json::Null => Op::default(),
                Json::Array(values) if values.is_empty() => Op::default(),
                Json::Array(values) => {
                    let types = match contract_receiver(&plan, values)? {
                        Some(addr) => match resolver.resolve(&addr, cancel).await {
                            Ok(types) => Some(types),
                            Err(ClientError::NotFound(_)) => {
                                tracing::debug!(contract = %addr, "no script found, decoding untyped");
                                None
                            }
                            Err(err) => return Err(err),
                        },
                        None => None,
                    };
                    let mut decoder = OpDecoder::new(options);
                    if let Some(types) = types.as_deref() {
                        decoder = decoder.with_types(types);
                    }
                    decoder.decode_row(&plan, values)?
                }
                _ => {
                    return Err(DecodeError::MalformedRow {
                        index,
                        reason: format!("expected object or array, got {row}"),
                    }
                    .into());
                }
            };
            list.push(op);
        }
        Ok(Self { rows: list })
    }
}

/// The receiver of a contract call row, if the row is one.
fn contract_receiver(plan: &ColumnPlan<OpColumn>, row: &[Json]) -> Result<Option<Address>, DecodeError> {
    let is_contract = plan
        .get(row, OpColumn::IsContract)
        .is_some_and(|v| v.as_u64() == Some(1));
    if !is_contract {
        return Ok(None);
    }
    match plan.get(row, OpColumn::Receiver).and_then(Json::as_str) {
        Some(receiver) if !receiver.is_empty() => Address::parse(receiver)
            .map(Some)
            .map_err(|e| e.in_column(OpColumn::Receiver.name())),
        _ => Ok(None),
    }
}

impl IntoIterator for OpList {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
