//! Blocks, in object form and table form.

use super::op::Op;
use crate::decode::{
    Column, ColumnPlan, columns, parse_address, parse_bool, parse_f64, parse_hash, parse_i32,
    parse_i64, parse_str, parse_time, parse_u64,
};
use crate::error::DecodeError;
use crate::types::{Address, BlockHash, VotingPeriodKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    pub row_id: u64,
    pub parent_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<BlockHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor: Option<BlockHash>,
    pub hash: BlockHash,
    pub is_orphan: bool,
    pub height: i64,
    pub cycle: i64,
    pub is_cycle_snapshot: bool,
    pub time: DateTime<Utc>,
    pub solvetime: i32,
    pub version: i32,
    pub validation_pass: i32,
    pub fitness: u64,
    pub priority: i32,
    pub nonce: String,
    pub voting_period_kind: VotingPeriodKind,
    pub baker_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baker: Option<Address>,
    /// Hex bitmap of endorsed slots, see [`Block::endorsed_slots`].
    pub slot_mask: String,
    pub n_endorsed_slots: i32,
    pub n_ops: i32,
    pub n_ops_failed: i32,
    pub n_ops_contract: i32,
    pub n_ops_implicit: i32,
    pub n_tx: i32,
    pub n_activation: i32,
    pub n_seed_nonce_revelation: i32,
    pub n_double_baking_evidence: i32,
    pub n_double_endorsement_evidence: i32,
    pub n_endorsement: i32,
    pub n_delegation: i32,
    pub n_reveal: i32,
    pub n_origination: i32,
    pub n_proposal: i32,
    pub n_ballot: i32,
    pub volume: f64,
    pub fee: f64,
    pub reward: f64,
    pub deposit: f64,
    pub unfrozen_fees: f64,
    pub unfrozen_rewards: f64,
    pub unfrozen_deposits: f64,
    pub activated_supply: f64,
    pub burned_supply: f64,
    #[serde(rename = "n_accounts")]
    pub seen_accounts: i32,
    #[serde(rename = "n_new_accounts")]
    pub new_accounts: i32,
    #[serde(rename = "n_new_implicit")]
    pub new_implicit_accounts: i32,
    #[serde(rename = "n_new_managed")]
    pub new_managed_accounts: i32,
    #[serde(rename = "n_new_contracts")]
    pub new_contracts: i32,
    #[serde(rename = "n_cleared_accounts")]
    pub cleared_accounts: i32,
    #[serde(rename = "n_funded_accounts")]
    pub funded_accounts: i32,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub gas_price: f64,
    pub storage_size: i64,
    pub days_destroyed: f64,
    pub pct_account_reuse: f64,
    #[serde(rename = "lb_esc_vote")]
    pub lb_escape_vote: bool,
    #[serde(rename = "lb_esc_ema")]
    pub lb_escape_ema: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Json>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ops: Vec<Op>,
}

columns! {
    /// Table columns of the `block` table.
    pub enum BlockColumn {
        RowId = "row_id",
        ParentId = "parent_id",
        Predecessor = "predecessor",
        Successor = "successor" @notable,
        Hash = "hash",
        IsOrphan = "is_orphan",
        Height = "height",
        Cycle = "cycle",
        IsCycleSnapshot = "is_cycle_snapshot",
        Time = "time",
        Solvetime = "solvetime",
        Version = "version",
        ValidationPass = "validation_pass",
        Fitness = "fitness",
        Priority = "priority",
        Nonce = "nonce",
        VotingPeriodKind = "voting_period_kind",
        BakerId = "baker_id",
        Baker = "baker",
        SlotMask = "slot_mask",
        NEndorsedSlots = "n_endorsed_slots",
        NOps = "n_ops",
        NOpsFailed = "n_ops_failed",
        NOpsContract = "n_ops_contract",
        NOpsImplicit = "n_ops_implicit",
        NTx = "n_tx",
        NActivation = "n_activation",
        NSeedNonce = "n_seed_nonce_revelation",
        NDoubleBaking = "n_double_baking_evidence",
        NDoubleEndorsement = "n_double_endorsement_evidence",
        NEndorsement = "n_endorsement",
        NDelegation = "n_delegation",
        NReveal = "n_reveal",
        NOrigination = "n_origination",
        NProposal = "n_proposal",
        NBallot = "n_ballot",
        Volume = "volume",
        Fee = "fee",
        Reward = "reward",
        Deposit = "deposit",
        UnfrozenFees = "unfrozen_fees",
        UnfrozenRewards = "unfrozen_rewards",
        UnfrozenDeposits = "unfrozen_deposits",
        ActivatedSupply = "activated_supply",
        BurnedSupply = "burned_supply",
        SeenAccounts = "n_accounts",
        NewAccounts = "n_new_accounts",
        NewImplicit = "n_new_implicit",
        NewManaged = "n_new_managed",
        NewContracts = "n_new_contracts",
        ClearedAccounts = "n_cleared_accounts",
        FundedAccounts = "n_funded_accounts",
        GasLimit = "gas_limit",
        GasUsed = "gas_used",
        GasPrice = "gas_price",
        StorageSize = "storage_size",
        DaysDestroyed = "days_destroyed",
        PctAccountReuse = "pct_account_reuse",
        LbEscapeVote = "lb_esc_vote",
        LbEscapeEma = "lb_esc_ema",
        Metadata = "metadata" @notable,
        Rights = "rights" @notable,
        Ops = "ops" @notable,
    }
}

/// Identity of a block for chain-continuity checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockId {
    pub height: i64,
    pub hash: BlockHash,
    pub time: DateTime<Utc>,
}

impl BlockId {
    /// True when `block` directly extends this block.
    pub fn is_next_block(&self, block: &Block) -> bool {
        block.height == self.height + 1 && block.predecessor == Some(self.hash)
    }

    pub fn is_same_block(&self, block: &Block) -> bool {
        block.height == self.height && block.hash == self.hash
    }
}

impl Block {
    pub fn block_id(&self) -> BlockId {
        BlockId {
            height: self.height,
            hash: self.hash,
            time: self.time,
        }
    }

    /// Indexes of endorsed slots; bit `i` of the mask is bit `i % 8` of byte `i / 8`.
    pub fn endorsed_slots(&self) -> Result<Vec<usize>, DecodeError> {
        let bytes = hex::decode(&self.slot_mask)
            .map_err(|e| DecodeError::invalid("slot mask", self.slot_mask.as_str(), e.to_string()))?;
        Ok(bytes
            .iter()
            .enumerate()
            .flat_map(|(i, byte)| {
                (0..8usize)
                    .filter(move |bit| (byte >> bit) & 1 == 1)
                    .map(move |bit| i * 8 + bit)
            })
            .collect())
    }

    /// Decode one table row. Fails on the first malformed field.
    pub fn decode_row(plan: &ColumnPlan<BlockColumn>, row: &[Json]) -> Result<Block, DecodeError> {
        let mut b = Block::default();
        for (column, v) in plan.walk(row) {
            let name = column.name();
            match column {
                BlockColumn::RowId => b.row_id = parse_u64(name, v)?,
                BlockColumn::ParentId => b.parent_id = parse_u64(name, v)?,
                BlockColumn::Predecessor => b.predecessor = Some(parse_hash(name, v)?),
                BlockColumn::Successor => b.successor = Some(parse_hash(name, v)?),
                BlockColumn::Hash => b.hash = parse_hash(name, v)?,
                BlockColumn::IsOrphan => b.is_orphan = parse_bool(name, v)?,
                BlockColumn::Height => b.height = parse_i64(name, v)?,
                BlockColumn::Cycle => b.cycle = parse_i64(name, v)?,
                BlockColumn::IsCycleSnapshot => b.is_cycle_snapshot = parse_bool(name, v)?,
                BlockColumn::Time => b.time = parse_time(name, v)?,
                BlockColumn::Solvetime => b.solvetime = parse_i32(name, v)?,
                BlockColumn::Version => b.version = parse_i32(name, v)?,
                BlockColumn::ValidationPass => b.validation_pass = parse_i32(name, v)?,
                BlockColumn::Fitness => b.fitness = parse_u64(name, v)?,
                BlockColumn::Priority => b.priority = parse_i32(name, v)?,
                BlockColumn::Nonce => b.nonce = parse_str(name, v)?.to_string(),
                BlockColumn::VotingPeriodKind => {
                    b.voting_period_kind = VotingPeriodKind::parse(parse_str(name, v)?)
                }
                BlockColumn::BakerId => b.baker_id = parse_u64(name, v)?,
                BlockColumn::Baker => b.baker = Some(parse_address(name, v)?),
                BlockColumn::SlotMask => b.slot_mask = parse_str(name, v)?.to_string(),
                BlockColumn::NEndorsedSlots => b.n_endorsed_slots = parse_i32(name, v)?,
                BlockColumn::NOps => b.n_ops = parse_i32(name, v)?,
                BlockColumn::NOpsFailed => b.n_ops_failed = parse_i32(name, v)?,
                BlockColumn::NOpsContract => b.n_ops_contract = parse_i32(name, v)?,
                BlockColumn::NOpsImplicit => b.n_ops_implicit = parse_i32(name, v)?,
                BlockColumn::NTx => b.n_tx = parse_i32(name, v)?,
                BlockColumn::NActivation => b.n_activation = parse_i32(name, v)?,
                BlockColumn::NSeedNonce => b.n_seed_nonce_revelation = parse_i32(name, v)?,
                BlockColumn::NDoubleBaking => b.n_double_baking_evidence = parse_i32(name, v)?,
                BlockColumn::NDoubleEndorsement => {
                    b.n_double_endorsement_evidence = parse_i32(name, v)?
                }
                BlockColumn::NEndorsement => b.n_endorsement = parse_i32(name, v)?,
                BlockColumn::NDelegation => b.n_delegation = parse_i32(name, v)?,
                BlockColumn::NReveal => b.n_reveal = parse_i32(name, v)?,
                BlockColumn::NOrigination => b.n_origination = parse_i32(name, v)?,
                BlockColumn::NProposal => b.n_proposal = parse_i32(name, v)?,
                BlockColumn::NBallot => b.n_ballot = parse_i32(name, v)?,
                BlockColumn::Volume => b.volume = parse_f64(name, v)?,
                BlockColumn::Fee => b.fee = parse_f64(name, v)?,
                BlockColumn::Reward => b.reward = parse_f64(name, v)?,
                BlockColumn::Deposit => b.deposit = parse_f64(name, v)?,
                BlockColumn::UnfrozenFees => b.unfrozen_fees = parse_f64(name, v)?,
                BlockColumn::UnfrozenRewards => b.unfrozen_rewards = parse_f64(name, v)?,
                BlockColumn::UnfrozenDeposits => b.unfrozen_deposits = parse_f64(name, v)?,
                BlockColumn::ActivatedSupply => b.activated_supply = parse_f64(name, v)?,
                BlockColumn::BurnedSupply => b.burned_supply = parse_f64(name, v)?,
                BlockColumn::SeenAccounts => b.seen_accounts = parse_i32(name, v)?,
                BlockColumn::NewAccounts => b.new_accounts = parse_i32(name, v)?,
                BlockColumn::NewImplicit => b.new_implicit_accounts = parse_i32(name, v)?,
                BlockColumn::NewManaged => b.new_managed_accounts = parse_i32(name, v)?,
                BlockColumn::NewContracts => b.new_contracts = parse_i32(name, v)?,
                BlockColumn::ClearedAccounts => b.cleared_accounts = parse_i32(name, v)?,
                BlockColumn::FundedAccounts => b.funded_accounts = parse_i32(name, v)?,
                BlockColumn::GasLimit => b.gas_limit = parse_i64(name, v)?,
                BlockColumn::GasUsed => b.gas_used = parse_i64(name, v)?,
                BlockColumn::GasPrice => b.gas_price = parse_f64(name, v)?,
                BlockColumn::StorageSize => b.storage_size = parse_i64(name, v)?,
                BlockColumn::DaysDestroyed => b.days_destroyed = parse_f64(name, v)?,
                BlockColumn::PctAccountReuse => b.pct_account_reuse = parse_f64(name, v)?,
                BlockColumn::LbEscapeVote => b.lb_escape_vote = parse_bool(name, v)?,
                BlockColumn::LbEscapeEma => b.lb_escape_ema = parse_i64(name, v)?,
                BlockColumn::Metadata | BlockColumn::Rights | BlockColumn::Ops => {}
            }
        }
        Ok(b)
    }
}

/// An ordered batch of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList {
    pub rows: Vec<Block>,
}

impl BlockList {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.rows.iter()
    }

    /// Row id of the last block, `None` for an empty batch.
    pub fn cursor(&self) -> Option<u64> {
        self.rows.last().map(|b| b.row_id)
    }

    pub fn decode<S: AsRef<str>>(data: &Json, columns: &[S]) -> Result<Self, DecodeError> {
        let rows = match data {
            Json::Null => return Ok(Self::default()),
            Json::Array(rows) => rows,
            _ => {
                return Err(DecodeError::MalformedRow {
                    index: 0,
                    reason: "expected a JSON array of rows".to_string(),
                });
            }
        };
        let plan = ColumnPlan::<BlockColumn>::new(columns);
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, row)| -> Result<Block, DecodeError> {
                match row {
                    Json::Object(_) => serde_json::from_value(row.clone()).map_err(|e| DecodeError::MalformedRow {
                        index,
                        reason: e.to_string(),
                    }),
                    Json::Null => Ok(Block::default()),
                    Json::Array(values) if values.is_empty() => Ok(Block::default()),
                    Json::Array(values) => Block::decode_row(&plan, values),
                    _ => Err(DecodeError::MalformedRow {
                        index,
                        reason: format!("expected object or array, got {row}"),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }
}

impl IntoIterator for BlockList {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_row() {
        let parent = BlockHash::new([1u8; 32]);
        let hash = BlockHash::new([2u8; 32]);
        let plan = ColumnPlan::<BlockColumn>::new(&[
            "row_id",
            "hash",
            "predecessor",
            "height",
            "is_cycle_snapshot",
            "voting_period_kind",
            "volume",
            "lb_esc_vote",
        ]);
        let row = vec![
            json!(10),
            json!(hash.to_string()),
            json!(parent.to_string()),
            json!(1_000_000),
            json!(0),
            json!("testing_vote"),
            json!(1234.5),
            json!(1),
        ];
        let b = Block::decode_row(&plan, &row).unwrap();
        assert_eq!(b.row_id, 10);
        assert_eq!(b.hash, hash);
        assert_eq!(b.predecessor, Some(parent));
        assert_eq!(b.height, 1_000_000);
        assert!(!b.is_cycle_snapshot);
        assert_eq!(b.voting_period_kind, VotingPeriodKind::Exploration);
        assert_eq!(b.volume, 1234.5);
        assert!(b.lb_escape_vote);
    }

    #[test]
    fn test_block_id_continuity() {
        let a = Block {
            height: 5,
            hash: BlockHash::new([5u8; 32]),
            ..Default::default()
        };
        let b = Block {
            height: 6,
            hash: BlockHash::new([6u8; 32]),
            predecessor: Some(a.hash),
            ..Default::default()
        };
        let id = a.block_id();
        assert!(id.is_same_block(&a));
        assert!(id.is_next_block(&b));
        assert!(!id.is_next_block(&a));
        assert!(!b.block_id().is_next_block(&a));
    }

    #[test]
    fn test_endorsed_slots() {
        let b = Block {
            slot_mask: "0501".to_string(),
            ..Default::default()
        };
        assert_eq!(b.endorsed_slots().unwrap(), vec![0, 2, 8]);
        let bad = Block {
            slot_mask: "xx".to_string(),
            ..Default::default()
        };
        assert!(bad.endorsed_slots().is_err());
    }

    #[test]
    fn test_list_cursor_and_mixed_rows() {
        let data = json!([[3, 100], {"row_id": 4, "height": 101}, [], null]);
        let list = BlockList::decode(&data, &["row_id", "height"]).unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list.rows[0].height, 100);
        assert_eq!(list.rows[1].row_id, 4);
        assert_eq!(list.rows[2], Block::default());
        assert_eq!(list.cursor(), Some(0));

        let empty = BlockList::decode(&json!([]), &["row_id"]).unwrap();
        assert_eq!(empty.cursor(), None);
        assert!(BlockList::decode(&json!({"row_id": 1}), &["row_id"]).is_err());
        assert!(matches!(
            BlockList::decode(&json!([[1], "x"]), &["row_id"]),
            Err(DecodeError::MalformedRow { index: 1, .. })
        ));
    }

    #[test]
    fn test_object_row_error_names_index() {
        let data = json!([[1, 10], {"row_id": 2, "height": "high"}]);
        match BlockList::decode(&data, &["row_id", "height"]).unwrap_err() {
            DecodeError::MalformedRow { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("height") || reason.contains("invalid type"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
