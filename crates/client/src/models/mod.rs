//! Explorer records.

mod block;
mod contract;
mod op;

pub use block::{Block, BlockColumn, BlockId, BlockList};
pub use contract::{
    BigmapMeta, BigmapUpdate, BigmapValue, ContractParameters, ContractScript, ContractTypes,
    ContractValue, Script,
};
pub use op::{Op, OpColumn, OpDecoder, OpList};
