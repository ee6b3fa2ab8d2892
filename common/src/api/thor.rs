use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Quantity;
use crate::{
    config::{DEFAULT_FILTER_LIMIT, DEFAULT_FILTER_RANGE_TO},
    time::TimestampSeconds,
};

pub type BlockNumber = u32;

// Tip of the chain as known by the head tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    pub id: String,
    pub number: BlockNumber,
    pub timestamp: TimestampSeconds,
    #[serde(rename = "parentID")]
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub head: Head,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub number: BlockNumber,
    pub size: u32,
    #[serde(rename = "parentID")]
    pub parent_id: String,
    pub timestamp: TimestampSeconds,
    pub gas_limit: u64,
    pub beneficiary: String,
    pub gas_used: u64,
    pub total_score: u64,
    pub txs_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txs_features: Option<u32>,
    pub state_root: String,
    pub receipts_root: String,
    pub signer: String,
    pub is_trunk: bool,
    pub transactions: Vec<String>,
}

impl Block {
    // Head pointing at this block
    pub fn to_head(&self) -> Head {
        Head {
            id: self.id.clone(),
            number: self.number,
            timestamp: self.timestamp,
            parent_id: self.parent_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub to: Option<String>,
    pub value: String,
    pub data: String,
}

// Clause to simulate, as written by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseInput {
    pub to: Option<String>,
    pub value: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    #[serde(rename = "blockID")]
    pub block_id: String,
    pub block_number: BlockNumber,
    pub block_timestamp: TimestampSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub chain_tag: u8,
    pub block_ref: String,
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub gas_price_coef: u8,
    pub gas: u64,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegator: Option<String>,
    pub nonce: String,
    pub depends_on: Option<String>,
    pub size: u32,
    pub meta: TxMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMeta {
    #[serde(rename = "blockID")]
    pub block_id: String,
    pub block_number: BlockNumber,
    pub block_timestamp: TimestampSeconds,
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub tx_origin: String,
    pub clause_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<LogMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: String,
    pub recipient: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<LogMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutput {
    pub contract_address: Option<String>,
    pub events: Vec<Event>,
    pub transfers: Vec<Transfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    #[serde(rename = "blockID")]
    pub block_id: String,
    pub block_number: BlockNumber,
    pub block_timestamp: TimestampSeconds,
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub tx_origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub gas_used: u64,
    pub gas_payer: String,
    pub paid: String,
    pub reward: String,
    pub reverted: bool,
    pub outputs: Vec<ReceiptOutput>,
    pub meta: ReceiptMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub balance: String,
    pub energy: String,
    pub has_code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub value: String,
}

// Result of a simulated clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmOutput {
    pub data: String,
    pub vm_error: String,
    pub gas_used: u64,
    pub reverted: bool,
    pub events: Vec<Event>,
    pub transfers: Vec<Transfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Value>,
}

// Block used to pin a query, by id or by number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Revision {
    Id(String),
    Number(BlockNumber),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<BlockNumber> for Revision {
    fn from(number: BlockNumber) -> Self {
        Self::Number(number)
    }
}

impl From<&str> for Revision {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    #[default]
    Block,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRange {
    pub unit: RangeUnit,
    pub from: u64,
    pub to: u64,
}

impl Default for FilterRange {
    fn default() -> Self {
        Self {
            unit: RangeUnit::Block,
            from: 0,
            to: DEFAULT_FILTER_RANGE_TO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub offset: u64,
    pub limit: u32,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_FILTER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic0: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic4: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

// Body sent to the driver when a filter is applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterArg<C> {
    pub range: FilterRange,
    pub options: FilterOptions,
    pub criteria_set: Vec<C>,
    pub order: Order,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainArg {
    pub clauses: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}
