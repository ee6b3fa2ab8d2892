use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Quantity;
use crate::time::TimestampSeconds;

// Clause of a transaction signing request, as written by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxClause {
    pub to: Option<String>,
    pub value: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Value>,
}

// Clause forwarded to the driver once validated and normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningClause {
    pub to: Option<String>,
    pub value: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOptions {
    pub delegated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// Transaction built by the driver, waiting for its signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub raw: String,
    pub origin: String,
}

// What a delegator hands back for an unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationSignature {
    pub signature: String,
}

// Outcome of asking a delegator to co-sign
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub txid: String,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertMessage {
    pub purpose: String,
    pub payload: CertPayload,
}

impl CertMessage {
    pub fn text(purpose: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            payload: CertPayload {
                kind: "text".to_owned(),
                content: content.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertAnnex {
    pub domain: String,
    pub timestamp: TimestampSeconds,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertResponse {
    pub annex: CertAnnex,
    pub signature: String,
}
