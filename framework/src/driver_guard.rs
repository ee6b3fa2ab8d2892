//! Driver decorator checking every response against the expected shape
//!
//! Violations are only reported (log + optional handler), the response is
//! always handed back to the caller untouched.

use std::sync::Arc;

use async_trait::async_trait;
use connex_common::{
    api::{
        thor::{
            Account, Block, Code, Event, EventCriteria, ExplainArg, FilterArg, Head, Receipt,
            Revision, Storage, Transaction, Transfer, TransferCriteria, VmOutput,
        },
        vendor::{
            CertMessage, CertOptions, CertResponse, Delegation, SigningClause, TxOptions,
            TxResponse, UnsignedTx,
        },
    },
    config::SIGNATURE_SIZE,
    validator::{is_hex_bytes, test_with, Rule, Scheme, ValidationError},
};
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::Value;

use crate::driver::{Driver, DriverError, HeadPolling, PendingTx};

pub type ErrorHandler = Arc<dyn Fn(&ValidationError) + Send + Sync>;

pub fn signature_scheme() -> Scheme {
    Scheme::predicate(|v: Option<&Value>| {
        match v.and_then(Value::as_str) {
            Some(s) if is_hex_bytes(s, Some(SIGNATURE_SIZE)) => Ok(()),
            _ => Err(format!("expected {} bytes", SIGNATURE_SIZE)),
        }
    })
}

lazy_static! {
    static ref HEAD_SCHEME: Scheme = Scheme::object([
        ("id", Rule::BYTES32),
        ("number", Rule::Uint32),
        ("timestamp", Rule::Uint64),
        ("parentID", Rule::BYTES32),
    ]);
    static ref BLOCK_SCHEME: Scheme = Scheme::object([
        ("id", Rule::BYTES32.into()),
        ("number", Rule::Uint32.into()),
        ("size", Rule::Uint32.into()),
        ("parentID", Rule::BYTES32.into()),
        ("timestamp", Rule::Uint64.into()),
        ("gasLimit", Rule::Uint64.into()),
        ("beneficiary", Rule::Address.into()),
        ("gasUsed", Rule::Uint64.into()),
        ("totalScore", Rule::Uint64.into()),
        ("txsRoot", Rule::BYTES32.into()),
        ("txsFeatures", Scheme::optional(Rule::Uint32)),
        ("stateRoot", Rule::BYTES32.into()),
        ("receiptsRoot", Rule::BYTES32.into()),
        ("signer", Rule::Address.into()),
        ("isTrunk", Rule::Bool.into()),
        ("transactions", Scheme::array(Rule::BYTES32)),
    ]);
    static ref TX_SCHEME: Scheme = Scheme::object([
        ("id", Rule::BYTES32.into()),
        ("chainTag", Rule::Uint8.into()),
        ("blockRef", Rule::BYTES8.into()),
        ("expiration", Rule::Uint32.into()),
        ("gasPriceCoef", Rule::Uint8.into()),
        ("gas", Rule::Uint64.into()),
        ("origin", Rule::Address.into()),
        ("delegator", Scheme::optional(Rule::Address)),
        ("nonce", Rule::HexString.into()),
        ("dependsOn", Scheme::nullable(Rule::BYTES32)),
        ("size", Rule::Uint32.into()),
        (
            "clauses",
            Scheme::array(Scheme::object([
                ("to", Scheme::nullable(Rule::Address)),
                ("value", Rule::HexString.into()),
                ("data", Rule::Bytes.into()),
            ])),
        ),
        (
            "meta",
            Scheme::object([
                ("blockID", Rule::BYTES32),
                ("blockNumber", Rule::Uint32),
                ("blockTimestamp", Rule::Uint64),
            ]),
        ),
    ]);
    static ref LOG_META_SCHEME: Scheme = Scheme::object([
        ("blockID", Rule::BYTES32),
        ("blockNumber", Rule::Uint32),
        ("blockTimestamp", Rule::Uint64),
        ("txID", Rule::BYTES32),
        ("txOrigin", Rule::Address),
        ("clauseIndex", Rule::Uint32),
    ]);
    static ref EVENT_SCHEME: Scheme = Scheme::object([
        ("address", Rule::Address.into()),
        ("topics", Scheme::array(Rule::BYTES32)),
        ("data", Rule::Bytes.into()),
        ("meta", Scheme::any()),
        ("decoded", Scheme::any()),
    ]);
    static ref EVENT_WITH_META_SCHEME: Scheme =
        EVENT_SCHEME.clone().with("meta", LOG_META_SCHEME.clone());
    static ref TRANSFER_SCHEME: Scheme = Scheme::object([
        ("sender", Rule::Address.into()),
        ("recipient", Rule::Address.into()),
        ("amount", Rule::HexString.into()),
        ("meta", Scheme::any()),
    ]);
    static ref TRANSFER_WITH_META_SCHEME: Scheme =
        TRANSFER_SCHEME.clone().with("meta", LOG_META_SCHEME.clone());
    static ref RECEIPT_SCHEME: Scheme = Scheme::object([
        ("gasUsed", Rule::Uint64.into()),
        ("gasPayer", Rule::Address.into()),
        ("paid", Rule::HexString.into()),
        ("reward", Rule::HexString.into()),
        ("reverted", Rule::Bool.into()),
        (
            "outputs",
            Scheme::array(Scheme::object([
                ("contractAddress", Scheme::nullable(Rule::Address)),
                ("events", Scheme::array(EVENT_SCHEME.clone())),
                ("transfers", Scheme::array(TRANSFER_SCHEME.clone())),
            ])),
        ),
        (
            "meta",
            Scheme::object([
                ("blockID", Rule::BYTES32),
                ("blockNumber", Rule::Uint32),
                ("blockTimestamp", Rule::Uint64),
                ("txID", Rule::BYTES32),
                ("txOrigin", Rule::Address),
            ]),
        ),
    ]);
    static ref VM_OUTPUT_SCHEME: Scheme = Scheme::object([
        ("data", Rule::Bytes.into()),
        ("vmError", Rule::String.into()),
        ("gasUsed", Rule::Uint64.into()),
        ("reverted", Rule::Bool.into()),
        ("events", Scheme::array(EVENT_SCHEME.clone())),
        ("transfers", Scheme::array(TRANSFER_SCHEME.clone())),
        ("decoded", Scheme::any()),
    ]);
    static ref ACCOUNT_SCHEME: Scheme = Scheme::object([
        ("balance", Rule::HexString),
        ("energy", Rule::HexString),
        ("hasCode", Rule::Bool),
    ]);
    static ref CODE_SCHEME: Scheme = Scheme::object([("code", Rule::Bytes)]);
    static ref STORAGE_SCHEME: Scheme = Scheme::object([("value", Rule::BYTES32)]);
    static ref UNSIGNED_TX_SCHEME: Scheme =
        Scheme::object([("raw", Rule::Bytes), ("origin", Rule::Address)]);
    static ref TX_RESPONSE_SCHEME: Scheme =
        Scheme::object([("txid", Rule::BYTES32), ("signer", Rule::Address)]);
    static ref CERT_RESPONSE_SCHEME: Scheme = Scheme::object([
        (
            "annex",
            Scheme::object([
                ("domain", Rule::String),
                ("timestamp", Rule::Uint64),
                ("signer", Rule::Address),
            ]),
        ),
        ("signature", signature_scheme()),
    ]);
    static ref OWNED_ADDRESSES_SCHEME: Scheme = Scheme::array(Rule::Address);
    static ref OWNED_SCHEME: Scheme = Scheme::from(Rule::Bool);
}

fn test<T: Serialize>(value: T, scheme: &Scheme, path: &str, on_error: &Option<ErrorHandler>) -> T {
    test_with(value, scheme, path, on_error.as_deref())
}

pub struct DriverGuard {
    inner: Arc<dyn Driver>,
    on_error: Option<ErrorHandler>,
}

impl DriverGuard {
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self::build(inner, None)
    }

    // Same as `new` but every violation is also given to the handler
    pub fn with_error_handler(inner: Arc<dyn Driver>, on_error: ErrorHandler) -> Self {
        Self::build(inner, Some(on_error))
    }

    fn build(inner: Arc<dyn Driver>, on_error: Option<ErrorHandler>) -> Self {
        test(inner.genesis(), &BLOCK_SCHEME, "genesis", &on_error);
        Self { inner, on_error }
    }

    fn test<T: Serialize>(&self, value: T, scheme: &Scheme, path: &str) -> T {
        test(value, scheme, path, &self.on_error)
    }
}

// Checks the final signing response of a transaction built by the inner driver
struct GuardedTx {
    inner: Box<dyn PendingTx>,
    on_error: Option<ErrorHandler>,
}

#[async_trait]
impl PendingTx for GuardedTx {
    fn unsigned_tx(&self) -> &UnsignedTx {
        self.inner.unsigned_tx()
    }

    async fn sign(
        self: Box<Self>,
        delegation: Option<Delegation>,
    ) -> Result<TxResponse, DriverError> {
        let GuardedTx { inner, on_error } = *self;
        let response = inner.sign(delegation).await?;
        Ok(test(response, &TX_RESPONSE_SCHEME, "sign_tx()", &on_error))
    }
}

#[async_trait]
impl Driver for DriverGuard {
    fn genesis(&self) -> &Block {
        self.inner.genesis()
    }

    fn head(&self) -> Head {
        self.test(self.inner.head(), &HEAD_SCHEME, "head()")
    }

    fn head_polling(&self) -> HeadPolling {
        self.inner.head_polling()
    }

    async fn pull_head(&self) -> Result<Head, DriverError> {
        let head = self.inner.pull_head().await?;
        Ok(self.test(head, &HEAD_SCHEME, "pull_head()"))
    }

    async fn get_block(&self, revision: &Revision) -> Result<Option<Block>, DriverError> {
        let block = self.inner.get_block(revision).await?;
        Ok(block.map(|b| self.test(b, &BLOCK_SCHEME, "get_block()")))
    }

    async fn get_transaction(
        &self,
        id: &str,
        head_id: &str,
    ) -> Result<Option<Transaction>, DriverError> {
        let tx = self.inner.get_transaction(id, head_id).await?;
        Ok(tx.map(|tx| self.test(tx, &TX_SCHEME, "get_transaction()")))
    }

    async fn get_receipt(&self, id: &str, head_id: &str) -> Result<Option<Receipt>, DriverError> {
        let receipt = self.inner.get_receipt(id, head_id).await?;
        Ok(receipt.map(|r| self.test(r, &RECEIPT_SCHEME, "get_receipt()")))
    }

    async fn get_account(&self, address: &str, revision: &str) -> Result<Account, DriverError> {
        let account = self.inner.get_account(address, revision).await?;
        Ok(self.test(account, &ACCOUNT_SCHEME, "get_account()"))
    }

    async fn get_code(&self, address: &str, revision: &str) -> Result<Code, DriverError> {
        let code = self.inner.get_code(address, revision).await?;
        Ok(self.test(code, &CODE_SCHEME, "get_code()"))
    }

    async fn get_storage(
        &self,
        address: &str,
        key: &str,
        revision: &str,
    ) -> Result<Storage, DriverError> {
        let storage = self.inner.get_storage(address, key, revision).await?;
        Ok(self.test(storage, &STORAGE_SCHEME, "get_storage()"))
    }

    async fn filter_event_logs(
        &self,
        arg: &FilterArg<EventCriteria>,
    ) -> Result<Vec<Event>, DriverError> {
        let events = self.inner.filter_event_logs(arg).await?;
        Ok(self.test(
            events,
            &Scheme::array(EVENT_WITH_META_SCHEME.clone()),
            "filter_event_logs()",
        ))
    }

    async fn filter_transfer_logs(
        &self,
        arg: &FilterArg<TransferCriteria>,
    ) -> Result<Vec<Transfer>, DriverError> {
        let transfers = self.inner.filter_transfer_logs(arg).await?;
        Ok(self.test(
            transfers,
            &Scheme::array(TRANSFER_WITH_META_SCHEME.clone()),
            "filter_transfer_logs()",
        ))
    }

    async fn explain(
        &self,
        arg: &ExplainArg,
        revision: &str,
        cache_ties: Option<&[String]>,
    ) -> Result<Vec<VmOutput>, DriverError> {
        let outputs = self.inner.explain(arg, revision, cache_ties).await?;
        Ok(self.test(
            outputs,
            &Scheme::array(VM_OUTPUT_SCHEME.clone()),
            "explain()",
        ))
    }

    async fn pull_owned_addresses(&self) -> Result<Vec<String>, DriverError> {
        let addresses = self.inner.pull_owned_addresses().await?;
        Ok(self.test(
            addresses,
            &OWNED_ADDRESSES_SCHEME,
            "pull_owned_addresses()",
        ))
    }

    async fn is_address_owned(&self, address: &str) -> Result<bool, DriverError> {
        let owned = self.inner.is_address_owned(address).await?;
        Ok(self.test(owned, &OWNED_SCHEME, "is_address_owned()"))
    }

    async fn build_tx(
        &self,
        clauses: &[SigningClause],
        options: &TxOptions,
    ) -> Result<Box<dyn PendingTx>, DriverError> {
        let pending = self.inner.build_tx(clauses, options).await?;
        self.test(pending.unsigned_tx(), &UNSIGNED_TX_SCHEME, "build_tx()");
        Ok(Box::new(GuardedTx {
            inner: pending,
            on_error: self.on_error.clone(),
        }))
    }

    async fn sign_cert(
        &self,
        message: &CertMessage,
        options: &CertOptions,
    ) -> Result<CertResponse, DriverError> {
        let response = self.inner.sign_cert(message, options).await?;
        Ok(self.test(response, &CERT_RESPONSE_SCHEME, "sign_cert()"))
    }
}
