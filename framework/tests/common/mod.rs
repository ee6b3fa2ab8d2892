// In-memory driver shared by the integration tests
#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use connex_common::api::{
    thor::{
        Account, Block, Code, Event, EventCriteria, ExplainArg, FilterArg, Head, Receipt,
        Revision, Storage, Transaction, Transfer, TransferCriteria, VmOutput,
    },
    vendor::{
        CertAnnex, CertMessage, CertOptions, CertResponse, Delegation, SigningClause, TxOptions,
        TxResponse, UnsignedTx,
    },
};
use connex_framework::driver::{Driver, DriverError, HeadPolling, PendingTx};
use tokio::sync::{mpsc, watch};

pub const GENESIS_TIMESTAMP: u64 = 1_530_014_400;

pub fn hash(n: u32) -> String {
    format!("0x{:064x}", n)
}

pub fn address(byte: &str) -> String {
    format!("0x{}", byte.repeat(20))
}

pub fn head(number: u32) -> Head {
    head_with_id(number, hash(number))
}

pub fn head_with_id(number: u32, id: String) -> Head {
    Head {
        id,
        number,
        timestamp: GENESIS_TIMESTAMP + number as u64 * 10,
        parent_id: hash(number.saturating_sub(1)),
    }
}

pub fn genesis_block() -> Block {
    Block {
        id: hash(0),
        number: 0,
        size: 170,
        parent_id: format!("0x{}", "ff".repeat(32)),
        timestamp: GENESIS_TIMESTAMP,
        gas_limit: 10_000_000,
        beneficiary: address("00"),
        gas_used: 0,
        total_score: 0,
        txs_root: hash(1000),
        txs_features: None,
        state_root: hash(1001),
        receipts_root: hash(1002),
        signer: address("00"),
        is_trunk: true,
        transactions: vec![],
    }
}

pub fn vm_output(data: &str, reverted: bool) -> VmOutput {
    VmOutput {
        data: data.to_owned(),
        vm_error: if reverted { "execution reverted".to_owned() } else { String::new() },
        gas_used: 21000,
        reverted,
        events: vec![],
        transfers: vec![],
        decoded: None,
    }
}

pub struct MockDriver {
    genesis: Block,
    initial_head: Head,
    polling: HeadPolling,
    heads: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Head, DriverError>>>,
    pulls: watch::Sender<usize>,
    calls: Mutex<Vec<String>>,
    // JSON bodies of every filter request
    filters: Mutex<Vec<serde_json::Value>>,
    pub account: Mutex<Account>,
    pub explain_outputs: Mutex<Vec<VmOutput>>,
    // Returned by every event filter
    pub events: Mutex<Vec<Event>>,
    pub owned: Mutex<Vec<String>>,
    delegations: Arc<Mutex<Vec<Option<Delegation>>>>,
    pub signing_error: Mutex<Option<String>>,
}

// Feeds the heads the mock driver hands out on `pull_head`
// Dropping it closes the driver
pub struct HeadFeed {
    sender: mpsc::UnboundedSender<Result<Head, DriverError>>,
}

impl HeadFeed {
    pub fn push(&self, head: Head) {
        self.sender.send(Ok(head)).unwrap();
    }

    pub fn fail(&self, message: &str) {
        self.sender
            .send(Err(DriverError::Any(anyhow!(message.to_owned()))))
            .unwrap();
    }

    pub fn close(self) {
        self.sender.send(Err(DriverError::Closed)).unwrap();
    }
}

impl MockDriver {
    pub fn new(polling: HeadPolling) -> (Arc<Self>, HeadFeed) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (pulls, _) = watch::channel(0);
        let genesis = genesis_block();
        let driver = Self {
            initial_head: genesis.to_head(),
            genesis,
            polling,
            heads: tokio::sync::Mutex::new(receiver),
            pulls,
            calls: Mutex::new(Vec::new()),
            filters: Mutex::new(Vec::new()),
            account: Mutex::new(Account {
                balance: "0x0".to_owned(),
                energy: "0x0".to_owned(),
                has_code: false,
            }),
            explain_outputs: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            owned: Mutex::new(Vec::new()),
            delegations: Arc::new(Mutex::new(Vec::new())),
            signing_error: Mutex::new(None),
        };

        (Arc::new(driver), HeadFeed { sender })
    }

    pub fn long_poll() -> (Arc<Self>, HeadFeed) {
        Self::new(HeadPolling::LongPoll)
    }

    // Number of `pull_head` calls started so far
    pub fn pulls(&self) -> usize {
        *self.pulls.borrow()
    }

    // Wait until the tracker came back for pull number `n`,
    // meaning every head fed before has been handled
    pub async fn wait_pulls(&self, n: usize) {
        let mut receiver = self.pulls.subscribe();
        tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(|pulls| *pulls >= n))
            .await
            .expect("tracker didn't pull in time")
            .unwrap();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn filters(&self) -> Vec<serde_json::Value> {
        self.filters.lock().unwrap().clone()
    }

    // Delegation handed to every signed transaction
    pub fn delegations(&self) -> Vec<Option<Delegation>> {
        self.delegations.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

struct MockPendingTx {
    unsigned: UnsignedTx,
    signer: String,
    delegations: Arc<Mutex<Vec<Option<Delegation>>>>,
    error: Option<String>,
}

#[async_trait]
impl PendingTx for MockPendingTx {
    fn unsigned_tx(&self) -> &UnsignedTx {
        &self.unsigned
    }

    async fn sign(
        self: Box<Self>,
        delegation: Option<Delegation>,
    ) -> Result<TxResponse, DriverError> {
        let MockPendingTx {
            signer,
            delegations,
            error,
            ..
        } = *self;

        delegations.lock().unwrap().push(delegation);
        if let Some(error) = error {
            return Err(DriverError::Any(anyhow!(error)));
        }

        Ok(TxResponse {
            txid: hash(42),
            signer,
        })
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn genesis(&self) -> &Block {
        &self.genesis
    }

    fn head(&self) -> Head {
        self.initial_head.clone()
    }

    fn head_polling(&self) -> HeadPolling {
        self.polling
    }

    async fn pull_head(&self) -> Result<Head, DriverError> {
        let mut heads = self.heads.lock().await;
        self.pulls.send_modify(|pulls| *pulls += 1);
        match heads.recv().await {
            Some(result) => result,
            None => Err(DriverError::Closed),
        }
    }

    async fn get_block(&self, revision: &Revision) -> Result<Option<Block>, DriverError> {
        self.record(format!("get_block {}", revision));
        Ok(Some(self.genesis.clone()))
    }

    async fn get_transaction(
        &self,
        id: &str,
        head_id: &str,
    ) -> Result<Option<Transaction>, DriverError> {
        self.record(format!("get_transaction {} {}", id, head_id));
        Ok(None)
    }

    async fn get_receipt(&self, id: &str, head_id: &str) -> Result<Option<Receipt>, DriverError> {
        self.record(format!("get_receipt {} {}", id, head_id));
        Ok(None)
    }

    async fn get_account(&self, address: &str, revision: &str) -> Result<Account, DriverError> {
        self.record(format!("get_account {} {}", address, revision));
        Ok(self.account.lock().unwrap().clone())
    }

    async fn get_code(&self, address: &str, revision: &str) -> Result<Code, DriverError> {
        self.record(format!("get_code {} {}", address, revision));
        Ok(Code {
            code: "0x".to_owned(),
        })
    }

    async fn get_storage(
        &self,
        address: &str,
        key: &str,
        revision: &str,
    ) -> Result<Storage, DriverError> {
        self.record(format!("get_storage {} {} {}", address, key, revision));
        Ok(Storage { value: hash(0) })
    }

    async fn filter_event_logs(
        &self,
        arg: &FilterArg<EventCriteria>,
    ) -> Result<Vec<Event>, DriverError> {
        self.record("filter_event_logs".to_owned());
        let body = serde_json::to_value(arg).map_err(|e| DriverError::Any(e.into()))?;
        self.filters.lock().unwrap().push(body);
        Ok(self.events.lock().unwrap().clone())
    }

    async fn filter_transfer_logs(
        &self,
        arg: &FilterArg<TransferCriteria>,
    ) -> Result<Vec<Transfer>, DriverError> {
        self.record("filter_transfer_logs".to_owned());
        let body = serde_json::to_value(arg).map_err(|e| DriverError::Any(e.into()))?;
        self.filters.lock().unwrap().push(body);
        Ok(vec![])
    }

    async fn explain(
        &self,
        arg: &ExplainArg,
        revision: &str,
        cache_ties: Option<&[String]>,
    ) -> Result<Vec<VmOutput>, DriverError> {
        self.record(format!(
            "explain {} {} {:?}",
            serde_json::to_value(arg).map_err(|e| DriverError::Any(e.into()))?,
            revision,
            cache_ties
        ));
        Ok(self.explain_outputs.lock().unwrap().clone())
    }

    async fn pull_owned_addresses(&self) -> Result<Vec<String>, DriverError> {
        self.record("pull_owned_addresses".to_owned());
        Ok(self.owned.lock().unwrap().clone())
    }

    async fn build_tx(
        &self,
        clauses: &[SigningClause],
        options: &TxOptions,
    ) -> Result<Box<dyn PendingTx>, DriverError> {
        self.record(format!(
            "build_tx {} {}",
            serde_json::to_string(clauses).map_err(|e| DriverError::Any(e.into()))?,
            serde_json::to_string(options).map_err(|e| DriverError::Any(e.into()))?
        ));

        let signer = options.signer.clone().unwrap_or_else(|| address("aa"));
        Ok(Box::new(MockPendingTx {
            unsigned: UnsignedTx {
                raw: "0xf8".to_owned(),
                origin: signer.clone(),
            },
            signer,
            delegations: Arc::clone(&self.delegations),
            error: self.signing_error.lock().unwrap().clone(),
        }))
    }

    async fn sign_cert(
        &self,
        message: &CertMessage,
        options: &CertOptions,
    ) -> Result<CertResponse, DriverError> {
        self.record(format!("sign_cert {}", message.purpose));
        if let Some(error) = self.signing_error.lock().unwrap().clone() {
            return Err(DriverError::Any(anyhow!(error)));
        }

        Ok(CertResponse {
            annex: CertAnnex {
                domain: "localhost".to_owned(),
                timestamp: GENESIS_TIMESTAMP,
                signer: options.signer.clone().unwrap_or_else(|| address("aa")),
            },
            signature: format!("0x{}", "11".repeat(65)),
        })
    }
}
