use std::time::Duration;

use anyhow::Error as AnyError;
use async_trait::async_trait;
use connex_common::api::{
    thor::{
        Account, Block, Code, EventCriteria, Event, ExplainArg, FilterArg, Head, Receipt,
        Revision, Storage, Transaction, Transfer, TransferCriteria, VmOutput,
    },
    vendor::{
        CertMessage, CertOptions, CertResponse, Delegation, SigningClause, TxOptions, TxResponse,
        UnsignedTx,
    },
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    // Permanent, the driver will not serve any further request
    #[error("driver is closed")]
    Closed,
    #[error(transparent)]
    Any(#[from] AnyError),
}

impl DriverError {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

// How the driver delivers new heads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadPolling {
    // `pull_head` only returns once the head has changed, pull again right away
    LongPoll,
    // `pull_head` returns the current head, wait between two pulls
    Interval(Duration),
}

// Transaction built by the driver that still has to be signed
#[async_trait]
pub trait PendingTx: Send + Sync {
    fn unsigned_tx(&self) -> &UnsignedTx;

    async fn sign(self: Box<Self>, delegation: Option<Delegation>)
        -> Result<TxResponse, DriverError>;
}

/// Transport doing the real work: node queries and signing
///
/// Addresses and hashes it receives are lowercase `0x` hex strings.
#[async_trait]
pub trait Driver: Send + Sync {
    fn genesis(&self) -> &Block;

    // Head known by the driver when the framework is created
    fn head(&self) -> Head;

    fn head_polling(&self) -> HeadPolling {
        HeadPolling::Interval(connex_common::config::DEFAULT_POLL_INTERVAL)
    }

    // Fails with `DriverError::Closed` once the driver is shut down,
    // any other error is considered transient
    async fn pull_head(&self) -> Result<Head, DriverError>;

    async fn get_block(&self, revision: &Revision) -> Result<Option<Block>, DriverError>;

    async fn get_transaction(
        &self,
        id: &str,
        head_id: &str,
    ) -> Result<Option<Transaction>, DriverError>;

    async fn get_receipt(&self, id: &str, head_id: &str) -> Result<Option<Receipt>, DriverError>;

    async fn get_account(&self, address: &str, revision: &str) -> Result<Account, DriverError>;

    async fn get_code(&self, address: &str, revision: &str) -> Result<Code, DriverError>;

    async fn get_storage(
        &self,
        address: &str,
        key: &str,
        revision: &str,
    ) -> Result<Storage, DriverError>;

    async fn filter_event_logs(
        &self,
        arg: &FilterArg<EventCriteria>,
    ) -> Result<Vec<Event>, DriverError>;

    async fn filter_transfer_logs(
        &self,
        arg: &FilterArg<TransferCriteria>,
    ) -> Result<Vec<Transfer>, DriverError>;

    async fn explain(
        &self,
        arg: &ExplainArg,
        revision: &str,
        cache_ties: Option<&[String]>,
    ) -> Result<Vec<VmOutput>, DriverError>;

    async fn pull_owned_addresses(&self) -> Result<Vec<String>, DriverError>;

    async fn is_address_owned(&self, address: &str) -> Result<bool, DriverError> {
        let owned = self.pull_owned_addresses().await?;
        Ok(owned.iter().any(|a| a.eq_ignore_ascii_case(address)))
    }

    async fn build_tx(
        &self,
        clauses: &[SigningClause],
        options: &TxOptions,
    ) -> Result<Box<dyn PendingTx>, DriverError>;

    async fn sign_cert(
        &self,
        message: &CertMessage,
        options: &CertOptions,
    ) -> Result<CertResponse, DriverError>;
}
