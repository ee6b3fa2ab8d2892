mod account;
mod block;
mod event;
mod explainer;
mod filter;
mod method;
mod transaction;

use std::sync::Arc;

use connex_common::api::thor::{
    Block, EventCriteria, FilterArg, Head, Revision, Status, TransferCriteria,
};

use crate::{
    config::FrameworkConfig,
    driver::Driver,
    error::FrameworkError,
    head_tracker::{HeadTracker, Ticker},
};

pub use account::AccountVisitor;
pub use block::BlockVisitor;
pub use event::{AbiEvent, EventFilter, EventVisitor};
pub use explainer::Explainer;
pub use filter::{EventLogs, Filter, FilterKind, TransferLogs};
pub use method::{AbiFunction, Method};
pub use transaction::TransactionVisitor;

// Shared by every visitor and builder created from the same `Thor`
#[derive(Clone)]
pub(crate) struct Context {
    driver: Arc<dyn Driver>,
    tracker: Arc<HeadTracker>,
}

impl Context {
    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    // Read at call time so every query is pinned to the latest known head
    pub(crate) fn head(&self) -> Head {
        self.tracker.head()
    }
}

/// Chain facade: queries are pinned to the head tracked in the background
pub struct Thor {
    ctx: Context,
}

impl Thor {
    // Start tracking from the head currently known by the driver
    pub fn new(driver: Arc<dyn Driver>, config: &FrameworkConfig) -> Self {
        let initial_head = driver.head();
        Self::with_head(driver, initial_head, config)
    }

    pub fn with_head(driver: Arc<dyn Driver>, initial_head: Head, config: &FrameworkConfig) -> Self {
        let genesis_timestamp = driver.genesis().timestamp;
        let tracker = HeadTracker::new(Arc::clone(&driver), genesis_timestamp, initial_head, config);

        Self {
            ctx: Context {
                driver,
                tracker: Arc::new(tracker),
            },
        }
    }

    pub fn genesis(&self) -> &Block {
        self.ctx.driver.genesis()
    }

    pub fn status(&self) -> Status {
        Status {
            head: self.ctx.tracker.head(),
            progress: self.ctx.tracker.progress(),
        }
    }

    pub fn ticker(&self) -> Ticker {
        self.ctx.tracker.ticker()
    }

    pub fn head_tracker(&self) -> &HeadTracker {
        &self.ctx.tracker
    }

    pub fn account(&self, address: &str) -> Result<AccountVisitor, FrameworkError> {
        AccountVisitor::new(self.ctx.clone(), address)
    }

    // Without revision, the block is pinned to the current head
    pub fn block(&self, revision: Option<Revision>) -> Result<BlockVisitor, FrameworkError> {
        BlockVisitor::new(self.ctx.clone(), revision)
    }

    pub fn transaction(&self, id: &str) -> Result<TransactionVisitor, FrameworkError> {
        TransactionVisitor::new(self.ctx.clone(), id)
    }

    pub fn filter_events(&self) -> Filter<EventLogs> {
        Filter::new(self.ctx.clone(), FilterArg::<EventCriteria>::default())
    }

    pub fn filter_transfers(&self) -> Filter<TransferLogs> {
        Filter::new(self.ctx.clone(), FilterArg::<TransferCriteria>::default())
    }

    pub fn explain(&self) -> Explainer {
        Explainer::new(self.ctx.clone())
    }
}
