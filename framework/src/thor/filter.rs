use async_trait::async_trait;
use connex_common::{
    api::thor::{
        Event, EventCriteria, FilterArg, FilterOptions, FilterRange, Order, Transfer,
        TransferCriteria,
    },
    config::MAX_FILTER_LIMIT,
    validator::{ensure, is_safe_integer, validate_serialized, Rule, Scheme},
};
use lazy_static::lazy_static;
use log::{log_enabled, trace, Level};
use serde::Serialize;

use super::Context;
use crate::{
    driver::{Driver, DriverError},
    error::FrameworkError,
};

lazy_static! {
    static ref EVENT_CRITERIA_SCHEME: Scheme = Scheme::array(Scheme::object([
        ("address", Scheme::optional(Rule::Address)),
        ("topic0", Scheme::optional(Rule::BYTES32)),
        ("topic1", Scheme::optional(Rule::BYTES32)),
        ("topic2", Scheme::optional(Rule::BYTES32)),
        ("topic3", Scheme::optional(Rule::BYTES32)),
        ("topic4", Scheme::optional(Rule::BYTES32)),
    ]));
    static ref TRANSFER_CRITERIA_SCHEME: Scheme = Scheme::array(Scheme::object([
        ("txOrigin", Scheme::optional(Rule::Address)),
        ("sender", Scheme::optional(Rule::Address)),
        ("recipient", Scheme::optional(Rule::Address)),
    ]));
}

fn lowercase(field: &mut Option<String>) {
    if let Some(value) = field.as_mut() {
        *value = value.to_lowercase();
    }
}

/// Kind of logs a [`Filter`] is looking for
#[async_trait]
pub trait FilterKind: Send + Sync {
    type Criteria: Serialize + Clone + Send + Sync;
    type Log: Send;

    fn criteria_scheme(&self) -> &Scheme;

    // Lowercase every address/hash of a criteria already validated
    fn normalize(&self, criteria: &mut Self::Criteria);

    async fn fetch(
        &self,
        driver: &dyn Driver,
        arg: &FilterArg<Self::Criteria>,
    ) -> Result<Vec<Self::Log>, DriverError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventLogs;

#[async_trait]
impl FilterKind for EventLogs {
    type Criteria = EventCriteria;
    type Log = Event;

    fn criteria_scheme(&self) -> &Scheme {
        &EVENT_CRITERIA_SCHEME
    }

    fn normalize(&self, criteria: &mut EventCriteria) {
        lowercase(&mut criteria.address);
        lowercase(&mut criteria.topic0);
        lowercase(&mut criteria.topic1);
        lowercase(&mut criteria.topic2);
        lowercase(&mut criteria.topic3);
        lowercase(&mut criteria.topic4);
    }

    async fn fetch(
        &self,
        driver: &dyn Driver,
        arg: &FilterArg<EventCriteria>,
    ) -> Result<Vec<Event>, DriverError> {
        driver.filter_event_logs(arg).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferLogs;

#[async_trait]
impl FilterKind for TransferLogs {
    type Criteria = TransferCriteria;
    type Log = Transfer;

    fn criteria_scheme(&self) -> &Scheme {
        &TRANSFER_CRITERIA_SCHEME
    }

    fn normalize(&self, criteria: &mut TransferCriteria) {
        lowercase(&mut criteria.tx_origin);
        lowercase(&mut criteria.sender);
        lowercase(&mut criteria.recipient);
    }

    async fn fetch(
        &self,
        driver: &dyn Driver,
        arg: &FilterArg<TransferCriteria>,
    ) -> Result<Vec<Transfer>, DriverError> {
        driver.filter_transfer_logs(arg).await
    }
}

/// Log filter, configured step by step then applied page per page
pub struct Filter<K: FilterKind> {
    ctx: Context,
    kind: K,
    body: FilterArg<K::Criteria>,
}

impl<K: FilterKind + Default> Filter<K> {
    pub(crate) fn new(ctx: Context, body: FilterArg<K::Criteria>) -> Self {
        Self {
            ctx,
            kind: K::default(),
            body,
        }
    }
}

impl<K: FilterKind> Filter<K> {
    // Request body the next `apply` will send, minus the page options
    pub fn body(&self) -> &FilterArg<K::Criteria> {
        &self.body
    }

    pub fn criteria(mut self, mut set: Vec<K::Criteria>) -> Result<Self, FrameworkError> {
        validate_serialized(&set, self.kind.criteria_scheme(), "arg0")?;

        for criteria in set.iter_mut() {
            self.kind.normalize(criteria);
        }
        self.body.criteria_set = set;
        Ok(self)
    }

    pub fn range(mut self, range: FilterRange) -> Result<Self, FrameworkError> {
        ensure(
            is_safe_integer(range.from),
            "arg0.from",
            "expected non-neg safe integer",
        )?;
        ensure(
            is_safe_integer(range.to),
            "arg0.to",
            "expected non-neg safe integer",
        )?;

        self.body.range = range;
        Ok(self)
    }

    pub fn order(mut self, order: Order) -> Self {
        self.body.order = order;
        self
    }

    // Fetch `limit` logs starting at `offset`
    pub async fn apply(&self, offset: u64, limit: u32) -> Result<Vec<K::Log>, FrameworkError> {
        ensure(
            is_safe_integer(offset),
            "arg0",
            "expected non-neg safe integer",
        )?;
        ensure(
            limit <= MAX_FILTER_LIMIT,
            "arg1",
            format!("expected integer in [0, {}]", MAX_FILTER_LIMIT),
        )?;

        let arg = FilterArg {
            options: FilterOptions { offset, limit },
            ..self.body.clone()
        };

        if log_enabled!(Level::Trace) {
            trace!(
                "filter logs, range {}..{}, offset {}, limit {}, {} criteria",
                arg.range.from,
                arg.range.to,
                offset,
                limit,
                arg.criteria_set.len()
            );
        }

        Ok(self.kind.fetch(self.ctx.driver(), &arg).await?)
    }
}
