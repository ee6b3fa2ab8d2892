use std::sync::Arc;

use anyhow::Result as AnyResult;
use connex_common::{
    api::thor::{Event, EventCriteria, FilterArg, FilterRange, Order},
    validator::ValidationError,
};
use serde_json::{Map, Value};

use super::{Context, EventLogs, Filter};
use crate::error::FrameworkError;

/// ABI coder of a single contract event
pub trait AbiEvent: Send + Sync {
    // Topics matching the given indexed parameters, keyed by name or position
    // The address is left unset, the visitor fills it
    fn encode_criteria(&self, indexed: &Value) -> AnyResult<EventCriteria>;

    fn decode(&self, data: &str, topics: &[String]) -> AnyResult<Value>;
}

/// Contract event emitted by an account
pub struct EventVisitor {
    ctx: Context,
    address: String,
    abi: Arc<dyn AbiEvent>,
}

impl EventVisitor {
    pub(crate) fn new(ctx: Context, address: String, abi: Arc<dyn AbiEvent>) -> Self {
        Self { ctx, address, abi }
    }

    fn encode(&self, indexed: &Value, path: String) -> Result<EventCriteria, ValidationError> {
        let criteria = self
            .abi
            .encode_criteria(indexed)
            .map_err(|e| ValidationError::new(path, format!("{:#}", e)))?;

        Ok(EventCriteria {
            address: Some(self.address.clone()),
            ..criteria
        })
    }

    // One criteria per set of indexed parameters
    pub fn as_criteria(&self, indexed: &[Value]) -> Result<Vec<EventCriteria>, FrameworkError> {
        let criteria = indexed
            .iter()
            .enumerate()
            .map(|(i, set)| self.encode(set, format!("arg0.#{}", i)))
            .collect::<Result<_, _>>()?;
        Ok(criteria)
    }

    // Filter on this event, an empty list matches every emission
    pub fn filter(&self, indexed: &[Value]) -> Result<EventFilter, FrameworkError> {
        let criteria = if indexed.is_empty() {
            vec![self.encode(&Value::Object(Map::new()), "arg0".to_owned())?]
        } else {
            self.as_criteria(indexed)?
        };

        let filter = Filter::<EventLogs>::new(self.ctx.clone(), FilterArg::default())
            .criteria(criteria)?;
        Ok(EventFilter {
            filter,
            abi: Arc::clone(&self.abi),
        })
    }
}

/// Event log filter whose results are decoded with the event ABI
pub struct EventFilter {
    filter: Filter<EventLogs>,
    abi: Arc<dyn AbiEvent>,
}

impl EventFilter {
    pub fn body(&self) -> &FilterArg<EventCriteria> {
        self.filter.body()
    }

    pub fn range(self, range: FilterRange) -> Result<Self, FrameworkError> {
        Ok(Self {
            filter: self.filter.range(range)?,
            ..self
        })
    }

    pub fn order(self, order: Order) -> Self {
        Self {
            filter: self.filter.order(order),
            ..self
        }
    }

    pub async fn apply(&self, offset: u64, limit: u32) -> Result<Vec<Event>, FrameworkError> {
        let mut events = self.filter.apply(offset, limit).await?;
        for event in events.iter_mut() {
            let decoded = self
                .abi
                .decode(&event.data, &event.topics)
                .map_err(FrameworkError::Decode)?;
            event.decoded = Some(decoded);
        }
        Ok(events)
    }
}
