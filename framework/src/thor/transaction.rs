use connex_common::{
    api::thor::{Receipt, Transaction},
    validator::{ensure, is_bytes32},
};
use log::trace;

use super::Context;
use crate::error::FrameworkError;

pub struct TransactionVisitor {
    ctx: Context,
    id: String,
}

impl TransactionVisitor {
    pub(crate) fn new(ctx: Context, id: &str) -> Result<Self, FrameworkError> {
        ensure(is_bytes32(id), "id", "expected bytes32")?;
        Ok(Self {
            ctx,
            id: id.to_lowercase(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn get(&self) -> Result<Option<Transaction>, FrameworkError> {
        let head = self.ctx.head();
        trace!("get transaction {} at {}", self.id, head.id);
        Ok(self.ctx.driver().get_transaction(&self.id, &head.id).await?)
    }

    pub async fn get_receipt(&self) -> Result<Option<Receipt>, FrameworkError> {
        let head = self.ctx.head();
        trace!("get receipt {} at {}", self.id, head.id);
        Ok(self.ctx.driver().get_receipt(&self.id, &head.id).await?)
    }
}
