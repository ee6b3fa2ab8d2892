use connex_common::{
    api::thor::{Block, Revision},
    validator::{ensure, is_bytes32},
};
use log::trace;

use super::Context;
use crate::error::FrameworkError;

pub struct BlockVisitor {
    ctx: Context,
    revision: Revision,
}

impl BlockVisitor {
    pub(crate) fn new(ctx: Context, revision: Option<Revision>) -> Result<Self, FrameworkError> {
        let revision = match revision {
            Some(Revision::Id(id)) => {
                ensure(is_bytes32(&id), "revision", "expected bytes32")?;
                Revision::Id(id.to_lowercase())
            }
            Some(number @ Revision::Number(_)) => number,
            None => Revision::Id(ctx.head().id),
        };

        Ok(Self { ctx, revision })
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    // `None` if the driver doesn't know the block
    pub async fn get(&self) -> Result<Option<Block>, FrameworkError> {
        trace!("get block {}", self.revision);
        Ok(self.ctx.driver().get_block(&self.revision).await?)
    }
}
