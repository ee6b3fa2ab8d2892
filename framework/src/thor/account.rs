use std::sync::Arc;

use connex_common::{
    api::thor::{Account, Code, Storage},
    validator::{ensure, is_address, is_bytes32},
};
use log::trace;

use super::{AbiEvent, AbiFunction, Context, EventVisitor, Method};
use crate::error::FrameworkError;

pub struct AccountVisitor {
    ctx: Context,
    address: String,
}

impl AccountVisitor {
    pub(crate) fn new(ctx: Context, address: &str) -> Result<Self, FrameworkError> {
        ensure(is_address(address), "addr", "expected address")?;
        Ok(Self {
            ctx,
            address: address.to_lowercase(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn get(&self) -> Result<Account, FrameworkError> {
        let head = self.ctx.head();
        trace!("get account {} at {}", self.address, head.id);
        Ok(self.ctx.driver().get_account(&self.address, &head.id).await?)
    }

    pub async fn get_code(&self) -> Result<Code, FrameworkError> {
        let head = self.ctx.head();
        trace!("get code of {} at {}", self.address, head.id);
        Ok(self.ctx.driver().get_code(&self.address, &head.id).await?)
    }

    pub async fn get_storage(&self, key: &str) -> Result<Storage, FrameworkError> {
        ensure(is_bytes32(key), "key", "expected bytes32")?;

        let key = key.to_lowercase();
        let head = self.ctx.head();
        trace!("get storage {} of {} at {}", key, self.address, head.id);
        Ok(self
            .ctx
            .driver()
            .get_storage(&self.address, &key, &head.id)
            .await?)
    }

    // Contract method of this account described by `abi`
    pub fn method(&self, abi: Arc<dyn AbiFunction>) -> Method {
        Method::new(self.ctx.clone(), self.address.clone(), abi)
    }

    // Contract event of this account described by `abi`
    pub fn event(&self, abi: Arc<dyn AbiEvent>) -> EventVisitor {
        EventVisitor::new(self.ctx.clone(), self.address.clone(), abi)
    }
}
