use std::sync::Arc;

use anyhow::Result as AnyResult;
use connex_common::{
    api::{
        thor::{Clause, VmOutput},
        Quantity,
    },
    validator::{ensure, validate_serialized, Rule, Scheme, ValidationError},
};
use log::{debug, log_enabled, Level};
use serde_json::Value;

use super::{explainer::CallOptions, Context};
use crate::error::FrameworkError;

/// ABI coder of a single contract function
pub trait AbiFunction: Send + Sync {
    fn input_count(&self) -> usize;

    // Hex encoded call data, selector included
    fn encode(&self, args: &[Value]) -> AnyResult<String>;

    fn decode(&self, data: &str) -> AnyResult<Value>;
}

/// Contract function bound to an account
pub struct Method {
    ctx: Context,
    address: String,
    abi: Arc<dyn AbiFunction>,
    value: Quantity,
    options: CallOptions,
}

impl Method {
    pub(crate) fn new(ctx: Context, address: String, abi: Arc<dyn AbiFunction>) -> Self {
        Self {
            ctx,
            address,
            abi,
            value: Quantity::default(),
            options: CallOptions::default(),
        }
    }

    // Amount of VET sent along the call
    pub fn value(mut self, value: impl Into<Quantity>) -> Result<Self, FrameworkError> {
        let value = value.into();
        validate_serialized(&value, &Scheme::from(Rule::BigInt), "value")?;
        self.value = value;
        Ok(self)
    }

    pub fn caller(mut self, addr: &str) -> Result<Self, FrameworkError> {
        self.options.set_caller(addr)?;
        Ok(self)
    }

    pub fn gas(mut self, gas: u64) -> Result<Self, FrameworkError> {
        self.options.set_gas(gas)?;
        Ok(self)
    }

    pub fn gas_price(mut self, gp: &str) -> Result<Self, FrameworkError> {
        self.options.set_gas_price(gp)?;
        Ok(self)
    }

    pub fn cache(mut self, ties: &[&str]) -> Result<Self, FrameworkError> {
        self.options.set_cache(ties)?;
        Ok(self)
    }

    pub fn as_clause(&self, args: &[Value]) -> Result<Clause, FrameworkError> {
        let expected = self.abi.input_count();
        ensure(
            args.len() == expected,
            "args",
            format!("expected {} argument(s), got {}", expected, args.len()),
        )?;

        let data = self
            .abi
            .encode(args)
            .map_err(|e| ValidationError::new("args", format!("{:#}", e)))?;

        Ok(Clause {
            to: Some(self.address.clone()),
            value: self.value.to_string(),
            data,
        })
    }

    // Simulate the call at the current head, output decoded unless reverted
    pub async fn call(&self, args: &[Value]) -> Result<VmOutput, FrameworkError> {
        let clause = self.as_clause(args)?;
        let mut output = self
            .options
            .explain(&self.ctx, vec![clause])
            .await?
            .into_iter()
            .next()
            .ok_or(FrameworkError::EmptyOutput)?;

        if output.reverted {
            if log_enabled!(Level::Debug) {
                debug!("call to {} reverted: {}", self.address, output.vm_error);
            }
        } else {
            let decoded = self.abi.decode(&output.data).map_err(FrameworkError::Decode)?;
            output.decoded = Some(decoded);
        }

        Ok(output)
    }
}
