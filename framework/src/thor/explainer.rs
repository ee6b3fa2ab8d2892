use connex_common::{
    api::thor::{Clause, ClauseInput, ExplainArg, VmOutput},
    validator::{
        ensure, is_address, is_dec_string, is_hex_string, is_safe_integer, validate_serialized,
        Rule, Scheme, ValidationError,
    },
};
use lazy_static::lazy_static;
use log::trace;

use super::Context;
use crate::error::FrameworkError;

lazy_static! {
    static ref CLAUSES_SCHEME: Scheme = Scheme::array(Scheme::object([
        ("to", Scheme::nullable(Rule::Address)),
        ("value", Rule::BigInt.into()),
        ("data", Scheme::optional(Rule::Bytes)),
    ]));
}

// Options shared by every simulated call
#[derive(Debug, Clone, Default)]
pub(crate) struct CallOptions {
    caller: Option<String>,
    gas: Option<u64>,
    gas_price: Option<String>,
    cache_ties: Option<Vec<String>>,
}

impl CallOptions {
    pub(crate) fn set_caller(&mut self, addr: &str) -> Result<(), ValidationError> {
        ensure(is_address(addr), "caller", "expected address")?;
        self.caller = Some(addr.to_lowercase());
        Ok(())
    }

    pub(crate) fn set_gas(&mut self, gas: u64) -> Result<(), ValidationError> {
        ensure(is_safe_integer(gas), "gas", "expected non-neg safe integer")?;
        self.gas = Some(gas);
        Ok(())
    }

    pub(crate) fn set_gas_price(&mut self, gp: &str) -> Result<(), ValidationError> {
        ensure(
            is_dec_string(gp) || is_hex_string(gp),
            "gasPrice",
            "expected unsigned integer in string",
        )?;
        self.gas_price = Some(gp.to_owned());
        Ok(())
    }

    pub(crate) fn set_cache(&mut self, ties: &[&str]) -> Result<(), ValidationError> {
        for (i, tie) in ties.iter().enumerate() {
            ensure(is_address(tie), format!("ties.#{}", i), "expected address")?;
        }
        self.cache_ties = Some(ties.iter().map(|t| t.to_lowercase()).collect());
        Ok(())
    }

    pub(crate) fn to_arg(&self, clauses: Vec<Clause>) -> ExplainArg {
        ExplainArg {
            clauses,
            caller: self.caller.clone(),
            gas: self.gas,
            gas_price: self.gas_price.clone(),
        }
    }

    // Simulate the clauses at the current head
    pub(crate) async fn explain(
        &self,
        ctx: &Context,
        clauses: Vec<Clause>,
    ) -> Result<Vec<VmOutput>, FrameworkError> {
        let arg = self.to_arg(clauses);
        let head = ctx.head();
        trace!("explain {} clause(s) at {}", arg.clauses.len(), head.id);

        Ok(ctx
            .driver()
            .explain(&arg, &head.id, self.cache_ties.as_deref())
            .await?)
    }
}

// Clause as sent to the driver: lowercase strings, `0x` for missing data
pub(crate) fn normalize_clause(clause: ClauseInput) -> Clause {
    Clause {
        to: clause.to.map(|to| to.to_lowercase()),
        value: clause.value.to_string().to_lowercase(),
        data: clause
            .data
            .map(|data| data.to_lowercase())
            .unwrap_or_else(|| "0x".to_owned()),
    }
}

/// Simulates a batch of clauses without sending any transaction
pub struct Explainer {
    ctx: Context,
    options: CallOptions,
}

impl Explainer {
    pub(crate) fn new(ctx: Context) -> Self {
        Self {
            ctx,
            options: CallOptions::default(),
        }
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

    // Addresses whose state changes invalidate a cached result
    pub fn cache(mut self, ties: &[&str]) -> Result<Self, FrameworkError> {
        self.options.set_cache(ties)?;
        Ok(self)
    }

    pub async fn execute(&self, clauses: Vec<ClauseInput>) -> Result<Vec<VmOutput>, FrameworkError> {
        validate_serialized(&clauses, &CLAUSES_SCHEME, "clauses")?;

        let clauses = clauses.into_iter().map(normalize_clause).collect();
        self.options.explain(&self.ctx, clauses).await
    }
}
