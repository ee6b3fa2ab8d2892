//! Signing services: transactions and certificates are built and signed by the driver

use std::sync::Arc;

use anyhow::{Context as _, Result as AnyResult};
use async_trait::async_trait;
use connex_common::{
    api::vendor::{
        CertMessage, CertOptions, CertResponse, Delegation, DelegationSignature, SigningClause,
        TxClause, TxOptions, TxResponse, UnsignedTx,
    },
    validator::{
        ensure, is_address, is_bytes32, is_safe_integer, validate, validate_serialized, Rule,
        Scheme,
    },
};
use lazy_static::lazy_static;
use log::{debug, info, log_enabled, trace, Level};
use serde_json::Value;

use crate::{
    driver::{Driver, DriverError},
    driver_guard::signature_scheme,
    error::FrameworkError,
};

lazy_static! {
    static ref TX_CLAUSES_SCHEME: Scheme = Scheme::array(Scheme::object([
        ("to", Scheme::nullable(Rule::Address)),
        ("value", Rule::BigInt.into()),
        ("data", Scheme::optional(Rule::Bytes)),
        ("comment", Scheme::optional(Rule::String)),
        (
            "abi",
            Scheme::optional(Scheme::predicate(|v: Option<&Value>| match v {
                Some(Value::Object(_)) => Ok(()),
                _ => Err("expected object".to_owned()),
            })),
        ),
    ]));
    static ref CERT_MESSAGE_SCHEME: Scheme = Scheme::object([
        (
            "purpose",
            Scheme::predicate(|v: Option<&Value>| match v.and_then(Value::as_str) {
                Some("agreement") | Some("identification") => Ok(()),
                _ => Err("expected 'agreement' or 'identification'".to_owned()),
            }),
        ),
        (
            "payload",
            Scheme::object([
                (
                    "type",
                    Scheme::predicate(|v: Option<&Value>| match v.and_then(Value::as_str) {
                        Some("text") => Ok(()),
                        _ => Err("expected 'text'".to_owned()),
                    }),
                ),
                ("content", Rule::String.into()),
            ]),
        ),
    ]);
    static ref DELEGATION_RESULT_SCHEME: Scheme =
        Scheme::object([("signature", signature_scheme())]);
}

/// Asks a third party to pay for a transaction
#[async_trait]
pub trait DelegationHandler: Send + Sync {
    async fn delegate(&self, unsigned: &UnsignedTx) -> AnyResult<Value>;
}

fn rejected(err: DriverError) -> FrameworkError {
    FrameworkError::Rejected(err.to_string())
}

// Lowercase everything the driver will sign, `0x` for missing data
fn normalize_clause(clause: TxClause) -> SigningClause {
    SigningClause {
        to: clause.to.map(|to| to.to_lowercase()),
        value: clause.value.to_string().to_lowercase(),
        data: clause
            .data
            .map(|data| data.to_lowercase())
            .unwrap_or_else(|| "0x".to_owned()),
        comment: clause.comment,
        abi: clause.abi,
    }
}

fn delegation_signature(value: Value) -> AnyResult<DelegationSignature> {
    validate(&value, &DELEGATION_RESULT_SCHEME, "delegation-result")?;
    serde_json::from_value(value).context("invalid delegation result")
}

pub struct Vendor {
    driver: Arc<dyn Driver>,
}

impl Vendor {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    pub fn sign_tx(&self) -> TxSigningService {
        TxSigningService {
            driver: Arc::clone(&self.driver),
            options: TxOptions::default(),
            handler: None,
        }
    }

    pub fn sign_cert(&self) -> CertSigningService {
        CertSigningService {
            driver: Arc::clone(&self.driver),
            options: CertOptions::default(),
        }
    }

    pub async fn owned(&self, addr: &str) -> Result<bool, FrameworkError> {
        ensure(is_address(addr), "arg0", "expected address")?;
        Ok(self.driver.is_address_owned(&addr.to_lowercase()).await?)
    }
}

pub struct TxSigningService {
    driver: Arc<dyn Driver>,
    options: TxOptions,
    handler: Option<Arc<dyn DelegationHandler>>,
}

impl TxSigningService {
    pub fn signer(mut self, addr: &str) -> Result<Self, FrameworkError> {
        ensure(is_address(addr), "arg0", "expected address")?;
        self.options.signer = Some(addr.to_lowercase());
        Ok(self)
    }

    pub fn gas(mut self, gas: u64) -> Result<Self, FrameworkError> {
        ensure(is_safe_integer(gas), "arg0", "expected non-neg safe integer")?;
        self.options.gas = Some(gas);
        Ok(self)
    }

    pub fn depends_on(mut self, txid: &str) -> Result<Self, FrameworkError> {
        ensure(is_bytes32(txid), "arg0", "expected bytes32")?;
        self.options.depends_on = Some(txid.to_lowercase());
        Ok(self)
    }

    // Url the user is sent to once the transaction is signed, `{txid}` is replaced
    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.options.link = Some(url.into());
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.options.comment = Some(text.into());
        self
    }

    pub fn delegate(mut self, handler: Arc<dyn DelegationHandler>) -> Self {
        self.options.delegated = true;
        self.handler = Some(handler);
        self
    }

    pub async fn request(&self, clauses: Vec<TxClause>) -> Result<TxResponse, FrameworkError> {
        validate_serialized(&clauses, &TX_CLAUSES_SCHEME, "arg0")?;

        let clauses: Vec<SigningClause> = clauses.into_iter().map(normalize_clause).collect();
        trace!("build tx with {} clause(s)", clauses.len());
        let pending = self
            .driver
            .build_tx(&clauses, &self.options)
            .await
            .map_err(rejected)?;

        let delegation = match &self.handler {
            Some(handler) => {
                let result = handler
                    .delegate(pending.unsigned_tx())
                    .await
                    .and_then(delegation_signature);

                Some(match result {
                    Ok(dsig) => Delegation {
                        signature: Some(dsig.signature),
                        error: None,
                    },
                    Err(e) => {
                        if log_enabled!(Level::Debug) {
                            debug!("delegation failed: {:#}", e);
                        }
                        Delegation {
                            signature: None,
                            error: Some(format!("{:#}", e)),
                        }
                    }
                })
            }
            None => None,
        };

        let response = pending.sign(delegation).await.map_err(rejected)?;
        info!("transaction {} signed by {}", response.txid, response.signer);
        Ok(response)
    }
}

pub struct CertSigningService {
    driver: Arc<dyn Driver>,
    options: CertOptions,
}

impl CertSigningService {
    pub fn signer(mut self, addr: &str) -> Result<Self, FrameworkError> {
        ensure(is_address(addr), "arg0", "expected address")?;
        self.options.signer = Some(addr.to_lowercase());
        Ok(self)
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.options.link = Some(url.into());
        self
    }

    pub async fn request(&self, message: &CertMessage) -> Result<CertResponse, FrameworkError> {
        validate_serialized(message, &CERT_MESSAGE_SCHEME, "arg0")?;

        trace!("sign certificate for {}", message.purpose);
        self.driver
            .sign_cert(message, &self.options)
            .await
            .map_err(rejected)
    }
}
