//! Schema validation engine
//!
//! A value is walked depth first against a [`Scheme`] and the first
//! violation is reported with the path leading to it.
//!
//! Two postures are offered:
//! - hard: [`validate`] returns an error, used on caller arguments
//!   before anything is sent to the driver.
//! - soft: [`test`] only logs the violation and hands the value back,
//!   used on driver responses so an evolving backend degrades gracefully.

mod rules;
mod scheme;

use log::warn;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::MALFORMED_RESPONSE_PREFIX;

pub use rules::*;
pub use scheme::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_message(.path, .message))]
pub struct ValidationError {
    path: String,
    message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// A violation at the root carries no path prefix
fn join_message(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_owned()
    } else {
        format!("{} {}", path, message)
    }
}

pub fn ensure(
    condition: bool,
    path: impl Into<String>,
    message: impl Into<String>,
) -> Result<(), ValidationError> {
    if condition {
        Ok(())
    } else {
        Err(ValidationError::new(path, message))
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{}.{}", path, key)
    }
}

pub fn validate(value: &Value, scheme: &Scheme, path: &str) -> Result<(), ValidationError> {
    validate_at(Some(value), scheme, path)
}

// `None` stands for an absent value (missing object key)
pub fn validate_at(
    value: Option<&Value>,
    scheme: &Scheme,
    path: &str,
) -> Result<(), ValidationError> {
    match scheme {
        Scheme::Array(inner) => {
            let items = value
                .and_then(Value::as_array)
                .ok_or_else(|| ValidationError::new(path, "expected array"))?;
            for (i, item) in items.iter().enumerate() {
                validate_at(Some(item), inner, &join_key(path, &format!("#{}", i)))?;
            }
            Ok(())
        }
        Scheme::Optional(inner) => match value {
            None => Ok(()),
            Some(_) => validate_at(value, inner, path),
        },
        Scheme::Nullable(inner) => match value {
            Some(Value::Null) => Ok(()),
            _ => validate_at(value, inner, path),
        },
        Scheme::Predicate(predicate) => match predicate(value) {
            Err(message) if !message.is_empty() => Err(ValidationError::new(path, message)),
            _ => Ok(()),
        },
        Scheme::Object(fields) => {
            let object = value
                .and_then(Value::as_object)
                .ok_or_else(|| ValidationError::new(path, "expected object"))?;
            for (key, sub) in fields.iter() {
                validate_at(object.get(*key), sub, &join_key(path, key))?;
            }
            Ok(())
        }
        Scheme::Rule(rule) => rule
            .check(value)
            .map_err(|message| ValidationError::new(path, message)),
    }
}

// Validate any serializable value through its JSON representation
pub fn validate_serialized<T: Serialize + ?Sized>(
    value: &T,
    scheme: &Scheme,
    path: &str,
) -> Result<(), ValidationError> {
    let json = serde_json::to_value(value)
        .map_err(|e| ValidationError::new(path, format!("can not be serialized: {}", e)))?;
    validate(&json, scheme, path)
}

// Soft validation: a violation is reported but the value is returned untouched
pub fn test<T: Serialize>(value: T, scheme: &Scheme, path: &str) -> T {
    test_with(value, scheme, path, None)
}

pub fn test_with<T: Serialize>(
    value: T,
    scheme: &Scheme,
    path: &str,
    on_error: Option<&(dyn Fn(&ValidationError) + Send + Sync)>,
) -> T {
    if let Err(e) = validate_serialized(&value, scheme, path) {
        warn!("{}: {}", MALFORMED_RESPONSE_PREFIX, e);
        if let Some(handler) = on_error {
            handler(&e);
        }
    }
    value
}
