pub mod thor;
pub mod vendor;

use std::fmt;

use serde::{Deserialize, Serialize};

// Integer provided by a caller, either as a JSON number or as a decimal/hex string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Default for Quantity {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Quantity {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
