use std::fmt;

use serde_json::Value;

use crate::config::{ADDRESS_SIZE, HASH_SIZE, MAX_SAFE_INTEGER};

// Accept both `0x` and `0X`, hex digits are case-insensitive too
fn strip_hex_prefix(val: &str) -> Option<&str> {
    val.strip_prefix("0x").or_else(|| val.strip_prefix("0X"))
}

pub fn is_dec_string(val: &str) -> bool {
    !val.is_empty() && val.bytes().all(|c| c.is_ascii_digit())
}

// `0x` followed by at least one hex digit, odd length allowed
pub fn is_hex_string(val: &str) -> bool {
    match strip_hex_prefix(val) {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

// `0x` followed by an even number of hex digits
// When `n` is set, exactly `n` bytes are required
pub fn is_hex_bytes(val: &str, n: Option<usize>) -> bool {
    let Some(digits) = strip_hex_prefix(val) else {
        return false;
    };
    if !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    match n {
        Some(n) => val.len() == n * 2 + 2,
        None => val.len() % 2 == 0,
    }
}

pub fn is_address(val: &str) -> bool {
    is_hex_bytes(val, Some(ADDRESS_SIZE))
}

pub fn is_bytes32(val: &str) -> bool {
    is_hex_bytes(val, Some(HASH_SIZE))
}

pub fn is_safe_integer(val: u64) -> bool {
    val <= MAX_SAFE_INTEGER
}

// A JSON number holding a non-negative integer strictly below 2^bits
fn is_uint(value: &Value, bits: u32) -> bool {
    let Value::Number(n) = value else {
        return false;
    };

    if let Some(v) = n.as_u64() {
        return bits >= 64 || v < (1u64 << bits);
    }

    match n.as_f64() {
        Some(f) => f >= 0.0 && f.fract() == 0.0 && f < 2f64.powi(bits as i32),
        None => false,
    }
}

fn is_safe_number(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };

    if let Some(v) = n.as_u64() {
        return is_safe_integer(v);
    }

    match n.as_f64() {
        Some(f) => f >= 0.0 && f.fract() == 0.0 && f <= MAX_SAFE_INTEGER as f64,
        None => false,
    }
}

/// Base rules a scheme can be built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Hex encoded bytes of any length
    Bytes,
    /// Hex encoded bytes of exactly N bytes
    FixedBytes(usize),
    /// 20 bytes
    Address,
    Uint8,
    Uint32,
    Uint64,
    Bool,
    /// Non-negative safe integer, or a decimal/hex string
    BigInt,
    /// Integer already encoded in hex, odd length allowed
    HexString,
    String,
}

impl Rule {
    pub const BYTES8: Rule = Rule::FixedBytes(8);
    pub const BYTES32: Rule = Rule::FixedBytes(HASH_SIZE);

    // Run the predicate of this rule
    // A missing value never satisfies a base rule
    pub fn check(&self, value: Option<&Value>) -> Result<(), String> {
        let ok = match value {
            Some(value) => self.matches(value),
            None => false,
        };

        if ok {
            Ok(())
        } else {
            Err(self.expectation())
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Bytes => value.as_str().is_some_and(|s| is_hex_bytes(s, None)),
            Self::FixedBytes(n) => value.as_str().is_some_and(|s| is_hex_bytes(s, Some(*n))),
            Self::Address => value.as_str().is_some_and(is_address),
            Self::Uint8 => is_uint(value, 8),
            Self::Uint32 => is_uint(value, 32),
            Self::Uint64 => is_uint(value, 64),
            Self::Bool => value.is_boolean(),
            Self::BigInt => match value {
                Value::String(s) => is_dec_string(s) || is_hex_string(s),
                other => is_safe_number(other),
            },
            Self::HexString => value.as_str().is_some_and(is_hex_string),
            Self::String => value.is_string(),
        }
    }

    pub fn expectation(&self) -> String {
        match self {
            Self::Bytes => "expected bytes in hex string".to_owned(),
            Self::FixedBytes(n) => format!("expected bytes{}", n),
            Self::Address => "expected address".to_owned(),
            Self::Uint8 => "expected unsigned 8-bit integer".to_owned(),
            Self::Uint32 => "expected unsigned 32-bit integer".to_owned(),
            Self::Uint64 => "expected unsigned 64-bit integer".to_owned(),
            Self::Bool => "expected boolean".to_owned(),
            Self::BigInt => "expected unsigned integer in number or string".to_owned(),
            Self::HexString => "expected integer in hex string".to_owned(),
            Self::String => "expected string".to_owned(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::FixedBytes(n) => write!(f, "bytes{}", n),
            Self::Address => write!(f, "address"),
            Self::Uint8 => write!(f, "uint8"),
            Self::Uint32 => write!(f, "uint32"),
            Self::Uint64 => write!(f, "uint64"),
            Self::Bool => write!(f, "bool"),
            Self::BigInt => write!(f, "big_int"),
            Self::HexString => write!(f, "hex_string"),
            Self::String => write!(f, "string"),
        }
    }
}
