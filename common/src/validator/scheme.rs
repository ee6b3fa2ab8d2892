use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;

use super::Rule;

// Custom check, `Err` carries the expectation message
// An empty message is treated as a success
pub type Predicate = Arc<dyn Fn(Option<&Value>) -> Result<(), String> + Send + Sync>;

/// Declarative description of the shape a value is expected to have
#[derive(Clone)]
pub enum Scheme {
    Rule(Rule),
    /// Homogeneous sequence
    Array(Box<Scheme>),
    /// Only the declared keys are checked, extra keys are ignored
    Object(IndexMap<&'static str, Scheme>),
    /// Passes when the value is absent
    Optional(Box<Scheme>),
    /// Passes when the value is `null`
    Nullable(Box<Scheme>),
    Predicate(Predicate),
}

impl Scheme {
    pub fn array(inner: impl Into<Scheme>) -> Self {
        Self::Array(Box::new(inner.into()))
    }

    pub fn optional(inner: impl Into<Scheme>) -> Self {
        Self::Optional(Box::new(inner.into()))
    }

    pub fn nullable(inner: impl Into<Scheme>) -> Self {
        Self::Nullable(Box::new(inner.into()))
    }

    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, S)>,
        S: Into<Scheme>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(key, scheme)| (key, scheme.into()))
                .collect(),
        )
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    // Accept anything, used for fields the driver may attach freely
    pub fn any() -> Self {
        Self::predicate(|_| Ok(()))
    }

    // Declare or replace a key of an object scheme
    // Only object schemes have keys, other schemes are a caller bug
    pub fn with(self, key: &'static str, scheme: impl Into<Scheme>) -> Self {
        debug_assert!(
            matches!(self, Self::Object(_)),
            "cannot declare key '{}' on {:?}",
            key,
            self
        );
        match self {
            Self::Object(mut fields) => {
                fields.insert(key, scheme.into());
                Self::Object(fields)
            }
            other => other,
        }
    }
}

impl From<Rule> for Scheme {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule(rule) => write!(f, "{}", rule),
            Self::Array(inner) => f.debug_list().entry(inner).finish(),
            Self::Object(fields) => f.debug_map().entries(fields.iter()).finish(),
            Self::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Self::Nullable(inner) => f.debug_tuple("Nullable").field(inner).finish(),
            Self::Predicate(_) => write!(f, "<predicate>"),
        }
    }
}
