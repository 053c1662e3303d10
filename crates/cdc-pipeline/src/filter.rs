//! Partition-key filters.
//!
//! A pattern is either an exact key (`tenant#42`) or a prefix followed by a
//! single trailing wildcard (`tenant#*`). The same patterns render to the
//! upstream subscription filter document, so records that reach the relay
//! and records that pass [`KeyFilter::matches`] agree.

use serde_json::{json, Value};

use cdc_types::StreamRecord;

use crate::error::{FilterError, FilterResult};

/// One compiled pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyRule {
    Exact(String),
    Prefix(String),
}

impl KeyRule {
    /// Compile a single pattern.
    pub fn parse(pattern: &str) -> FilterResult<Self> {
        if pattern.is_empty() {
            return Err(FilterError::EmptyPattern);
        }
        match pattern.matches('*').count() {
            0 => Ok(Self::Exact(pattern.to_string())),
            1 => match pattern.strip_suffix('*') {
                Some(prefix) => Ok(Self::Prefix(prefix.to_string())),
                None => Err(FilterError::NonTrailingWildcard(pattern.to_string())),
            },
            _ => Err(FilterError::MultipleWildcards(pattern.to_string())),
        }
    }

    pub fn matches(&self, pk: &str) -> bool {
        match self {
            Self::Exact(key) => pk == key,
            Self::Prefix(prefix) => pk.starts_with(prefix.as_str()),
        }
    }

    fn criterion(&self) -> Value {
        match self {
            Self::Exact(key) => Value::String(key.clone()),
            Self::Prefix(prefix) => json!({ "prefix": prefix }),
        }
    }
}

/// A set of rules. A key passes if any rule matches it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyFilter {
    rules: Vec<KeyRule>,
}

impl KeyFilter {
    /// Compile every pattern. The first invalid pattern fails the whole set.
    pub fn compile<I, S>(patterns: I) -> FilterResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| KeyRule::parse(p.as_ref()))
            .collect::<FilterResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[KeyRule] {
        &self.rules
    }

    /// A filter with no rules lets every key through.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, pk: &str) -> bool {
        self.is_empty() || self.rules.iter().any(|rule| rule.matches(pk))
    }

    /// Apply the filter to a raw record by its string-typed partition key.
    ///
    /// A record whose key is absent or not string-typed does not match,
    /// which is what the upstream filter does with it.
    pub fn matches_record(&self, record: &StreamRecord, pk_attr: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        record
            .dynamodb
            .as_ref()
            .and_then(|payload| payload.keys.as_ref())
            .and_then(|keys| keys.get(pk_attr))
            .and_then(|typed| typed.get("S"))
            .and_then(Value::as_str)
            .is_some_and(|pk| self.matches(pk))
    }

    /// Render the subscription filter criteria for the upstream stream.
    pub fn to_filter_criteria(&self, pk_attr: &str) -> Value {
        let rules: Vec<Value> = self.rules.iter().map(KeyRule::criterion).collect();
        json!({ "dynamodb": { "Keys": { pk_attr: { "S": rules } } } })
    }
}
