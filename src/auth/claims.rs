//! Caller identity attached to a request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authorization level that passes every role check.
pub const SUPERUSER_LEVEL: i64 = 100;

/// Decoded claims of a verified access token, or the identity a trusted
/// service supplied. Created per request and never persisted.
///
/// `level` and `roles` read as `0` and the empty set when the claims lack them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Map<String, Value>);

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Authorization tier.
    pub fn level(&self) -> i64 {
        self.0.get("level").and_then(Value::as_i64).unwrap_or(0)
    }

    /// Role names. Non-string entries are ignored.
    pub fn roles(&self) -> BTreeSet<&str> {
        self.0
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        let own = self.roles();
        roles.iter().any(|r| own.contains(r.as_ref()))
    }

    pub fn is_superuser(&self) -> bool {
        self.level() == SUPERUSER_LEVEL
    }
}

impl From<Map<String, Value>> for Identity {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
