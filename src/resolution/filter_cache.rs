use dashmap::DashMap;
use tracing::trace;

use crate::errors::Result;

/// Memoizes the outcome of evaluating a where condition against an object type.
///
/// Both key parts are case-insensitive and the condition is trimmed. Keys are
/// kept as tuples, so `("A", "B|C")` and `("A|B", "C")` never collide.
#[derive(Debug, Default)]
pub struct FilterConditionCache {
    entries: DashMap<(String, String), bool>,
}

fn cache_key(object_type: &str, where_condition: &str) -> (String, String) {
    (
        object_type.trim().to_lowercase(),
        where_condition.trim().to_lowercase(),
    )
}

impl FilterConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached outcome, or `None` if the pair was never added.
    pub fn try_get(&self, object_type: &str, where_condition: &str) -> Option<bool> {
        self.entries
            .get(&cache_key(object_type, where_condition))
            .map(|entry| *entry.value())
    }

    /// Publishes an outcome; the last write wins.
    pub fn add(&self, object_type: &str, where_condition: &str, value: bool) {
        self.entries
            .insert(cache_key(object_type, where_condition), value);
    }

    /// Returns the cached outcome or evaluates and publishes it.
    ///
    /// Errors from `evaluate` propagate and nothing is cached for them.
    pub fn get_or_evaluate<F>(
        &self,
        object_type: &str,
        where_condition: &str,
        evaluate: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        if let Some(value) = self.try_get(object_type, where_condition) {
            trace!(object_type, where_condition, value, "filter condition cache hit");
            return Ok(value);
        }
        let value = evaluate()?;
        self.add(object_type, where_condition, value);
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
