//! The shared cross-widget settings value.
//!
//! One `Settings` value is owned by the widgets manager and broadcast to every
//! bridge element opting into shared context. Updates are merge-patches: the
//! patch is shallow-unioned over the previous value, never replacing it
//! wholesale except on `initialize`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A string-keyed bag of shared settings, e.g. `{"theme": "dark"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    /// Creates an empty settings value.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a setting, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Shallow right-biased merge: keys present in `patch` win, keys absent
    /// from `patch` are preserved.
    #[must_use]
    pub fn merged(mut self, patch: Self) -> Self {
        self.0.extend(patch.0);
        self
    }

    /// Number of settings keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_preserves_absent_keys() {
        let defaults = Settings::new().with("theme", "light").with("locale", "en");
        let merged = defaults.merged(Settings::new().with("theme", "dark"));
        assert_eq!(merged.get("theme"), Some(&json!("dark")));
        assert_eq!(merged.get("locale"), Some(&json!("en")));
    }

    #[test]
    fn serde_round_trip_is_transparent() {
        let settings = Settings::new().with("theme", "dark");
        let as_json = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(as_json, json!({"theme": "dark"}));
    }
}
