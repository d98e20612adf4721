//! Locale Resolver
//!
//! Localized fields are stored as a map of locale code to value. These pure
//! functions read and write such maps. Reads never fail: when the requested
//! locale is missing they fall back to the default locale, then to the first
//! translation available.

use crate::core::value::is_empty_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Locale configuration exposed to callers through the config surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(rename = "default")]
    pub default_locale: String,
    pub supported: Vec<String>,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let names = [
            ("en", "English"),
            ("es", "Español"),
            ("fr", "Français"),
            ("de", "Deutsch"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();

        Self {
            default_locale: "en".to_string(),
            supported: vec!["en".into(), "es".into(), "fr".into(), "de".into()],
            names,
        }
    }
}

impl LocaleConfig {
    pub fn new(default_locale: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            supported,
            names: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(code.into(), name.into());
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.supported.iter().any(|code| code == locale)
    }

    /// Display name of a locale, falling back to the upper-cased code.
    pub fn locale_name(&self, locale: &str) -> String {
        self.names
            .get(locale)
            .cloned()
            .unwrap_or_else(|| locale.to_uppercase())
    }
}

/// Reads a possibly-localized value.
///
/// Non-object values are returned unchanged. For a locale map the lookup
/// order is the requested locale, then the default locale, then the first
/// non-empty translation in insertion order, then the empty string.
pub fn resolve_value(stored: &Value, requested: &str, default_locale: &str) -> Value {
    let Value::Object(map) = stored else {
        return stored.clone();
    };

    for locale in [requested, default_locale] {
        if let Some(value) = map.get(locale)
            && !is_empty_value(value)
        {
            return value.clone();
        }
    }

    map.values()
        .find(|value| !is_empty_value(value))
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()))
}

/// Writes one translation into a locale map, starting from an empty map when
/// `stored` is not already one.
pub fn set_value(stored: &Value, locale: &str, new_value: Value) -> Value {
    let mut map = match stored {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert(locale.to_string(), new_value);
    Value::Object(map)
}

/// True when `value` is an object with at least one supported locale key.
pub fn is_localized_value(value: &Value, config: &LocaleConfig) -> bool {
    match value {
        Value::Object(map) => map.keys().any(|key| config.is_supported(key)),
        _ => false,
    }
}
