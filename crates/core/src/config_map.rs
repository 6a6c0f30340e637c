//! Parse-tolerant string maps stored as JSON columns.
//!
//! Secrets and runs keep their environment and terraform variables as JSON
//! objects. A malformed payload must never fail a run: it is logged and
//! replaced by an empty map.

use std::collections::BTreeMap;

use serde_json::Value;

/// Ordered `string -> string` map passed to the provisioner.
pub type ConfigMap = BTreeMap<String, String>;

/// Outcome of decoding a JSON payload into a [`ConfigMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    pub map: ConfigMap,
    /// Set when the payload was present but not a flat string map.
    pub warning: Option<String>,
}

/// Decode `raw` into a [`ParsedConfig`] without ever failing.
///
/// `None` and JSON `null` decode to an empty map with no warning. Anything
/// other than an object whose values are all strings yields an empty map and
/// a warning describing the problem.
pub fn decode_config_map(raw: Option<&Value>) -> ParsedConfig {
    let Some(value) = raw else {
        return ParsedConfig {
            map: ConfigMap::new(),
            warning: None,
        };
    };

    match value {
        Value::Null => ParsedConfig {
            map: ConfigMap::new(),
            warning: None,
        },
        // Some writers store the object as a JSON string.
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(inner @ Value::Object(_)) => decode_config_map(Some(&inner)),
            Ok(_) | Err(_) => ParsedConfig {
                map: ConfigMap::new(),
                warning: Some("payload is not a JSON object".into()),
            },
        },
        Value::Object(_) => match serde_json::from_value::<ConfigMap>(value.clone()) {
            Ok(map) => ParsedConfig { map, warning: None },
            Err(e) => ParsedConfig {
                map: ConfigMap::new(),
                warning: Some(format!("payload is not a map of strings: {e}")),
            },
        },
        _ => ParsedConfig {
            map: ConfigMap::new(),
            warning: Some("payload is not a JSON object".into()),
        },
    }
}

/// Like [`decode_config_map`], logging the warning (if any) under `label`.
pub fn parse_config_map(raw: Option<&Value>, label: &str) -> ConfigMap {
    let parsed = decode_config_map(raw);
    if let Some(warning) = &parsed.warning {
        tracing::warn!(field = label, warning = %warning, "Ignoring malformed config map");
    }
    parsed.map
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_payload_is_empty_without_warning() {
        let parsed = decode_config_map(None);
        assert!(parsed.map.is_empty());
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn flat_string_object_decodes() {
        let raw = json!({"REGION": "eu-west-1", "SIZE": "large"});
        let parsed = decode_config_map(Some(&raw));
        assert_eq!(parsed.map.get("REGION").map(String::as_str), Some("eu-west-1"));
        assert_eq!(parsed.map.len(), 2);
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn non_string_values_yield_empty_map_and_warning() {
        let raw = json!({"instances": 4});
        let parsed = decode_config_map(Some(&raw));
        assert!(parsed.map.is_empty());
        assert!(parsed.warning.is_some());
    }

    #[test]
    fn array_payload_yields_warning() {
        let raw = json!(["a", "b"]);
        let parsed = decode_config_map(Some(&raw));
        assert!(parsed.map.is_empty());
        assert!(parsed.warning.is_some());
    }

    #[test]
    fn stringified_object_is_accepted() {
        let raw = json!("{\"k\":\"v\"}");
        let parsed = decode_config_map(Some(&raw));
        assert_eq!(parsed.map.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn garbage_string_yields_warning() {
        let raw = json!("{not json");
        let parsed = decode_config_map(Some(&raw));
        assert!(parsed.map.is_empty());
        assert!(parsed.warning.is_some());
    }
}
