//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TintSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::TintSettings;

/// Resolve the default settings file path (`~/.tint/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tint").join("settings.json")
}

/// An environment override that failed to parse and was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnoredOverride {
    /// Variable name.
    pub key: &'static str,
    /// Raw value as found.
    pub value: String,
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
/// Env values that fail to parse are returned for the caller to log.
pub fn load_settings_from_path(path: &Path) -> Result<(TintSettings, Vec<IgnoredOverride>)> {
    let mut settings = read_settings_file(path)?;
    let ignored = apply_env_overrides(&mut settings);
    Ok((settings, ignored))
}

fn read_settings_file(path: &Path) -> Result<TintSettings> {
    let defaults = serde_json::to_value(TintSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut TintSettings) -> Vec<IgnoredOverride> {
    apply_overrides_from(settings, |name| std::env::var(name).ok())
}

/// Apply overrides from `lookup`, which maps a variable name to its value.
///
/// Each variable has strict parsing rules; invalid values are skipped
/// (falling back to file/default) and returned. `TINT_PORT` wins over `PORT`.
pub fn apply_overrides_from(
    settings: &mut TintSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<IgnoredOverride> {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut ignored = Vec::new();

    for name in ["PORT", "TINT_PORT"] {
        if let Some(v) = read(name)
            .and_then(|v| parsed(&mut ignored, name, &v, parse_u16_range(&v, 1, 65535)))
        {
            settings.server.port = v;
        }
    }
    if let Some(v) = read("TINT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("TINT_PUBLIC_DIR") {
        settings.server.public_dir = v;
    }
    if let Some(v) = read("TINT_BUFFER_SIZE").and_then(|v| {
        parsed(&mut ignored, "TINT_BUFFER_SIZE", &v, parse_usize_range(&v, 1, 10_000))
    }) {
        settings.smoothing.buffer_size = v;
    }
    if let Some(v) = read("TINT_CONFIDENCE_THRESHOLD").and_then(|v| {
        parsed(&mut ignored, "TINT_CONFIDENCE_THRESHOLD", &v, parse_fraction(&v))
    }) {
        settings.smoothing.confidence_threshold = v;
    }
    if let Some(v) = read("TINT_LIVENESS_INTERVAL_SECS").and_then(|v| {
        parsed(&mut ignored, "TINT_LIVENESS_INTERVAL_SECS", &v, parse_u64_range(&v, 1, 3600))
    }) {
        settings.liveness.interval_secs = v;
    }
    if let Some(v) = read("TINT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if !ignored.is_empty() {
        debug!(count = ignored.len(), "skipped invalid env overrides");
    }
    ignored
}

fn parsed<T>(
    ignored: &mut Vec<IgnoredOverride>,
    name: &'static str,
    raw: &str,
    result: Option<T>,
) -> Option<T> {
    if result.is_none() {
        ignored.push(IgnoredOverride {
            key: name,
            value: raw.to_owned(),
        });
    }
    result
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `f64` in `[0, 1]`.
pub fn parse_fraction(val: &str) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (0.0..=1.0).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "server": {"port": 8080, "host": "localhost"}
        });
        let source = serde_json::json!({
            "server": {"port": 9090}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    #[test]
    fn merge_new_keys_added() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"b": 2});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── read_settings_file ──────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_settings_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, TintSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9090}, "smoothing": {"confidenceThreshold": 0.8}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!((settings.smoothing.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(settings.smoothing.buffer_size, 20);
    }

    #[test]
    fn invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = read_settings_file(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "eighty"}}"#).unwrap();

        assert!(read_settings_file(&path).is_err());
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn port_env_var() {
        let mut settings = TintSettings::default();
        let ignored = apply_overrides_from(&mut settings, env(&[("PORT", "3000")]));
        assert_eq!(settings.server.port, 3000);
        assert!(ignored.is_empty());
    }

    #[test]
    fn tint_port_beats_port() {
        let mut settings = TintSettings::default();
        let _ = apply_overrides_from(
            &mut settings,
            env(&[("PORT", "3000"), ("TINT_PORT", "4000")]),
        );
        assert_eq!(settings.server.port, 4000);
    }

    #[test]
    fn invalid_port_ignored() {
        let mut settings = TintSettings::default();
        let ignored = apply_overrides_from(&mut settings, env(&[("PORT", "not-a-port")]));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            ignored,
            vec![IgnoredOverride {
                key: "PORT",
                value: "not-a-port".into()
            }]
        );
        let ignored = apply_overrides_from(&mut settings, env(&[("PORT", "0")]));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(ignored.len(), 1);
    }

    #[test]
    fn every_invalid_override_is_returned() {
        let mut settings = TintSettings::default();
        let ignored = apply_overrides_from(
            &mut settings,
            env(&[
                ("TINT_BUFFER_SIZE", "0"),
                ("TINT_CONFIDENCE_THRESHOLD", "high"),
                ("TINT_LIVENESS_INTERVAL_SECS", "5"),
            ]),
        );
        let keys: Vec<_> = ignored.iter().map(|o| o.key).collect();
        assert_eq!(keys, ["TINT_BUFFER_SIZE", "TINT_CONFIDENCE_THRESHOLD"]);
        assert_eq!(settings.liveness.interval_secs, 5);
        assert_eq!(settings.smoothing, TintSettings::default().smoothing);
    }

    #[test]
    fn load_from_path_reports_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"smoothing": {"bufferSize": 7}}"#).unwrap();
        let (settings, _ignored) = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.smoothing.buffer_size, 7);
    }

    #[test]
    fn smoothing_env_vars() {
        let mut settings = TintSettings::default();
        let _ = apply_overrides_from(
            &mut settings,
            env(&[
                ("TINT_BUFFER_SIZE", "1"),
                ("TINT_CONFIDENCE_THRESHOLD", "0"),
            ]),
        );
        assert_eq!(settings.smoothing.buffer_size, 1);
        assert!(settings.smoothing.confidence_threshold.abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_threshold_ignored() {
        let mut settings = TintSettings::default();
        let ignored =
            apply_overrides_from(&mut settings, env(&[("TINT_CONFIDENCE_THRESHOLD", "1.5")]));
        assert_eq!(ignored.len(), 1);
        assert!((settings.smoothing.confidence_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn string_env_vars() {
        let mut settings = TintSettings::default();
        let _ = apply_overrides_from(
            &mut settings,
            env(&[
                ("TINT_HOST", "127.0.0.1"),
                ("TINT_PUBLIC_DIR", "/srv/www"),
                ("TINT_LOG_LEVEL", "debug"),
                ("TINT_LIVENESS_INTERVAL_SECS", "5"),
            ]),
        );
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.public_dir, "/srv/www");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.liveness.interval_secs, 5);
    }

    #[test]
    fn empty_env_value_ignored() {
        let mut settings = TintSettings::default();
        let ignored = apply_overrides_from(&mut settings, env(&[("TINT_HOST", "")]));
        assert!(ignored.is_empty());
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("80", 1, 65535), Some(80));
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range("0", 1, 10), None);
        assert_eq!(parse_usize_range("20", 1, 100), Some(20));
        assert_eq!(parse_usize_range("-1", 1, 100), None);
    }

    #[test]
    fn parse_fractions() {
        assert_eq!(parse_fraction("0.6"), Some(0.6));
        assert_eq!(parse_fraction("1"), Some(1.0));
        assert_eq!(parse_fraction("-0.1"), None);
        assert_eq!(parse_fraction("NaN"), None);
        assert_eq!(parse_fraction("abc"), None);
    }
}
