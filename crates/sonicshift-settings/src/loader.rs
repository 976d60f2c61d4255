//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SonicShiftSettings::default()`]
//! 2. If `~/.sonicshift/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Clamp out-of-range values ([`SonicShiftSettings::validate`])
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::SonicShiftSettings;

/// Resolve the path to the settings file (`~/.sonicshift/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sonicshift").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SonicShiftSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, or JSON that is not an object, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<SonicShiftSettings> {
    let defaults = serde_json::to_value(SonicShiftSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        if !user.is_object() {
            return Err(SettingsError::InvalidValue(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SonicShiftSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
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
pub fn apply_env_overrides(settings: &mut SonicShiftSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Each variable has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_overrides(settings: &mut SonicShiftSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Pipeline timing ─────────────────────────────────────────────
    if let Some(v) = env.u64("SONICSHIFT_UPLOAD_TICK_MS", 1, 60_000) {
        settings.pipeline.upload.tick_ms = v;
    }
    if let Some(v) = env.u64("SONICSHIFT_UPLOAD_TICKS", 1, 10_000) {
        settings.pipeline.upload.ticks = v as u32;
    }
    if let Some(v) = env.u64("SONICSHIFT_CONVERT_TICK_MS", 1, 60_000) {
        settings.pipeline.convert.tick_ms = v;
    }
    if let Some(v) = env.u64("SONICSHIFT_CONVERT_TICKS", 1, 10_000) {
        settings.pipeline.convert.ticks = v as u32;
    }

    // ── Describe service ────────────────────────────────────────────
    if let Some(v) = env.bool("SONICSHIFT_DESCRIBE_ENABLED") {
        settings.describe.enabled = v;
    }
    if let Some(v) = env.string("SONICSHIFT_GEMINI_MODEL") {
        settings.describe.model = v;
    }
    if let Some(v) = env.string("SONICSHIFT_GEMINI_BASE_URL") {
        settings.describe.base_url = v;
    }
    if let Some(v) = env.u64("SONICSHIFT_DESCRIBE_TIMEOUT_MS", 100, 600_000) {
        settings.describe.timeout_ms = v;
    }
    if let Some(v) = env
        .string("GEMINI_API_KEY")
        .or_else(|| env.string("API_KEY"))
    {
        settings.describe.api_key = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("SONICSHIFT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("SONICSHIFT_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Variable readers (thin wrappers) ────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_nested_objects() {
        let target = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let source = serde_json::json!({"a": {"b": 10}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"]["b"], 10);
        assert_eq!(merged["a"]["c"], 2);
        assert_eq!(merged["d"], 3);
    }

    #[test]
    fn deep_merge_skips_nulls_and_replaces_arrays() {
        let target = serde_json::json!({"a": 1, "list": [1, 2, 3]});
        let source = serde_json::json!({"a": null, "list": [9]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["list"], serde_json::json!([9]));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s.pipeline.convert.ticks, 20);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"pipeline": {"convert": {"ticks": 4}}, "export": {"archivePrefix": "out_"}}"#,
        )
        .unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.pipeline.convert.ticks, 4);
        // sibling fields keep their defaults through the deep merge
        assert_eq!(s.pipeline.convert.tick_ms, 100);
        assert_eq!(s.pipeline.convert.max_step, 10);
        assert_eq!(s.export.archive_prefix, "out_");
    }

    #[test]
    fn file_values_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"pipeline": {"upload": {"ticks": 0, "maxStep": 200}}}"#).unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.pipeline.upload.ticks, 1);
        assert_eq!(s.pipeline.upload.max_step, 100);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn non_object_json_is_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    #[test]
    fn overrides_apply_valid_values() {
        let mut s = SonicShiftSettings::default();
        apply_overrides(
            &mut s,
            lookup(&[
                ("SONICSHIFT_UPLOAD_TICK_MS", "5"),
                ("SONICSHIFT_CONVERT_TICKS", "3"),
                ("SONICSHIFT_DESCRIBE_ENABLED", "off"),
                ("SONICSHIFT_GEMINI_BASE_URL", "http://localhost:9999"),
                ("SONICSHIFT_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(s.pipeline.upload.tick_ms, 5);
        assert_eq!(s.pipeline.convert.ticks, 3);
        assert!(!s.describe.enabled);
        assert_eq!(s.describe.base_url, "http://localhost:9999");
        assert_eq!(s.logging.level, "debug");
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut s = SonicShiftSettings::default();
        apply_overrides(
            &mut s,
            lookup(&[
                ("SONICSHIFT_UPLOAD_TICKS", "0"),
                ("SONICSHIFT_CONVERT_TICK_MS", "fast"),
                ("SONICSHIFT_DESCRIBE_ENABLED", "maybe"),
                ("SONICSHIFT_GEMINI_MODEL", ""),
            ]),
        );
        assert_eq!(s.pipeline.upload.ticks, 10);
        assert_eq!(s.pipeline.convert.tick_ms, 100);
        assert!(s.describe.enabled);
        assert_eq!(s.describe.model, "gemini-3-flash-preview");
    }

    #[test]
    fn gemini_api_key_preferred_over_generic() {
        let mut s = SonicShiftSettings::default();
        apply_overrides(
            &mut s,
            lookup(&[("GEMINI_API_KEY", "gem"), ("API_KEY", "generic")]),
        );
        assert_eq!(s.describe.api_key.as_deref(), Some("gem"));

        let mut s = SonicShiftSettings::default();
        apply_overrides(&mut s, lookup(&[("API_KEY", "generic")]));
        assert_eq!(s.describe.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("5", 1, 10), Some(5));
        assert_eq!(parse_u64_range("0", 1, 10), None);
        assert_eq!(parse_u64_range("11", 1, 10), None);
        assert_eq!(parse_u64_range("-1", 1, 10), None);
    }
}
