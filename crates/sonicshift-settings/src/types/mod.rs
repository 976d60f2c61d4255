//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file format.
//! Each type implements [`Default`] with production default values, and
//! `#[serde(default)]` lets a settings file override only the fields it names.

mod describe;
mod pipeline;

pub use describe::*;
pub use pipeline::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "pipeline": { "upload": { "tickMs": 50 } },
///   "describe": { "enabled": false }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SonicShiftSettings {
    /// Settings schema version.
    pub version: String,
    /// Simulated phase timing.
    pub pipeline: PipelineSettings,
    /// AI description service.
    pub describe: DescribeSettings,
    /// Export naming.
    pub export: ExportSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for SonicShiftSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            pipeline: PipelineSettings::default(),
            describe: DescribeSettings::default(),
            export: ExportSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SonicShiftSettings {
    /// Clamp out-of-range values instead of rejecting them.
    ///
    /// Called automatically during loading.
    pub fn validate(&mut self) {
        self.pipeline.upload.validate("upload");
        self.pipeline.convert.validate("convert");
        if self.describe.timeout_ms == 0 {
            tracing::warn!("describe timeout_ms is 0, using default");
            self.describe.timeout_ms = DescribeSettings::default().timeout_ms;
        }
        if self.export.archive_prefix.is_empty() {
            tracing::warn!("export archive_prefix is empty, using default");
            self.export.archive_prefix = ExportSettings::default().archive_prefix;
        }
    }
}

/// Export naming settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Prefix of the archive file name; a millisecond timestamp and `.zip` follow.
    pub archive_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            archive_prefix: "sonicshift_converted_".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_values() {
        let s = SonicShiftSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.pipeline.upload.tick_ms, 150);
        assert_eq!(s.pipeline.upload.ticks, 10);
        assert_eq!(s.pipeline.convert.tick_ms, 100);
        assert_eq!(s.pipeline.convert.ticks, 20);
        assert!(s.describe.enabled);
        assert_eq!(s.describe.model, "gemini-3-flash-preview");
        assert_eq!(s.export.archive_prefix, "sonicshift_converted_");
        assert_eq!(s.logging.level, "warn");
    }

    #[test]
    fn default_settings_serde_roundtrip() {
        let defaults = SonicShiftSettings::default();
        let json = serde_json::to_string(&defaults).unwrap();
        let back: SonicShiftSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pipeline.upload.ticks, defaults.pipeline.upload.ticks);
        assert_eq!(back.describe.model, defaults.describe.model);
    }

    #[test]
    fn json_field_names_are_camel_case() {
        let json = serde_json::to_value(SonicShiftSettings::default()).unwrap();
        assert!(json["pipeline"]["upload"].get("tickMs").is_some());
        assert!(json["pipeline"]["upload"].get("maxStep").is_some());
        assert!(json["export"].get("archivePrefix").is_some());
        // api key is never written out when unset
        assert!(json["describe"].get("apiKey").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: SonicShiftSettings =
            serde_json::from_str(r#"{"pipeline": {"upload": {"ticks": 4}}}"#).unwrap();
        assert_eq!(s.pipeline.upload.ticks, 4);
        assert_eq!(s.pipeline.upload.tick_ms, 150);
        assert_eq!(s.pipeline.convert.ticks, 20);
        assert!(s.describe.enabled);
    }

    #[test]
    fn validate_restores_empty_prefix_and_zero_timeout() {
        let mut s = SonicShiftSettings::default();
        s.export.archive_prefix.clear();
        s.describe.timeout_ms = 0;
        s.validate();
        assert_eq!(s.export.archive_prefix, "sonicshift_converted_");
        assert_eq!(s.describe.timeout_ms, 30_000);
    }
}
