//! # sonicshift-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SonicShiftSettings::default()`]
//! 2. **User file**: `~/.sonicshift/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SONICSHIFT_*` overrides plus the Gemini
//!    API key (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sonicshift_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("upload ticks: {}", settings.pipeline.upload.ticks);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SonicShiftSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
