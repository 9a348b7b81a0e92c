//! # tint-settings
//!
//! Layered configuration for the tint relay.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`TintSettings::default()`]
//! 2. **Settings file**: `~/.tint/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `PORT` and `TINT_*` overrides
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    IgnoredOverride, apply_env_overrides, apply_overrides_from, deep_merge,
    load_settings_from_path, settings_path,
};
pub use types::{LivenessSettings, LoggingSettings, ServerSettings, SmoothingSettings, TintSettings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = TintSettings::default();
        let _path = settings_path();
    }
}
