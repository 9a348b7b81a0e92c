//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a
//! settings file may name any subset of fields.

use serde::{Deserialize, Serialize};
use tint_core::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_LIVENESS_INTERVAL_SECS,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT, DEFAULT_SEND_QUEUE_CAPACITY,
};
use tint_core::smoothing::SmoothingConfig;

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "smoothing": { "bufferSize": 10, "confidenceThreshold": 0.7 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TintSettings {
    /// Network listener.
    pub server: ServerSettings,
    /// Vote window tunables.
    pub smoothing: SmoothingSettings,
    /// Ping sweep.
    pub liveness: LivenessSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl TintSettings {
    /// Check cross-field constraints the types cannot express.
    pub fn validate(&self) -> Result<()> {
        let _ = self.smoothing.to_config()?;
        if self.liveness.interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "liveness interval must be at least 1 second".into(),
            ));
        }
        if self.server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "max message size must be at least 1 byte".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "send queue capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Listener and HTTP surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory served for every path that is not an API route.
    pub public_dir: String,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Outbound messages buffered per connection before drops.
    pub send_queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            public_dir: "public".into(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
        }
    }
}

/// Observation window tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmoothingSettings {
    /// Window capacity.
    pub buffer_size: usize,
    /// Minimum share of the window a value needs to win.
    pub confidence_threshold: f64,
}

impl SmoothingSettings {
    /// Validated engine config.
    pub fn to_config(&self) -> Result<SmoothingConfig> {
        SmoothingConfig::new(self.buffer_size, self.confidence_threshold)
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Liveness sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivenessSettings {
    /// Seconds between sweeps; a client silent for one full interval is dropped.
    pub interval_secs: u64,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_LIVENESS_INTERVAL_SECS,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = TintSettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.public_dir, "public");
        assert_eq!(settings.smoothing.buffer_size, 20);
        assert!((settings.smoothing.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(settings.liveness.interval_secs, 30);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn defaults_validate() {
        assert!(TintSettings::default().validate().is_ok());
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(TintSettings::default()).unwrap();
        assert_eq!(json["server"]["publicDir"], "public");
        assert_eq!(json["smoothing"]["bufferSize"], 20);
        assert_eq!(json["smoothing"]["confidenceThreshold"], 0.6);
        assert_eq!(json["liveness"]["intervalSecs"], 30);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TintSettings =
            serde_json::from_str(r#"{"smoothing": {"bufferSize": 5}}"#).unwrap();
        assert_eq!(settings.smoothing.buffer_size, 5);
        assert!((settings.smoothing.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn zero_buffer_is_invalid() {
        let mut settings = TintSettings::default();
        settings.smoothing.buffer_size = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("buffer size"));
    }

    #[test]
    fn threshold_above_one_is_invalid() {
        let mut settings = TintSettings::default();
        settings.smoothing.confidence_threshold = 1.2;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn zero_liveness_interval_is_invalid() {
        let mut settings = TintSettings::default();
        settings.liveness.interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn default_message_limit_is_generous() {
        assert_eq!(ServerSettings::default().max_message_size, 100 * 1024 * 1024);
    }

    #[test]
    fn zero_message_size_is_invalid() {
        let mut settings = TintSettings::default();
        settings.server.max_message_size = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("max message size"));
    }

    #[test]
    fn zero_send_queue_is_invalid() {
        let mut settings = TintSettings::default();
        settings.server.send_queue_capacity = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("send queue"));
    }

    #[test]
    fn smoothing_to_config() {
        let cfg = SmoothingSettings {
            buffer_size: 1,
            confidence_threshold: 0.0,
        }
        .to_config()
        .unwrap();
        assert_eq!(cfg, SmoothingConfig::passthrough());
    }
}
