//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use tint_core::constants::{
    DEFAULT_LIVENESS_INTERVAL_SECS, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SEND_QUEUE_CAPACITY,
};
use tint_core::smoothing::SmoothingConfig;
use tint_settings::{SettingsError, TintSettings};

/// Runtime configuration for the relay server.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Directory served on every non-API path.
    pub public_dir: PathBuf,
    /// Max inbound WebSocket message size in bytes. A larger message is a
    /// transport error and closes the connection.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Time between liveness sweeps.
    pub liveness_interval: Duration,
    /// Vote window tunables.
    pub smoothing: SmoothingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            public_dir: PathBuf::from("public"),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
            liveness_interval: Duration::from_secs(DEFAULT_LIVENESS_INTERVAL_SECS),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from resolved settings, validating them first.
    pub fn from_settings(settings: &TintSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            public_dir: PathBuf::from(&settings.server.public_dir),
            max_message_size: settings.server.max_message_size,
            send_queue_capacity: settings.server.send_queue_capacity,
            liveness_interval: Duration::from_secs(settings.liveness.interval_secs),
            smoothing: settings.smoothing.to_config()?,
        })
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_on_ephemeral_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn default_liveness_interval() {
        assert_eq!(
            ServerConfig::default().liveness_interval,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn from_default_settings() {
        let cfg = ServerConfig::from_settings(&TintSettings::default()).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.public_dir, PathBuf::from("public"));
        assert_eq!(cfg.smoothing, SmoothingConfig::default());
        assert_eq!(cfg.liveness_interval, Duration::from_secs(30));
    }

    #[test]
    fn from_settings_carries_overrides() {
        let mut settings = TintSettings::default();
        settings.server.port = 9001;
        settings.smoothing.buffer_size = 5;
        settings.smoothing.confidence_threshold = 0.8;
        settings.liveness.interval_secs = 2;
        let cfg = ServerConfig::from_settings(&settings).unwrap();
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.smoothing.buffer_size(), 5);
        assert!((cfg.smoothing.confidence_threshold() - 0.8).abs() < f64::EPSILON);
        assert_eq!(cfg.liveness_interval, Duration::from_secs(2));
    }

    #[test]
    fn from_invalid_settings_fails() {
        let mut settings = TintSettings::default();
        settings.smoothing.buffer_size = 0;
        assert!(matches!(
            ServerConfig::from_settings(&settings),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn from_settings_rejects_empty_send_queue() {
        let mut settings = TintSettings::default();
        settings.server.send_queue_capacity = 0;
        assert!(ServerConfig::from_settings(&settings).is_err());
    }
}
