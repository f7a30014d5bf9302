//! Session lifecycle configuration

use crate::error::{BridgeError, BridgeResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Idle timeout and sweep cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds without a request after which a session may be evicted
    pub idle_timeout_secs: u64,
    /// Seconds between two sweeps
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            sweep_interval_secs: 300,
        }
    }
}

impl SessionSettings {
    /// Upper bound for both settings: one year
    pub const MAX_SECS: u64 = 365 * 24 * 60 * 60;

    /// Idle timeout, capped at [`Self::MAX_SECS`]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.min(Self::MAX_SECS))
    }

    /// Sweep interval, capped at [`Self::MAX_SECS`]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.min(Self::MAX_SECS))
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.idle_timeout_secs == 0 {
            return Err(BridgeError::Config {
                message: "Session idle timeout must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set idle_timeout_secs to a positive value"),
            });
        }

        if self.sweep_interval_secs == 0 {
            return Err(BridgeError::Config {
                message: "Sweep interval must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set sweep_interval_secs to a positive value"),
            });
        }

        if self.idle_timeout_secs > Self::MAX_SECS || self.sweep_interval_secs > Self::MAX_SECS {
            return Err(BridgeError::Config {
                message: format!(
                    "Session timeout and sweep interval must not exceed {} seconds",
                    Self::MAX_SECS
                ),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Lower idle_timeout_secs or sweep_interval_secs"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SessionSettings::default();
        assert_eq!(settings.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(300));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let settings = SessionSettings {
            idle_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.validate().unwrap_err().code(), "CONFIGURATION_ERROR");

        let settings = SessionSettings {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_values_rejected() {
        let settings = SessionSettings {
            sweep_interval_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(settings.validate().unwrap_err().code(), "CONFIGURATION_ERROR");
        assert_eq!(
            settings.sweep_interval(),
            Duration::from_secs(SessionSettings::MAX_SECS)
        );

        let settings = SessionSettings {
            idle_timeout_secs: SessionSettings::MAX_SECS + 1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = SessionSettings {
            idle_timeout_secs: SessionSettings::MAX_SECS,
            sweep_interval_secs: SessionSettings::MAX_SECS,
        };
        assert!(settings.validate().is_ok());
    }
}
