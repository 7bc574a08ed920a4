use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_SECONDS: f64 = 4.0;

/// Polling settings of the execution driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Seconds between status queries.
    pub poll_interval_seconds: f64,
    /// Upper bound on the total wait; unbounded when absent.
    pub max_wait_seconds: Option<f64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            max_wait_seconds: None,
        }
    }
}

impl DriverConfig {
    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_seconds = interval.as_secs_f64();
        self
    }

    /// Bounds the total wait.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait_seconds = Some(max_wait.as_secs_f64());
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECONDS))
    }

    /// Returns the maximum wait, if bounded.
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Checks that both durations are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Invalid` for a non-positive poll interval
    /// or a negative maximum wait.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.poll_interval_seconds.is_finite() && self.poll_interval_seconds > 0.0) {
            return Err(ConfigurationError::Invalid {
                field: "driver.poll_interval_seconds".to_string(),
                reason: format!("must be positive, got {}", self.poll_interval_seconds),
            });
        }
        if let Some(max_wait) = self.max_wait_seconds {
            if !(max_wait.is_finite() && max_wait >= 0.0) {
                return Err(ConfigurationError::Invalid {
                    field: "driver.max_wait_seconds".to_string(),
                    reason: format!("must be non-negative, got {max_wait}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.max_wait(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = DriverConfig::default()
            .with_poll_interval(Duration::from_millis(250))
            .with_max_wait(Duration::from_secs(60));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.max_wait(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = DriverConfig {
            poll_interval_seconds: 0.0,
            max_wait_seconds: None,
        };
        assert!(zero.validate().is_err());

        let negative_wait = DriverConfig {
            poll_interval_seconds: 1.0,
            max_wait_seconds: Some(-5.0),
        };
        assert!(negative_wait.validate().is_err());

        let nan = DriverConfig {
            poll_interval_seconds: f64::NAN,
            max_wait_seconds: None,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let config: DriverConfig = serde_json::from_str(r#"{"max_wait_seconds": 30}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.max_wait(), Some(Duration::from_secs(30)));
    }
}
