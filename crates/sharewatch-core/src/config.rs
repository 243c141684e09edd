//! Recorder configuration.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sharewatch_error::{Result, UsageError};

/// Upper bound accepted for [`RecorderConfig::max_frames`].
pub const MAX_FRAMES_LIMIT: usize = 4096;

pub const ENV_CAPTURE_BACKTRACES: &str = "SHAREWATCH_CAPTURE_BACKTRACES";
pub const ENV_MAX_FRAMES: &str = "SHAREWATCH_MAX_FRAMES";
pub const ENV_SWEEP_INTERVAL: &str = "SHAREWATCH_SWEEP_INTERVAL";

/// Tuning for [`CallerContextRecorder`](crate::CallerContextRecorder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Capture a stack snapshot on every call entry. When off, contexts
    /// still record thread and operation.
    pub capture_backtraces: bool,
    /// Frames rendered per stack in a report.
    pub max_frames: usize,
    /// Evict contexts of terminated threads every this many captures.
    pub sweep_interval: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capture_backtraces: true,
            max_frames: 32,
            sweep_interval: 256,
        }
    }
}

impl RecorderConfig {
    /// Defaults overridden by the `SHAREWATCH_*` environment variables.
    ///
    /// Unparseable values are logged and replaced by the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            capture_backtraces: read(&lookup, ENV_CAPTURE_BACKTRACES, defaults.capture_backtraces),
            max_frames: read(&lookup, ENV_MAX_FRAMES, defaults.max_frames),
            sweep_interval: read(&lookup, ENV_SWEEP_INTERVAL, defaults.sweep_interval),
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidConfig`] for malformed JSON or values
    /// rejected by [`validate`](Self::validate).
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|err| UsageError::InvalidConfig {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_frames == 0 || self.max_frames > MAX_FRAMES_LIMIT {
            return Err(UsageError::InvalidConfig {
                detail: format!(
                    "max_frames must be in 1..={MAX_FRAMES_LIMIT}, got {}",
                    self.max_frames
                ),
            });
        }
        if self.sweep_interval == 0 {
            return Err(UsageError::InvalidConfig {
                detail: "sweep_interval must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, ?default, "sharewatch::config_fallback");
        default
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = RecorderConfig::default();
        assert!(config.capture_backtraces);
        assert_eq!(config.max_frames, 32);
        assert_eq!(config.sweep_interval, 256);
        config.validate().unwrap();
    }

    #[test]
    fn environment_overrides() {
        let config = RecorderConfig::from_lookup(lookup(&[
            (ENV_CAPTURE_BACKTRACES, "false"),
            (ENV_MAX_FRAMES, " 8 "),
            (ENV_SWEEP_INTERVAL, "16"),
        ]));
        assert_eq!(
            config,
            RecorderConfig {
                capture_backtraces: false,
                max_frames: 8,
                sweep_interval: 16,
            }
        );
    }

    #[test]
    fn invalid_environment_values_fall_back() {
        let config = RecorderConfig::from_lookup(lookup(&[
            (ENV_CAPTURE_BACKTRACES, "sometimes"),
            (ENV_MAX_FRAMES, "-1"),
        ]));
        assert_eq!(config, RecorderConfig::default());
    }

    #[test]
    fn json_with_missing_fields_uses_defaults() {
        let config = RecorderConfig::from_json(r#"{"max_frames": 4}"#).unwrap();
        assert_eq!(config.max_frames, 4);
        assert!(config.capture_backtraces);
        assert_eq!(config.sweep_interval, 256);
    }

    #[test]
    fn validation_rejects_out_of_range() {
        for bad in [
            RecorderConfig {
                max_frames: 0,
                ..RecorderConfig::default()
            },
            RecorderConfig {
                max_frames: MAX_FRAMES_LIMIT + 1,
                ..RecorderConfig::default()
            },
            RecorderConfig {
                sweep_interval: 0,
                ..RecorderConfig::default()
            },
        ] {
            let err = bad.validate().unwrap_err();
            assert!(matches!(err, UsageError::InvalidConfig { .. }), "case={bad:?}");
        }
        assert!(RecorderConfig::from_json(r#"{"sweep_interval": 0}"#).is_err());
        assert!(RecorderConfig::from_json("not json").is_err());
    }
}
