//! Detection and scoring thresholds.
//!
//! Every constant the rules and the risk scorer key on lives here so the
//! rule set can be audited and overridden from a TOML file without touching
//! the engine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "OUTBREAK_MONITOR_CONFIG";

pub const WINDOW_DAYS: i64 = 7;
pub const MAX_WINDOW_DAYS: i64 = 3650;
pub const WINDOW_CASE_LIMIT: u64 = 50;
pub const CLUSTER_CASE_LIMIT: u64 = 10;
pub const BASELINE_DAYS: usize = 7;
pub const INCREASE_MULTIPLIER: f64 = 2.0;
pub const DAILY_AVERAGE_DIVISOR: f64 = 7.0;
pub const RAPID_GROWTH_RATIO: f64 = 1.5;
pub const RAPID_GROWTH_POINTS: u32 = 30;
pub const GROWTH_POINTS: u32 = 15;
pub const CRITICAL_SCORE: u32 = 70;
pub const HIGH_SCORE: u32 = 50;
pub const MEDIUM_SCORE: u32 = 30;
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid threshold `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A score contribution awarded when a metric strictly exceeds `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub above: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Trailing window length for Rule 1 and for the scorer's recent subset.
    pub window_days: i64,
    pub window_case_limit: u64,
    pub cluster_case_limit: u64,
    pub baseline_days: usize,
    pub increase_multiplier: f64,
    pub daily_average_divisor: f64,
    /// Checked highest first.
    pub volume_tiers: Vec<Tier>,
    pub severity_tiers: Vec<Tier>,
    pub rapid_growth_ratio: f64,
    pub rapid_growth_points: u32,
    pub growth_points: u32,
    pub critical_score: u32,
    pub high_score: u32,
    pub medium_score: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            window_days: WINDOW_DAYS,
            window_case_limit: WINDOW_CASE_LIMIT,
            cluster_case_limit: CLUSTER_CASE_LIMIT,
            baseline_days: BASELINE_DAYS,
            increase_multiplier: INCREASE_MULTIPLIER,
            daily_average_divisor: DAILY_AVERAGE_DIVISOR,
            volume_tiers: vec![
                Tier { above: 30.0, points: 40 },
                Tier { above: 20.0, points: 25 },
                Tier { above: 10.0, points: 10 },
            ],
            severity_tiers: vec![
                Tier { above: 10.0, points: 30 },
                Tier { above: 5.0, points: 15 },
            ],
            rapid_growth_ratio: RAPID_GROWTH_RATIO,
            rapid_growth_points: RAPID_GROWTH_POINTS,
            growth_points: GROWTH_POINTS,
            critical_score: CRITICAL_SCORE,
            high_score: HIGH_SCORE,
            medium_score: MEDIUM_SCORE,
        }
    }
}

impl Thresholds {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let thresholds = Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        info!(path = %path.display(), "loaded threshold configuration");
        Ok(thresholds)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let thresholds: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ConfigError::Invalid {
                field: "window_days",
                reason: format!("must be between 0 and {MAX_WINDOW_DAYS}"),
            });
        }
        if self.baseline_days == 0 {
            return Err(invalid("baseline_days", "must be at least 1"));
        }
        if self.increase_multiplier <= 0.0 {
            return Err(invalid("increase_multiplier", "must be positive"));
        }
        if self.daily_average_divisor <= 0.0 {
            return Err(invalid("daily_average_divisor", "must be positive"));
        }
        if self.rapid_growth_ratio <= 0.0 {
            return Err(invalid("rapid_growth_ratio", "must be positive"));
        }
        check_descending("volume_tiers", &self.volume_tiers)?;
        check_descending("severity_tiers", &self.severity_tiers)?;
        if !(self.critical_score >= self.high_score && self.high_score >= self.medium_score) {
            return Err(invalid(
                "critical_score",
                "level cut-offs must satisfy critical >= high >= medium",
            ));
        }
        Ok(())
    }
}

fn check_descending(field: &'static str, tiers: &[Tier]) -> Result<(), ConfigError> {
    if tiers.windows(2).any(|pair| pair[0].above <= pair[1].above) {
        return Err(invalid(field, "tiers must be listed highest threshold first"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_named_constants() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.window_days, WINDOW_DAYS);
        assert_eq!(thresholds.window_case_limit, 50);
        assert_eq!(thresholds.cluster_case_limit, 10);
        assert_eq!(thresholds.increase_multiplier, 2.0);
        assert_eq!(thresholds.volume_tiers[0], Tier { above: 30.0, points: 40 });
        assert!(thresholds.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let thresholds = Thresholds::from_toml("cluster_case_limit = 20\n").unwrap();
        assert_eq!(thresholds.cluster_case_limit, 20);
        assert_eq!(thresholds.window_case_limit, WINDOW_CASE_LIMIT);
        assert_eq!(thresholds.severity_tiers.len(), 2);
    }

    #[test]
    fn tiers_can_be_overridden() {
        let content = r#"
            volume_tiers = [{ above = 5.0, points = 20 }]
        "#;
        let thresholds = Thresholds::from_toml(content).unwrap();
        assert_eq!(thresholds.volume_tiers, vec![Tier { above: 5.0, points: 20 }]);
    }

    #[test]
    fn rejects_zero_multiplier() {
        let err = Thresholds::from_toml("increase_multiplier = 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "increase_multiplier",
                ..
            }
        ));
    }

    #[test]
    fn rejects_oversized_window() {
        let err = Thresholds::from_toml("window_days = 100000000\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "window_days",
                ..
            }
        ));
        assert!(Thresholds::from_toml("window_days = 3650\n").is_ok());
        assert!(Thresholds::from_toml("window_days = -1\n").is_err());
    }

    #[test]
    fn rejects_unordered_tiers() {
        let content = r#"
            severity_tiers = [{ above = 5.0, points = 15 }, { above = 10.0, points = 30 }]
        "#;
        assert!(Thresholds::from_toml(content).is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Thresholds::from_toml("window_days = \"seven\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thresholds.toml");
        std::fs::write(&path, "window_case_limit = 75\n").unwrap();
        let thresholds = Thresholds::load(&path).unwrap();
        assert_eq!(thresholds.window_case_limit, 75);
    }
}
