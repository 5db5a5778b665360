use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Session timing and recording settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulated time per step, in seconds. Must be finite and positive.
    pub time_increment: f64,
    /// Maximum number of steps per run. `None` means unbounded.
    pub step_budget: Option<usize>,
    /// Record every n-th step. Values below 1 are treated as 1.
    pub record_interval: usize,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            time_increment: 0.01,
            step_budget: None,
            record_interval: 1,
        }
    }

    /// Converts a signed budget where any negative value means "no limit".
    pub fn budget_from_signed(budget: i64) -> Option<usize> {
        usize::try_from(budget).ok()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse session config")
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid config in {}", path.display()))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.time_increment, 0.01);
        assert_eq!(cfg.step_budget, None);
        assert_eq!(cfg.record_interval, 1);
    }

    #[test]
    fn test_partial_json() -> Result<()> {
        let cfg = SessionConfig::from_json_str(r#"{"step_budget": 5}"#)?;
        assert_eq!(cfg.step_budget, Some(5));
        assert_eq!(cfg.time_increment, 0.01);
        Ok(())
    }

    #[test]
    fn test_invalid_json() {
        assert!(SessionConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_negative_budget_is_unbounded() {
        assert_eq!(SessionConfig::budget_from_signed(-1), None);
        assert_eq!(SessionConfig::budget_from_signed(0), Some(0));
        assert_eq!(SessionConfig::budget_from_signed(12), Some(12));
    }

    #[test]
    fn test_read_json_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("tissue3d_cfg_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"time_increment": 0.5, "record_interval": 2}"#)?;
        let cfg = SessionConfig::read_json(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(cfg.time_increment, 0.5);
        assert_eq!(cfg.record_interval, 2);
        Ok(())
    }
}
