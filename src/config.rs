//! Engine configuration, persisted as JSON

use crate::constants::{aggregate::DEFAULT_DECIMALS, gaps::DEFAULT_MAX_ATTEMPTS};
use crate::error::{EngineError, Result};
use crate::validate::{DateRangeValidator, FuturePolicy, default_floor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for validation, rounding and gap synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Earliest accepted window start
    pub floor: DateTime<Utc>,
    pub future_policy: FuturePolicy,
    /// Decimal places kept on averaged bucket values
    pub decimals: u32,
    /// Placement attempts per synthetic gap
    pub gap_max_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            future_policy: FuturePolicy::default(),
            decimals: DEFAULT_DECIMALS,
            gap_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Read a config file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.check()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validator(&self) -> DateRangeValidator {
        DateRangeValidator::new(self.floor, self.future_policy)
    }

    fn check(&self) -> Result<()> {
        if self.gap_max_attempts == 0 {
            return Err(EngineError::Config(
                "gap_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.decimals > 15 {
            return Err(EngineError::Config(format!(
                "decimals must be at most 15, got {}",
                self.decimals
            )));
        }
        Ok(())
    }
}
