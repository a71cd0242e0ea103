use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::decimal::MONEY_DP;
use crate::errors::{LedgerError, Result};

/// ledger configuration, handed to the service at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// decimal places kept for every interval and aggregate
    pub money_scale: u32,
    /// run the full recomputation beside every incremental apply
    pub verify_incremental: bool,
    pub lock_timeout_ms: u64,
    pub schedule_cache_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            money_scale: MONEY_DP,
            verify_incremental: true,
            lock_timeout_ms: 250,
            schedule_cache_capacity: 256,
        }
    }
}

impl LedgerConfig {
    /// load from json; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// bulk import setup: incremental results are trusted, cache kept small
    pub fn bulk_import() -> Self {
        Self {
            verify_incremental: false,
            schedule_cache_capacity: 16,
            ..Self::default()
        }
    }

    /// cents precision, as shown to borrowers
    pub fn cents() -> Self {
        Self {
            money_scale: 2,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.money_scale > MONEY_DP {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "money_scale {} exceeds the supported {} places",
                    self.money_scale, MONEY_DP
                ),
            });
        }
        if self.schedule_cache_capacity == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "schedule_cache_capacity must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.money_scale, 8);
        assert!(config.verify_incremental);
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = LedgerConfig::from_json(r#"{"verify_incremental": false}"#).unwrap();

        assert!(!config.verify_incremental);
        assert_eq!(config.schedule_cache_capacity, 256);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            LedgerConfig::from_json(r#"{"money_scale": 12}"#),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            LedgerConfig::from_json(r#"{"schedule_cache_capacity": 0}"#),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            LedgerConfig::from_json("not json"),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_presets() {
        assert!(!LedgerConfig::bulk_import().verify_incremental);
        assert_eq!(LedgerConfig::cents().money_scale, 2);
        assert!(LedgerConfig::cents().validate().is_ok());
    }
}
