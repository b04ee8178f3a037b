//! Reconciliation configuration
//!
//! The core never reads prices or policy percentages from constants. A
//! caller builds an [`EscrowConfig`] (or loads one from TOML) and passes it
//! into every classification and aggregation call.

use std::path::Path;

use bigdecimal::BigDecimal;
use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EscrowError, EscrowResult};

/// Largest accepted distance from UTC, in minutes
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Longest accepted join grace window, in minutes (one week)
const MAX_JOIN_GRACE_MINUTES: i64 = 7 * 24 * 60;

/// Policy and conversion parameters for the escrow core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Currency value of one credit
    pub unit_price_in_currency: BigDecimal,
    /// Commission taken from completed standard sessions, in percent
    pub platform_fee_percent: u32,
    /// Goodwill bonus paid on top of a tutor no-show refund, in percent
    pub refund_bonus_percent: u32,
    /// Minutes after the start time within which a join counts as on time
    pub join_grace_minutes: i64,
    /// Prefix used when formatting currency values
    pub currency_symbol: String,
    /// Local wall-clock offset used for windows, month buckets and dates
    pub utc_offset_minutes: i32,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            unit_price_in_currency: BigDecimal::from(150),
            platform_fee_percent: 20,
            refund_bonus_percent: 10,
            join_grace_minutes: 5,
            currency_symbol: "₹".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl EscrowConfig {
    /// Default policy with a specific credit price
    pub fn with_unit_price(unit_price_in_currency: BigDecimal) -> Self {
        Self {
            unit_price_in_currency,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document; absent keys take their defaults
    pub fn from_toml_str(input: &str) -> EscrowResult<Self> {
        let config: EscrowConfig =
            toml::from_str(input).map_err(|e| EscrowError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> EscrowResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        log::debug!("loaded escrow config from {}", path.display());
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> EscrowResult<()> {
        if self.unit_price_in_currency < BigDecimal::from(0) {
            return Err(EscrowError::ConfigValidation(format!(
                "unit_price_in_currency must not be negative, got {}",
                self.unit_price_in_currency
            )));
        }

        if self.platform_fee_percent > 100 {
            return Err(EscrowError::ConfigValidation(format!(
                "platform_fee_percent must be at most 100, got {}",
                self.platform_fee_percent
            )));
        }

        if self.refund_bonus_percent > 100 {
            return Err(EscrowError::ConfigValidation(format!(
                "refund_bonus_percent must be at most 100, got {}",
                self.refund_bonus_percent
            )));
        }

        if !(0..=MAX_JOIN_GRACE_MINUTES).contains(&self.join_grace_minutes) {
            return Err(EscrowError::ConfigValidation(format!(
                "join_grace_minutes must be within 0..={}, got {}",
                MAX_JOIN_GRACE_MINUTES, self.join_grace_minutes
            )));
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(EscrowError::ConfigValidation(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.utc_offset_minutes
            )));
        }

        Ok(())
    }

    /// Local offset used for calendar arithmetic
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Grace window as a duration, `None` when it does not fit a `TimeDelta`
    pub fn join_grace(&self) -> Option<TimeDelta> {
        TimeDelta::try_minutes(self.join_grace_minutes)
    }
}
