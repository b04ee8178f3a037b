//! Escrow distribution by settlement state, for the escrow chart

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EscrowConfig;
use crate::settlement::classifier::{credits_to_currency, ClassifiedBooking};
use crate::types::*;

/// One state's share of escrowed credits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    pub state: EscrowState,
    pub label: String,
    pub count: usize,
    pub credits: i64,
    pub value: BigDecimal,
    /// Share of all credits, in percent with one decimal
    pub percent: BigDecimal,
}

/// Escrowed credits grouped by state; only states that occur get a slice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscrowDistribution {
    pub slices: Vec<DistributionSlice>,
    pub total_credits: i64,
    pub total_value: BigDecimal,
}

impl EscrowDistribution {
    /// Group stored escrow entries. Entries with an unknown status are ignored.
    pub fn from_records(records: &[EscrowRecord], config: &EscrowConfig) -> Self {
        let entries = records.iter().filter_map(|record| {
            record
                .status
                .as_state()
                .map(|state| (state, record.credits_locked.max(0)))
        });
        Self::from_entries(entries, config)
    }

    /// Group bookings by the escrow state the classifier derived
    pub fn from_classified(bookings: &[ClassifiedBooking], config: &EscrowConfig) -> Self {
        let entries = bookings
            .iter()
            .map(|booking| (booking.escrow_state, booking.credits_required));
        Self::from_entries(entries, config)
    }

    fn from_entries(
        entries: impl IntoIterator<Item = (EscrowState, i64)>,
        config: &EscrowConfig,
    ) -> Self {
        let mut groups: BTreeMap<EscrowState, (usize, i64)> = BTreeMap::new();
        for (state, credits) in entries {
            let group = groups.entry(state).or_insert((0, 0));
            group.0 += 1;
            group.1 = group.1.saturating_add(credits);
        }

        let total_credits: i64 = groups.values().map(|(_, credits)| *credits).sum();

        let slices = groups
            .into_iter()
            .map(|(state, (count, credits))| DistributionSlice {
                state,
                label: state.label().to_string(),
                count,
                credits,
                value: credits_to_currency(credits, config),
                percent: percent_of(credits, total_credits),
            })
            .collect();

        Self {
            slices,
            total_credits,
            total_value: credits_to_currency(total_credits, config),
        }
    }

    pub fn slice(&self, state: EscrowState) -> Option<&DistributionSlice> {
        self.slices.iter().find(|s| s.state == state)
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

fn percent_of(part: i64, total: i64) -> BigDecimal {
    if total == 0 {
        return BigDecimal::from(0);
    }
    (BigDecimal::from(part) * BigDecimal::from(100) / BigDecimal::from(total)).round(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn record(id: u64, credits: i64, status: EscrowStatus) -> EscrowRecord {
        EscrowRecord {
            id,
            student_id: 1,
            tutor_id: 2,
            booking_id: id,
            credits_locked: credits,
            status,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            released_at: None,
        }
    }

    #[test]
    fn test_distribution_percentages() {
        let records = vec![
            record(1, 5, EscrowStatus::Locked),
            record(2, 5, EscrowStatus::Locked),
            record(3, 20, EscrowStatus::Released),
            record(4, 100, EscrowStatus::Unknown),
        ];
        let distribution = EscrowDistribution::from_records(&records, &EscrowConfig::default());

        assert_eq!(distribution.total_credits, 30);
        assert_eq!(distribution.total_value, BigDecimal::from(4500));
        assert!(distribution.slice(EscrowState::Refunded).is_none());

        let locked = distribution.slice(EscrowState::Locked).unwrap();
        assert_eq!(locked.count, 2);
        assert_eq!(locked.credits, 10);
        assert_eq!(locked.value, BigDecimal::from(1500));
        assert_eq!(locked.percent, BigDecimal::from_str("33.3").unwrap());

        let released = distribution.slice(EscrowState::Released).unwrap();
        assert_eq!(released.percent, BigDecimal::from_str("66.7").unwrap());
    }

    #[test]
    fn test_empty_distribution() {
        let distribution = EscrowDistribution::from_records(&[], &EscrowConfig::default());
        assert!(distribution.is_empty());
        assert_eq!(distribution.total_credits, 0);
    }

    #[test]
    fn test_zero_credit_entries_have_zero_percent() {
        let records = vec![record(1, 0, EscrowStatus::Refunded)];
        let distribution = EscrowDistribution::from_records(&records, &EscrowConfig::default());
        let refunded = distribution.slice(EscrowState::Refunded).unwrap();
        assert_eq!(refunded.count, 1);
        assert_eq!(refunded.percent, BigDecimal::from(0));
    }
}
