//! Escrow settlement transitions
//!
//! Credits are locked when a booking is made and leave escrow once, either
//! refunded to the student or released to the tutor. Releasing an entry
//! that is already released is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EscrowConfig;
use crate::types::*;

/// Settlement requested for a locked escrow entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EscrowAction {
    /// Return the locked credits to the student
    Refund,
    /// Pay the tutor for a delivered session
    Release { session_type: SessionType },
}

impl EscrowAction {
    fn verb(&self) -> &'static str {
        match self {
            EscrowAction::Refund => "refund",
            EscrowAction::Release { .. } => "release",
        }
    }
}

/// Credit movement produced by a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "settlement", rename_all = "snake_case")]
pub enum EscrowSettlement {
    Refunded {
        student_id: u64,
        credits: i64,
    },
    Released {
        tutor_id: u64,
        tutor_credits: i64,
        platform_credits: i64,
    },
    /// The entry was released earlier; nothing moves
    AlreadyReleased,
}

/// Updated escrow entry together with the credits it moved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransition {
    pub record: EscrowRecord,
    pub settlement: EscrowSettlement,
}

/// Tutor's share of released credits.
///
/// Standard sessions pay out the locked credits minus the platform fee
/// percentage, floored. Trial sessions pay out in full.
pub fn tutor_share_credits(
    credits_locked: i64,
    session_type: SessionType,
    config: &EscrowConfig,
) -> EscrowResult<i64> {
    let credits = credits_locked.max(0);
    match session_type {
        SessionType::Standard => {
            let tutor_percent = 100 - i64::from(config.platform_fee_percent.min(100));
            Ok(credits.saturating_mul(tutor_percent) / 100)
        }
        SessionType::Trial => Ok(credits),
        SessionType::Unknown => Err(EscrowError::InvalidTransition(
            "cannot release credits for an unknown session type".to_string(),
        )),
    }
}

/// Apply a settlement to an escrow entry without mutating it
pub fn settle_escrow(
    record: &EscrowRecord,
    action: EscrowAction,
    at: DateTime<Utc>,
    config: &EscrowConfig,
) -> EscrowResult<EscrowTransition> {
    let credits = record.credits_locked.max(0);

    let (status, settlement) = match (record.status, action) {
        (EscrowStatus::Locked, EscrowAction::Refund) => (
            EscrowStatus::Refunded,
            EscrowSettlement::Refunded {
                student_id: record.student_id,
                credits,
            },
        ),
        (EscrowStatus::Locked, EscrowAction::Release { session_type }) => {
            let tutor_credits = tutor_share_credits(credits, session_type, config)?;
            (
                EscrowStatus::Released,
                EscrowSettlement::Released {
                    tutor_id: record.tutor_id,
                    tutor_credits,
                    platform_credits: credits - tutor_credits,
                },
            )
        }
        (EscrowStatus::Released, EscrowAction::Release { .. }) => {
            return Ok(EscrowTransition {
                record: record.clone(),
                settlement: EscrowSettlement::AlreadyReleased,
            });
        }
        (from, action) => {
            return Err(EscrowError::InvalidTransition(format!(
                "cannot {} booking {} from {:?}",
                action.verb(),
                record.booking_id,
                from
            )));
        }
    };

    log::debug!(
        "escrow for booking {} moved {:?} -> {:?}",
        record.booking_id,
        record.status,
        status
    );

    Ok(EscrowTransition {
        record: EscrowRecord {
            status,
            released_at: Some(at),
            ..record.clone()
        },
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn record(status: EscrowStatus, credits: i64) -> EscrowRecord {
        EscrowRecord {
            id: 1,
            student_id: 5,
            tutor_id: 7,
            booking_id: 42,
            credits_locked: credits,
            status,
            created_at: now() - Duration::days(1),
            released_at: None,
        }
    }

    fn release(session_type: SessionType) -> EscrowAction {
        EscrowAction::Release { session_type }
    }

    #[test]
    fn test_refund_from_locked() {
        let transition = settle_escrow(
            &record(EscrowStatus::Locked, 12),
            EscrowAction::Refund,
            now(),
            &EscrowConfig::default(),
        )
        .unwrap();

        assert_eq!(transition.record.status, EscrowStatus::Refunded);
        assert_eq!(transition.record.released_at, Some(now()));
        assert_eq!(
            transition.settlement,
            EscrowSettlement::Refunded {
                student_id: 5,
                credits: 12,
            }
        );
    }

    #[test]
    fn test_standard_release_pays_tutor_share() {
        let transition = settle_escrow(
            &record(EscrowStatus::Locked, 13),
            release(SessionType::Standard),
            now(),
            &EscrowConfig::default(),
        )
        .unwrap();

        assert_eq!(transition.record.status, EscrowStatus::Released);
        assert_eq!(
            transition.settlement,
            EscrowSettlement::Released {
                tutor_id: 7,
                tutor_credits: 10,
                platform_credits: 3,
            }
        );
    }

    #[test]
    fn test_trial_release_pays_in_full() {
        let transition = settle_escrow(
            &record(EscrowStatus::Locked, 4),
            release(SessionType::Trial),
            now(),
            &EscrowConfig::default(),
        )
        .unwrap();

        assert_eq!(
            transition.settlement,
            EscrowSettlement::Released {
                tutor_id: 7,
                tutor_credits: 4,
                platform_credits: 0,
            }
        );
    }

    #[test]
    fn test_repeated_release_is_noop() {
        let released = EscrowRecord {
            released_at: Some(now() - Duration::hours(1)),
            ..record(EscrowStatus::Released, 10)
        };
        let transition = settle_escrow(
            &released,
            release(SessionType::Standard),
            now(),
            &EscrowConfig::default(),
        )
        .unwrap();

        assert_eq!(transition.settlement, EscrowSettlement::AlreadyReleased);
        assert_eq!(transition.record, released);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let config = EscrowConfig::default();
        let cases = [
            (EscrowStatus::Released, EscrowAction::Refund),
            (EscrowStatus::Refunded, EscrowAction::Refund),
            (EscrowStatus::Refunded, release(SessionType::Standard)),
            (EscrowStatus::Unknown, EscrowAction::Refund),
            (EscrowStatus::Unknown, release(SessionType::Trial)),
            (EscrowStatus::Locked, release(SessionType::Unknown)),
        ];

        for (status, action) in cases {
            let result = settle_escrow(&record(status, 10), action, now(), &config);
            assert!(
                matches!(result, Err(EscrowError::InvalidTransition(_))),
                "{status:?} + {action:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_tutor_share_follows_fee_percent() {
        let config = EscrowConfig {
            platform_fee_percent: 25,
            ..EscrowConfig::default()
        };
        assert_eq!(tutor_share_credits(10, SessionType::Standard, &config).unwrap(), 7);
        assert_eq!(tutor_share_credits(-3, SessionType::Standard, &config).unwrap(), 0);
        assert_eq!(tutor_share_credits(10, SessionType::Trial, &config).unwrap(), 10);

        for credits in 0..=60 {
            let tutor = tutor_share_credits(credits, SessionType::Standard, &EscrowConfig::default())
                .unwrap();
            assert_eq!(tutor, credits * 80 / 100);
        }
    }
}
