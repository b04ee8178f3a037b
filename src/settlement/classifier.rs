//! Session outcome classification
//!
//! Maps one booking and the slot it consumed to exactly one settlement
//! outcome. Rules are checked in priority order:
//!
//! 1. refund: a refund was recorded, the student joined on time and the tutor did not
//! 2. fee earned: a completed standard session
//! 3. retained: a confirmed session where nobody joined and the grace window has passed
//! 4. otherwise no financial attribution
//!
//! All credit arithmetic is integer. The platform fee truncates toward zero
//! and the refund bonus floors; the two only differ for negative inputs but
//! both operations are kept distinct.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EscrowConfig;
use crate::types::*;

/// Settlement outcome of a single booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Tutor no-show; the platform owes the student a bonus on top of the base refund
    Refund {
        bonus_credits: i64,
        expense: BigDecimal,
    },
    /// Platform commission on a completed standard session
    FeeEarned { fee_credits: i64, fee: BigDecimal },
    /// Mutual no-show; the platform keeps the full value
    Retained { credits: i64, value: BigDecimal },
    /// No financial attribution
    #[serde(rename = "none")]
    Unattributed,
}

impl SessionOutcome {
    /// Platform fee contributed by this outcome
    pub fn platform_fee(&self) -> BigDecimal {
        match self {
            SessionOutcome::FeeEarned { fee, .. } => fee.clone(),
            _ => BigDecimal::from(0),
        }
    }

    /// Retained value contributed by this outcome
    pub fn retained_value(&self) -> BigDecimal {
        match self {
            SessionOutcome::Retained { value, .. } => value.clone(),
            _ => BigDecimal::from(0),
        }
    }

    /// Refund bonus expense contributed by this outcome
    pub fn refund_expense(&self) -> BigDecimal {
        match self {
            SessionOutcome::Refund { expense, .. } => expense.clone(),
            _ => BigDecimal::from(0),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SessionOutcome::Refund { .. } => "refund",
            SessionOutcome::FeeEarned { .. } => "fee_earned",
            SessionOutcome::Retained { .. } => "retained",
            SessionOutcome::Unattributed => "none",
        }
    }
}

/// Platform commission in whole credits, truncated toward zero
pub fn platform_fee_credits(credits: i64, fee_percent: u32) -> i64 {
    credits.saturating_mul(i64::from(fee_percent)) / 100
}

/// Refund goodwill bonus in whole credits, floored
pub fn refund_bonus_credits(credits: i64, bonus_percent: u32) -> i64 {
    credits
        .saturating_mul(i64::from(bonus_percent))
        .div_euclid(100)
}

/// Convert whole credits to currency with the configured unit price
pub fn credits_to_currency(credits: i64, config: &EscrowConfig) -> BigDecimal {
    BigDecimal::from(credits) * &config.unit_price_in_currency
}

/// Classify one booking against its availability slot
///
/// `now` is only consulted for the mutual no-show rule.
pub fn classify_booking(
    booking: &Booking,
    availability: &Availability,
    now: DateTime<Utc>,
    config: &EscrowConfig,
) -> SessionOutcome {
    let credits = availability.credits_required.max(0);

    if booking.refund_status && booking.is_tutor_no_show() {
        let bonus_credits = refund_bonus_credits(credits, config.refund_bonus_percent);
        return SessionOutcome::Refund {
            bonus_credits,
            expense: credits_to_currency(bonus_credits, config),
        };
    }

    if booking.booking_status == BookingStatus::Completed
        && availability.session_type == SessionType::Standard
    {
        let fee_credits = platform_fee_credits(credits, config.platform_fee_percent);
        return SessionOutcome::FeeEarned {
            fee_credits,
            fee: credits_to_currency(fee_credits, config),
        };
    }

    if booking.booking_status == BookingStatus::Confirmed
        && booking.is_mutual_no_show()
        && retention_deadline(booking, availability, config).is_some_and(|deadline| now > deadline)
    {
        return SessionOutcome::Retained {
            credits,
            value: credits_to_currency(credits, config),
        };
    }

    SessionOutcome::Unattributed
}

/// End of the join grace window for a booking.
///
/// `None` when the deadline cannot be represented; such a booking is never
/// retained.
pub fn retention_deadline(
    booking: &Booking,
    availability: &Availability,
    config: &EscrowConfig,
) -> Option<DateTime<Utc>> {
    let grace = config.join_grace()?;
    booking.effective_start(availability).checked_add_signed(grace)
}

/// Escrow state implied by a booking and its classified outcome
pub fn derive_escrow_state(booking: &Booking, outcome: &SessionOutcome) -> EscrowState {
    match outcome {
        SessionOutcome::Refund { .. } => EscrowState::Refunded,
        SessionOutcome::Retained { .. } => EscrowState::Retained,
        SessionOutcome::FeeEarned { .. } => EscrowState::Released,
        SessionOutcome::Unattributed => match booking.booking_status {
            BookingStatus::Completed => EscrowState::Released,
            BookingStatus::Cancelled if booking.refund_status => EscrowState::Refunded,
            _ => EscrowState::Locked,
        },
    }
}

/// A booking with its outcome and escrow state computed once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedBooking {
    pub booking_id: u64,
    pub availability_id: u64,
    pub created_at: DateTime<Utc>,
    pub booking_status: BookingStatus,
    pub session_type: SessionType,
    pub credits_required: i64,
    pub outcome: SessionOutcome,
    pub escrow_state: EscrowState,
}

impl ClassifiedBooking {
    /// Classify a booking and attach the derived escrow state
    pub fn new(
        booking: &Booking,
        availability: &Availability,
        now: DateTime<Utc>,
        config: &EscrowConfig,
    ) -> Self {
        let outcome = classify_booking(booking, availability, now, config);
        let escrow_state = derive_escrow_state(booking, &outcome);
        Self {
            booking_id: booking.id,
            availability_id: availability.id,
            created_at: booking.created_at,
            booking_status: booking.booking_status,
            session_type: availability.session_type,
            credits_required: availability.credits_required.max(0),
            outcome,
            escrow_state,
        }
    }
}

/// Classify every booking whose availability is known.
///
/// Bookings pointing at a missing availability contribute nothing and are
/// dropped from the result.
pub fn classify_bookings(
    bookings: &[Booking],
    availabilities: &AvailabilityIndex,
    now: DateTime<Utc>,
    config: &EscrowConfig,
) -> Vec<ClassifiedBooking> {
    bookings
        .iter()
        .filter_map(|booking| match availabilities.get(&booking.availability_id) {
            Some(availability) => Some(ClassifiedBooking::new(booking, availability, now, config)),
            None => {
                log::warn!(
                    "skipping booking {}: availability {} not found",
                    booking.id,
                    booking.availability_id
                );
                None
            }
        })
        .collect()
}
