//! Core types and data structures for the escrow reconciliation core

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::validation::deserialize_credits;

/// Lifecycle status of a booking as reported by the booking flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
    /// Any status this crate does not know about yet
    #[serde(other)]
    Unknown,
}

/// Kind of session a tutor offers in an availability slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Regular paid session, the only kind the platform takes commission from
    Standard,
    /// Free trial session
    Trial,
    #[serde(other)]
    Unknown,
}

/// Kind of ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    CreditPurchase,
    Withdrawal,
    #[serde(other)]
    Unknown,
}

impl TransactionType {
    /// Display label used in ledger tables
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::CreditPurchase => "Credit Purchase",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Unknown => "Unknown",
        }
    }

    /// Sign prefix for amounts of this type: money in is `+`, money out is `-`
    pub fn sign(&self) -> &'static str {
        match self {
            TransactionType::CreditPurchase => "+",
            TransactionType::Withdrawal => "-",
            TransactionType::Unknown => "",
        }
    }
}

/// Processing status of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    /// Capitalised label used in ledger tables
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Unknown => "Unknown",
        }
    }
}

/// One scheduled session instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier for the booking
    pub id: u64,
    /// The availability slot this booking consumed
    #[serde(alias = "availability")]
    pub availability_id: u64,
    pub student_id: u64,
    /// Tutor owning the slot, when the fetching layer resolved it
    #[serde(default)]
    pub tutor_id: Option<u64>,
    pub booking_status: BookingStatus,
    pub created_at: DateTime<Utc>,
    /// Overrides the availability's start time when present
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub student_joined_within_5_min: bool,
    #[serde(default)]
    pub student_joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tutor_joined_within_5_min: bool,
    #[serde(default)]
    pub tutor_joined_at: Option<DateTime<Utc>>,
    /// True once a refund decision has been recorded
    #[serde(default)]
    pub refund_status: bool,
}

impl Booking {
    /// Create a booking with no join events and no refund decision
    pub fn new(
        id: u64,
        availability_id: u64,
        student_id: u64,
        booking_status: BookingStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            availability_id,
            student_id,
            tutor_id: None,
            booking_status,
            created_at,
            start_time: None,
            student_joined_within_5_min: false,
            student_joined_at: None,
            tutor_joined_within_5_min: false,
            tutor_joined_at: None,
            refund_status: false,
        }
    }

    /// Start time of the session, falling back to the slot's start time
    pub fn effective_start(&self, availability: &Availability) -> DateTime<Utc> {
        self.start_time.unwrap_or(availability.start_time)
    }

    /// Whether neither party joined within the grace window
    pub fn is_mutual_no_show(&self) -> bool {
        !self.student_joined_within_5_min && !self.tutor_joined_within_5_min
    }

    /// Whether the student showed up on time and the tutor did not
    pub fn is_tutor_no_show(&self) -> bool {
        self.student_joined_within_5_min && !self.tutor_joined_within_5_min
    }
}

/// A tutor's offered slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub id: u64,
    pub tutor_id: u64,
    #[serde(default)]
    pub language_to_teach: String,
    pub session_type: SessionType,
    /// Price of the slot in credits; missing or non-numeric values read as 0
    #[serde(default, deserialize_with = "deserialize_credits")]
    pub credits_required: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_booked: bool,
}

impl Availability {
    /// Create an availability of the given length starting at `start_time`
    pub fn new(
        id: u64,
        tutor_id: u64,
        session_type: SessionType,
        credits_required: i64,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            tutor_id,
            language_to_teach: String::new(),
            session_type,
            credits_required: credits_required.max(0),
            start_time,
            end_time: start_time + duration,
            is_booked: false,
        }
    }
}

/// Availabilities keyed by id for O(1) lookup from bookings
pub type AvailabilityIndex = HashMap<u64, Availability>;

/// Immutable ledger entry from the payment service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub transaction_type: TransactionType,
    /// Amount in currency units
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl Transaction {
    /// Create a transaction without a reference id
    pub fn new(
        id: u64,
        transaction_type: TransactionType,
        amount: BigDecimal,
        status: TransactionStatus,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            transaction_type,
            amount,
            status,
            transaction_date,
            reference_id: None,
        }
    }

    /// Attach a reference id (payment intent, payout id, ...)
    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Only completed transactions count toward reporting sums
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Status of an escrow entry as stored by the payment service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Locked,
    Released,
    Refunded,
    #[serde(other)]
    Unknown,
}

/// Escrow ledger entry locking a student's credits for one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub id: u64,
    pub student_id: u64,
    pub tutor_id: u64,
    pub booking_id: u64,
    #[serde(default, deserialize_with = "deserialize_credits")]
    pub credits_locked: i64,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
}

/// Settlement state of a booking's credits, derived by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowState {
    /// Credits still held between booking and settlement
    Locked,
    /// Tutor paid out, platform took its commission
    Released,
    /// Student reimbursed
    Refunded,
    /// Platform kept the full value after a mutual no-show
    Retained,
}

impl EscrowState {
    pub fn label(&self) -> &'static str {
        match self {
            EscrowState::Locked => "Locked",
            EscrowState::Released => "Released",
            EscrowState::Refunded => "Refunded",
            EscrowState::Retained => "Retained",
        }
    }
}

impl EscrowStatus {
    /// Escrow state this stored status corresponds to, if known
    pub fn as_state(&self) -> Option<EscrowState> {
        match self {
            EscrowStatus::Locked => Some(EscrowState::Locked),
            EscrowStatus::Released => Some(EscrowState::Released),
            EscrowStatus::Refunded => Some(EscrowState::Refunded),
            EscrowStatus::Unknown => None,
        }
    }
}

/// Rolling reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Week,
    Month,
    Year,
}

impl FromStr for Timeframe {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            _ => Err(EscrowError::InvalidTimeframe(s.to_string())),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Week => write!(f, "week"),
            Timeframe::Month => write!(f, "month"),
            Timeframe::Year => write!(f, "year"),
        }
    }
}

/// Everything the core needs for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub bookings: Vec<Booking>,
    pub availabilities: AvailabilityIndex,
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub escrow_records: Vec<EscrowRecord>,
}

impl Dataset {
    /// Build a dataset from the arrays a fetching layer returns
    pub fn new(
        bookings: Vec<Booking>,
        availabilities: Vec<Availability>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            bookings,
            availabilities: index_availabilities(availabilities),
            transactions,
            escrow_records: Vec::new(),
        }
    }

    pub fn with_escrow_records(mut self, escrow_records: Vec<EscrowRecord>) -> Self {
        self.escrow_records = escrow_records;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty() && self.transactions.is_empty() && self.escrow_records.is_empty()
    }
}

/// Convert a fetched availability array into a lookup map.
/// Later entries win when ids repeat.
pub fn index_availabilities(availabilities: Vec<Availability>) -> AvailabilityIndex {
    availabilities.into_iter().map(|a| (a.id, a)).collect()
}

/// Errors that can occur in the reconciliation core
#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("Invalid timeframe: {0} (expected week, month or year)")]
    InvalidTimeframe(String),
    #[error("Config parse error: {0}")]
    ConfigParse(String),
    #[error("Config validation error: {0}")]
    ConfigValidation(String),
    #[error("Invalid escrow transition: {0}")]
    InvalidTransition(String),
    #[error("Escrow entry not found for booking {0}")]
    EscrowNotFound(u64),
    #[error("Record source error: {0}")]
    Source(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for escrow core operations
pub type EscrowResult<T> = Result<T, EscrowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parsing_is_exact() {
        assert_eq!("week".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert_eq!("month".parse::<Timeframe>().unwrap(), Timeframe::Month);
        assert_eq!("year".parse::<Timeframe>().unwrap(), Timeframe::Year);

        for input in [" WEEK ", "Month", "year ", "", "decade"] {
            assert!(matches!(
                input.parse::<Timeframe>(),
                Err(EscrowError::InvalidTimeframe(ref value)) if value == input
            ));
        }
    }
}
