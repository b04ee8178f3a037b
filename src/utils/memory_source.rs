//! In-memory record source for testing and development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::config::EscrowConfig;
use crate::settlement::escrow::{settle_escrow, EscrowAction, EscrowSettlement};
use crate::traits::*;
use crate::types::*;

/// In-memory record source; clones share the same underlying data
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    bookings: Arc<RwLock<Vec<Booking>>>,
    availabilities: Arc<RwLock<Vec<Availability>>>,
    transactions: Arc<RwLock<Vec<Transaction>>>,
    escrow_records: Arc<RwLock<Vec<EscrowRecord>>>,
}

impl MemoryRecordSource {
    /// Create an empty record source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-filled with the given records
    pub fn with_records(
        bookings: Vec<Booking>,
        availabilities: Vec<Availability>,
        transactions: Vec<Transaction>,
    ) -> EscrowResult<Self> {
        let source = Self::new();
        source.extend_bookings(bookings)?;
        source.extend_availabilities(availabilities)?;
        source.extend_transactions(transactions)?;
        Ok(source)
    }

    pub fn add_booking(&self, booking: Booking) -> EscrowResult<()> {
        self.extend_bookings([booking])
    }

    pub fn add_availability(&self, availability: Availability) -> EscrowResult<()> {
        self.extend_availabilities([availability])
    }

    pub fn add_transaction(&self, transaction: Transaction) -> EscrowResult<()> {
        self.extend_transactions([transaction])
    }

    pub fn add_escrow_record(&self, record: EscrowRecord) -> EscrowResult<()> {
        writable(&self.escrow_records, "escrow")?.push(record);
        Ok(())
    }

    pub fn extend_bookings(&self, bookings: impl IntoIterator<Item = Booking>) -> EscrowResult<()> {
        writable(&self.bookings, "booking")?.extend(bookings);
        Ok(())
    }

    pub fn extend_availabilities(
        &self,
        availabilities: impl IntoIterator<Item = Availability>,
    ) -> EscrowResult<()> {
        writable(&self.availabilities, "availability")?.extend(availabilities);
        Ok(())
    }

    pub fn extend_transactions(
        &self,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> EscrowResult<()> {
        writable(&self.transactions, "transaction")?.extend(transactions);
        Ok(())
    }

    /// Refund or release the escrow entry held for a booking.
    ///
    /// When a booking has several entries the locked one is settled first,
    /// then a released one, so a repeated release stays a no-op.
    pub fn settle_escrow(
        &self,
        booking_id: u64,
        action: EscrowAction,
        at: DateTime<Utc>,
        config: &EscrowConfig,
    ) -> EscrowResult<EscrowSettlement> {
        let mut records = writable(&self.escrow_records, "escrow")?;
        let find = |status: Option<EscrowStatus>| {
            records.iter().position(|r| {
                r.booking_id == booking_id && status.map_or(true, |s| r.status == s)
            })
        };
        let index = find(Some(EscrowStatus::Locked))
            .or_else(|| find(Some(EscrowStatus::Released)))
            .or_else(|| find(None))
            .ok_or(EscrowError::EscrowNotFound(booking_id))?;

        let transition = settle_escrow(&records[index], action, at, config)?;
        records[index] = transition.record;
        Ok(transition.settlement)
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> EscrowResult<()> {
        writable(&self.bookings, "booking")?.clear();
        writable(&self.availabilities, "availability")?.clear();
        writable(&self.transactions, "transaction")?.clear();
        writable(&self.escrow_records, "escrow")?.clear();
        Ok(())
    }
}

fn writable<'a, T>(
    lock: &'a RwLock<Vec<T>>,
    what: &str,
) -> EscrowResult<RwLockWriteGuard<'a, Vec<T>>> {
    lock.write()
        .map_err(|_| EscrowError::Source(format!("{what} store lock poisoned")))
}

fn snapshot<T: Clone>(lock: &RwLock<Vec<T>>, what: &str) -> EscrowResult<Vec<T>> {
    lock.read()
        .map(|records| records.clone())
        .map_err(|_| EscrowError::Source(format!("{what} store lock poisoned")))
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_bookings(&self) -> EscrowResult<Vec<Booking>> {
        snapshot(&self.bookings, "booking")
    }

    async fn fetch_availabilities(&self) -> EscrowResult<Vec<Availability>> {
        snapshot(&self.availabilities, "availability")
    }

    async fn fetch_transactions(&self) -> EscrowResult<Vec<Transaction>> {
        snapshot(&self.transactions, "transaction")
    }

    async fn fetch_escrow_records(&self) -> EscrowResult<Vec<EscrowRecord>> {
        snapshot(&self.escrow_records, "escrow")
    }
}
