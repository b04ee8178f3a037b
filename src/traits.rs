//! Traits for the seams between the pure core and its collaborators

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::*;

/// Source of the records a reconciliation run consumes
///
/// The core never performs I/O itself. A fetching layer (REST client,
/// database, fixture files, in-memory store) implements this trait and the
/// [`ReconciliationService`](crate::settlement::ReconciliationService)
/// pulls a full snapshot through it for every run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All bookings visible to the reporting user
    async fn fetch_bookings(&self) -> EscrowResult<Vec<Booking>>;

    /// All availability slots referenced by bookings
    async fn fetch_availabilities(&self) -> EscrowResult<Vec<Availability>>;

    /// Ledger transactions of every status
    async fn fetch_transactions(&self) -> EscrowResult<Vec<Transaction>>;

    /// Escrow ledger entries, if the source tracks them
    async fn fetch_escrow_records(&self) -> EscrowResult<Vec<EscrowRecord>> {
        Ok(Vec::new())
    }
}

/// Wall-clock abstraction so "now" is always an explicit input
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant, for tests and replayed reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A titled table that can be rendered into an exported sheet
pub trait TabularSection {
    /// Sheet or section title
    fn title(&self) -> &'static str;

    /// Column headers, in display order
    fn headers(&self) -> Vec<&'static str>;

    /// Fully formatted rows, one string per column
    fn rows(&self) -> Vec<Vec<String>>;
}
