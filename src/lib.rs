//! # Escrow Ledger Core
//!
//! Booking credit escrow classification and financial reconciliation for a
//! language-tutoring marketplace.
//!
//! ## Features
//!
//! - **Session outcome classification**: refund bonuses, platform fees and
//!   retained credits derived from booking status and join timestamps
//! - **Escrow state**: every booking carries a first-class `Locked`,
//!   `Released`, `Refunded` or `Retained` state, and stored escrow entries
//!   settle through checked refund and release transitions
//! - **Windowed aggregation**: weekly, monthly and yearly summaries plus
//!   calendar-month buckets
//! - **Reporting**: summary, monthly series and transaction ledger tables,
//!   escrow distribution, transaction type breakdown, CSV export
//! - **Source abstraction**: records come from any [`RecordSource`]
//!   implementation; the clock is injected through [`Clock`]
//!
//! ## Quick Start
//!
//! ```rust
//! use escrow_ledger_core::{aggregate, Dataset, EscrowConfig, Timeframe};
//! use chrono::Utc;
//!
//! let config = EscrowConfig::default();
//! let result = aggregate(&Dataset::default(), Timeframe::Month, Utc::now(), &config);
//! assert!(result.monthly.is_empty());
//! ```

pub mod config;
pub mod reporting;
pub mod settlement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use reporting::*;
pub use settlement::*;
pub use traits::*;
pub use types::*;
