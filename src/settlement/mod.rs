//! Settlement module containing booking classification, escrow
//! transitions, windowed aggregation and the service that runs them over a
//! record source

pub mod aggregator;
pub mod classifier;
pub mod core;
pub mod escrow;

pub use aggregator::*;
pub use classifier::*;
pub use self::core::*;
pub use escrow::*;
