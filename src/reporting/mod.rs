//! Report building: tables, escrow distribution, transaction type
//! breakdown and export

pub mod breakdown;
pub mod distribution;
pub mod export;
pub mod report;
pub mod tables;

pub use breakdown::*;
pub use distribution::*;
pub use export::*;
pub use report::*;
pub use tables::*;
