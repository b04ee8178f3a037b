//! Reconciliation service that runs the pure core over a record source

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::config::EscrowConfig;
use crate::reporting::{EscrowDistribution, FinancialReport};
use crate::settlement::aggregator::{aggregate_classified, LedgerAggregate};
use crate::settlement::classifier::{classify_bookings, ClassifiedBooking};
use crate::traits::*;
use crate::types::*;

/// Runs classification, aggregation and report building over records
/// pulled from a [`RecordSource`], with "now" taken from a [`Clock`].
///
/// The service keeps no state between runs: every call fetches a fresh
/// snapshot and recomputes from scratch.
pub struct ReconciliationService<S: RecordSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    config: EscrowConfig,
}

impl<S: RecordSource> ReconciliationService<S, SystemClock> {
    /// Create a service reading the system clock
    pub fn new(source: S, config: EscrowConfig) -> EscrowResult<Self> {
        Self::with_clock(source, SystemClock, config)
    }
}

impl<S: RecordSource, C: Clock> ReconciliationService<S, C> {
    /// Create a service with an explicit clock
    pub fn with_clock(source: S, clock: C, config: EscrowConfig) -> EscrowResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch a full snapshot from the record source
    pub async fn load_dataset(&self) -> EscrowResult<Dataset> {
        let bookings = self.source.fetch_bookings().await?;
        let availabilities = self.source.fetch_availabilities().await?;
        let transactions = self.source.fetch_transactions().await?;
        let escrow_records = self.source.fetch_escrow_records().await?;

        log::debug!(
            "loaded {} bookings, {} availabilities, {} transactions, {} escrow records",
            bookings.len(),
            availabilities.len(),
            transactions.len(),
            escrow_records.len()
        );

        Ok(Dataset::new(bookings, availabilities, transactions).with_escrow_records(escrow_records))
    }

    /// Aggregate a fresh snapshot for one timeframe
    pub async fn aggregate(&self, timeframe: Timeframe) -> EscrowResult<LedgerAggregate> {
        let dataset = self.load_dataset().await?;
        let now = self.clock.now();
        let classified = classify_bookings(&dataset.bookings, &dataset.availabilities, now, &self.config);
        Ok(aggregate_classified(
            &classified,
            &dataset.transactions,
            timeframe,
            now,
            self.config.offset(),
        ))
    }

    /// Build the report for one timeframe
    pub async fn build_report(&self, timeframe: Timeframe) -> EscrowResult<FinancialReport> {
        let dataset = self.load_dataset().await?;
        let now = self.clock.now();
        let classified = classify_bookings(&dataset.bookings, &dataset.availabilities, now, &self.config);
        let distribution = self.escrow_distribution(&dataset, &classified);
        Ok(self.report(&dataset, &classified, distribution, timeframe, now))
    }

    /// Build the report for a timeframe given as text (`week`, `month`, `year`)
    pub async fn build_report_for(&self, timeframe: &str) -> EscrowResult<FinancialReport> {
        let timeframe = Timeframe::from_str(timeframe)?;
        self.build_report(timeframe).await
    }

    /// Build reports for several timeframes from one snapshot and one
    /// classification pass
    pub async fn build_reports(
        &self,
        timeframes: &[Timeframe],
    ) -> EscrowResult<Vec<FinancialReport>> {
        let dataset = self.load_dataset().await?;
        let now = self.clock.now();
        let classified = classify_bookings(&dataset.bookings, &dataset.availabilities, now, &self.config);
        let distribution = self.escrow_distribution(&dataset, &classified);

        Ok(timeframes
            .iter()
            .map(|timeframe| self.report(&dataset, &classified, distribution.clone(), *timeframe, now))
            .collect())
    }

    fn report(
        &self,
        dataset: &Dataset,
        classified: &[ClassifiedBooking],
        distribution: EscrowDistribution,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> FinancialReport {
        let aggregate = aggregate_classified(
            classified,
            &dataset.transactions,
            timeframe,
            now,
            self.config.offset(),
        );
        log::info!(
            "built {} report: revenue {}, minimum guaranteed profit {}",
            timeframe,
            aggregate.summary.revenue,
            aggregate.summary.minimum_guaranteed_profit
        );
        FinancialReport::build(&aggregate, distribution, &self.config)
    }

    /// Stored escrow entries when the source has them, otherwise the
    /// states derived from every classified booking
    fn escrow_distribution(
        &self,
        dataset: &Dataset,
        classified: &[ClassifiedBooking],
    ) -> EscrowDistribution {
        if dataset.escrow_records.is_empty() {
            EscrowDistribution::from_classified(classified, &self.config)
        } else {
            EscrowDistribution::from_records(&dataset.escrow_records, &self.config)
        }
    }
}
