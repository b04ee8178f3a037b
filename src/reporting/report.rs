//! Complete financial report for one timeframe

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EscrowConfig;
use crate::reporting::breakdown::TransactionTypeBreakdown;
use crate::reporting::distribution::EscrowDistribution;
use crate::reporting::export::ReportWorkbook;
use crate::reporting::tables::{MonthlySeriesTable, SummaryTable, TransactionLedgerTable};
use crate::settlement::aggregator::{FinancialSummary, LedgerAggregate};
use crate::types::*;

/// Everything the dashboard shows and exports for one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub window_start: DateTime<Utc>,
    /// Raw figures behind the summary table
    pub figures: FinancialSummary,
    pub summary: SummaryTable,
    pub monthly: MonthlySeriesTable,
    pub ledger: TransactionLedgerTable,
    pub escrow_distribution: EscrowDistribution,
    pub transaction_types: TransactionTypeBreakdown,
}

impl FinancialReport {
    /// Shape an aggregation result into report tables
    pub fn build(
        aggregate: &LedgerAggregate,
        escrow_distribution: EscrowDistribution,
        config: &EscrowConfig,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: aggregate.as_of,
            timeframe: aggregate.timeframe,
            window_start: aggregate.window_start,
            figures: aggregate.summary.clone(),
            summary: SummaryTable::from_summary(&aggregate.summary, config),
            monthly: MonthlySeriesTable::from_buckets(&aggregate.monthly, config),
            ledger: TransactionLedgerTable::from_transactions(&aggregate.transactions, config),
            escrow_distribution,
            transaction_types: TransactionTypeBreakdown::from_transactions(&aggregate.transactions),
        }
    }

    /// Summary, monthly series and ledger as exportable sheets
    pub fn workbook(&self) -> ReportWorkbook {
        let mut workbook = ReportWorkbook::new();
        workbook.add_section(&self.summary);
        workbook.add_section(&self.monthly);
        workbook.add_section(&self.ledger);
        workbook
    }

    pub fn is_empty(&self) -> bool {
        self.monthly.rows.is_empty()
            && self.ledger.rows.is_empty()
            && self.escrow_distribution.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::aggregator::aggregate;
    use chrono::TimeZone;

    #[test]
    fn test_empty_report_has_zero_rows() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let config = EscrowConfig::default();
        let result = aggregate(&Dataset::default(), Timeframe::Month, now, &config);
        let report = FinancialReport::build(&result, EscrowDistribution::default(), &config);

        assert!(report.is_empty());
        assert!(report.transaction_types.is_empty());
        assert_eq!(report.summary.rows.len(), 5);
        assert!(report
            .summary
            .pairs()
            .iter()
            .all(|(_, amount)| amount == "₹0.00"));

        let workbook = report.workbook();
        let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Financial Overview", "Monthly Revenue Overview", "Transaction Details"]
        );
        assert!(workbook.sheet("Transaction Details").unwrap().rows.is_empty());
    }
}
