//! Presentation-ready tables built from aggregation output

use bigdecimal::BigDecimal;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::config::EscrowConfig;
use crate::settlement::aggregator::{FinancialSummary, MonthlyBucket};
use crate::traits::TabularSection;
use crate::types::*;

/// Format a currency value as `<symbol><amount>` with two decimals
pub fn format_currency(amount: &BigDecimal, symbol: &str) -> String {
    format!("{}{}", symbol, amount.round(2).with_scale(2))
}

/// Format a ledger amount with its direction sign, e.g. `+₹150.00`
pub fn format_signed_currency(
    amount: &BigDecimal,
    transaction_type: TransactionType,
    symbol: &str,
) -> String {
    format!(
        "{}{}",
        transaction_type.sign(),
        format_currency(&amount.abs(), symbol)
    )
}

/// One metric of the summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub metric: String,
    pub value: BigDecimal,
}

/// Headline figures for the selected window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub currency_symbol: String,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn from_summary(summary: &FinancialSummary, config: &EscrowConfig) -> Self {
        let row = |metric: &str, value: &BigDecimal| SummaryRow {
            metric: metric.to_string(),
            value: value.clone(),
        };

        Self {
            currency_symbol: config.currency_symbol.clone(),
            rows: vec![
                row("Revenue", &summary.revenue),
                row("Total Withdrawals", &summary.total_withdrawals),
                row("Maximum Potential Profit", &summary.platform_profit),
                row("Minimum Guaranteed Profit", &summary.minimum_guaranteed_profit),
                row("Refund Credits Expenses", &summary.total_refund_credits_expenses),
            ],
        }
    }

    /// (label, formatted value) pairs in display order
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .map(|r| (r.metric.clone(), format_currency(&r.value, &self.currency_symbol)))
            .collect()
    }
}

impl TabularSection for SummaryTable {
    fn title(&self) -> &'static str {
        "Financial Overview"
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Metric", "Amount"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.pairs()
            .into_iter()
            .map(|(metric, amount)| vec![metric, amount])
            .collect()
    }
}

/// One month of the series table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeriesRow {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub revenue: BigDecimal,
    pub withdrawals: BigDecimal,
    pub platform_fee: BigDecimal,
    pub retained_credits: BigDecimal,
    pub platform_profit: BigDecimal,
    pub minimum_guaranteed_profit: BigDecimal,
    pub refund_credits_expenses: BigDecimal,
}

impl From<&MonthlyBucket> for MonthlySeriesRow {
    fn from(bucket: &MonthlyBucket) -> Self {
        let f = &bucket.figures;
        Self {
            year: bucket.year,
            month: bucket.month,
            label: bucket.label.clone(),
            revenue: f.revenue.clone(),
            withdrawals: f.total_withdrawals.clone(),
            platform_fee: f.platform_fee_from_sessions.clone(),
            retained_credits: f.retained_credits.clone(),
            platform_profit: f.platform_profit.clone(),
            minimum_guaranteed_profit: f.minimum_guaranteed_profit.clone(),
            refund_credits_expenses: f.total_refund_credits_expenses.clone(),
        }
    }
}

/// Month-by-month series for charting and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeriesTable {
    pub currency_symbol: String,
    pub rows: Vec<MonthlySeriesRow>,
}

impl MonthlySeriesTable {
    /// Build the series, sorted chronologically whatever the input order
    pub fn from_buckets(buckets: &[MonthlyBucket], config: &EscrowConfig) -> Self {
        let mut rows: Vec<MonthlySeriesRow> = buckets.iter().map(MonthlySeriesRow::from).collect();
        rows.sort_by_key(|r| (r.year, r.month));
        Self {
            currency_symbol: config.currency_symbol.clone(),
            rows,
        }
    }
}

impl TabularSection for MonthlySeriesTable {
    fn title(&self) -> &'static str {
        "Monthly Revenue Overview"
    }

    fn headers(&self) -> Vec<&'static str> {
        vec![
            "Month",
            "Revenue",
            "Total Withdrawals",
            "Platform Fee",
            "Retained Credits",
            "Maximum Potential Profit",
            "Minimum Guaranteed Profit",
            "Refund Credits Expenses",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let money = |v: &BigDecimal| format_currency(v, &self.currency_symbol);
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.label.clone(),
                    money(&r.revenue),
                    money(&r.withdrawals),
                    money(&r.platform_fee),
                    money(&r.retained_credits),
                    money(&r.platform_profit),
                    money(&r.minimum_guaranteed_profit),
                    money(&r.refund_credits_expenses),
                ]
            })
            .collect()
    }
}

/// One formatted ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: String,
    pub reference_id: String,
    pub transaction_type: String,
    pub amount: String,
    pub status: String,
}

impl LedgerRow {
    pub fn from_transaction(transaction: &Transaction, offset: FixedOffset, symbol: &str) -> Self {
        Self {
            date: transaction
                .transaction_date
                .with_timezone(&offset)
                .format("%Y-%m-%d")
                .to_string(),
            reference_id: transaction.reference_id.clone().unwrap_or_default(),
            transaction_type: transaction.transaction_type.label().to_string(),
            amount: format_signed_currency(
                &transaction.amount,
                transaction.transaction_type,
                symbol,
            ),
            status: transaction.status.label().to_string(),
        }
    }
}

/// Transactions inside the window, every status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLedgerTable {
    pub rows: Vec<LedgerRow>,
}

impl TransactionLedgerTable {
    pub fn from_transactions(transactions: &[Transaction], config: &EscrowConfig) -> Self {
        let offset = config.offset();
        Self {
            rows: transactions
                .iter()
                .map(|t| LedgerRow::from_transaction(t, offset, &config.currency_symbol))
                .collect(),
        }
    }
}

impl TabularSection for TransactionLedgerTable {
    fn title(&self) -> &'static str {
        "Transaction Details"
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Date", "Reference ID", "Type", "Amount", "Status"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.reference_id.clone(),
                    r.transaction_type.clone(),
                    r.amount.clone(),
                    r.status.clone(),
                ]
            })
            .collect()
    }
}
