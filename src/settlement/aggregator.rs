//! Windowed ledger aggregation
//!
//! Every call recomputes from the full dataset; nothing is cached between
//! timeframes.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EscrowConfig;
use crate::settlement::classifier::{classify_bookings, ClassifiedBooking};
use crate::types::*;

/// Summed financial figures for one window or one month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Completed credit purchases
    pub revenue: BigDecimal,
    /// Completed withdrawals
    pub total_withdrawals: BigDecimal,
    /// Commission from completed standard sessions
    pub platform_fee_from_sessions: BigDecimal,
    /// Full value kept from mutual no-shows
    pub retained_credits: BigDecimal,
    /// Bonus credits owed on tutor no-show refunds
    pub total_refund_credits_expenses: BigDecimal,
    /// Maximum potential profit: fees plus retained value
    pub platform_profit: BigDecimal,
    /// Profit left after every pending refund bonus is paid
    pub minimum_guaranteed_profit: BigDecimal,
}

impl FinancialSummary {
    /// Sum a set of transactions and classified bookings
    pub fn from_records<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
        bookings: impl IntoIterator<Item = &'a ClassifiedBooking>,
    ) -> Self {
        let mut summary = Self::default();
        for transaction in transactions {
            summary.record_transaction(transaction);
        }
        for booking in bookings {
            summary.record_booking(booking);
        }
        summary.settle();
        summary
    }

    fn record_transaction(&mut self, transaction: &Transaction) {
        if !transaction.is_completed() {
            return;
        }
        match transaction.transaction_type {
            TransactionType::CreditPurchase => self.revenue += &transaction.amount,
            TransactionType::Withdrawal => self.total_withdrawals += &transaction.amount,
            TransactionType::Unknown => {}
        }
    }

    fn record_booking(&mut self, booking: &ClassifiedBooking) {
        self.platform_fee_from_sessions += booking.outcome.platform_fee();
        self.retained_credits += booking.outcome.retained_value();
        self.total_refund_credits_expenses += booking.outcome.refund_expense();
    }

    fn settle(&mut self) {
        self.platform_profit = &self.platform_fee_from_sessions + &self.retained_credits;
        self.minimum_guaranteed_profit = &self.platform_profit - &self.total_refund_credits_expenses;
    }

    /// Whether the profit identities hold exactly
    pub fn is_consistent(&self) -> bool {
        self.platform_profit == &self.platform_fee_from_sessions + &self.retained_credits
            && self.minimum_guaranteed_profit
                == &self.platform_profit - &self.total_refund_credits_expenses
    }
}

/// Figures for one calendar month in the configured local offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    /// `YYYY-M` key, e.g. `2024-3`
    pub key: String,
    /// Three-letter month name, e.g. `Mar`
    pub label: String,
    #[serde(flatten)]
    pub figures: FinancialSummary,
}

/// Output of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAggregate {
    pub timeframe: Timeframe,
    pub window_start: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
    pub summary: FinancialSummary,
    /// Chronological month buckets
    pub monthly: Vec<MonthlyBucket>,
    /// Transactions inside the window, every status, input order
    pub transactions: Vec<Transaction>,
    /// Classified bookings created inside the window
    pub bookings: Vec<ClassifiedBooking>,
}

/// First instant included in the window ending at `now`.
///
/// Weeks are a fixed seven days. Months and years step back on the local
/// calendar, clamping to the last day of shorter months.
pub fn window_start(timeframe: Timeframe, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let start = match timeframe {
        Timeframe::Week => local.checked_sub_signed(Duration::days(7)),
        Timeframe::Month => local.checked_sub_months(Months::new(1)),
        Timeframe::Year => local.checked_sub_months(Months::new(12)),
    };
    start.map_or(DateTime::<Utc>::MIN_UTC, |start| start.with_timezone(&Utc))
}

/// Classify the dataset's bookings and aggregate them with its transactions
pub fn aggregate(
    dataset: &Dataset,
    timeframe: Timeframe,
    now: DateTime<Utc>,
    config: &EscrowConfig,
) -> LedgerAggregate {
    let classified = classify_bookings(&dataset.bookings, &dataset.availabilities, now, config);
    aggregate_classified(&classified, &dataset.transactions, timeframe, now, config.offset())
}

/// Aggregate bookings that were already classified.
///
/// Lets several timeframes share one classification pass.
pub fn aggregate_classified(
    bookings: &[ClassifiedBooking],
    transactions: &[Transaction],
    timeframe: Timeframe,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> LedgerAggregate {
    let start = window_start(timeframe, now, offset);

    let transactions: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.transaction_date >= start)
        .cloned()
        .collect();
    let bookings: Vec<ClassifiedBooking> = bookings
        .iter()
        .filter(|b| b.created_at >= start)
        .cloned()
        .collect();

    log::debug!(
        "aggregating {} transactions and {} bookings for {} window starting {}",
        transactions.len(),
        bookings.len(),
        timeframe,
        start
    );

    let summary = FinancialSummary::from_records(&transactions, &bookings);
    let monthly = monthly_buckets(&transactions, &bookings, offset);

    LedgerAggregate {
        timeframe,
        window_start: start,
        as_of: now,
        summary,
        monthly,
        transactions,
        bookings,
    }
}

/// Group records by local calendar month.
///
/// A month gets a bucket as soon as either a transaction or a booking
/// falls into it.
pub fn monthly_buckets(
    transactions: &[Transaction],
    bookings: &[ClassifiedBooking],
    offset: FixedOffset,
) -> Vec<MonthlyBucket> {
    let month_of = |ts: &DateTime<Utc>| {
        let local = ts.with_timezone(&offset);
        (local.year(), local.month())
    };

    let mut groups: BTreeMap<(i32, u32), (Vec<&Transaction>, Vec<&ClassifiedBooking>, String)> =
        BTreeMap::new();

    for transaction in transactions {
        let key = month_of(&transaction.transaction_date);
        groups
            .entry(key)
            .or_insert_with(|| (Vec::new(), Vec::new(), month_label(&transaction.transaction_date, offset)))
            .0
            .push(transaction);
    }
    for booking in bookings {
        let key = month_of(&booking.created_at);
        groups
            .entry(key)
            .or_insert_with(|| (Vec::new(), Vec::new(), month_label(&booking.created_at, offset)))
            .1
            .push(booking);
    }

    groups
        .into_iter()
        .map(|((year, month), (transactions, bookings, label))| MonthlyBucket {
            year,
            month,
            key: format!("{year}-{month}"),
            label,
            figures: FinancialSummary::from_records(transactions, bookings),
        })
        .collect()
}

fn month_label(ts: &DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%b").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::classifier::SessionOutcome;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn txn(
        id: u64,
        kind: TransactionType,
        amount: i64,
        status: TransactionStatus,
        date: DateTime<Utc>,
    ) -> Transaction {
        Transaction::new(id, kind, BigDecimal::from(amount), status, date)
    }

    fn fee_booking(id: u64, fee: i64, created_at: DateTime<Utc>) -> ClassifiedBooking {
        ClassifiedBooking {
            booking_id: id,
            availability_id: id,
            created_at,
            booking_status: BookingStatus::Completed,
            session_type: SessionType::Standard,
            credits_required: 10,
            outcome: SessionOutcome::FeeEarned {
                fee_credits: 2,
                fee: BigDecimal::from(fee),
            },
            escrow_state: EscrowState::Released,
        }
    }

    fn refund_booking(id: u64, expense: i64, created_at: DateTime<Utc>) -> ClassifiedBooking {
        ClassifiedBooking {
            outcome: SessionOutcome::Refund {
                bonus_credits: 1,
                expense: BigDecimal::from(expense),
            },
            booking_status: BookingStatus::Cancelled,
            escrow_state: EscrowState::Refunded,
            ..fee_booking(id, 0, created_at)
        }
    }

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            txn(1, TransactionType::CreditPurchase, 1000, TransactionStatus::Completed, now() - Duration::days(2)),
            txn(2, TransactionType::CreditPurchase, 500, TransactionStatus::Pending, now() - Duration::days(2)),
            txn(3, TransactionType::Withdrawal, 300, TransactionStatus::Completed, now() - Duration::days(20)),
            txn(4, TransactionType::CreditPurchase, 700, TransactionStatus::Completed, now() - Duration::days(200)),
            txn(5, TransactionType::Unknown, 999, TransactionStatus::Completed, now() - Duration::days(1)),
            txn(6, TransactionType::Withdrawal, 50, TransactionStatus::Failed, now() - Duration::days(1)),
        ]
    }

    fn sample_bookings() -> Vec<ClassifiedBooking> {
        vec![
            fee_booking(1, 300, now() - Duration::days(3)),
            fee_booking(2, 600, now() - Duration::days(25)),
            refund_booking(3, 150, now() - Duration::days(100)),
        ]
    }

    #[test]
    fn test_empty_dataset_yields_zero_report() {
        for timeframe in [Timeframe::Week, Timeframe::Month, Timeframe::Year] {
            let result = aggregate_classified(&[], &[], timeframe, now(), utc());
            assert_eq!(result.summary, FinancialSummary::default());
            assert!(result.monthly.is_empty());
            assert!(result.transactions.is_empty());
        }
    }

    #[test]
    fn test_only_completed_known_transactions_count() {
        let result = aggregate_classified(&[], &sample_transactions(), Timeframe::Week, now(), utc());
        assert_eq!(result.summary.revenue, BigDecimal::from(1000));
        assert_eq!(result.summary.total_withdrawals, BigDecimal::from(0));
        // window filtering keeps all statuses for the ledger
        assert_eq!(result.transactions.len(), 4);
    }

    #[test]
    fn test_profit_identities() {
        let result = aggregate_classified(
            &sample_bookings(),
            &sample_transactions(),
            Timeframe::Year,
            now(),
            utc(),
        );
        let summary = &result.summary;
        assert_eq!(summary.platform_fee_from_sessions, BigDecimal::from(900));
        assert_eq!(summary.total_refund_credits_expenses, BigDecimal::from(150));
        assert_eq!(summary.platform_profit, BigDecimal::from(900));
        assert_eq!(summary.minimum_guaranteed_profit, BigDecimal::from(750));
        assert!(summary.is_consistent());
        assert!(result.monthly.iter().all(|m| m.figures.is_consistent()));
    }

    #[test]
    fn test_widening_window_never_decreases_sums() {
        let bookings = sample_bookings();
        let transactions = sample_transactions();
        let summaries: Vec<FinancialSummary> = [Timeframe::Week, Timeframe::Month, Timeframe::Year]
            .into_iter()
            .map(|tf| aggregate_classified(&bookings, &transactions, tf, now(), utc()).summary)
            .collect();

        for pair in summaries.windows(2) {
            assert!(pair[0].revenue <= pair[1].revenue);
            assert!(pair[0].total_withdrawals <= pair[1].total_withdrawals);
            assert!(pair[0].platform_fee_from_sessions <= pair[1].platform_fee_from_sessions);
            assert!(pair[0].retained_credits <= pair[1].retained_credits);
        }
        assert_eq!(summaries[2].revenue, BigDecimal::from(1700));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let bookings = sample_bookings();
        let transactions = sample_transactions();
        let first = aggregate_classified(&bookings, &transactions, Timeframe::Month, now(), utc());
        let second = aggregate_classified(&bookings, &transactions, Timeframe::Month, now(), utc());
        assert_eq!(first, second);
    }

    #[test]
    fn test_month_with_only_bookings_gets_bucket() {
        let bookings = vec![fee_booking(1, 300, Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap())];
        let transactions = vec![txn(
            1,
            TransactionType::CreditPurchase,
            100,
            TransactionStatus::Completed,
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
        )];

        let buckets = monthly_buckets(&transactions, &bookings, utc());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "2024-4");
        assert_eq!(buckets[0].label, "Apr");
        assert_eq!(buckets[0].figures.revenue, BigDecimal::from(0));
        assert_eq!(buckets[0].figures.platform_fee_from_sessions, BigDecimal::from(300));
        assert_eq!(buckets[1].key, "2024-5");
        assert_eq!(buckets[1].figures.revenue, BigDecimal::from(100));
    }

    #[test]
    fn test_buckets_sorted_across_year_boundary() {
        let transactions = vec![
            txn(1, TransactionType::CreditPurchase, 10, TransactionStatus::Completed, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
            txn(2, TransactionType::CreditPurchase, 10, TransactionStatus::Completed, Utc.with_ymd_and_hms(2023, 12, 5, 0, 0, 0).unwrap()),
            txn(3, TransactionType::CreditPurchase, 10, TransactionStatus::Completed, Utc.with_ymd_and_hms(2023, 11, 5, 0, 0, 0).unwrap()),
        ];
        let keys: Vec<String> = monthly_buckets(&transactions, &[], utc())
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-1"]);
    }

    #[test]
    fn test_buckets_follow_local_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let transactions = vec![txn(
            1,
            TransactionType::Withdrawal,
            10,
            TransactionStatus::Completed,
            Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap(),
        )];
        let buckets = monthly_buckets(&transactions, &[], ist);
        assert_eq!(buckets[0].key, "2024-2");
        assert_eq!(buckets[0].label, "Feb");
    }

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 10, 0, 0).unwrap();
        assert_eq!(
            window_start(Timeframe::Week, now, utc()),
            Utc.with_ymd_and_hms(2024, 3, 24, 10, 0, 0).unwrap()
        );
        assert_eq!(
            window_start(Timeframe::Month, now, utc()),
            Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap()
        );
        assert_eq!(
            window_start(Timeframe::Year, now, utc()),
            Utc.with_ymd_and_hms(2023, 3, 31, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_aggregate_classifies_dataset() {
        let availability = Availability::new(
            1,
            7,
            SessionType::Standard,
            10,
            now() - Duration::days(1),
            Duration::hours(1),
        );
        let booking = Booking::new(1, 1, 3, BookingStatus::Completed, now() - Duration::days(2));
        let orphan = Booking::new(2, 42, 3, BookingStatus::Completed, now() - Duration::days(2));
        let dataset = Dataset::new(vec![booking, orphan], vec![availability], Vec::new());

        let result = aggregate(&dataset, Timeframe::Week, now(), &EscrowConfig::default());
        assert_eq!(result.summary.platform_fee_from_sessions, BigDecimal::from(300));
        assert_eq!(result.bookings.len(), 1);
    }
}
