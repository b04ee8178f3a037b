//! Financial report example: classify a few bookings and export the report

use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use escrow_ledger_core::utils::MemoryRecordSource;
use escrow_ledger_core::{
    Availability, Booking, BookingStatus, EscrowConfig, ReconciliationService, SessionType,
    Timeframe, Transaction, TransactionStatus, TransactionType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("📒 Escrow Ledger Core - Financial Report Example\n");

    let now = Utc::now();
    let source = MemoryRecordSource::new();

    // A completed standard session and a mutual no-show
    source.add_availability(Availability::new(
        1,
        7,
        SessionType::Standard,
        10,
        now - Duration::days(1),
        Duration::hours(1),
    ))?;
    source.add_availability(Availability::new(
        2,
        7,
        SessionType::Standard,
        6,
        now - Duration::minutes(30),
        Duration::hours(1),
    ))?;
    source.add_booking(Booking::new(1, 1, 100, BookingStatus::Completed, now - Duration::days(2)))?;
    source.add_booking(Booking::new(2, 2, 101, BookingStatus::Confirmed, now - Duration::days(1)))?;

    source.add_transaction(
        Transaction::new(
            1,
            TransactionType::CreditPurchase,
            BigDecimal::from(4500),
            TransactionStatus::Completed,
            now - Duration::days(1),
        )
        .with_reference("cs_live_001"),
    )?;

    let service = ReconciliationService::new(source, EscrowConfig::default())?;
    let report = service.build_report(Timeframe::Month).await?;

    println!("📊 Financial Overview ({})", report.timeframe);
    for (metric, amount) in report.summary.pairs() {
        println!("  {metric:<28} {amount}");
    }
    println!();

    println!("💳 Transaction types");
    for slice in &report.transaction_types.slices {
        println!("  {:<16} {}", slice.label, slice.amount);
    }
    println!();

    println!("🔐 Escrow distribution");
    for slice in &report.escrow_distribution.slices {
        println!(
            "  {:<10} {:>3} bookings {:>5} credits ({}%)",
            slice.label, slice.count, slice.credits, slice.percent
        );
    }
    println!();

    let document = report.workbook().to_csv_document()?;
    println!("📄 Exported report ({} bytes):\n", document.len());
    println!("{}", String::from_utf8_lossy(&document));

    Ok(())
}
