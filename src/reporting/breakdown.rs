//! Completed transaction volume per type, for the transaction type chart

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Whole-currency volume of one transaction type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeSlice {
    pub transaction_type: TransactionType,
    pub label: String,
    /// Sum of completed amounts, truncated to whole currency units
    pub amount: BigDecimal,
}

/// Completed purchases and withdrawals inside a window.
///
/// Slices appear in the order their type first occurs; a type with no
/// completed transaction gets no slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeBreakdown {
    pub slices: Vec<TransactionTypeSlice>,
}

impl TransactionTypeBreakdown {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut totals: Vec<(TransactionType, BigDecimal)> = Vec::new();

        for transaction in transactions.iter().filter(|t| t.is_completed()) {
            if transaction.transaction_type == TransactionType::Unknown {
                continue;
            }
            match totals
                .iter_mut()
                .find(|(kind, _)| *kind == transaction.transaction_type)
            {
                Some((_, total)) => *total += &transaction.amount,
                None => totals.push((transaction.transaction_type, transaction.amount.clone())),
            }
        }

        let slices = totals
            .into_iter()
            .map(|(transaction_type, total)| TransactionTypeSlice {
                transaction_type,
                label: chart_label(transaction_type).to_string(),
                amount: total.with_scale(0),
            })
            .collect();

        Self { slices }
    }

    pub fn slice(&self, transaction_type: TransactionType) -> Option<&TransactionTypeSlice> {
        self.slices
            .iter()
            .find(|slice| slice.transaction_type == transaction_type)
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

fn chart_label(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::CreditPurchase => "Credit Purchase",
        TransactionType::Withdrawal => "Withdrawals",
        TransactionType::Unknown => "Unknown",
    }
}
