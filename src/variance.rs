//! Cash and online-cash variance calculations.
//!
//! Everything here is pure. Sales arrive from the backend either with a
//! legacy single `paymentMode` or with a list of payment legs (split
//! tender); legs are attributed to their own mode.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sales and expenses (read-only backend records)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Cash,
    Card,
    Upi,
    Online,
    Wallet,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tender {
    Cash,
    Online,
    Other,
}

impl PaymentMode {
    pub fn tender(self) -> Tender {
        match self {
            PaymentMode::Cash => Tender::Cash,
            PaymentMode::Card | PaymentMode::Upi | PaymentMode::Online | PaymentMode::Wallet => {
                Tender::Online
            }
            PaymentMode::Other => Tender::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLeg {
    #[serde(alias = "method", alias = "paymentMode")]
    pub mode: PaymentMode,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "amount", alias = "total")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default, alias = "payments")]
    pub payment_modes: Vec<PaymentLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Tallies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub cash: Decimal,
    pub online: Decimal,
    pub other: Decimal,
}

impl PaymentTotals {
    fn add(&mut self, tender: Tender, amount: Decimal) {
        match tender {
            Tender::Cash => self.cash += amount,
            Tender::Online => self.online += amount,
            Tender::Other => self.other += amount,
        }
    }
}

/// Partition a day's sales into cash, online and other tender.
pub fn tally_payments(sales: &[SaleRecord]) -> PaymentTotals {
    let mut totals = PaymentTotals::default();
    for sale in sales {
        if !sale.payment_modes.is_empty() {
            for leg in &sale.payment_modes {
                totals.add(leg.mode.tender(), leg.amount);
            }
            continue;
        }
        let tender = sale
            .payment_mode
            .map(PaymentMode::tender)
            .unwrap_or(Tender::Other);
        totals.add(tender, sale.total_amount);
    }
    totals
}

pub fn cash_sales(sales: &[SaleRecord]) -> Decimal {
    tally_payments(sales).cash
}

pub fn online_sales(sales: &[SaleRecord]) -> Decimal {
    tally_payments(sales).online
}

pub fn expense_total(expenses: &[ExpenseRecord]) -> Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

// ---------------------------------------------------------------------------
// Variances
// ---------------------------------------------------------------------------

/// Cash expected in the drawer at close.
pub fn expected_cash(opening: Decimal, cash_sales: Decimal, expenses: Decimal) -> Decimal {
    opening + cash_sales - expenses
}

/// Positive is a surplus, negative a shortage.
pub fn cash_difference(
    closing: Decimal,
    opening: Decimal,
    cash_sales: Decimal,
    expenses: Decimal,
) -> Decimal {
    closing - expected_cash(opening, cash_sales, expenses)
}

pub fn online_cash_difference(pos_cash: Decimal, online_sales: Decimal) -> Decimal {
    pos_cash - online_sales
}

/// Exact comparison; decimal sums carry no rounding residue.
pub fn has_variance(difference: Decimal) -> bool {
    !difference.is_zero()
}
