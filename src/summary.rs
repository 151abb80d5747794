//! Daily cash registry summary.
//!
//! A summary row is never persisted; it is rebuilt from the day's opening and
//! closing entries plus the backend's sales and expense records for the date.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::shifts::{ShiftEntry, ShiftType};
use crate::variance::{self, ExpenseRecord, SaleRecord};
use crate::verification::DayState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub opening_balance: Decimal,
    pub cash_collected: Decimal,
    pub expense: Decimal,
    pub cash_balance: Decimal,
    pub closing_balance: Decimal,
    pub cash_difference: Decimal,
    pub total_online_sales: Decimal,
    pub cash_in_pos: Decimal,
    pub online_cash_difference: Decimal,
    pub balance_difference_reason: Option<String>,
    pub online_cash_difference_reason: Option<String>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub opening_entry_id: Option<String>,
    pub closing_entry_id: Option<String>,
    pub state: DayState,
}

fn entry_of<'a>(entries: &'a [ShiftEntry], date: NaiveDate, shift: ShiftType) -> Option<&'a ShiftEntry> {
    entries
        .iter()
        .find(|e| e.date == date && e.shift_type == shift)
}

/// Build the summary row for `date`.
///
/// `entries` may contain entries for other dates; only those matching `date`
/// are used. `sales` and `expenses` must already be scoped to `date`.
pub fn build_daily_summary(
    date: NaiveDate,
    entries: &[ShiftEntry],
    sales: &[SaleRecord],
    expenses: &[ExpenseRecord],
) -> DailySummary {
    let opening = entry_of(entries, date, ShiftType::Opening);
    let closing = entry_of(entries, date, ShiftType::Closing);

    let tender = variance::tally_payments(sales);
    let expense = variance::expense_total(expenses);

    let opening_balance = opening.map(ShiftEntry::balance).unwrap_or(Decimal::ZERO);
    let closing_balance = closing.map(ShiftEntry::balance).unwrap_or(Decimal::ZERO);
    let cash_in_pos = closing.map(ShiftEntry::pos_cash).unwrap_or(Decimal::ZERO);

    DailySummary {
        date,
        opening_balance,
        cash_collected: tender.cash,
        expense,
        cash_balance: variance::expected_cash(opening_balance, tender.cash, expense),
        closing_balance,
        cash_difference: variance::cash_difference(
            closing_balance,
            opening_balance,
            tender.cash,
            expense,
        ),
        total_online_sales: tender.online,
        cash_in_pos,
        online_cash_difference: variance::online_cash_difference(cash_in_pos, tender.online),
        balance_difference_reason: closing.and_then(|c| c.balance_difference_reason.clone()),
        online_cash_difference_reason: closing
            .and_then(|c| c.online_cash_difference_reason.clone()),
        is_verified: closing.map(|c| c.is_verified).unwrap_or(false),
        verified_at: closing.and_then(|c| c.verified_at),
        verified_by: closing.and_then(|c| c.verified_by.clone()),
        opening_entry_id: opening.map(|e| e.id.clone()),
        closing_entry_id: closing.map(|e| e.id.clone()),
        state: DayState::from_entries(opening, closing),
    }
}

pub fn group_entries_by_date(entries: &[ShiftEntry]) -> BTreeMap<NaiveDate, Vec<ShiftEntry>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ShiftEntry>> = BTreeMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry.clone());
    }
    by_date
}
