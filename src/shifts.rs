//! Shift entries: opening and closing cash counts for a business date.
//!
//! `prepare_shift_entry` is the single validation gate for "record shift
//! balance". It runs before any network call, so a rejected entry is never
//! partially persisted.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::denominations::{DenominationLedger, DenominationLine};
use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Opening,
    Closing,
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftType::Opening => f.write_str("opening"),
            ShiftType::Closing => f.write_str("closing"),
        }
    }
}

/// Business date as either `YYYY-MM-DD` or an RFC 3339 timestamp
/// (`2026-10-18T00:00:00.000Z`); a timestamp contributes its own date part.
pub fn parse_business_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.date_naive()))
}

fn deserialize_business_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_business_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid date {raw:?}: expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })
}

// ---------------------------------------------------------------------------
// Persisted entry (as returned by the backend)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEntry {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_business_date")]
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub denominations: Vec<DenominationLine>,
    #[serde(default)]
    pub opening_balance: Option<Decimal>,
    #[serde(default)]
    pub closing_balance: Option<Decimal>,
    #[serde(default)]
    pub online_cash: Option<Decimal>,
    #[serde(default)]
    pub pos_cash: Option<Decimal>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub balance_difference_reason: Option<String>,
    #[serde(default)]
    pub online_cash_difference_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ShiftEntry {
    /// The balance that is meaningful for this entry's shift type.
    ///
    /// Falls back to the denomination sum when the backend omitted it.
    pub fn balance(&self) -> Decimal {
        let stored = match self.shift_type {
            ShiftType::Opening => self.opening_balance,
            ShiftType::Closing => self.closing_balance,
        };
        stored.unwrap_or_else(|| self.denomination_total())
    }

    pub fn denomination_total(&self) -> Decimal {
        self.denominations.iter().map(DenominationLine::total).sum()
    }

    pub fn pos_cash(&self) -> Decimal {
        self.pos_cash.unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Operator input and outgoing payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordShiftBalance {
    #[serde(deserialize_with = "deserialize_business_date")]
    pub date: NaiveDate,
    #[serde(alias = "shift_type")]
    pub shift_type: ShiftType,
    #[serde(default)]
    pub denominations: Vec<DenominationLine>,
    #[serde(alias = "created_by")]
    pub created_by: String,
    #[serde(default, alias = "online_cash")]
    pub online_cash: Option<Decimal>,
    #[serde(default, alias = "pos_cash")]
    pub pos_cash: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShiftEntry {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub created_by: String,
    pub denominations: DenominationLedger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_cash: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_cash: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewShiftEntry {
    pub fn balance(&self) -> Decimal {
        self.opening_balance
            .or(self.closing_balance)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Validate a "record shift balance" request against the entries that
/// already exist for the same date.
pub fn prepare_shift_entry(
    request: &RecordShiftBalance,
    existing_for_date: &[ShiftEntry],
) -> RegistryResult<NewShiftEntry> {
    let created_by = request.created_by.trim();
    if created_by.is_empty() {
        return Err(RegistryError::validation(
            "createdBy",
            "Operator recording the balance is required",
        ));
    }

    let ledger = DenominationLedger::from_lines(&request.denominations)?;

    if existing_for_date
        .iter()
        .any(|e| e.date == request.date && e.shift_type == request.shift_type)
    {
        return Err(RegistryError::DuplicateShift {
            date: request.date,
            shift: request.shift_type,
        });
    }

    let balance = ledger.total();
    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    let entry = match request.shift_type {
        ShiftType::Opening => NewShiftEntry {
            date: request.date,
            shift_type: ShiftType::Opening,
            created_by: created_by.to_string(),
            denominations: ledger,
            opening_balance: Some(balance),
            closing_balance: None,
            online_cash: None,
            pos_cash: None,
            notes,
        },
        ShiftType::Closing => {
            let online_cash = request.online_cash.unwrap_or(Decimal::ZERO);
            let pos_cash = request.pos_cash.unwrap_or(Decimal::ZERO);

            if pos_cash < Decimal::ZERO {
                return Err(RegistryError::validation(
                    "posCash",
                    "Cash in POS cannot be negative",
                ));
            }
            if online_cash > Decimal::ZERO && pos_cash <= Decimal::ZERO {
                return Err(RegistryError::validation(
                    "posCash",
                    format!(
                        "Cash in POS is required: {online_cash} in online sales were recorded for {}",
                        request.date
                    ),
                ));
            }

            NewShiftEntry {
                date: request.date,
                shift_type: ShiftType::Closing,
                created_by: created_by.to_string(),
                denominations: ledger,
                opening_balance: None,
                closing_balance: Some(balance),
                online_cash: Some(online_cash),
                pos_cash: Some(pos_cash),
                notes,
            }
        }
    };

    debug!(
        date = %entry.date,
        shift = %entry.shift_type,
        balance = %entry.balance(),
        "Shift entry validated"
    );

    Ok(entry)
}
