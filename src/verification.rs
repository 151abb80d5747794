//! Verification workflow for a business day's cash registry.
//!
//! `DayState` is derived from which shift entries exist and whether the
//! closing entry has been verified. `verify` is the only transition; it never
//! touches the network and returns a `Verification` for the caller to send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::session::Operator;
use crate::shifts::{ShiftEntry, ShiftType};
use crate::summary::DailySummary;
use crate::variance::has_variance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayState {
    AwaitingBoth,
    AwaitingOpening,
    AwaitingClosing,
    Pending,
    Verified,
}

impl DayState {
    pub fn from_entries(opening: Option<&ShiftEntry>, closing: Option<&ShiftEntry>) -> Self {
        match (opening, closing) {
            (None, None) => DayState::AwaitingBoth,
            (None, Some(_)) => DayState::AwaitingOpening,
            (Some(_), None) => DayState::AwaitingClosing,
            (Some(_), Some(c)) if c.is_verified => DayState::Verified,
            (Some(_), Some(_)) => DayState::Pending,
        }
    }

    /// The shift whose balance still has to be recorded, if any.
    pub fn missing_shift(self) -> Option<ShiftType> {
        match self {
            DayState::AwaitingBoth | DayState::AwaitingOpening => Some(ShiftType::Opening),
            DayState::AwaitingClosing => Some(ShiftType::Closing),
            DayState::Pending | DayState::Verified => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default, alias = "balance_difference_reason")]
    pub balance_difference_reason: Option<String>,
    #[serde(default, alias = "online_cash_difference_reason")]
    pub online_cash_difference_reason: Option<String>,
}

/// Payload sent to the backend verify endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_difference_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_cash_difference_reason: Option<String>,
    #[serde(skip)]
    pub verified_by: String,
    #[serde(skip)]
    pub verified_at: DateTime<Utc>,
}

fn clean_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
}

/// Move a day from `Pending` to `Verified`.
///
/// A reason is mandatory for each non-zero variance; the two checks are
/// independent. Reasons supplied for a zero variance are kept.
pub fn verify(
    summary: &DailySummary,
    request: &VerifyRequest,
    operator: &Operator,
    now: DateTime<Utc>,
) -> RegistryResult<Verification> {
    match summary.state {
        DayState::Verified => {
            return Err(RegistryError::AlreadyVerified { date: summary.date });
        }
        state => {
            if let Some(missing) = state.missing_shift() {
                return Err(RegistryError::MissingBalance {
                    date: summary.date,
                    missing,
                });
            }
        }
    }

    let entry_id = summary
        .closing_entry_id
        .clone()
        .ok_or(RegistryError::MissingBalance {
            date: summary.date,
            missing: ShiftType::Closing,
        })?;

    let balance_reason = clean_reason(request.balance_difference_reason.as_deref());
    let online_reason = clean_reason(request.online_cash_difference_reason.as_deref());

    if has_variance(summary.cash_difference) && balance_reason.is_none() {
        warn!(date = %summary.date, difference = %summary.cash_difference, "Cash difference reason missing");
        return Err(RegistryError::validation(
            "balanceDifferenceReason",
            format!(
                "A reason is required for the cash difference of {}",
                summary.cash_difference
            ),
        ));
    }
    if has_variance(summary.online_cash_difference) && online_reason.is_none() {
        warn!(
            date = %summary.date,
            difference = %summary.online_cash_difference,
            "Online cash difference reason missing"
        );
        return Err(RegistryError::validation(
            "onlineCashDifferenceReason",
            format!(
                "A reason is required for the online cash difference of {}",
                summary.online_cash_difference
            ),
        ));
    }

    info!(
        date = %summary.date,
        entry_id = %entry_id,
        operator = %operator.id,
        cash_difference = %summary.cash_difference,
        online_cash_difference = %summary.online_cash_difference,
        "Cash registry verification accepted"
    );

    Ok(Verification {
        entry_id,
        balance_difference_reason: balance_reason,
        online_cash_difference_reason: online_reason,
        verified_by: operator.id.clone(),
        verified_at: now,
    })
}

/// Reflect an accepted verification on a summary row.
pub fn apply_verification(summary: &mut DailySummary, verification: &Verification) {
    summary.is_verified = true;
    summary.verified_by = Some(verification.verified_by.clone());
    summary.verified_at = Some(verification.verified_at);
    summary.balance_difference_reason = verification.balance_difference_reason.clone();
    summary.online_cash_difference_reason = verification.online_cash_difference_reason.clone();
    summary.state = DayState::Verified;
}

/// Check whether `operator` may delete `entry`.
///
/// Unverified entries are free to delete. Verified entries need a privileged
/// operator and an explicit confirmation.
pub fn authorize_delete(
    entry: &ShiftEntry,
    operator: &Operator,
    confirmed: bool,
) -> RegistryResult<()> {
    if !entry.is_verified {
        return Ok(());
    }
    if !operator.role.is_privileged() {
        warn!(entry_id = %entry.id, operator = %operator.id, "Blocked delete of verified entry");
        return Err(RegistryError::PrivilegeRequired);
    }
    if !confirmed {
        return Err(RegistryError::ConfirmationRequired);
    }
    info!(
        entry_id = %entry.id,
        operator = %operator.id,
        role = %operator.role,
        "Privileged delete of verified entry authorized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::denominations::DenominationLine;
    use crate::session::OperatorRole;
    use crate::summary::build_daily_summary;
    use crate::variance::{ExpenseRecord, PaymentMode, SaleRecord};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn entry(id: &str, shift_type: ShiftType, notes: Vec<DenominationLine>) -> ShiftEntry {
        ShiftEntry {
            id: id.into(),
            date: date(),
            shift_type,
            created_by: Some("staff-1".into()),
            denominations: notes,
            opening_balance: None,
            closing_balance: None,
            online_cash: None,
            pos_cash: None,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            balance_difference_reason: None,
            online_cash_difference_reason: None,
            notes: None,
            created_at: None,
        }
    }

    fn sale(mode: PaymentMode, amount: Decimal) -> SaleRecord {
        SaleRecord {
            id: None,
            total_amount: amount,
            payment_mode: Some(mode),
            payment_modes: Vec::new(),
        }
    }

    fn operator(role: OperatorRole) -> Operator {
        Operator {
            id: "op-1".into(),
            name: None,
            role,
        }
    }

    /// Opening ₹500 x 10, cash sales 3200, expenses 450.
    fn day(closing_notes: Vec<DenominationLine>, pos_cash: Decimal, online: Decimal) -> DailySummary {
        let opening = entry("open-1", ShiftType::Opening, vec![DenominationLine::new(500, 10)]);
        let mut closing = entry("close-1", ShiftType::Closing, closing_notes);
        closing.pos_cash = Some(pos_cash);
        let mut sales = vec![sale(PaymentMode::Cash, dec!(3200))];
        if !online.is_zero() {
            sales.push(sale(PaymentMode::Card, online));
        }
        let expenses = vec![ExpenseRecord {
            id: None,
            amount: dec!(450),
            category: None,
            description: None,
        }];
        build_daily_summary(date(), &[opening, closing], &sales, &expenses)
    }

    fn balanced_closing() -> Vec<DenominationLine> {
        // 7750
        vec![
            DenominationLine::new(500, 15),
            DenominationLine::new(200, 1),
            DenominationLine::new(50, 1),
        ]
    }

    fn short_closing() -> Vec<DenominationLine> {
        // 7600
        vec![DenominationLine::new(500, 15), DenominationLine::new(100, 1)]
    }

    #[test]
    fn zero_variance_verifies_without_reasons() {
        let summary = day(balanced_closing(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(summary.cash_difference, Decimal::ZERO);

        let v = verify(
            &summary,
            &VerifyRequest::default(),
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .expect("balanced day verifies");
        assert_eq!(v.entry_id, "close-1");
        assert_eq!(v.balance_difference_reason, None);
        assert_eq!(v.verified_by, "op-1");
    }

    #[test]
    fn cash_shortage_requires_balance_reason() {
        let summary = day(short_closing(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(summary.cash_difference, dec!(-150));

        let err = verify(
            &summary,
            &VerifyRequest {
                balance_difference_reason: Some("   ".into()),
                online_cash_difference_reason: None,
            },
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("balanceDifferenceReason"));

        let v = verify(
            &summary,
            &VerifyRequest {
                balance_difference_reason: Some(" Change given twice ".into()),
                online_cash_difference_reason: None,
            },
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .expect("reason supplied");
        assert_eq!(v.balance_difference_reason.as_deref(), Some("Change given twice"));
    }

    #[test]
    fn online_difference_requires_its_own_reason() {
        let summary = day(balanced_closing(), dec!(1200), dec!(1500));
        assert_eq!(summary.cash_difference, Decimal::ZERO);
        assert_eq!(summary.online_cash_difference, dec!(-300));

        let err = verify(
            &summary,
            &VerifyRequest {
                balance_difference_reason: Some("not needed".into()),
                online_cash_difference_reason: None,
            },
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("onlineCashDifferenceReason"));

        let v = verify(
            &summary,
            &VerifyRequest {
                balance_difference_reason: None,
                online_cash_difference_reason: Some("Card settlement pending".into()),
            },
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["entryId"], "close-1");
        assert_eq!(json["onlineCashDifferenceReason"], "Card settlement pending");
        assert!(json.get("balanceDifferenceReason").is_none());
        assert!(json.get("verifiedBy").is_none());
        assert_eq!(json.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn missing_entries_block_verification() {
        let opening = entry("open-1", ShiftType::Opening, vec![]);
        let summary = build_daily_summary(date(), &[opening], &[], &[]);
        let err = verify(
            &summary,
            &VerifyRequest::default(),
            &operator(OperatorRole::Admin),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingBalance {
                missing: ShiftType::Closing,
                ..
            }
        ));

        let summary = build_daily_summary(date(), &[], &[], &[]);
        let err = verify(
            &summary,
            &VerifyRequest::default(),
            &operator(OperatorRole::Admin),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("openingBalance"));
    }

    #[test]
    fn verified_day_cannot_be_verified_again() {
        let mut summary = day(balanced_closing(), Decimal::ZERO, Decimal::ZERO);
        let v = verify(
            &summary,
            &VerifyRequest::default(),
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .unwrap();
        apply_verification(&mut summary, &v);
        assert_eq!(summary.state, DayState::Verified);
        assert_eq!(summary.verified_by.as_deref(), Some("op-1"));

        let err = verify(
            &summary,
            &VerifyRequest::default(),
            &operator(OperatorRole::Staff),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyVerified { .. }));
    }

    #[test]
    fn day_state_follows_entries() {
        let opening = entry("o", ShiftType::Opening, vec![]);
        let mut closing = entry("c", ShiftType::Closing, vec![]);
        assert_eq!(DayState::from_entries(None, None), DayState::AwaitingBoth);
        assert_eq!(
            DayState::from_entries(None, Some(&closing)),
            DayState::AwaitingOpening
        );
        assert_eq!(
            DayState::from_entries(Some(&opening), None),
            DayState::AwaitingClosing
        );
        assert_eq!(
            DayState::from_entries(Some(&opening), Some(&closing)),
            DayState::Pending
        );
        closing.is_verified = true;
        assert_eq!(
            DayState::from_entries(Some(&opening), Some(&closing)),
            DayState::Verified
        );
    }

    #[test]
    fn deleting_verified_entry_needs_privilege_and_confirmation() {
        let mut closing = entry("c", ShiftType::Closing, vec![]);
        assert!(authorize_delete(&closing, &operator(OperatorRole::Staff), false).is_ok());

        closing.is_verified = true;
        assert!(matches!(
            authorize_delete(&closing, &operator(OperatorRole::Staff), true),
            Err(RegistryError::PrivilegeRequired)
        ));
        assert!(matches!(
            authorize_delete(&closing, &operator(OperatorRole::Manager), false),
            Err(RegistryError::ConfirmationRequired)
        ));
        assert!(authorize_delete(&closing, &operator(OperatorRole::Owner), true).is_ok());
    }
}
