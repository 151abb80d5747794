use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::denominations::{DenominationLedger, DenominationLine};
use crate::error::RegistryError;
use crate::registry::CashRegistry;
use crate::shifts::RecordShiftBalance;
use crate::verification::{DayState, VerifyRequest};
use crate::variance::has_variance;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryDatePayload {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryListPayload {
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryRangePayload {
    #[serde(alias = "date_from", alias = "dateFrom")]
    from: NaiveDate,
    #[serde(alias = "date_to", alias = "dateTo")]
    to: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryVerifyPayload {
    date: NaiveDate,
    #[serde(flatten)]
    reasons: VerifyRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryDeletePayload {
    #[serde(alias = "_id", alias = "entryId", alias = "entry_id")]
    id: String,
    #[serde(default, alias = "confirmed")]
    confirm: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DenominationCountPayload {
    #[serde(default)]
    denominations: Vec<DenominationLine>,
}

/// Accept either a bare string (`"2026-10-18"`) or an object payload.
fn object_payload(arg0: Option<serde_json::Value>, string_key: &str) -> serde_json::Value {
    match arg0 {
        Some(serde_json::Value::String(s)) => {
            let mut obj = serde_json::Map::new();
            obj.insert(
                string_key.to_string(),
                serde_json::Value::String(s.trim().to_string()),
            );
            serde_json::Value::Object(obj)
        }
        Some(v) if !v.is_null() => v,
        _ => serde_json::json!({}),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    arg0: Option<serde_json::Value>,
    string_key: &str,
    what: &str,
) -> Result<T, String> {
    serde_json::from_value(object_payload(arg0, string_key))
        .map_err(|e| format!("Invalid {what} payload: {e}"))
}

/// Validation failures stay inline (`success: false` + field); everything
/// else becomes a command error carrying the display message.
fn respond(result: Result<serde_json::Value, RegistryError>) -> Result<serde_json::Value, String> {
    match result {
        Ok(data) => Ok(serde_json::json!({ "success": true, "data": data })),
        Err(e) if e.is_validation() => Ok(serde_json::json!({
            "success": false,
            "field": e.field(),
            "error": e.to_string(),
        })),
        Err(e) => {
            warn!(error = %e, "cash registry command failed");
            Err(e.to_string())
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RegistryError> {
    serde_json::to_value(value)
        .map_err(|e| RegistryError::UnexpectedResponse(format!("serialize response: {e}")))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub async fn registry_record_shift(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let request: RecordShiftBalance = parse_payload(arg0, "date", "shift balance")?;
    respond(
        registry
            .record_shift_balance(request)
            .await
            .and_then(|entry| to_json(&entry)),
    )
}

pub async fn registry_list_entries(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryListPayload = parse_payload(arg0, "date", "entry list")?;
    let result = match payload.date {
        Some(date) => registry.entries_for(date).await,
        None => registry.list_entries().await,
    };
    respond(result.and_then(|entries| to_json(&entries)))
}

pub async fn registry_delete_entry(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryDeletePayload = parse_payload(arg0, "id", "delete")?;
    let id = payload.id.trim();
    if id.is_empty() {
        return Err("Missing entry id".into());
    }
    respond(
        registry
            .delete_entry(id, payload.confirm)
            .await
            .map(|message| serde_json::json!({ "message": message })),
    )
}

pub async fn registry_daily_summary(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryDatePayload = parse_payload(arg0, "date", "summary")?;
    respond(
        registry
            .daily_summary(payload.date)
            .await
            .and_then(|summary| to_json(&summary)),
    )
}

pub async fn registry_daily_summaries(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryRangePayload = parse_payload(arg0, "from", "summary range")?;
    respond(
        registry
            .daily_summaries(payload.from, payload.to)
            .await
            .and_then(|rows| to_json(&rows)),
    )
}

/// Banner state for a date: which balance is still missing and which
/// variance reasons verification will ask for.
pub async fn registry_day_status(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryDatePayload = parse_payload(arg0, "date", "day status")?;
    respond(registry.daily_summary(payload.date).await.map(|summary| {
        let awaiting_verification = summary.state == DayState::Pending;
        serde_json::json!({
            "date": summary.date,
            "state": summary.state,
            "missingShift": summary.state.missing_shift(),
            "requiresCashReason": awaiting_verification && has_variance(summary.cash_difference),
            "requiresOnlineReason": awaiting_verification
                && has_variance(summary.online_cash_difference),
            "cashDifference": summary.cash_difference,
            "onlineCashDifference": summary.online_cash_difference,
        })
    }))
}

pub async fn registry_verify_day(
    registry: &CashRegistry,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: RegistryVerifyPayload = parse_payload(arg0, "date", "verify")?;
    respond(
        registry
            .verify_day(payload.date, &payload.reasons)
            .await
            .and_then(|verified| {
                Ok(serde_json::json!({
                    "entry": to_json(&verified.entry)?,
                    "summary": to_json(&verified.summary)?,
                }))
            }),
    )
}

/// Live totals for the denomination form. Pure; never touches the backend.
pub fn registry_count_denominations(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: DenominationCountPayload = parse_payload(arg0, "denominations", "denomination")?;
    respond(
        DenominationLedger::from_lines(&payload.denominations).and_then(|ledger| {
            Ok(serde_json::json!({
                "denominations": to_json(&ledger)?,
                "total": to_json(&ledger.total())?,
            }))
        }),
    )
}

pub async fn registry_test_connectivity(registry: &CashRegistry) -> Result<serde_json::Value, String> {
    let result = registry.api().test_connectivity().await;
    serde_json::to_value(result).map_err(|e| e.to_string())
}
