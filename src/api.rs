//! Salon backend API client.
//!
//! Provides authenticated HTTP communication with the backend that owns cash
//! registry persistence, plus the sales and expense read models the variance
//! calculator needs.

use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::session::Session;
use crate::shifts::{NewShiftEntry, ShiftEntry};
use crate::variance::{ExpenseRecord, SaleRecord};
use crate::verification::Verification;

const HEALTH_PATH: &str = "/api/health";
const REGISTRY_PATH: &str = "/api/cash-registry";
const SALES_BY_DATE_PATH: &str = "/api/sales/by-date";
const EXPENSES_BY_DATE_PATH: &str = "/api/expenses/by-date";

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // "/api/" leaves a slash behind
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Describe a transport failure in operator-facing terms.
fn transport_reason(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("cannot reach {url}");
    }
    if err.is_timeout() {
        return format!("connection to {url} timed out");
    }
    format!("network error communicating with {url}: {err}")
}

/// Convert a `reqwest::Error` into a registry error.
fn transport_error(url: &str, err: &reqwest::Error) -> RegistryError {
    if err.is_builder() {
        return RegistryError::validation("baseUrl", format!("Invalid backend URL: {url}"));
    }
    RegistryError::ServiceUnavailable(transport_reason(url, err))
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        403 => "Operator not permitted to perform this action".to_string(),
        404 => "Cash registry endpoint not found".to_string(),
        409 => "Conflicting cash registry entry".to_string(),
        s if s >= 500 => format!("Cash registry server error (HTTP {s})"),
        s => format!("Unexpected response from cash registry service (HTTP {s})"),
    }
}

/// Map a non-2xx response to an error, preserving the backend's message.
fn status_error(status: StatusCode, body_text: &str) -> RegistryError {
    if status == StatusCode::UNAUTHORIZED {
        return RegistryError::Unauthorized;
    }
    let message = serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|json| envelope_message(&json))
        .unwrap_or_else(|| status_message(status));
    RegistryError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn envelope_message(json: &Value) -> Option<String> {
    json.get("error")
        .or_else(|| json.get("message"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Unwrap `{success, data}` envelopes; bare payloads pass through.
///
/// Empty bodies, `null`, and envelopes without usable data are failures even
/// though the transport succeeded.
pub(crate) fn unwrap_envelope(status: StatusCode, body: Value) -> RegistryResult<Value> {
    if body.is_null() {
        return Err(RegistryError::UnexpectedResponse("empty response body".into()));
    }
    let Some(obj) = body.as_object() else {
        return Ok(body);
    };

    if obj.get("success").and_then(Value::as_bool) == Some(false) {
        let message = envelope_message(&body).unwrap_or_else(|| "Request was rejected".into());
        return Err(RegistryError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    if !obj.contains_key("success") && !obj.contains_key("data") {
        return Ok(body);
    }

    let data = obj.get("data").filter(|d| !d.is_null()).cloned();
    let has_message = obj.contains_key("message");
    match data {
        Some(data) => Ok(data),
        None if has_message => Ok(body),
        None => Err(RegistryError::UnexpectedResponse(
            "response envelope carried no data".into(),
        )),
    }
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> RegistryResult<T> {
    serde_json::from_value(value)
        .map_err(|e| RegistryError::UnexpectedResponse(format!("invalid {what}: {e}")))
}

// ---------------------------------------------------------------------------
// Connectivity test
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client bound to one backend and one operator session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    health: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &RegistryConfig, session: Session) -> RegistryResult<Self> {
        let base_url = normalize_base_url(&config.base_url);
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RegistryError::validation("baseUrl", format!("Failed to create HTTP client: {e}")))?;
        let health = Client::builder()
            .timeout(config.connectivity_timeout)
            .build()
            .map_err(|e| RegistryError::validation("baseUrl", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            health,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Lightweight health check against the backend.
    pub async fn test_connectivity(&self) -> ConnectivityResult {
        let health_url = format!("{}{HEALTH_PATH}", self.base_url);
        let start = Instant::now();

        let resp = match self.health.get(&health_url).send().await {
            Ok(r) => r,
            Err(e) => {
                return ConnectivityResult {
                    success: false,
                    latency_ms: None,
                    error: Some(transport_reason(&self.base_url, &e)),
                };
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        let status = resp.status();

        if status.is_success() {
            debug!(latency_ms = latency, "connectivity test passed");
            ConnectivityResult {
                success: true,
                latency_ms: Some(latency),
                error: None,
            }
        } else {
            ConnectivityResult {
                success: false,
                latency_ms: Some(latency),
                error: Some(status_message(status)),
            }
        }
    }

    /// Fail fast with `ServiceUnavailable` before a write.
    pub async fn ensure_reachable(&self) -> RegistryResult<()> {
        let result = self.test_connectivity().await;
        if result.success {
            return Ok(());
        }
        let reason = result.error.unwrap_or_else(|| "health check failed".into());
        warn!(base_url = %self.base_url, error = %reason, "Cash registry backend unreachable");
        Err(RegistryError::ServiceUnavailable(reason))
    }

    /// Perform an authenticated JSON request and unwrap the response envelope.
    ///
    /// `path` should include the leading slash, e.g. `/api/cash-registry`.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> RegistryResult<Value> {
        let full_url = format!("{}{path}", self.base_url);
        let request_id = Uuid::new_v4();

        let mut req = self
            .http
            .request(method.clone(), &full_url)
            .header("Authorization", self.session.bearer())
            .header("Content-Type", "application/json")
            .header("X-Request-Id", request_id.to_string());
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        debug!(%method, path, %request_id, "backend request");
        let resp = req
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, &e))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let err = status_error(status, &body_text);
            warn!(%method, path, %request_id, status = status.as_u16(), error = %err, "backend request failed");
            return Err(err);
        }

        if body_text.trim().is_empty() {
            return Err(RegistryError::UnexpectedResponse("empty response body".into()));
        }
        let json: Value = serde_json::from_str(&body_text)
            .map_err(|e| RegistryError::UnexpectedResponse(format!("invalid JSON: {e}")))?;
        unwrap_envelope(status, json)
    }

    // -----------------------------------------------------------------------
    // Cash registry endpoints
    // -----------------------------------------------------------------------

    pub async fn create_shift_entry(&self, entry: &NewShiftEntry) -> RegistryResult<ShiftEntry> {
        let data = self
            .request(Method::POST, REGISTRY_PATH, &[], Some(entry))
            .await?;
        let created: ShiftEntry = decode("shift entry", data)?;
        info!(
            entry_id = %created.id,
            date = %created.date,
            shift = %created.shift_type,
            balance = %created.balance(),
            "Shift balance recorded"
        );
        Ok(created)
    }

    pub async fn list_shift_entries(&self) -> RegistryResult<Vec<ShiftEntry>> {
        let data = self
            .request::<()>(Method::GET, REGISTRY_PATH, &[], None)
            .await?;
        decode("shift entry list", data)
    }

    /// Returns the backend's confirmation message.
    pub async fn delete_shift_entry(&self, id: &str) -> RegistryResult<String> {
        let path = format!("{REGISTRY_PATH}/{id}");
        let data = self.request::<()>(Method::DELETE, &path, &[], None).await?;
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| "Shift entry deleted".to_string());
        info!(entry_id = %id, "Shift entry deleted");
        Ok(message)
    }

    pub async fn verify_shift_entry(&self, verification: &Verification) -> RegistryResult<ShiftEntry> {
        let path = format!("{REGISTRY_PATH}/{}/verify", verification.entry_id);
        let data = self
            .request(Method::PATCH, &path, &[], Some(verification))
            .await?;
        let entry: ShiftEntry = decode("verified shift entry", data)?;
        if !entry.is_verified {
            return Err(RegistryError::UnexpectedResponse(
                "backend did not mark the entry as verified".into(),
            ));
        }
        Ok(entry)
    }

    // -----------------------------------------------------------------------
    // Read models
    // -----------------------------------------------------------------------

    pub async fn sales_by_date(&self, date: NaiveDate) -> RegistryResult<Vec<SaleRecord>> {
        let data = self
            .request::<()>(Method::GET, SALES_BY_DATE_PATH, &[("date", date.to_string())], None)
            .await?;
        decode("sales list", data)
    }

    pub async fn expenses_by_date(&self, date: NaiveDate) -> RegistryResult<Vec<ExpenseRecord>> {
        let data = self
            .request::<()>(
                Method::GET,
                EXPENSES_BY_DATE_PATH,
                &[("date", date.to_string())],
                None,
            )
            .await?;
        decode("expense list", data)
    }
}
