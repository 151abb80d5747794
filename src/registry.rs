//! Cash registry service.
//!
//! Orchestrates the pure ledger/variance/verification logic against the
//! backend. Every operation issues its backend calls one after another; a
//! validation failure stops the operation before any write is sent.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{RegistryError, RegistryResult};
use crate::shifts::{self, RecordShiftBalance, ShiftEntry, ShiftType};
use crate::summary::{self, DailySummary};
use crate::variance;
use crate::verification::{self, VerifyRequest};

/// Result of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedDay {
    pub entry: ShiftEntry,
    pub summary: DailySummary,
}

pub struct CashRegistry {
    api: ApiClient,
}

impl CashRegistry {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // -----------------------------------------------------------------------
    // Shift entries
    // -----------------------------------------------------------------------

    pub async fn list_entries(&self) -> RegistryResult<Vec<ShiftEntry>> {
        self.api.list_shift_entries().await
    }

    pub async fn entries_for(&self, date: NaiveDate) -> RegistryResult<Vec<ShiftEntry>> {
        let entries = self.api.list_shift_entries().await?;
        Ok(entries.into_iter().filter(|e| e.date == date).collect())
    }

    /// Record an opening or closing balance.
    ///
    /// For a closing entry the day's online sales always come from the
    /// backend; an operator-supplied `onlineCash` is replaced so the
    /// `posCash` rule cannot be sidestepped.
    pub async fn record_shift_balance(
        &self,
        mut request: RecordShiftBalance,
    ) -> RegistryResult<ShiftEntry> {
        if request.shift_type == ShiftType::Closing {
            let sales = self.api.sales_by_date(request.date).await?;
            let reported = variance::online_sales(&sales);
            if let Some(sent) = request.online_cash.filter(|sent| *sent != reported) {
                debug!(
                    date = %request.date,
                    sent = %sent,
                    reported = %reported,
                    "Replacing operator onlineCash with backend online sales"
                );
            }
            request.online_cash = Some(reported);
        }

        let existing = self.entries_for(request.date).await?;
        let entry = shifts::prepare_shift_entry(&request, &existing).map_err(|e| {
            warn!(date = %request.date, shift = %request.shift_type, error = %e, "Shift balance rejected");
            e
        })?;

        self.api.ensure_reachable().await?;
        self.api.create_shift_entry(&entry).await
    }

    /// Delete an entry. Verified entries need a privileged operator and an
    /// explicit confirmation.
    pub async fn delete_entry(&self, id: &str, confirmed: bool) -> RegistryResult<String> {
        let entries = self.api.list_shift_entries().await?;
        let entry = entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| RegistryError::EntryNotFound(id.to_string()))?;

        verification::authorize_delete(entry, &self.api.session().operator, confirmed)?;

        self.api.ensure_reachable().await?;
        self.api.delete_shift_entry(id).await
    }

    // -----------------------------------------------------------------------
    // Summaries
    // -----------------------------------------------------------------------

    pub async fn daily_summary(&self, date: NaiveDate) -> RegistryResult<DailySummary> {
        let entries = self.entries_for(date).await?;
        self.summarize(date, &entries).await
    }

    async fn summarize(&self, date: NaiveDate, entries: &[ShiftEntry]) -> RegistryResult<DailySummary> {
        let sales = self.api.sales_by_date(date).await?;
        let expenses = self.api.expenses_by_date(date).await?;
        Ok(summary::build_daily_summary(date, entries, &sales, &expenses))
    }

    /// Summaries for every date in `from..=to` that has at least one entry,
    /// newest first.
    pub async fn daily_summaries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RegistryResult<Vec<DailySummary>> {
        if from > to {
            return Err(RegistryError::validation(
                "from",
                format!("Start date {from} is after end date {to}"),
            ));
        }

        let entries = self.api.list_shift_entries().await?;
        let by_date = summary::group_entries_by_date(&entries);

        let mut rows = Vec::new();
        for (date, day_entries) in by_date.range(from..=to).rev() {
            rows.push(self.summarize(*date, day_entries).await?);
        }

        let unverified_variance = rows
            .iter()
            .filter(|r| !r.is_verified)
            .map(|r| r.cash_difference)
            .sum::<Decimal>();
        info!(
            from = %from,
            to = %to,
            days = rows.len(),
            unverified_variance = %unverified_variance,
            "Built daily cash registry summaries"
        );
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    pub async fn verify_day(
        &self,
        date: NaiveDate,
        request: &VerifyRequest,
    ) -> RegistryResult<VerifiedDay> {
        let mut summary = self.daily_summary(date).await?;
        let verification =
            verification::verify(&summary, request, &self.api.session().operator, Utc::now())?;

        self.api.ensure_reachable().await?;
        let entry = self.api.verify_shift_entry(&verification).await?;

        verification::apply_verification(&mut summary, &verification);
        // Backend-assigned metadata wins over the locally stamped values.
        if entry.verified_by.is_some() {
            summary.verified_by = entry.verified_by.clone();
        }
        if entry.verified_at.is_some() {
            summary.verified_at = entry.verified_at;
        }

        info!(
            date = %date,
            entry_id = %entry.id,
            verified_by = ?summary.verified_by,
            "Cash registry verified"
        );
        Ok(VerifiedDay { entry, summary })
    }
}
