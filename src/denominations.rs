//! Denomination ledger for cash counts.
//!
//! A ledger holds one line per supported note/coin value. Line totals and the
//! overall sum are always derived from `value * count`; incoming totals are
//! never trusted.

use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RegistryError, RegistryResult};

/// Supported note and coin values, highest first.
pub const SUPPORTED_DENOMINATIONS: [u32; 10] = [2000, 500, 200, 100, 50, 20, 10, 5, 2, 1];

pub fn is_supported(value: u32) -> bool {
    SUPPORTED_DENOMINATIONS.contains(&value)
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DenominationLine {
    pub value: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count: u32,
}

impl DenominationLine {
    pub fn new(value: u32, count: u32) -> Self {
        Self { value, count }
    }

    pub fn total(&self) -> Decimal {
        Decimal::from(self.value) * Decimal::from(self.count)
    }
}

impl Serialize for DenominationLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut line = serializer.serialize_struct("DenominationLine", 3)?;
        line.serialize_field("value", &self.value)?;
        line.serialize_field("count", &self.count)?;
        line.serialize_field("total", &self.total())?;
        line.end()
    }
}

/// Negative counts from form input are clamped to zero.
pub fn clamp_count(count: i64) -> u32 {
    count.clamp(0, i64::from(u32::MAX)) as u32
}

fn deserialize_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok(clamp_count(raw.trunc() as i64))
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DenominationLedger {
    lines: Vec<DenominationLine>,
}

impl Default for DenominationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DenominationLedger {
    /// Empty ledger: one zero-count line per supported value.
    pub fn new() -> Self {
        Self {
            lines: SUPPORTED_DENOMINATIONS
                .iter()
                .map(|&value| DenominationLine::new(value, 0))
                .collect(),
        }
    }

    /// Build a ledger from operator/backend lines.
    ///
    /// Unsupported or repeated values are rejected. Values not present in
    /// `lines` get a zero count so the ledger always covers the full set.
    pub fn from_lines(lines: &[DenominationLine]) -> RegistryResult<Self> {
        let mut ledger = Self::new();
        let mut seen: Vec<u32> = Vec::with_capacity(lines.len());

        for line in lines {
            if !is_supported(line.value) {
                return Err(RegistryError::validation(
                    "denominations",
                    format!("Unsupported denomination: {}", line.value),
                ));
            }
            if seen.contains(&line.value) {
                return Err(RegistryError::validation(
                    "denominations",
                    format!("Denomination {} listed more than once", line.value),
                ));
            }
            seen.push(line.value);
            ledger.put(line.value, line.count);
        }

        Ok(ledger)
    }

    /// Update a single line. Negative counts are stored as zero.
    pub fn set_count(&mut self, value: u32, count: i64) -> RegistryResult<()> {
        if !is_supported(value) {
            return Err(RegistryError::validation(
                "denominations",
                format!("Unsupported denomination: {value}"),
            ));
        }
        self.put(value, clamp_count(count));
        Ok(())
    }

    fn put(&mut self, value: u32, count: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.value == value) {
            line.count = count;
        }
    }

    pub fn count(&self, value: u32) -> u32 {
        self.lines
            .iter()
            .find(|l| l.value == value)
            .map(|l| l.count)
            .unwrap_or(0)
    }

    pub fn lines(&self) -> &[DenominationLine] {
        &self.lines
    }

    pub fn non_zero_lines(&self) -> impl Iterator<Item = &DenominationLine> {
        self.lines.iter().filter(|l| l.count > 0)
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(DenominationLine::total).sum()
    }
}
