//! Prescription rate and legend models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cell::RateKey;

/// Fill colour for cells without rate data
pub const NO_DATA_COLOR: &str = "#3388ff";

/// A watering rate for one grid cell, as found in a prescription document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateEntry {
    pub bearing_seq: String,
    pub distance_seq: String,
    pub rate_percent: Decimal,
}

impl RateEntry {
    pub fn key(&self) -> RateKey {
        RateKey::new(self.bearing_seq.clone(), self.distance_seq.clone())
    }
}

/// One colour band of a prescription legend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegendEntry {
    pub threshold: Decimal,
    pub color: String,
    pub label: String,
}

impl LegendEntry {
    pub fn new(threshold: Decimal, color: impl Into<String>) -> Self {
        Self {
            threshold,
            color: color.into(),
            label: format!("{}%", threshold.normalize()),
        }
    }
}

/// Legend entries sorted ascending by threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Legend(Vec<LegendEntry>);

impl Legend {
    /// Sorts the entries; equal thresholds keep their document order
    pub fn new(mut entries: Vec<LegendEntry>) -> Self {
        entries.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        Self(entries)
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Prescription payload returned by the upstream generator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionResponse {
    /// Base64 encoded prescription XML
    #[serde(default)]
    pub encoded_vri: Option<String>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub max_irrigation_amount: Option<f64>,
}

impl PrescriptionResponse {
    /// Machine speed rounded to a whole percent
    pub fn rounded_speed(&self) -> Option<i64> {
        self.speed
            .filter(|s| s.is_finite())
            .map(|s| s.round() as i64)
    }

    /// Maximum irrigation amount rounded to two decimals
    pub fn rounded_max_irrigation_amount(&self) -> Option<Decimal> {
        self.max_irrigation_amount
            .and_then(Decimal::from_f64_retain)
            .map(|d| d.round_dp(2))
    }
}

/// Summary of a prescription for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionSummary {
    pub speed: Option<i64>,
    pub max_irrigation_amount: Option<Decimal>,
    pub rate_count: usize,
    pub rated_cells: usize,
    pub legend: Legend,
}
