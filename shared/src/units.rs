//! Unit conversions for micro-irrigation inputs
//!
//! Emitter flow is gallons per hour (imperial) or litres per hour (SI);
//! spacings are inches (imperial) or metres (SI).

use serde::{Deserialize, Serialize};

use crate::error::UnitError;

pub const LITERS_PER_GALLON: f64 = 3.78541;
pub const METERS_PER_INCH: f64 = 0.0254;
pub const MILLIMETERS_PER_INCH: f64 = 25.4;

/// Cubic inches per gallon, the constant of the precipitation rate formula
const CUBIC_INCHES_PER_GALLON: f64 = 231.0;

/// Default share of emitted water that reaches the root zone
pub const DEFAULT_IRRIGATION_EFFICIENCY: f64 = 0.95;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    #[serde(rename = "imperial", alias = "Imperial")]
    Imperial,
    #[serde(rename = "SI", alias = "si", alias = "Si")]
    Si,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Flow,
    Distance,
}

impl Quantity {
    /// SI units per imperial unit
    fn factor(self) -> f64 {
        match self {
            Quantity::Flow => LITERS_PER_GALLON,
            Quantity::Distance => METERS_PER_INCH,
        }
    }
}

/// Convert `value` of `quantity` between unit systems
pub fn convert(value: f64, quantity: Quantity, from: UnitSystem, to: UnitSystem) -> f64 {
    match (from, to) {
        (UnitSystem::Imperial, UnitSystem::Si) => value * quantity.factor(),
        (UnitSystem::Si, UnitSystem::Imperial) => value / quantity.factor(),
        _ => value,
    }
}

/// A value tagged with the unit system it was entered in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: UnitSystem,
}

impl Measurement {
    pub fn new(value: f64, unit: UnitSystem) -> Self {
        Self { value, unit }
    }

    pub fn to(&self, quantity: Quantity, unit: UnitSystem) -> f64 {
        convert(self.value, quantity, self.unit, unit)
    }

    fn positive(&self, field: &'static str) -> Result<f64, UnitError> {
        positive(field, self.value)
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, UnitError> {
    if !value.is_finite() {
        return Err(UnitError::NotFinite(field));
    }
    if value <= 0.0 {
        return Err(UnitError::NonPositive(field));
    }
    Ok(value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drip precipitation rate, in/h for imperial output or mm/h for SI
///
/// PR = 231 · Q · efficiency / (row spacing · emitter spacing), with Q in
/// gallons per hour and both spacings in inches. Rounded to two decimals.
pub fn application_rate(
    emitter_flow: Measurement,
    drip_line_distance: Measurement,
    emitter_spacing: Measurement,
    efficiency: f64,
    output: UnitSystem,
) -> Result<f64, UnitError> {
    emitter_flow.positive("emitter flow")?;
    drip_line_distance.positive("drip line distance")?;
    emitter_spacing.positive("emitter spacing")?;
    positive("irrigation efficiency", efficiency)?;
    if efficiency > 1.0 {
        return Err(UnitError::EfficiencyOutOfRange(efficiency));
    }

    let flow_gph = emitter_flow.to(Quantity::Flow, UnitSystem::Imperial);
    let row_in = drip_line_distance.to(Quantity::Distance, UnitSystem::Imperial);
    let emitter_in = emitter_spacing.to(Quantity::Distance, UnitSystem::Imperial);

    let inches_per_hour = CUBIC_INCHES_PER_GALLON * flow_gph * efficiency / (row_in * emitter_in);
    let rate = match output {
        UnitSystem::Imperial => inches_per_hour,
        UnitSystem::Si => inches_per_hour * MILLIMETERS_PER_INCH,
    };
    Ok(round2(rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_flow_and_distance() {
        assert!((convert(1.0, Quantity::Flow, UnitSystem::Imperial, UnitSystem::Si) - 3.78541).abs() < 1e-12);
        assert!((convert(0.0254, Quantity::Distance, UnitSystem::Si, UnitSystem::Imperial) - 1.0).abs() < 1e-12);
        assert_eq!(convert(7.0, Quantity::Flow, UnitSystem::Si, UnitSystem::Si), 7.0);
    }

    #[test]
    fn test_application_rate_imperial() {
        // 231 * 1 * 0.95 / (12 * 12) = 1.5239...
        let rate = application_rate(
            Measurement::new(1.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            0.95,
            UnitSystem::Imperial,
        )
        .unwrap();
        assert_eq!(rate, 1.52);
    }

    #[test]
    fn test_application_rate_si_output() {
        let rate = application_rate(
            Measurement::new(1.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            0.95,
            UnitSystem::Si,
        )
        .unwrap();
        assert_eq!(rate, 38.71);
    }

    #[test]
    fn test_si_inputs_match_imperial() {
        let imperial = application_rate(
            Measurement::new(1.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            Measurement::new(12.0, UnitSystem::Imperial),
            0.9,
            UnitSystem::Imperial,
        )
        .unwrap();
        let si = application_rate(
            Measurement::new(LITERS_PER_GALLON, UnitSystem::Si),
            Measurement::new(12.0 * METERS_PER_INCH, UnitSystem::Si),
            Measurement::new(12.0 * METERS_PER_INCH, UnitSystem::Si),
            0.9,
            UnitSystem::Imperial,
        )
        .unwrap();
        assert_eq!(imperial, si);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let ok = Measurement::new(1.0, UnitSystem::Imperial);
        assert_eq!(
            application_rate(Measurement::new(0.0, UnitSystem::Si), ok, ok, 0.9, UnitSystem::Si),
            Err(UnitError::NonPositive("emitter flow"))
        );
        assert_eq!(
            application_rate(ok, Measurement::new(f64::NAN, UnitSystem::Si), ok, 0.9, UnitSystem::Si),
            Err(UnitError::NotFinite("drip line distance"))
        );
        assert_eq!(
            application_rate(ok, ok, ok, 1.5, UnitSystem::Si),
            Err(UnitError::EfficiencyOutOfRange(1.5))
        );
    }
}
