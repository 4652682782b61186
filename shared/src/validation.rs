//! Validation utilities for irrigation system and zone input

use rust_decimal::Decimal;

// ============================================================================
// Irrigation System Validations
// ============================================================================

/// Validate that a measurement is a finite number above zero
pub fn validate_positive(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() {
        return Err("must be a finite number");
    }
    if value <= 0.0 {
        return Err("must be greater than zero");
    }
    Ok(())
}

/// Validate an irrigation system or farm name
pub fn validate_system_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("name cannot be empty");
    }
    if trimmed.chars().count() > 100 {
        return Err("name must be at most 100 characters");
    }
    // Names travel as URL path segments upstream
    if trimmed.contains('/') {
        return Err("name cannot contain '/'");
    }
    Ok(())
}

// ============================================================================
// Management Zone Validations
// ============================================================================

/// Validate a management zone name
pub fn validate_zone_name(name: &str) -> Result<(), &'static str> {
    validate_system_name(name)
}

/// Validate a zone colour in `#rrggbb` form
pub fn validate_zone_color(color: &str) -> Result<(), &'static str> {
    let hex = color
        .strip_prefix('#')
        .ok_or("Zone colour must start with '#'")?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Zone colour must be six hex digits");
    }
    Ok(())
}

/// Validate an irrigation treatment percentage (0-200% of the base rate)
pub fn validate_treatment_percent(percent: Decimal) -> Result<(), &'static str> {
    if percent < Decimal::ZERO || percent > Decimal::from(200) {
        return Err("Irrigation treatment must be between 0 and 200%");
    }
    Ok(())
}

// ============================================================================
// Prescription Validations
// ============================================================================

/// Validate a watering rate percentage entered by the user
pub fn validate_watering_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO {
        return Err("Watering rate cannot be negative");
    }
    Ok(())
}
