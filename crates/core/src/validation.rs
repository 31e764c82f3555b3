//! Input validation
//!
//! Validators collect every violated rule instead of stopping at the first
//! one, so a caller can report all problems with a request together.
//!
//! # Example
//!
//! ```rust
//! use geofinder_core::validation::validate_new_place;
//!
//! let result = validate_new_place("Farmacias", "  ", 95.0, 200.0);
//! assert_eq!(result.errors().len(), 3);
//! ```

use serde::{Deserialize, Serialize};

/// Latitude domain in degrees
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Longitude domain in degrees
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Rule code
    pub code: String,
    /// Expected value (if applicable)
    pub expected: Option<String>,
    /// Actual value (if applicable)
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// One human-readable line per violated rule
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Whether `field` violated the rule `code`
    pub fn has(&self, field: &str, code: &str) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && e.code == code)
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    /// Validate that a field is not blank after trimming
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: "is required".to_string(),
                code: "REQUIRED".to_string(),
                expected: Some("non-empty value".to_string()),
                actual: Some("empty".to_string()),
            });
        }
        self
    }

    /// Validate that a number is finite, then that it lies in `[min, max]`.
    ///
    /// The range rule is only checked for finite values so a NaN reports one
    /// problem, not two.
    pub fn number_in_range(mut self, field: &str, value: f64, min: f64, max: f64) -> Self {
        if !value.is_finite() {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: "must be a valid number".to_string(),
                code: "NUMBER".to_string(),
                expected: Some("finite number".to_string()),
                actual: Some(value.to_string()),
            });
        } else if value < min || value > max {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: format!("must be between {} and {}", min, max),
                code: "RANGE".to_string(),
                expected: Some(format!("{} - {}", min, max)),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Validate a finite, non-negative number
    pub fn non_negative(mut self, field: &str, value: f64) -> Self {
        if !value.is_finite() || value < 0.0 {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: "must be a non-negative number".to_string(),
                code: "NON_NEGATIVE".to_string(),
                expected: Some(">= 0".to_string()),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}

/// Rules for creating a point of interest
pub fn validate_new_place(category: &str, name: &str, latitude: f64, longitude: f64) -> ValidationResult {
    Validator::new()
        .required("name", name)
        .number_in_range("latitude", latitude, LATITUDE_RANGE.0, LATITUDE_RANGE.1)
        .number_in_range("longitude", longitude, LONGITUDE_RANGE.0, LONGITUDE_RANGE.1)
        .required("category", category)
        .validate()
}

/// Rules for a radius query
pub fn validate_nearby_query(latitude: f64, longitude: f64, radius_km: f64) -> ValidationResult {
    Validator::new()
        .number_in_range("lat", latitude, LATITUDE_RANGE.0, LATITUDE_RANGE.1)
        .number_in_range("lng", longitude, LONGITUDE_RANGE.0, LONGITUDE_RANGE.1)
        .non_negative("radius", radius_km)
        .validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_validation() {
        let result = Validator::new().required("name", "   ").validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].code, "REQUIRED");
    }

    #[test]
    fn test_nan_reports_number_rule_only() {
        let result = Validator::new()
            .number_in_range("latitude", f64::NAN, -90.0, 90.0)
            .validate();
        assert_eq!(result.errors().len(), 1);
        assert!(result.has("latitude", "NUMBER"));
    }

    #[test]
    fn test_latitude_out_of_range() {
        let result = validate_new_place("Farmacias", "Farmacia Central", 95.0, -58.2);
        assert_eq!(result.errors().len(), 1);
        assert!(result.has("latitude", "RANGE"));
        assert_eq!(result.messages(), vec!["latitude: must be between -90 and 90"]);
    }

    #[test]
    fn test_longitude_out_of_range() {
        let result = validate_new_place("Farmacias", "Farmacia Central", 45.0, 200.0);
        assert_eq!(result.errors().len(), 1);
        assert!(result.has("longitude", "RANGE"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let result = validate_new_place("", " ", 95.0, f64::INFINITY);
        assert_eq!(result.errors().len(), 4);
        assert!(result.has("name", "REQUIRED"));
        assert!(result.has("latitude", "RANGE"));
        assert!(result.has("longitude", "NUMBER"));
        assert!(result.has("category", "REQUIRED"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate_new_place("Universidades", "Polo Sur", -90.0, 180.0).is_valid());
    }

    #[test]
    fn test_query_rules() {
        assert!(validate_nearby_query(-32.48, -58.23, 0.0).is_valid());
        let result = validate_nearby_query(f64::NAN, -58.23, -1.0);
        assert!(result.has("lat", "NUMBER"));
        assert!(result.has("radius", "NON_NEGATIVE"));
    }
}
