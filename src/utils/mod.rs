//! Form validation helpers shared by the route modules.

use serde_json::{json, Value};
use yelpcamp_http::AppError;

/// Field-level problems collected while checking one submitted form
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: Vec<Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, code: &str, message: impl Into<String>) {
        self.details.push(json!({
            "field": field,
            "code": code,
            "message": message.into(),
        }));
    }

    /// Trimmed value of a required text field, recording an error when blank
    pub fn required(&mut self, field: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "required", format!("\"{}\" is required", field));
        }
        trimmed.to_string()
    }

    /// Finite number within `[min, max]`
    pub fn number_in(&mut self, field: &str, value: &str, min: f64, max: f64) -> f64 {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "required", format!("\"{}\" is required", field));
            return 0.0;
        }
        match trimmed.parse::<f64>() {
            Ok(number) if !number.is_finite() => {
                self.add(field, "number", format!("\"{}\" must be a number", field));
                0.0
            }
            Ok(number) if number < min => {
                self.add(
                    field,
                    "min",
                    format!("\"{}\" must be greater than or equal to {}", field, min),
                );
                number
            }
            Ok(number) if number > max => {
                self.add(
                    field,
                    "max",
                    format!("\"{}\" must be less than or equal to {}", field, max),
                );
                number
            }
            Ok(number) => number,
            Err(_) => {
                self.add(field, "number", format!("\"{}\" must be a number", field));
                0.0
            }
        }
    }

    /// Whole number within `[min, max]`
    pub fn integer_in(&mut self, field: &str, value: &str, min: i64, max: i64) -> i64 {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "required", format!("\"{}\" is required", field));
            return min;
        }
        match trimmed.parse::<i64>() {
            Ok(number) if (min..=max).contains(&number) => number,
            Ok(number) => {
                self.add(
                    field,
                    "range",
                    format!("\"{}\" must be between {} and {}", field, min, max),
                );
                number
            }
            Err(_) => {
                self.add(field, "integer", format!("\"{}\" must be an integer", field));
                min
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// `Ok(value)` when nothing was recorded, otherwise a 400 validation error
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.details.is_empty() {
            return Ok(value);
        }
        let message = self
            .details
            .iter()
            .filter_map(|detail| detail["message"].as_str())
            .collect::<Vec<_>>()
            .join(". ");
        Err(AppError::validation(self.details, message))
    }
}
