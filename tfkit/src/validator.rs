//! Stock validators for attribute configuration values
//!
//! Validators run during config validation, before any API call. Null and
//! unknown values are skipped: requiredness is enforced by the schema, and
//! values that are only known after apply cannot be judged yet.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use regex::Regex;

fn pass() -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![],
    }
}

/// Enforces minimum and/or maximum length on a string attribute
pub struct StringLengthValidator {
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn at_most(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "string length is unconstrained".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return pass();
        }

        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            if let Some(min) = self.min {
                if s.chars().count() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", request.path, min),
                            format!("Got length {}", s.chars().count()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if s.chars().count() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", request.path, max),
                            format!("Got length {}", s.chars().count()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Enforces a regular expression on a string attribute
///
/// The pattern is compiled when the validator runs; an invalid pattern is
/// reported as a diagnostic against the attribute rather than panicking
/// inside the provider process.
pub struct StringPatternValidator {
    pattern: String,
    description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: &str, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern: pattern.to_string(),
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("string must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return pass();
        }

        let regex = match Regex::new(&self.pattern) {
            Ok(regex) => regex,
            Err(err) => {
                return ValidatorResponse {
                    diagnostics: vec![Diagnostic::error(
                        format!("Invalid validation pattern for {}", request.path),
                        format!("Pattern '{}' failed to compile: {}", self.pattern, err),
                    )
                    .with_attribute(request.path.clone())],
                };
            }
        };

        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            if !regex.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", request.path, self.description),
                        format!("Value '{}' does not match pattern '{}'", s, self.pattern),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Enforces minimum and/or maximum bounds on a number attribute
pub struct NumberRangeValidator {
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn at_most(max: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("number must be between {} and {}", min, max),
            (Some(min), None) => format!("number must be at least {}", min),
            (None, Some(max)) => format!("number must be at most {}", max),
            (None, None) => "number is unconstrained".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return pass();
        }

        let mut diagnostics = vec![];
        if let Dynamic::Number(n) = &request.config_value.value {
            if let Some(min) = self.min {
                if *n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", request.path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if *n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", request.path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Restricts a string attribute to a fixed set of allowed values
pub struct OneOfValidator {
    allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return pass();
        }

        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            if !self.allowed.iter().any(|allowed| allowed == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!(
                            "{} must be one of: {}",
                            request.path,
                            self.allowed.join(", ")
                        ),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Enforces minimum and/or maximum element count on a list attribute
pub struct ListLengthValidator {
    min: Option<usize>,
    max: Option<usize>,
}

impl ListLengthValidator {
    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn at_most(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "list length is unconstrained".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return pass();
        }

        let mut diagnostics = vec![];
        if let Dynamic::List(items) = &request.config_value.value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", request.path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", request.path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }
        ValidatorResponse { diagnostics }
    }
}
