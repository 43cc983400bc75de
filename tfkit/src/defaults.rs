//! Default value providers for attributes
//!
//! A default runs during planning when an optional+computed attribute is
//! absent from the configuration. It never runs for values the practitioner
//! set explicitly, including explicit nulls inside nested structures.
//!
//! # Examples
//!
//! ```no_run
//! use tfkit::schema::{AttributeBuilder, AttributeType};
//! use tfkit::defaults::{StaticDefault, EnvDefault};
//! use tfkit::types::Dynamic;
//!
//! let timeout = AttributeBuilder::new("request_timeout_seconds", AttributeType::Number)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::number(60.0))
//!     .build();
//!
//! let region = AttributeBuilder::new("region", AttributeType::String)
//!     .optional()
//!     .computed()
//!     .default(EnvDefault::create("NIMBUS_REGION", "eu-central-1"))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    /// Create a static default from any Dynamic value
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    /// Create a static string default
    pub fn string(value: &str) -> Box<dyn Default> {
        Box::new(Self {
            value: Dynamic::String(value.to_string()),
        })
    }

    /// Create a static number default
    pub fn number(value: f64) -> Box<dyn Default> {
        Box::new(Self {
            value: Dynamic::Number(value),
        })
    }

    /// Create a static boolean default
    pub fn bool(value: bool) -> Box<dyn Default> {
        Box::new(Self {
            value: Dynamic::Bool(value),
        })
    }

    /// Create a static list default
    pub fn list(values: Vec<Dynamic>) -> Box<dyn Default> {
        Box::new(Self {
            value: Dynamic::List(values),
        })
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// EnvDefault reads the default value from an environment variable
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    /// Create an environment variable default with a fallback value
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// Create an environment variable default that yields null when unset
    pub fn create_optional(env_var: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = match env::var(&self.env_var) {
            Ok(val) => Dynamic::String(val),
            Err(_) => match &self.fallback {
                Some(fallback) => Dynamic::String(fallback.clone()),
                None => Dynamic::Null,
            },
        };

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}
