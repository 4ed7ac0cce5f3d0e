//! Module settings schema and validation.
//!
//! Each module kind declares an ordered list of [`Setting`] records. User
//! supplied keyword settings are checked against that list once, at
//! registration: unknown keys and missing required keys are configuration
//! errors. Typed values are then pulled out with [`Settings::get_or`].

use std::fmt;

use i3ps_core::ConfigError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One recognized configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub required: bool,
}

impl Setting {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            description: None,
            required: false,
        }
    }

    pub const fn doc(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.required {
            write!(f, " (required)")?;
        }
        if let Some(doc) = self.description {
            write!(f, ": {doc}")?;
        }
        Ok(())
    }
}

/// Keyword settings that passed schema validation.
#[derive(Debug, Clone)]
pub struct Settings {
    module: String,
    values: Map<String, Value>,
}

impl Settings {
    /// Check `values` against `schema` for the module called `module`.
    ///
    /// Reports the first unknown key (in the order given), otherwise every
    /// missing required key (in schema order).
    pub fn validate(
        module: &str,
        schema: &[Setting],
        values: Map<String, Value>,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = values
            .keys()
            .find(|key| !schema.iter().any(|s| s.name == key.as_str()))
        {
            return Err(ConfigError::InvalidOption {
                module: module.to_string(),
                key: key.clone(),
            });
        }

        let missing: Vec<String> = schema
            .iter()
            .filter(|s| s.required && !values.contains_key(s.name))
            .map(|s| s.name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingOptions {
                module: module.to_string(),
                missing,
            });
        }

        Ok(Self {
            module: module.to_string(),
            values,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Typed value of `key`, or `None` when it was not supplied.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.values
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|e| ConfigError::InvalidValue {
                    module: self.module.clone(),
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Typed value of `key`, or `default` when it was not supplied.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}
