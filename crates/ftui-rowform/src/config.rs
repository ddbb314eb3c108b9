#![forbid(unsafe_code)]

//! JSON form configuration.
//!
//! A form can be described entirely in JSON and loaded with
//! [`FormConfig::from_json`]:
//!
//! ```json
//! {
//!   "minRows": 1,
//!   "initialRows": 2,
//!   "schema": {
//!     "fields": [
//!       { "name": "category", "required": true,
//!         "options": [{ "value": "option1", "label": "Option 1" }] },
//!       { "name": "start", "kind": "numeric", "required": true, "min": 0 },
//!       { "name": "end", "kind": "numeric", "required": true, "moreThan": "start" }
//!     ]
//!   }
//! }
//! ```
//!
//! Malformed JSON and schemas that fail their checks are both reported as a
//! [`ConfigError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{RawSchema, Schema, SchemaError};

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The input is not valid JSON for a form configuration.
    Json(serde_json::Error),
    /// The schema parsed but failed its checks.
    Schema(SchemaError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid configuration: {e}"),
            Self::Schema(e) => write!(f, "invalid schema: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Schema(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<SchemaError> for ConfigError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_rows() -> usize {
    1
}

/// Row counts plus the schema of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    /// Removals never take the collection below this many rows.
    #[serde(default = "default_rows")]
    pub min_rows: usize,
    /// Rows present when the form is created, raised to `min_rows` if lower.
    #[serde(default = "default_rows")]
    pub initial_rows: usize,
    pub schema: Schema,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormConfig {
    #[serde(default = "default_rows")]
    min_rows: usize,
    #[serde(default = "default_rows")]
    initial_rows: usize,
    schema: RawSchema,
}

impl FormConfig {
    /// Configuration with one initial and one minimum row.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            min_rows: default_rows(),
            initial_rows: default_rows(),
            schema,
        }
    }

    /// Parse and check a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let raw: RawFormConfig = serde_json::from_str(json)?;
        let schema = Schema::new(raw.schema.fields)?;
        debug!(
            fields = schema.len(),
            min_rows = raw.min_rows,
            initial_rows = raw.initial_rows,
            "form configuration loaded"
        );
        Ok(Self {
            min_rows: raw.min_rows,
            initial_rows: raw.initial_rows,
            schema,
        })
    }
}

impl Schema {
    /// Parse and check a JSON schema of the form `{"fields": [...]}`.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let raw: RawSchema = serde_json::from_str(json)?;
        Ok(Self::new(raw.fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;

    #[test]
    fn defaults_to_one_row() {
        let config = FormConfig::from_json(r#"{"schema":{"fields":[{"name":"a"}]}}"#).unwrap();
        assert_eq!(config.min_rows, 1);
        assert_eq!(config.initial_rows, 1);
        assert_eq!(config.schema.len(), 1);
    }

    #[test]
    fn explicit_row_counts() {
        let config = FormConfig::from_json(
            r#"{"minRows":0,"initialRows":3,"schema":{"fields":[{"name":"a"}]}}"#,
        )
        .unwrap();
        assert_eq!(config.min_rows, 0);
        assert_eq!(config.initial_rows, 3);
    }

    #[test]
    fn malformed_json_is_json_error() {
        let err = FormConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("invalid configuration:"));
    }

    #[test]
    fn bad_schema_is_schema_error() {
        let err = FormConfig::from_json(
            r#"{"schema":{"fields":[{"name":"a"},{"name":"a"}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Schema(SchemaError::DuplicateField(_))
        ));
        assert_eq!(err.to_string(), r#"invalid schema: duplicate field "a""#);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn schema_from_json() {
        let err =
            Schema::from_json(r#"{"fields":[{"name":"t","min":1}]}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Schema(SchemaError::NotNumeric { rule: "min", .. })
        ));
    }

    #[test]
    fn config_round_trips() {
        let config = FormConfig {
            min_rows: 2,
            initial_rows: 4,
            schema: Schema::new(vec![FieldSchema::numeric("n").required()]).unwrap(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(FormConfig::from_json(&json).unwrap(), config);
    }
}
