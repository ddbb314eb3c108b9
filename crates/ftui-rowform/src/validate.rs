#![forbid(unsafe_code)]

//! Whole-collection validation against a [`Schema`].
//!
//! [`validate`] is a pure function: the same collection and schema always
//! yield the same [`ErrorMap`]. At most one error is kept per field, the
//! first failing rule in this order:
//!
//! 1. required: the value is empty
//! 2. option: the value is not one of the field's options
//! 3. type: a numeric field whose value does not coerce to a finite number
//! 4. range: the number is below the inclusive minimum
//! 5. cross-field: the number is not strictly greater than the sibling
//!
//! An empty optional field passes every rule. A sibling that is empty or
//! not numeric fails the cross-field comparison.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::path::{self, FieldPath, to_path};
use crate::schema::{FieldKind, FieldSchema, Schema};
use crate::store::{Collection, Row};

/// Error code for an empty required field.
pub const ERROR_CODE_REQUIRED: &str = "required";
/// Error code for a numeric field holding non-numeric text.
pub const ERROR_CODE_TYPE: &str = "type";
/// Error code for a number below the field's minimum.
pub const ERROR_CODE_RANGE: &str = "range";
/// Error code for a number not greater than its sibling field.
pub const ERROR_CODE_MORE_THAN: &str = "more_than";
/// Error code for a value outside the field's option list.
pub const ERROR_CODE_OPTION: &str = "option";

/// Which rule a field failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    /// The field is required but empty.
    Required,
    /// The value does not coerce to a finite number.
    Type,
    /// The number is below the inclusive minimum `min`.
    Range { min: f64 },
    /// The number is not strictly greater than field `other`.
    CrossField { other: String },
    /// The value is not one of the field's options.
    UnknownOption,
}

impl FieldErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Required => ERROR_CODE_REQUIRED,
            Self::Type => ERROR_CODE_TYPE,
            Self::Range { .. } => ERROR_CODE_RANGE,
            Self::CrossField { .. } => ERROR_CODE_MORE_THAN,
            Self::UnknownOption => ERROR_CODE_OPTION,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::Required => "This field is required",
            Self::Type => "Must be a number",
            Self::Range { .. } => "Must be at least {min}",
            Self::CrossField { .. } => "Must be greater than {field}",
            Self::UnknownOption => "Select one of the available options",
        }
    }
}

/// A failed rule with its human-readable message.
///
/// Messages may contain `{name}` placeholders filled from `params`; range
/// errors carry `min`, cross-field errors carry `field`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// The rule that failed.
    pub kind: FieldErrorKind,
    /// Message template, possibly with `{key}` placeholders.
    pub message: String,
    /// Values substituted into the message template.
    pub params: BTreeMap<String, String>,
}

impl FieldError {
    /// Error of `kind` with the rule's own parameters filled in.
    #[must_use]
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        match &kind {
            FieldErrorKind::Range { min } => {
                params.insert("min".to_string(), min.to_string());
            }
            FieldErrorKind::CrossField { other } => {
                params.insert("field".to_string(), other.clone());
            }
            _ => {}
        }
        Self {
            kind,
            message: message.into(),
            params,
        }
    }

    /// Add or replace a template parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Stable code of the failed rule.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Message with every `{key}` replaced by its parameter.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.params {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_message())
    }
}

/// Errors keyed by field path. A path with no entry is valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorMap {
    errors: BTreeMap<FieldPath, FieldError>,
}

impl ErrorMap {
    /// Error at `path`; `None` means the field is valid.
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&FieldError> {
        path::get(&self.errors, path)
    }

    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.errors.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &FieldError)> {
        self.errors.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.errors.keys()
    }

    /// Errors of the row at position `row`, keyed by field name.
    pub fn for_row(&self, row: usize) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors
            .iter()
            .filter(move |(p, _)| p.row() == row)
            .map(|(p, e)| (p.field(), e))
    }
}

/// Validate every field of every row.
#[must_use]
pub fn validate(collection: &Collection, schema: &Schema) -> ErrorMap {
    let mut errors = BTreeMap::new();
    for (index, row) in collection.rows().iter().enumerate() {
        for field in schema.fields() {
            if let Some(err) = check(field, row) {
                errors.insert(to_path(index, &field.name), err);
            }
        }
    }
    trace!(
        rows = collection.len(),
        error_count = errors.len(),
        "collection validated"
    );
    ErrorMap { errors }
}

fn check(field: &FieldSchema, row: &Row) -> Option<FieldError> {
    let value = row.value(&field.name);
    if value.is_empty() {
        return field
            .required
            .then(|| custom_message(field, FieldErrorKind::Required));
    }
    if let Some(options) = &field.options
        && !options.contains(value)
    {
        return Some(custom_message(field, FieldErrorKind::UnknownOption));
    }
    if field.kind != FieldKind::Numeric {
        return None;
    }
    let Some(n) = value.as_number() else {
        return Some(custom_message(field, FieldErrorKind::Type));
    };
    if let Some(min) = field.min
        && n < min
    {
        return Some(custom_message(field, FieldErrorKind::Range { min }));
    }
    if let Some(other) = &field.more_than {
        let beats = row
            .value(other)
            .as_number()
            .is_some_and(|sibling| n > sibling);
        if !beats {
            return Some(custom_message(
                field,
                FieldErrorKind::CrossField {
                    other: other.clone(),
                },
            ));
        }
    }
    None
}

fn custom_message(field: &FieldSchema, kind: FieldErrorKind) -> FieldError {
    let custom = match &kind {
        FieldErrorKind::Required => &field.messages.required,
        FieldErrorKind::Type => &field.messages.type_error,
        FieldErrorKind::Range { .. } => &field.messages.range,
        FieldErrorKind::CrossField { .. } => &field.messages.more_than,
        FieldErrorKind::UnknownOption => &field.messages.option,
    };
    let message = custom
        .clone()
        .unwrap_or_else(|| kind.default_message().to_string());
    FieldError::new(kind, message)
}
