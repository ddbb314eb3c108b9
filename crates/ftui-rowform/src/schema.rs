#![forbid(unsafe_code)]

//! Declarative field rules for every row.
//!
//! A [`Schema`] lists the fields each row carries and the rules each field
//! must satisfy. Construction checks the schema itself: names are unique,
//! numeric-only rules sit on numeric fields, and cross-field references
//! point at a sibling that exists.
//!
//! # Example
//!
//! ```
//! use ftui_rowform::{FieldSchema, Schema};
//!
//! let schema = Schema::new(vec![
//!     FieldSchema::text("category").required(),
//!     FieldSchema::numeric("start").required().min(0.0),
//!     FieldSchema::numeric("end").required().more_than("start"),
//! ])
//! .unwrap();
//! assert_eq!(schema.len(), 3);
//! assert!(Schema::new(vec![FieldSchema::numeric("end").more_than("nope")]).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::store::RowValues;
use crate::value::FieldValue;

/// Problems found while building a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A field has an empty name.
    EmptyName,
    /// Two fields share a name.
    DuplicateField(String),
    /// A cross-field rule names a field the schema does not declare.
    UnknownReference { field: String, target: String },
    /// A cross-field rule names the field itself.
    SelfReference(String),
    /// A numeric-only rule is attached to a text field.
    NotNumeric { field: String, rule: &'static str },
    /// A minimum bound that is not a finite number.
    InvalidBound(String),
    /// An option list with no entries.
    EmptyOptions(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "field name must not be empty"),
            Self::DuplicateField(name) => write!(f, "duplicate field {name:?}"),
            Self::UnknownReference { field, target } => {
                write!(f, "field {field:?} compares against unknown field {target:?}")
            }
            Self::SelfReference(field) => {
                write!(f, "field {field:?} compares against itself")
            }
            Self::NotNumeric { field, rule } => {
                write!(f, "rule `{rule}` requires numeric field, {field:?} is text")
            }
            Self::InvalidBound(field) => {
                write!(f, "field {field:?} has a non-finite minimum")
            }
            Self::EmptyOptions(field) => {
                write!(f, "field {field:?} has an empty option list")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Value type a field is validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Numeric,
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Allowed values of a select field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionList {
    options: Vec<SelectOption>,
}

impl OptionList {
    #[must_use]
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }

    /// Build from `(value, label)` pairs.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            options: pairs
                .into_iter()
                .map(|(value, label)| SelectOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Whether `value` matches an option value by its text form.
    #[must_use]
    pub fn contains(&self, value: &FieldValue) -> bool {
        let text = value.display_text();
        self.options.iter().any(|o| o.value == text)
    }

    /// Label shown for the option with value `value`.
    #[must_use]
    pub fn label_for(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }
}

/// Per-rule message overrides. Unset entries use the built-in text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleMessages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_than: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

impl RuleMessages {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_none()
            && self.type_error.is_none()
            && self.range.is_none()
            && self.more_than.is_none()
            && self.option.is_none()
    }
}

/// Rules for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub kind: FieldKind,
    /// Inclusive lower bound, numeric fields only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Sibling this field must be strictly greater than, numeric fields only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_than: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionList>,
    #[serde(default, skip_serializing_if = "RuleMessages::is_empty")]
    pub messages: RuleMessages,
}

impl FieldSchema {
    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
            min: None,
            more_than: None,
            options: None,
            messages: RuleMessages::default(),
        }
    }

    /// Optional text field with no rules.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Text)
    }

    /// Optional numeric field with no bounds.
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Numeric)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn more_than(mut self, other: impl Into<String>) -> Self {
        self.more_than = Some(other.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: OptionList) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn required_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.required = Some(msg.into());
        self
    }

    #[must_use]
    pub fn type_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.type_error = Some(msg.into());
        self
    }

    #[must_use]
    pub fn range_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.range = Some(msg.into());
        self
    }

    #[must_use]
    pub fn more_than_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.more_than = Some(msg.into());
        self
    }

    #[must_use]
    pub fn option_message(mut self, msg: impl Into<String>) -> Self {
        self.messages.option = Some(msg.into());
        self
    }
}

/// Unchecked wire form of a schema.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSchema {
    pub(crate) fields: Vec<FieldSchema>,
}

/// Checked set of field rules, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    fields: Vec<FieldSchema>,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSchema::deserialize(deserializer)?;
        Self::new(raw.fields).map_err(serde::de::Error::custom)
    }
}

impl Schema {
    /// Check and wrap `fields`.
    pub fn new(fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        for field in &fields {
            check_field(field, &fields)?;
        }
        Ok(Self { fields })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A row with every declared field present and empty.
    #[must_use]
    pub fn empty_row(&self) -> RowValues {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), FieldValue::Empty))
            .collect()
    }
}

fn check_field(field: &FieldSchema, all: &[FieldSchema]) -> Result<(), SchemaError> {
    let numeric = field.kind == FieldKind::Numeric;
    if let Some(min) = field.min {
        if !numeric {
            return Err(SchemaError::NotNumeric {
                field: field.name.clone(),
                rule: "min",
            });
        }
        if !min.is_finite() {
            return Err(SchemaError::InvalidBound(field.name.clone()));
        }
    }
    if let Some(target) = &field.more_than {
        if !numeric {
            return Err(SchemaError::NotNumeric {
                field: field.name.clone(),
                rule: "more_than",
            });
        }
        if *target == field.name {
            return Err(SchemaError::SelfReference(field.name.clone()));
        }
        if !all.iter().any(|f| f.name == *target) {
            return Err(SchemaError::UnknownReference {
                field: field.name.clone(),
                target: target.clone(),
            });
        }
    }
    if let Some(options) = &field.options
        && options.is_empty()
    {
        return Err(SchemaError::EmptyOptions(field.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_schema() -> Result<Schema, SchemaError> {
        Schema::new(vec![
            FieldSchema::text("category").required(),
            FieldSchema::numeric("start").required().min(0.0),
            FieldSchema::numeric("end").required().more_than("start"),
        ])
    }

    #[test]
    fn builds_valid_schema() {
        let schema = range_schema().unwrap();
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["category", "start", "end"]
        );
        assert!(schema.contains("end"));
        assert!(!schema.contains("middle"));
        assert_eq!(schema.field("start").unwrap().min, Some(0.0));
    }

    #[test]
    fn rejects_bad_schemas() {
        let cases = vec![
            (vec![FieldSchema::text("")], SchemaError::EmptyName),
            (
                vec![FieldSchema::text("a"), FieldSchema::numeric("a")],
                SchemaError::DuplicateField("a".into()),
            ),
            (
                vec![FieldSchema::numeric("end").more_than("start")],
                SchemaError::UnknownReference {
                    field: "end".into(),
                    target: "start".into(),
                },
            ),
            (
                vec![FieldSchema::numeric("x").more_than("x")],
                SchemaError::SelfReference("x".into()),
            ),
            (
                vec![FieldSchema::text("t").min(1.0)],
                SchemaError::NotNumeric {
                    field: "t".into(),
                    rule: "min",
                },
            ),
            (
                vec![FieldSchema::numeric("a"), FieldSchema::text("t").more_than("a")],
                SchemaError::NotNumeric {
                    field: "t".into(),
                    rule: "more_than",
                },
            ),
            (
                vec![FieldSchema::numeric("n").min(f64::NAN)],
                SchemaError::InvalidBound("n".into()),
            ),
            (
                vec![FieldSchema::text("c").options(OptionList::default())],
                SchemaError::EmptyOptions("c".into()),
            ),
        ];
        for (fields, expected) in cases {
            assert_eq!(Schema::new(fields).unwrap_err(), expected);
        }
    }

    #[test]
    fn option_lookup() {
        let list = OptionList::from_pairs([("option1", "Option 1"), ("option2", "Option 2")]);
        assert_eq!(list.len(), 2);
        assert!(list.contains(&FieldValue::text("option2")));
        assert!(!list.contains(&FieldValue::text("option3")));
        assert_eq!(list.label_for("option1"), Some("Option 1"));
        assert_eq!(list.label_for("nope"), None);
    }

    #[test]
    fn numeric_values_match_options_by_text() {
        let list = OptionList::from_pairs([("5", "Five")]);
        assert!(list.contains(&FieldValue::Number(5.0)));
    }

    #[test]
    fn empty_row_has_all_fields() {
        let row = range_schema().unwrap().empty_row();
        assert_eq!(row.len(), 3);
        assert!(row.values().all(FieldValue::is_empty));
    }

    #[test]
    fn deserializes_with_messages() {
        let schema: Schema = serde_json::from_str(
            r#"{"fields":[
                {"name":"start","kind":"numeric","required":true,"min":0,
                 "messages":{"required":"Start is required","typeError":"Start must be a number"}},
                {"name":"end","kind":"numeric","moreThan":"start"}
            ]}"#,
        )
        .unwrap();
        let start = schema.field("start").unwrap();
        assert_eq!(start.messages.required.as_deref(), Some("Start is required"));
        assert_eq!(
            start.messages.type_error.as_deref(),
            Some("Start must be a number")
        );
        assert_eq!(schema.field("end").unwrap().more_than.as_deref(), Some("start"));
    }

    #[test]
    fn deserialize_runs_checks() {
        let err = serde_json::from_str::<Schema>(
            r#"{"fields":[{"name":"end","kind":"numeric","moreThan":"start"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn serialize_round_trip() {
        let schema = range_schema().unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
