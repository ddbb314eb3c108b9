#![forbid(unsafe_code)]

//! Raw field values as entered by the user.
//!
//! A field holds whatever the input produced: nothing yet, some text, or a
//! number. Validation coerces text to numbers on demand; the stored value is
//! never rewritten by validation.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a row.
///
/// Serializes untagged: `null`, a JSON string, or a JSON number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value entered.
    #[default]
    Empty,
    /// Free text, possibly numeric text awaiting coercion.
    Text(String),
    /// An already-numeric value.
    Number(f64),
}

/// Shared empty value returned for missing fields.
pub(crate) static EMPTY: FieldValue = FieldValue::Empty;

impl FieldValue {
    /// Text value from anything string-like.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Absent, or text that is blank after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Numeric reading of the value.
    ///
    /// Numbers pass through, text is trimmed and parsed. Non-finite results
    /// (NaN, infinities) do not count as numbers.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Empty => return None,
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Borrow the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text suitable for putting back into an input widget.
    ///
    /// Empty renders as `""`; whole numbers render without a fraction.
    #[must_use]
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s),
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Empty, Into::into)
    }
}
