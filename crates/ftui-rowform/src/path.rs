#![forbid(unsafe_code)]

//! Canonical addressing of one field of one row.
//!
//! A [`FieldPath`] names a field by row position and field name. Its text
//! form is `items[<row>].<field>`, and parsing (via [`FromStr`]) reverses
//! [`Display`](fmt::Display) exactly, so paths can be handed to presentation
//! code as plain strings and read back.
//!
//! Error and touched maps are keyed by paths. Lookups go through [`get`],
//! which reports a missing entry as `None`: an absent path means "no error"
//! or "not touched", never a failure.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the collection segment in the text form of a path.
pub const COLLECTION_NAME: &str = "items";

/// Identifies a single field of the row at `row` (zero-based position).
///
/// Ordering is by row, then by field name, which keeps path-keyed maps in
/// display order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    row: usize,
    field: String,
}

impl FieldPath {
    /// Create a path for `field` in the row at position `row`.
    #[must_use]
    pub fn new(row: usize, field: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
        }
    }

    /// Row position this path points into.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Field name within the row.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Same field, different row position.
    #[must_use]
    pub fn with_row(&self, row: usize) -> Self {
        Self {
            row,
            field: self.field.clone(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COLLECTION_NAME}[{}].{}", self.row, self.field)
    }
}

/// Error returned when a string is not a well-formed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError {
    input: String,
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid field path {:?}: expected {COLLECTION_NAME}[<row>].<field>",
            self.input
        )
    }
}

impl std::error::Error for PathParseError {}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PathParseError {
            input: s.to_string(),
        };
        let rest = s
            .strip_prefix(COLLECTION_NAME)
            .and_then(|r| r.strip_prefix('['))
            .ok_or_else(err)?;
        let (index, field) = rest.split_once("].").ok_or_else(err)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) || field.is_empty() {
            return Err(err());
        }
        let row = index.parse::<usize>().map_err(|_| err())?;
        Ok(Self::new(row, field))
    }
}

/// Build the path for `field` in the row at position `row`.
#[must_use]
pub fn to_path(row: usize, field: &str) -> FieldPath {
    FieldPath::new(row, field)
}

/// Look up `path` in a path-keyed map. Absent entries yield `None`.
#[must_use]
pub fn get<'a, V>(map: &'a BTreeMap<FieldPath, V>, path: &FieldPath) -> Option<&'a V> {
    map.get(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_indexed_form() {
        assert_eq!(to_path(0, "category").to_string(), "items[0].category");
        assert_eq!(to_path(12, "end").to_string(), "items[12].end");
    }

    #[test]
    fn equal_arguments_give_equal_paths() {
        assert_eq!(to_path(3, "start"), to_path(3, "start"));
        assert_ne!(to_path(3, "start"), to_path(4, "start"));
        assert_ne!(to_path(3, "start"), to_path(3, "end"));
    }

    #[test]
    fn parse_reverses_display() {
        for path in [
            to_path(0, "a"),
            to_path(7, "start"),
            to_path(100, "weird].name"),
        ] {
            let text = path.to_string();
            assert_eq!(text.parse::<FieldPath>().unwrap(), path);
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in [
            "",
            "items",
            "items[].a",
            "items[x].a",
            "items[-1].a",
            "items[0].",
            "rows[0].a",
            "items[0]a",
        ] {
            assert!(bad.parse::<FieldPath>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parse_error_mentions_input() {
        let err = "nope".parse::<FieldPath>().unwrap_err();
        assert!(err.to_string().contains("\"nope\""));
    }

    #[test]
    fn get_absent_is_none() {
        let mut map = BTreeMap::new();
        map.insert(to_path(0, "start"), "bad");
        assert_eq!(get(&map, &to_path(0, "start")), Some(&"bad"));
        assert_eq!(get(&map, &to_path(1, "start")), None);
    }

    #[test]
    fn ordering_is_row_major() {
        let mut paths = vec![to_path(1, "a"), to_path(0, "b"), to_path(0, "a")];
        paths.sort();
        assert_eq!(paths, vec![to_path(0, "a"), to_path(0, "b"), to_path(1, "a")]);
    }

    #[test]
    fn with_row_keeps_field() {
        let moved = to_path(4, "end").with_row(2);
        assert_eq!(moved.row(), 2);
        assert_eq!(moved.field(), "end");
    }
}
