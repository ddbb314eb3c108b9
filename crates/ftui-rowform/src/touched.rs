#![forbid(unsafe_code)]

//! Which fields the user has interacted with.
//!
//! Touched paths only ever grow, except when a row is removed: that row's
//! paths are dropped and later rows move up one position so every path keeps
//! pointing at the same row it was recorded for.

use std::collections::BTreeSet;

use crate::path::{FieldPath, to_path};
use crate::schema::Schema;
use crate::store::Collection;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchedState {
    paths: BTreeSet<FieldPath>,
}

impl TouchedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` touched. Returns `true` if it was not touched before.
    pub fn mark(&mut self, path: FieldPath) -> bool {
        self.paths.insert(path)
    }

    #[must_use]
    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.paths.contains(path)
    }

    /// Mark every schema field of every row.
    pub fn mark_all(&mut self, collection: &Collection, schema: &Schema) {
        for row in 0..collection.len() {
            for field in schema.field_names() {
                self.paths.insert(to_path(row, field));
            }
        }
    }

    /// Forget the row at position `row` and shift later rows up.
    pub fn remove_row(&mut self, row: usize) {
        self.paths = std::mem::take(&mut self.paths)
            .into_iter()
            .filter(|p| p.row() != row)
            .map(|p| if p.row() > row { p.with_row(p.row() - 1) } else { p })
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.paths.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use crate::store::{RowValues, SequentialIds};

    #[test]
    fn mark_reports_first_touch() {
        let mut t = TouchedState::new();
        assert!(t.mark(to_path(0, "a")));
        assert!(!t.mark(to_path(0, "a")));
        assert!(t.is_touched(&to_path(0, "a")));
        assert!(!t.is_touched(&to_path(1, "a")));
    }

    #[test]
    fn mark_all_covers_every_field() {
        let schema = Schema::new(vec![FieldSchema::text("a"), FieldSchema::text("b")]).unwrap();
        let mut ids = SequentialIds::new();
        let c = Collection::new(1)
            .append(RowValues::new(), &mut ids)
            .append(RowValues::new(), &mut ids);
        let mut t = TouchedState::new();
        t.mark_all(&c, &schema);
        assert_eq!(t.len(), 4);
        assert!(t.is_touched(&to_path(1, "b")));
    }

    #[test]
    fn remove_row_shifts_later_rows() {
        let mut t = TouchedState::new();
        t.mark(to_path(0, "a"));
        t.mark(to_path(1, "a"));
        t.mark(to_path(2, "b"));
        t.remove_row(1);
        assert_eq!(
            t.iter().cloned().collect::<Vec<_>>(),
            vec![to_path(0, "a"), to_path(1, "b")]
        );
    }

    #[test]
    fn remove_last_row_only_drops() {
        let mut t = TouchedState::new();
        t.mark(to_path(0, "a"));
        t.mark(to_path(1, "a"));
        t.remove_row(1);
        assert_eq!(t.len(), 1);
        assert!(t.is_touched(&to_path(0, "a")));
    }
}
