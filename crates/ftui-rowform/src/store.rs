#![forbid(unsafe_code)]

//! Ordered row collection with stable identities.
//!
//! Every mutation returns a new [`Collection`] and leaves the input
//! untouched. Row identities are minted by an [`IdGenerator`] and never
//! reused within a collection; positions shift on removal, identities do not.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::value::{EMPTY, FieldValue};

/// Field name to value for one row.
pub type RowValues = BTreeMap<String, FieldValue>;

/// Attempts before giving up on a generator that keeps returning ids in use.
const MAX_ID_ATTEMPTS: usize = 8;

/// Stable identity of a row, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// Source of fresh row identities.
pub trait IdGenerator {
    /// Produce the next identity.
    fn next_id(&mut self) -> RowId;
}

impl<F: FnMut() -> RowId> IdGenerator for F {
    fn next_id(&mut self) -> RowId {
        self()
    }
}

/// Monotonic counter starting at 1.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Counter whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counter whose first id is `first`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> RowId {
        let id = RowId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// One entry of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    values: RowValues,
}

impl Row {
    /// Row `id` holding `values`.
    #[must_use]
    pub fn new(id: RowId, values: RowValues) -> Self {
        Self { id, values }
    }

    /// Stable identity of this row.
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// All field values, keyed by field name.
    #[must_use]
    pub fn values(&self) -> &RowValues {
        &self.values
    }

    /// Value of `field`; fields the row does not carry read as empty.
    #[must_use]
    pub fn value(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }
}

/// Ordered sequence of rows with a minimum length enforced on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    rows: Vec<Row>,
    min_rows: usize,
}

impl Collection {
    /// Empty collection that refuses removals below `min_rows`.
    #[must_use]
    pub fn new(min_rows: usize) -> Self {
        Self {
            rows: Vec::new(),
            min_rows,
        }
    }

    /// Length below which removals are refused.
    #[must_use]
    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the collection holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row identities in order.
    pub fn ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.iter().map(Row::id)
    }

    /// Current position of the row with `id`.
    #[must_use]
    pub fn index_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    /// Row with identity `id`.
    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Whether a row with identity `id` is present.
    #[must_use]
    pub fn contains(&self, id: RowId) -> bool {
        self.index_of(id).is_some()
    }

    /// Field values of every row, in order, without identities.
    #[must_use]
    pub fn values(&self) -> Vec<RowValues> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    /// New collection with a row holding `values` appended at the end.
    ///
    /// The generator is asked again while it returns an id already present.
    /// A generator that never produces a fresh id leaves the collection as is.
    #[must_use]
    pub fn append(&self, values: RowValues, ids: &mut dyn IdGenerator) -> Self {
        self.append_fresh(values, ids, &BTreeSet::new())
    }

    /// Like [`append`](Self::append), also refusing any id in `retired`.
    ///
    /// Callers pass every id they have handed out so that an id freed by a
    /// removal is never attached to a new row.
    #[must_use]
    pub fn append_fresh(
        &self,
        values: RowValues,
        ids: &mut dyn IdGenerator,
        retired: &BTreeSet<RowId>,
    ) -> Self {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ids.next_id();
            if self.contains(id) {
                warn!(row_id = %id, "generated row id already in use, retrying");
                continue;
            }
            if retired.contains(&id) {
                warn!(row_id = %id, "generated row id was used by a removed row, retrying");
                continue;
            }
            let mut next = self.clone();
            next.rows.push(Row::new(id, values));
            return next;
        }
        warn!(
            attempts = MAX_ID_ATTEMPTS,
            "id generator produced no fresh id, row not added"
        );
        self.clone()
    }

    /// New collection without the row `id`.
    ///
    /// Unknown ids and removals that would drop below the minimum return an
    /// unchanged copy.
    #[must_use]
    pub fn remove_by_id(&self, id: RowId) -> Self {
        let mut next = self.clone();
        if let Some(index) = self.index_of(id)
            && self.rows.len() > self.min_rows
        {
            next.rows.remove(index);
        }
        next
    }

    /// New collection with `field` of row `id` set to `value`.
    #[must_use]
    pub fn update_field(&self, id: RowId, field: &str, value: FieldValue) -> Self {
        let mut next = self.clone();
        if let Some(index) = self.index_of(id) {
            next.rows[index].values.insert(field.to_string(), value);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, FieldValue)]) -> RowValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn seeded(n: usize, min_rows: usize) -> (Collection, SequentialIds) {
        let mut ids = SequentialIds::new();
        let mut c = Collection::new(min_rows);
        for i in 0..n {
            c = c.append(values(&[("n", FieldValue::from(i as i32))]), &mut ids);
        }
        (c, ids)
    }

    #[test]
    fn sequential_ids_are_monotonic() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id(), RowId::from_raw(1));
        assert_eq!(ids.next_id(), RowId::from_raw(2));
        let mut later = SequentialIds::starting_at(40);
        assert_eq!(later.next_id().raw(), 40);
    }

    #[test]
    fn append_adds_row_at_end() {
        let (c, mut ids) = seeded(2, 1);
        let next = c.append(values(&[("n", FieldValue::from(9))]), &mut ids);
        assert_eq!(next.len(), 3);
        assert_eq!(next.rows()[2].value("n"), &FieldValue::Number(9.0));
        assert_eq!(next.rows()[2].id(), RowId::from_raw(3));
    }

    #[test]
    fn append_leaves_input_untouched() {
        let (c, mut ids) = seeded(1, 1);
        let before = c.clone();
        let _ = c.append(RowValues::new(), &mut ids);
        assert_eq!(c, before);
    }

    #[test]
    fn append_skips_colliding_ids() {
        let (c, _) = seeded(1, 1);
        let a = c.rows()[0].id().raw();
        let mut queue = vec![99, a];
        let mut gen_ids = move || RowId::from_raw(queue.pop().unwrap_or(0));
        let next = c.append(RowValues::new(), &mut gen_ids);
        assert_eq!(next.len(), 2);
        assert_eq!(next.rows()[1].id(), RowId::from_raw(99));
    }

    #[test]
    fn stuck_generator_leaves_collection_unchanged() {
        let (c, _) = seeded(1, 1);
        let taken = c.rows()[0].id();
        let mut stuck = move || taken;
        let next = c.append(RowValues::new(), &mut stuck);
        assert_eq!(next, c);
    }

    #[test]
    fn append_fresh_skips_retired_ids() {
        let (c, _) = seeded(1, 1);
        let retired: BTreeSet<RowId> = [RowId::from_raw(2)].into_iter().collect();
        let mut queue = vec![3, 2];
        let mut gen_ids = move || RowId::from_raw(queue.pop().unwrap_or(0));
        let next = c.append_fresh(RowValues::new(), &mut gen_ids, &retired);
        assert_eq!(next.len(), 2);
        assert_eq!(next.rows()[1].id(), RowId::from_raw(3));
    }

    #[test]
    fn remove_keeps_order_of_others() {
        let (c, _) = seeded(3, 1);
        let ids: Vec<RowId> = c.ids().collect();
        let next = c.remove_by_id(ids[1]);
        assert_eq!(next.ids().collect::<Vec<_>>(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn remove_respects_minimum() {
        let (c, _) = seeded(1, 1);
        let id = c.rows()[0].id();
        assert_eq!(c.remove_by_id(id), c);
    }

    #[test]
    fn remove_unknown_id_is_identity() {
        let (c, _) = seeded(2, 1);
        assert_eq!(c.remove_by_id(RowId::from_raw(777)), c);
    }

    #[test]
    fn zero_minimum_allows_empty() {
        let (c, _) = seeded(1, 0);
        let id = c.rows()[0].id();
        assert!(c.remove_by_id(id).is_empty());
    }

    #[test]
    fn update_changes_only_target() {
        let (c, _) = seeded(2, 1);
        let target = c.rows()[1].id();
        let next = c.update_field(target, "n", FieldValue::text("x"));
        assert_eq!(next.rows()[0], c.rows()[0]);
        assert_eq!(next.rows()[1].value("n"), &FieldValue::text("x"));
        assert_eq!(next.rows()[1].id(), target);
    }

    #[test]
    fn update_with_same_value_is_identity() {
        let (c, _) = seeded(1, 1);
        let id = c.rows()[0].id();
        let current = c.rows()[0].value("n").clone();
        assert_eq!(c.update_field(id, "n", current), c);
    }

    #[test]
    fn update_unknown_id_is_identity() {
        let (c, _) = seeded(1, 1);
        assert_eq!(
            c.update_field(RowId::from_raw(5), "n", FieldValue::Empty),
            c
        );
    }

    #[test]
    fn missing_field_reads_as_empty() {
        let row = Row::new(RowId::from_raw(1), RowValues::new());
        assert!(row.value("anything").is_empty());
    }

    #[test]
    fn values_exclude_ids() {
        let (c, _) = seeded(2, 1);
        let vals = c.values();
        assert_eq!(vals.len(), 2);
        assert_eq!(vals[1].get("n"), Some(&FieldValue::Number(1.0)));
    }
}
