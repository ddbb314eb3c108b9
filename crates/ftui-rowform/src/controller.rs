#![forbid(unsafe_code)]

//! The form controller: event handlers over a row collection.
//!
//! [`FormController`] owns the collection, the touched set, the current
//! error map, and the submission coordinator. Every handler that changes
//! values revalidates the whole collection, so [`FormController::errors`]
//! always equals a fresh [`validate`] of [`FormController::collection`].
//!
//! | Event          | Handler                               | Effect                              |
//! |----------------|---------------------------------------|-------------------------------------|
//! | add row        | [`FormController::on_add_row`]        | append a default row                |
//! | remove row     | [`FormController::on_remove_row`]     | drop a row above the minimum        |
//! | field change   | [`FormController::on_field_change`]   | store the value and revalidate      |
//! | field blur     | [`FormController::on_field_blur`]     | mark the field touched              |
//! | submit         | [`FormController::request_submit`]    | gate on errors and in-flight state  |
//! | submit settled | [`FormController::settle_submit`]     | return to idle                      |
//!
//! An error is shown for a field only once that field is touched; see
//! [`FormController::visible_error`].

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::config::FormConfig;
use crate::path::{FieldPath, to_path};
use crate::schema::Schema;
use crate::store::{Collection, IdGenerator, RowId, RowValues, SequentialIds};
use crate::submit::{
    SubmissionCoordinator, SubmitDecision, SubmitError, SubmitGate, SubmitHandler, SubmitOutcome,
    SubmitPhase, SubmitStats, SubmitToken,
};
use crate::touched::TouchedState;
use crate::validate::{ErrorMap, FieldError, validate};
use crate::value::FieldValue;

/// Produces the values of a newly added row.
pub type RowFactory = Box<dyn Fn() -> RowValues>;

/// Read-only view of the form for rendering.
#[derive(Debug, Clone, Copy)]
pub struct FormState<'a> {
    pub collection: &'a Collection,
    pub touched: &'a TouchedState,
    pub submitting: bool,
}

/// Configures and creates a [`FormController`].
pub struct FormBuilder {
    schema: Schema,
    min_rows: usize,
    initial_rows: usize,
    ids: Option<Box<dyn IdGenerator>>,
    default_row: Option<RowFactory>,
}

impl fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBuilder")
            .field("fields", &self.schema.len())
            .field("min_rows", &self.min_rows)
            .field("initial_rows", &self.initial_rows)
            .field("custom_ids", &self.ids.is_some())
            .field("custom_default_row", &self.default_row.is_some())
            .finish()
    }
}

impl FormBuilder {
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            min_rows: 1,
            initial_rows: 1,
            ids: None,
            default_row: None,
        }
    }

    #[must_use]
    pub fn from_config(config: FormConfig) -> Self {
        Self::new(config.schema)
            .min_rows(config.min_rows)
            .initial_rows(config.initial_rows)
    }

    #[must_use]
    pub fn min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    #[must_use]
    pub fn initial_rows(mut self, initial_rows: usize) -> Self {
        self.initial_rows = initial_rows;
        self
    }

    /// Use `ids` instead of the built-in counter.
    ///
    /// The form refuses ids that are live or that belonged to a removed row,
    /// asking the generator again a bounded number of times. A generator that
    /// keeps returning refused ids leaves the form with fewer rows than
    /// requested, including fewer than `min_rows` at build time.
    #[must_use]
    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    /// Values for rows created by the form. Defaults to every field empty.
    #[must_use]
    pub fn default_row(mut self, factory: impl Fn() -> RowValues + 'static) -> Self {
        self.default_row = Some(Box::new(factory));
        self
    }

    #[must_use]
    pub fn build(self) -> FormController {
        let mut ids: Box<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Box::new(SequentialIds::new()),
        };
        let default_row: RowFactory = match self.default_row {
            Some(factory) => factory,
            None => {
                let empty = self.schema.empty_row();
                Box::new(move || empty.clone())
            }
        };
        let target = self.initial_rows.max(self.min_rows);
        let mut collection = Collection::new(self.min_rows);
        let mut issued = BTreeSet::new();
        for _ in 0..target {
            collection = collection.append_fresh(default_row(), ids.as_mut(), &issued);
            issued.extend(collection.ids());
        }
        if collection.len() < target {
            warn!(
                rows = collection.len(),
                requested = target,
                min_rows = self.min_rows,
                "initial row count not reached, id generator produced no fresh id"
            );
        }
        let errors = validate(&collection, &self.schema);
        debug!(
            rows = collection.len(),
            min_rows = self.min_rows,
            error_count = errors.len(),
            "form created"
        );
        FormController {
            initial_values: collection.values(),
            schema: self.schema,
            collection,
            touched: TouchedState::new(),
            errors,
            submission: SubmissionCoordinator::new(),
            ids,
            issued,
            default_row,
        }
    }
}

/// Dynamic row form with validation, touched tracking, and gated submit.
pub struct FormController {
    schema: Schema,
    collection: Collection,
    touched: TouchedState,
    errors: ErrorMap,
    initial_values: Vec<RowValues>,
    submission: SubmissionCoordinator,
    ids: Box<dyn IdGenerator>,
    /// Every id handed to a row, live or removed; none is ever reused.
    issued: BTreeSet<RowId>,
    default_row: RowFactory,
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("rows", &self.collection.len())
            .field("touched", &self.touched.len())
            .field("error_count", &self.errors.len())
            .field("phase", &self.submission.phase())
            .finish()
    }
}

impl FormController {
    #[must_use]
    pub fn builder(schema: Schema) -> FormBuilder {
        FormBuilder::new(schema)
    }

    /// Form with one row that can never be removed.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        FormBuilder::new(schema).build()
    }

    // --- read access ---

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    #[must_use]
    pub fn touched(&self) -> &TouchedState {
        &self.touched
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    #[must_use]
    pub fn state(&self) -> FormState<'_> {
        FormState {
            collection: &self.collection,
            touched: &self.touched,
            submitting: self.submission.is_submitting(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether any value differs from the rows the form was created with.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.collection.values() != self.initial_values
    }

    #[must_use]
    pub fn submit_phase(&self) -> SubmitPhase {
        self.submission.phase()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission.is_submitting()
    }

    #[must_use]
    pub fn submit_stats(&self) -> SubmitStats {
        self.submission.stats()
    }

    /// Current path of `field` in row `id`, if both exist.
    #[must_use]
    pub fn path_for(&self, id: RowId, field: &str) -> Option<FieldPath> {
        if !self.schema.contains(field) {
            return None;
        }
        self.collection.index_of(id).map(|row| to_path(row, field))
    }

    #[must_use]
    pub fn value(&self, id: RowId, field: &str) -> Option<&FieldValue> {
        self.collection.row(id).map(|row| row.value(field))
    }

    #[must_use]
    pub fn error(&self, id: RowId, field: &str) -> Option<&FieldError> {
        self.path_for(id, field)
            .and_then(|path| self.errors.get(&path))
    }

    #[must_use]
    pub fn is_touched(&self, id: RowId, field: &str) -> bool {
        self.path_for(id, field)
            .is_some_and(|path| self.touched.is_touched(&path))
    }

    /// The error to display for a field: present only once it is touched.
    #[must_use]
    pub fn visible_error(&self, id: RowId, field: &str) -> Option<&FieldError> {
        let path = self.path_for(id, field)?;
        if !self.touched.is_touched(&path) {
            return None;
        }
        self.errors.get(&path)
    }

    /// Every error that should currently be displayed.
    pub fn visible_errors(&self) -> impl Iterator<Item = (&FieldPath, &FieldError)> {
        self.errors
            .iter()
            .filter(|(path, _)| self.touched.is_touched(path))
    }

    // --- event handlers ---

    /// Append a row with default values. Returns its id.
    pub fn on_add_row(&mut self) -> Option<RowId> {
        let values = (self.default_row)();
        let next = self
            .collection
            .append_fresh(values, self.ids.as_mut(), &self.issued);
        if next.len() == self.collection.len() {
            return None;
        }
        let id = next.rows().last().map(|r| r.id());
        self.issued.extend(id);
        self.collection = next;
        self.revalidate();
        debug!(rows = self.collection.len(), "row added");
        id
    }

    /// Remove row `id`. Returns `false` when the row is unknown or the
    /// collection is at its minimum.
    pub fn on_remove_row(&mut self, id: RowId) -> bool {
        let Some(index) = self.collection.index_of(id) else {
            debug!(row_id = %id, "remove ignored, unknown row");
            return false;
        };
        let next = self.collection.remove_by_id(id);
        if next.len() == self.collection.len() {
            debug!(
                row_id = %id,
                min_rows = self.collection.min_rows(),
                "remove ignored, at minimum row count"
            );
            return false;
        }
        self.collection = next;
        self.touched.remove_row(index);
        self.revalidate();
        debug!(row_id = %id, rows = self.collection.len(), "row removed");
        true
    }

    /// Store `value` in `field` of row `id` and revalidate.
    ///
    /// Fields outside the schema and unknown rows are ignored. Returns
    /// whether the stored value changed.
    pub fn on_field_change(&mut self, id: RowId, field: &str, value: impl Into<FieldValue>) -> bool {
        if !self.schema.contains(field) {
            debug!(row_id = %id, field, "change ignored, field not in schema");
            return false;
        }
        let next = self.collection.update_field(id, field, value.into());
        if next == self.collection {
            return false;
        }
        self.collection = next;
        self.revalidate();
        debug!(
            row_id = %id,
            field,
            error_count = self.errors.len(),
            "field changed"
        );
        true
    }

    /// Mark `field` of row `id` touched. Returns whether it was newly touched.
    pub fn on_field_blur(&mut self, id: RowId, field: &str) -> bool {
        let Some(path) = self.path_for(id, field) else {
            debug!(row_id = %id, field, "blur ignored, unknown row or field");
            return false;
        };
        let newly = self.touched.mark(path);
        if newly {
            trace!(row_id = %id, field, "field touched");
        }
        newly
    }

    // --- submission ---

    /// Ask to submit the current rows.
    ///
    /// With errors present every field becomes touched and the submit is
    /// rejected. Otherwise the caller receives the snapshot and a token, and
    /// must later call [`settle_submit`](Self::settle_submit) with it.
    pub fn request_submit(&mut self) -> SubmitGate {
        if self.submission.is_submitting() {
            self.submission.request(self.errors.len());
            return SubmitGate::Ignored;
        }
        self.revalidate();
        match self.submission.request(self.errors.len()) {
            SubmitDecision::Reject => {
                self.touched.mark_all(&self.collection, &self.schema);
                SubmitGate::Rejected {
                    error_count: self.errors.len(),
                }
            }
            SubmitDecision::Proceed(token) => SubmitGate::Started {
                token,
                rows: self.collection.values(),
            },
            SubmitDecision::Ignore => SubmitGate::Ignored,
        }
    }

    /// Report the outcome of the submit identified by `token`.
    ///
    /// Returns `false` when `token` is not the submit in flight.
    pub fn settle_submit(&mut self, token: SubmitToken, result: Result<(), SubmitError>) -> bool {
        self.submission.settle(token, &result)
    }

    /// Request, deliver to `handler`, and settle in one call.
    pub fn submit_with(&mut self, mut handler: impl SubmitHandler) -> SubmitOutcome {
        match self.request_submit() {
            SubmitGate::Started { token, rows } => {
                let result = handler.submit(rows);
                self.settle_submit(token, result.clone());
                match result {
                    Ok(()) => SubmitOutcome::Submitted,
                    Err(err) => SubmitOutcome::Failed(err),
                }
            }
            SubmitGate::Rejected { error_count } => SubmitOutcome::Rejected { error_count },
            SubmitGate::Ignored => SubmitOutcome::Ignored,
        }
    }

    fn revalidate(&mut self) {
        self.errors = validate(&self.collection, &self.schema);
    }
}
