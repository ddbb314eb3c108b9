#![forbid(unsafe_code)]

//! Schema-validated dynamic row lists for FrankenTUI forms.
//!
//! # Role in FrankenTUI
//! `ftui-rowform` is the state layer behind editable lists of rows, such as
//! a list of ranges each with a category, a start, and an end. It keeps the
//! rows, checks them against a declarative [`Schema`], tracks which fields
//! the user has touched, and gates submission so that only valid snapshots
//! reach the consumer and only one submit runs at a time.
//!
//! Rendering is left to the caller: [`FormController::state`] and
//! [`FormController::visible_error`] expose everything a widget needs.
//!
//! # Modules
//!
//! | Module       | Contents                                            |
//! |--------------|-----------------------------------------------------|
//! | [`path`]     | `items[<row>].<field>` addressing                   |
//! | [`value`]    | raw field values and numeric coercion               |
//! | [`store`]    | the row collection and row identities               |
//! | [`schema`]   | field rules and schema checks                       |
//! | [`validate`](mod@validate) | whole-collection validation into an error map |
//! | [`touched`]  | touched-field tracking                              |
//! | [`submit`]   | submit gating and settle tokens                     |
//! | [`config`]   | JSON configuration loading                          |
//! | [`controller`] | the event-driven form controller                  |
//!
//! # Example
//!
//! ```
//! use ftui_rowform::{
//!     FieldSchema, FormController, Schema, Snapshot, SubmitError, SubmitOutcome,
//! };
//!
//! let schema = Schema::new(vec![
//!     FieldSchema::text("category").required(),
//!     FieldSchema::numeric("start").required().min(0.0),
//!     FieldSchema::numeric("end").required().more_than("start"),
//! ])
//! .unwrap();
//! let mut form = FormController::new(schema);
//! let row = form.collection().rows()[0].id();
//!
//! form.on_field_change(row, "category", "option1");
//! form.on_field_change(row, "start", 0);
//! form.on_field_change(row, "end", 10);
//! assert!(form.is_valid());
//!
//! let mut delivered = Vec::new();
//! let outcome = form.submit_with(|rows: Snapshot| -> Result<(), SubmitError> {
//!     delivered = rows;
//!     Ok(())
//! });
//! assert_eq!(outcome, SubmitOutcome::Submitted);
//! assert_eq!(delivered.len(), 1);
//! ```

pub mod config;
pub mod controller;
pub mod path;
pub mod schema;
pub mod store;
pub mod submit;
pub mod touched;
pub mod validate;
pub mod value;

pub use config::{ConfigError, ConfigResult, FormConfig};
pub use controller::{FormBuilder, FormController, FormState, RowFactory};
pub use path::{FieldPath, PathParseError, to_path};
pub use schema::{FieldKind, FieldSchema, OptionList, RuleMessages, Schema, SchemaError, SelectOption};
pub use store::{Collection, IdGenerator, Row, RowId, RowValues, SequentialIds};
pub use submit::{
    Snapshot, SubmissionCoordinator, SubmitDecision, SubmitError, SubmitGate, SubmitHandler,
    SubmitOutcome, SubmitPhase, SubmitStats, SubmitToken,
};
pub use touched::TouchedState;
pub use validate::{ErrorMap, FieldError, FieldErrorKind, validate};
pub use value::FieldValue;
