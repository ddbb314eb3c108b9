#![forbid(unsafe_code)]

//! Submission gating.
//!
//! A [`SubmissionCoordinator`] guards the handoff of a validated snapshot to
//! the consumer. It admits one submit at a time and identifies each one by a
//! [`SubmitToken`]; only the token in flight can settle it.
//!
//! ```text
//!            request, errors > 0
//!          +-------------------+
//!          v                   |
//!       +------+  request, ok  +------------+
//!  ---> | Idle | ------------> | Submitting |
//!       +------+ <------------ +------------+
//!                settle(token)     |    ^
//!                                  +----+
//!                            request: ignored
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::store::RowValues;

/// The rows handed to a submit handler, in collection order.
pub type Snapshot = Vec<RowValues>;

/// Whether a submit is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
    /// No submit in flight; requests are evaluated.
    #[default]
    Idle,
    /// A submit awaits its settle; requests are ignored.
    Submitting,
}

impl fmt::Display for SubmitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Submitting => write!(f, "submitting"),
        }
    }
}

/// Identifies one admitted submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmitToken(u64);

impl SubmitToken {
    /// Wrap a raw token value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Submit({})", self.0)
    }
}

/// Failure reported by a submit handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitError {
    message: String,
}

impl SubmitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Handler-supplied description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submit failed: {}", self.message)
    }
}

impl std::error::Error for SubmitError {}

/// Consumer of validated snapshots.
pub trait SubmitHandler {
    /// Deliver `rows`; an error leaves the form data intact for resubmission.
    fn submit(&mut self, rows: Snapshot) -> Result<(), SubmitError>;
}

impl<F: FnMut(Snapshot) -> Result<(), SubmitError>> SubmitHandler for F {
    fn submit(&mut self, rows: Snapshot) -> Result<(), SubmitError> {
        self(rows)
    }
}

/// Result of asking the form to start a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitGate {
    /// Admitted. Deliver `rows`, then settle with `token`.
    Started { token: SubmitToken, rows: Snapshot },
    /// Blocked by validation errors; every field is now touched.
    Rejected { error_count: usize },
    /// A submit is already in flight.
    Ignored,
}

/// Result of a synchronous submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The handler ran and succeeded.
    Submitted,
    /// The handler ran and reported an error.
    Failed(SubmitError),
    /// Validation errors blocked the submit.
    Rejected { error_count: usize },
    /// A submit was already in flight.
    Ignored,
}

/// Coordinator decision for a submit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Start the submit identified by the token.
    Proceed(SubmitToken),
    /// Errors are present.
    Reject,
    /// A submit is in flight.
    Ignore,
}

/// Counters over the coordinator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitStats {
    /// Every submit request, whatever its outcome.
    pub attempts: u64,
    /// Requests blocked by validation errors.
    pub rejected: u64,
    /// Requests dropped because a submit was in flight.
    pub ignored: u64,
    /// Submits settled successfully.
    pub succeeded: u64,
    /// Submits settled with an error.
    pub failed: u64,
}

/// Admits one submit at a time and settles it by token.
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    next_token: u64,
    in_flight: Option<SubmitToken>,
    stats: SubmitStats,
}

impl Default for SubmissionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: 1,
            in_flight: None,
            stats: SubmitStats::default(),
        }
    }

    /// Current phase, derived from the token in flight.
    #[must_use]
    pub fn phase(&self) -> SubmitPhase {
        if self.in_flight.is_some() {
            SubmitPhase::Submitting
        } else {
            SubmitPhase::Idle
        }
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Token of the submit awaiting its settle.
    #[must_use]
    pub fn in_flight(&self) -> Option<SubmitToken> {
        self.in_flight
    }

    #[must_use]
    pub fn stats(&self) -> SubmitStats {
        self.stats
    }

    /// Decide a submit request given the current error count.
    pub fn request(&mut self, error_count: usize) -> SubmitDecision {
        self.stats.attempts += 1;
        if let Some(token) = self.in_flight {
            self.stats.ignored += 1;
            debug!(in_flight = %token, "submit ignored, already submitting");
            return SubmitDecision::Ignore;
        }
        if error_count > 0 {
            self.stats.rejected += 1;
            debug!(error_count, "submit rejected");
            return SubmitDecision::Reject;
        }
        let token = SubmitToken(self.next_token);
        self.next_token = self.next_token.saturating_add(1);
        self.in_flight = Some(token);
        info!(token = %token, "submit started");
        SubmitDecision::Proceed(token)
    }

    /// Finish the submit identified by `token`.
    ///
    /// Returns `false` and changes nothing when `token` is not in flight.
    pub fn settle(&mut self, token: SubmitToken, result: &Result<(), SubmitError>) -> bool {
        if self.in_flight != Some(token) {
            warn!(token = %token, "settle for a submit that is not in flight, ignoring");
            return false;
        }
        self.in_flight = None;
        match result {
            Ok(()) => {
                self.stats.succeeded += 1;
                info!(token = %token, "submit succeeded");
            }
            Err(err) => {
                self.stats.failed += 1;
                info!(token = %token, error = %err, "submit failed");
            }
        }
        true
    }
}
