//! Candidate and submission events.
//!
//! # Responsibility
//! - Describe raw candidate events as supplied by the chat platform.
//! - Define the resolved `SubmissionEvent` consumed by the tally.
//!
//! # Invariants
//! - `SubmissionEvent::label` is a single label in grammar; anything else is
//!   a contract violation and is rejected by `validate()`.
//! - Submission events are never mutated after creation; a later ingestion
//!   with the same `id` replaces the whole record.

use crate::model::label::is_label_shaped;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Platform message identifier.
pub type EventId = i64;

/// One reaction (emoji or marker) attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji_name: String,
    pub user_id: UserId,
}

/// Candidate event as delivered by the event supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: EventId,
    pub sender_id: UserId,
    /// Display name reported by the platform at send time.
    #[serde(default)]
    pub sender_full_name: String,
    /// Topic line of the message.
    pub subject: String,
    pub content: String,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// Submission validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    MissingLabel,
    MalformedLabel(String),
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLabel => write!(f, "submission has no resolved label"),
            Self::MalformedLabel(label) => write!(f, "submission label `{label}` is malformed"),
        }
    }
}

impl Error for EventValidationError {}

/// A labeled submission with its credit flags already derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub id: EventId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_email: String,
    /// Resolved label text, e.g. `w2wed`.
    pub label: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Sent at or before the label deadline.
    pub on_time: bool,
    /// Not invalidated by a privileged reaction.
    pub valid: bool,
}

impl SubmissionEvent {
    /// Validates the boundary contract of a submission.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.label.is_empty() {
            return Err(EventValidationError::MissingLabel);
        }
        if !is_label_shaped(&self.label) {
            return Err(EventValidationError::MalformedLabel(self.label.clone()));
        }
        Ok(())
    }

    /// Whether this single event qualifies for credit.
    pub fn earns_credit(&self) -> bool {
        self.on_time && self.valid
    }
}
