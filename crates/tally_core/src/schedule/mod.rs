//! Label-to-deadline resolution.
//!
//! # Responsibility
//! - Define the resolver contract: find labels in topics and messages, and
//!   compute label deadlines.
//! - Select a resolver implementation from explicit configuration data.
//!
//! # Invariants
//! - Resolvers are pure: no I/O, no logging, no interior mutation.
//! - A label that matches the grammar but fails term rules is reported as
//!   "no match", exactly like text without any label.

mod weekly_grid;

pub use weekly_grid::WeeklyGridResolver;

use crate::model::label::Label;
use crate::model::term::{TermConfig, TermConfigError};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Failures detected while using resolved labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The label was produced by a resolver with another term calendar.
    ForeignLabel(String),
    /// The deadline falls outside the representable calendar range.
    DeadlineOutOfRange(String),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignLabel(label) => {
                write!(f, "label `{label}` was resolved under a different term calendar")
            }
            Self::DeadlineOutOfRange(label) => {
                write!(f, "deadline of label `{label}` is out of calendar range")
            }
        }
    }
}

impl Error for ScheduleError {}

/// Labeling scheme capability set.
pub trait ScheduleResolver: Send + Sync {
    /// First `[label]` in a topic line, if it is well-formed.
    fn extract_from_topic(&self, topic: &str) -> Option<Label>;

    /// First bare label anywhere in a message, if it is well-formed.
    fn extract_from_message(&self, message: &str) -> Option<Label>;

    /// Resolves text that consists of exactly one label.
    fn resolve(&self, text: &str) -> Option<Label>;

    /// Due instant of a label produced by this resolver.
    fn deadline_of(&self, label: &Label) -> ScheduleResult<DateTime<FixedOffset>>;

    /// Whether `sent_at` meets the label deadline; the deadline itself counts.
    fn is_on_time(&self, label: &Label, sent_at: DateTime<Utc>) -> ScheduleResult<bool> {
        let deadline = self.deadline_of(label)?;
        Ok(sent_at <= deadline.with_timezone(&Utc))
    }
}

/// Configuration-driven selection of a labeling scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SchemeConfig {
    /// `w<week><day>` labels on a weekly grid.
    WeeklyGrid(TermConfig),
}

impl SchemeConfig {
    /// Builds the configured resolver.
    pub fn build(&self) -> Result<Box<dyn ScheduleResolver>, TermConfigError> {
        match self {
            Self::WeeklyGrid(term) => Ok(Box::new(WeeklyGridResolver::new(term.clone())?)),
        }
    }

    /// Validates scheme parameters without building a resolver.
    pub fn validate(&self) -> Result<(), TermConfigError> {
        match self {
            Self::WeeklyGrid(term) => term.validate(),
        }
    }
}
