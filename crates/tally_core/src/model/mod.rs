//! Domain model for term calendars, labels, users and submissions.
//!
//! # Responsibility
//! - Define canonical data structures shared by the resolver and the tally.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - A `Label` can only be produced by a resolver, never by callers.
//! - A `SubmissionEvent` always carries a label string in label grammar.

pub mod event;
pub mod label;
pub mod term;
pub mod user;
