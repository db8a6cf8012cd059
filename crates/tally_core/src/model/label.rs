//! Assignment label value.
//!
//! # Invariants
//! - Labels are created by resolvers only; fields are private and immutable.
//! - Every label remembers which resolver produced it, so a deadline is never
//!   computed against a foreign term calendar.

use crate::model::term::DueDay;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Label grammar with named groups `label`, `week` and `day`.
pub(crate) const LABEL_PATTERN: &str =
    r"(?P<label>w(?P<week>[0-9]+)(?P<day>mon|tue|wed|thu|fri))";

pub(crate) static EXACT_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{LABEL_PATTERN}$")).expect("valid exact label regex"));

static NEXT_RESOLVER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one resolver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolverId(u64);

impl ResolverId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RESOLVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A resolved assignment label such as `w4mon`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    raw: String,
    week: u32,
    day: DueDay,
    resolver: ResolverId,
}

impl Label {
    pub(crate) fn new(raw: impl Into<String>, week: u32, day: DueDay, resolver: ResolverId) -> Self {
        Self {
            raw: raw.into(),
            week,
            day,
            resolver,
        }
    }

    /// Label text exactly as it appeared in the source.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn day(&self) -> DueDay {
        self.day
    }

    /// Resolver that produced this label.
    pub fn resolver_id(&self) -> ResolverId {
        self.resolver
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Whether `value` is exactly one label in grammar, ignoring term rules.
pub fn is_label_shaped(value: &str) -> bool {
    EXACT_LABEL_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{is_label_shaped, ResolverId};

    #[test]
    fn label_shape_is_strict() {
        assert!(is_label_shaped("w12fri"));
        assert!(!is_label_shaped("w12Fri"));
        assert!(!is_label_shaped("[w12fri]"));
        assert!(!is_label_shaped("w12"));
        assert!(!is_label_shaped(""));
    }

    #[test]
    fn resolver_ids_are_unique() {
        assert_ne!(ResolverId::next(), ResolverId::next());
    }
}
