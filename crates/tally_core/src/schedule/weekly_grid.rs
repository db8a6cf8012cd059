//! Weekly-grid labeling scheme (`w<week><day>`).
//!
//! Labels look like `w4mon`: `w`, a decimal week number and a three-letter
//! lowercase weekday. Topics must carry the label inside square brackets;
//! messages may carry it bare. Only the first match is considered.

use super::{ScheduleError, ScheduleResolver, ScheduleResult};
use crate::model::label::{Label, ResolverId, EXACT_LABEL_RE, LABEL_PATTERN};
use crate::model::term::{DueDay, TermConfig, TermConfigError};
use chrono::{DateTime, Duration, FixedOffset};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOPIC_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\[{LABEL_PATTERN}\]")).expect("valid topic label regex")
});
static MESSAGE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(LABEL_PATTERN).expect("valid message label regex"));

/// Resolver for one term calendar.
///
/// Clones share identity, so labels from a clone resolve deadlines against
/// the original and vice versa.
#[derive(Debug, Clone)]
pub struct WeeklyGridResolver {
    term: TermConfig,
    start: DateTime<FixedOffset>,
    id: ResolverId,
}

impl WeeklyGridResolver {
    /// Validates `term` and fixes the `w1mon` deadline.
    pub fn new(term: TermConfig) -> Result<Self, TermConfigError> {
        let start = term.start_instant()?;
        Ok(Self {
            term,
            start,
            id: ResolverId::next(),
        })
    }

    pub fn term(&self) -> &TermConfig {
        &self.term
    }

    /// Deadline of `w1mon` under this term.
    pub fn start_instant(&self) -> DateTime<FixedOffset> {
        self.start
    }

    fn admit(&self, captures: Option<Captures<'_>>) -> Option<Label> {
        let captures = captures?;
        let raw = captures.name("label")?.as_str();
        // Digit runs too long for u32 are necessarily past max_week.
        let week = captures.name("week")?.as_str().parse::<u32>().ok()?;
        let day = DueDay::from_code(captures.name("day")?.as_str())?;

        if !self.term.admits(raw, week, day) {
            return None;
        }
        Some(Label::new(raw, week, day, self.id))
    }
}

impl ScheduleResolver for WeeklyGridResolver {
    fn extract_from_topic(&self, topic: &str) -> Option<Label> {
        self.admit(TOPIC_LABEL_RE.captures(topic))
    }

    fn extract_from_message(&self, message: &str) -> Option<Label> {
        self.admit(MESSAGE_LABEL_RE.captures(message))
    }

    fn resolve(&self, text: &str) -> Option<Label> {
        self.admit(EXACT_LABEL_RE.captures(text))
    }

    fn deadline_of(&self, label: &Label) -> ScheduleResult<DateTime<FixedOffset>> {
        if label.resolver_id() != self.id {
            return Err(ScheduleError::ForeignLabel(label.as_str().to_string()));
        }
        let week = self.term.effective_week(label.week());
        let days = 7 * (week - 1) + i64::from(label.day().index());
        Duration::try_days(days)
            .and_then(|offset| self.start.checked_add_signed(offset))
            .ok_or_else(|| ScheduleError::DeadlineOutOfRange(label.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::WeeklyGridResolver;
    use crate::model::term::{DueDay, TermConfig};
    use crate::schedule::ScheduleResolver;
    use chrono::NaiveDate;

    fn resolver() -> WeeklyGridResolver {
        WeeklyGridResolver::new(TermConfig::new(
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            23,
            10,
            [DueDay::Mon, DueDay::Wed, DueDay::Fri],
        ))
        .unwrap()
    }

    #[test]
    fn topic_requires_brackets() {
        let resolver = resolver();
        assert!(resolver.extract_from_topic("RQ w2wed").is_none());
        assert_eq!(
            resolver.extract_from_topic("RQ [w2wed] ch. 3").unwrap().as_str(),
            "w2wed"
        );
    }

    #[test]
    fn only_first_match_is_considered() {
        let resolver = resolver();
        // w2tue matches the grammar first but tue is not a due day.
        assert!(resolver.extract_from_message("w2tue or w2wed").is_none());
        assert!(resolver.extract_from_topic("[w2tue] [w2wed]").is_none());
    }

    #[test]
    fn oversized_week_number_is_no_match() {
        assert!(resolver()
            .extract_from_message("w99999999999999999999mon")
            .is_none());
    }

    #[test]
    fn non_ascii_digits_do_not_match() {
        assert!(resolver().extract_from_message("w\u{0663}mon").is_none());
    }
}
