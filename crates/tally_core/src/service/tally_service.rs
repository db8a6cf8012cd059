//! Credit aggregation over resolved submissions.
//!
//! # Responsibility
//! - Reduce submissions to per-sender credit / no-credit label sets.
//! - Project the reduction into personal, roster and daily reports.
//!
//! # Invariants
//! - A (sender, label) pair earns credit iff any of its submissions is both
//!   on time and valid; the reduction is a logical OR and order-independent.
//! - Every call recomputes from its input; no state survives between calls.
//! - Senders and labels keep first-seen order.

use crate::model::event::{EventId, EventValidationError, SubmissionEvent};
use crate::model::user::UserId;
use crate::repo::{RepoResult, UserLookup};
use log::debug;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Aggregation precondition failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    InvalidEvent {
        event_id: EventId,
        source: EventValidationError,
    },
}

impl Display for TallyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEvent { event_id, source } => {
                write!(f, "event {event_id} rejected before aggregation: {source}")
            }
        }
    }
}

impl Error for TallyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEvent { source, .. } => Some(source),
        }
    }
}

/// Credit split for one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderTally {
    pub sender_id: UserId,
    /// Labels with at least one on-time, valid submission.
    pub credit: Vec<String>,
    /// Labels whose submissions were all late or invalid.
    pub no_credit: Vec<String>,
}

/// Result of one aggregation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyResult {
    senders: Vec<SenderTally>,
    index: HashMap<UserId, usize>,
}

impl TallyResult {
    pub fn get(&self, sender_id: UserId) -> Option<&SenderTally> {
        self.index.get(&sender_id).map(|&pos| &self.senders[pos])
    }

    /// Number of credited labels; zero for unseen senders.
    pub fn credit_count(&self, sender_id: UserId) -> usize {
        self.get(sender_id).map_or(0, |tally| tally.credit.len())
    }

    /// Senders in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SenderTally> {
        self.senders.iter()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

/// One sender's labels, split by credit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalReport {
    pub credit_labels: Vec<String>,
    pub no_credit_labels: Vec<String>,
}

impl PersonalReport {
    pub fn credit_count(&self) -> usize {
        self.credit_labels.len()
    }
}

/// One roster line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub sender_id: UserId,
    pub name: String,
    pub email: String,
    pub credit_count: usize,
}

/// One submission listed for manual review of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyEntry {
    pub event_id: EventId,
    pub sender_name: String,
    pub content: String,
}

/// Folds submissions into per-sender credit decisions.
///
/// Every event is validated first; one malformed event rejects the call.
pub fn aggregate(events: &[SubmissionEvent]) -> Result<TallyResult, TallyError> {
    for event in events {
        event
            .validate()
            .map_err(|source| TallyError::InvalidEvent {
                event_id: event.id,
                source,
            })?;
    }

    let mut order: Vec<UserId> = Vec::new();
    let mut pairs: HashMap<UserId, Vec<(&str, bool)>> = HashMap::new();
    for event in events {
        let labels = pairs.entry(event.sender_id).or_insert_with(|| {
            order.push(event.sender_id);
            Vec::new()
        });
        let earned = event.earns_credit();
        match labels.iter_mut().find(|(label, _)| *label == event.label) {
            Some((_, credited)) => *credited |= earned,
            None => labels.push((event.label.as_str(), earned)),
        }
    }

    let mut result = TallyResult::default();
    for sender_id in order {
        let labels = pairs.remove(&sender_id).unwrap_or_default();
        let (credit, no_credit): (Vec<_>, Vec<_>) =
            labels.into_iter().partition(|(_, credited)| *credited);
        result.index.insert(sender_id, result.senders.len());
        result.senders.push(SenderTally {
            sender_id,
            credit: credit.into_iter().map(|(label, _)| label.to_string()).collect(),
            no_credit: no_credit
                .into_iter()
                .map(|(label, _)| label.to_string())
                .collect(),
        });
    }

    debug!(
        "event=tally_aggregate module=tally status=ok events={} senders={}",
        events.len(),
        result.len()
    );
    Ok(result)
}

/// Credit split for one sender; empty when the sender never submitted.
pub fn personal_report(result: &TallyResult, sender_id: UserId) -> PersonalReport {
    result
        .get(sender_id)
        .map(|tally| PersonalReport {
            credit_labels: tally.credit.clone(),
            no_credit_labels: tally.no_credit.clone(),
        })
        .unwrap_or_default()
}

/// One row per sender present in `result`, in first-seen order.
pub fn roster_report<L: UserLookup>(result: &TallyResult, users: &L) -> RepoResult<Vec<RosterRow>> {
    result
        .iter()
        .map(|tally| -> RepoResult<RosterRow> {
            let user = users.lookup_user(tally.sender_id)?;
            Ok(RosterRow {
                sender_id: tally.sender_id,
                name: user.full_name,
                email: user.delivery_email,
                credit_count: tally.credit.len(),
            })
        })
        .collect()
}

/// All submissions for `label` in input order, whatever their credit.
pub fn daily_report(events: &[SubmissionEvent], label: &str) -> Vec<DailyEntry> {
    events
        .iter()
        .filter(|event| event.label == label)
        .map(|event| DailyEntry {
            event_id: event.id,
            sender_name: event.sender_name.clone(),
            content: event.content.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{aggregate, TallyError};
    use crate::model::event::{EventValidationError, SubmissionEvent};
    use chrono::{TimeZone, Utc};

    fn event(id: i64, sender_id: i64, label: &str, earned: bool) -> SubmissionEvent {
        SubmissionEvent {
            id,
            sender_id,
            sender_name: format!("Student {sender_id}"),
            sender_email: format!("s{sender_id}@example.edu"),
            label: label.to_string(),
            content: "answer".to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 1, 4, 12, 0, 0).unwrap(),
            on_time: earned,
            valid: true,
        }
    }

    #[test]
    fn senders_and_labels_keep_first_seen_order() {
        let result = aggregate(&[
            event(1, 9, "w1fri", true),
            event(2, 3, "w1mon", false),
            event(3, 9, "w1mon", true),
        ])
        .unwrap();

        let senders: Vec<i64> = result.iter().map(|tally| tally.sender_id).collect();
        assert_eq!(senders, vec![9, 3]);
        assert_eq!(result.get(9).unwrap().credit, vec!["w1fri", "w1mon"]);
    }

    #[test]
    fn unlabeled_event_rejects_whole_batch() {
        let mut bad = event(2, 3, "w1mon", true);
        bad.label.clear();
        let err = aggregate(&[event(1, 3, "w1mon", true), bad]).unwrap_err();
        assert_eq!(
            err,
            TallyError::InvalidEvent {
                event_id: 2,
                source: EventValidationError::MissingLabel,
            }
        );
    }
}
