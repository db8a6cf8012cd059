//! Candidate-event ingestion at the orchestrator boundary.
//!
//! # Responsibility
//! - Turn raw platform events into resolved `SubmissionEvent`s.
//! - Derive `valid` from privileged invalidation markers and `on_time` from
//!   the label deadline.
//!
//! # Invariants
//! - Only regular members' messages with a well-formed topic label are kept.
//! - Batches merge by event id: a repeated id overwrites in place.

use crate::model::event::{EventId, RawEvent, SubmissionEvent};
use crate::repo::{RepoError, UserLookup};
use crate::schedule::{ScheduleError, ScheduleResolver};
use chrono::DateTime;
use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Display name the platform uses for its own automated posts.
pub const NOTIFICATION_BOT_NAME: &str = "Notification Bot";

#[derive(Debug)]
pub enum IngestError {
    Repo(RepoError),
    Schedule(ScheduleError),
    InvalidTimestamp { event_id: EventId, timestamp: i64 },
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Schedule(err) => write!(f, "{err}"),
            Self::InvalidTimestamp {
                event_id,
                timestamp,
            } => write!(f, "event {event_id} has out-of-range timestamp {timestamp}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Schedule(err) => Some(err),
            Self::InvalidTimestamp { .. } => None,
        }
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ScheduleError> for IngestError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

/// Why a candidate event did not become a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotificationBot,
    StaffSender,
    UnlabeledTopic,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::NotificationBot => "notification_bot",
            Self::StaffSender => "staff_sender",
            Self::UnlabeledTopic => "unlabeled_topic",
        }
    }
}

/// Outcome for a single candidate event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Kept(SubmissionEvent),
    Dropped(DropReason),
}

/// Outcome for a batch of candidate events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Kept submissions, deduplicated by id.
    pub events: Vec<SubmissionEvent>,
    pub dropped: usize,
}

/// Boundary service composing the resolver and the user directory.
pub struct IngestService<'a, L: UserLookup> {
    resolver: &'a dyn ScheduleResolver,
    users: &'a L,
    invalid_marker: String,
}

impl<'a, L: UserLookup> IngestService<'a, L> {
    /// `invalid_marker` is the reaction name staff use to void a submission.
    pub fn new(
        resolver: &'a dyn ScheduleResolver,
        users: &'a L,
        invalid_marker: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            users,
            invalid_marker: invalid_marker.into(),
        }
    }

    /// False iff a privileged user attached the invalidation marker.
    ///
    /// Reactors are looked up only for matching markers.
    pub fn is_valid(&self, raw: &RawEvent) -> Result<bool, IngestError> {
        for reaction in &raw.reactions {
            if reaction.emoji_name != self.invalid_marker {
                continue;
            }
            if self.users.lookup_user(reaction.user_id)?.is_privileged() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolves one candidate event, or explains why it is not a submission.
    pub fn materialize(&self, raw: &RawEvent) -> Result<Materialized, IngestError> {
        if raw.sender_full_name == NOTIFICATION_BOT_NAME {
            return Ok(Materialized::Dropped(DropReason::NotificationBot));
        }

        let sender = self.users.lookup_user(raw.sender_id)?;
        if sender.is_privileged() {
            return Ok(Materialized::Dropped(DropReason::StaffSender));
        }

        let Some(label) = self.resolver.extract_from_topic(&raw.subject) else {
            return Ok(Materialized::Dropped(DropReason::UnlabeledTopic));
        };

        let timestamp =
            DateTime::from_timestamp(raw.timestamp, 0).ok_or(IngestError::InvalidTimestamp {
                event_id: raw.id,
                timestamp: raw.timestamp,
            })?;
        let on_time = self.resolver.is_on_time(&label, timestamp)?;
        let valid = self.is_valid(raw)?;

        Ok(Materialized::Kept(SubmissionEvent {
            id: raw.id,
            sender_id: sender.user_id,
            sender_name: sender.full_name,
            sender_email: sender.delivery_email,
            label: label.as_str().to_string(),
            content: raw.content.clone(),
            timestamp,
            on_time,
            valid,
        }))
    }

    /// Materializes a batch; repeated ids keep the last occurrence.
    pub fn ingest_batch(&self, batch: &[RawEvent]) -> Result<IngestOutcome, IngestError> {
        let mut kept = Vec::new();
        let mut dropped = 0;
        for raw in batch {
            match self.materialize(raw)? {
                Materialized::Kept(event) => kept.push(event),
                Materialized::Dropped(reason) => {
                    dropped += 1;
                    debug!(
                        "event=ingest_drop module=ingest event_id={} reason={}",
                        raw.id,
                        reason.as_str()
                    );
                }
            }
        }

        let events = merge_events(Vec::new(), kept);
        info!(
            "event=ingest module=ingest status=ok candidates={} kept={} dropped={}",
            batch.len(),
            events.len(),
            dropped
        );
        Ok(IngestOutcome { events, dropped })
    }
}

/// Merges `incoming` into `existing` by event id.
///
/// A known id is overwritten at its original position; new ids append in
/// arrival order.
pub fn merge_events(
    existing: Vec<SubmissionEvent>,
    incoming: impl IntoIterator<Item = SubmissionEvent>,
) -> Vec<SubmissionEvent> {
    let mut merged = existing;
    let mut positions: HashMap<EventId, usize> = merged
        .iter()
        .enumerate()
        .map(|(pos, event)| (event.id, pos))
        .collect();

    for event in incoming {
        match positions.get(&event.id) {
            Some(&pos) => merged[pos] = event,
            None => {
                positions.insert(event.id, merged.len());
                merged.push(event);
            }
        }
    }
    merged
}
