//! Key-value caches for users and submissions.
//!
//! # Responsibility
//! - Define the user lookup contracts the tally and ingest layers depend on.
//! - Keep SQLite details away from resolver and tally logic.
//!
//! # Invariants
//! - Submission writes call `SubmissionEvent::validate()` before SQL.
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod event_repo;
pub mod user_repo;

use crate::db::DbError;
use crate::model::event::EventValidationError;
use crate::model::user::{UserId, UserRecord};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Cache and collaborator failures.
#[derive(Debug)]
pub enum RepoError {
    Validation(EventValidationError),
    Db(DbError),
    UserNotFound(UserId),
    /// The external user supplier failed.
    Source { user_id: UserId, message: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UserNotFound(user_id) => write!(f, "user not found: {user_id}"),
            Self::Source { user_id, message } => {
                write!(f, "user source failed for {user_id}: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid cached data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::UserNotFound(_) | Self::Source { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// User records keyed by sender id, as seen by the core.
pub trait UserLookup {
    fn lookup_user(&self, user_id: UserId) -> RepoResult<UserRecord>;
}

/// External supplier of user records (the chat platform client).
pub trait UserSource {
    fn fetch_user(&self, user_id: UserId) -> RepoResult<UserRecord>;
}

impl UserLookup for BTreeMap<UserId, UserRecord> {
    fn lookup_user(&self, user_id: UserId) -> RepoResult<UserRecord> {
        self.get(&user_id)
            .cloned()
            .ok_or(RepoError::UserNotFound(user_id))
    }
}

impl UserSource for BTreeMap<UserId, UserRecord> {
    fn fetch_user(&self, user_id: UserId) -> RepoResult<UserRecord> {
        self.lookup_user(user_id)
    }
}

/// Source for cache-only lookups: every miss is `UserNotFound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUserSource;

impl UserSource for NoUserSource {
    fn fetch_user(&self, user_id: UserId) -> RepoResult<UserRecord> {
        Err(RepoError::UserNotFound(user_id))
    }
}
