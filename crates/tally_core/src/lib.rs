//! Core logic for tallying weekly coursework participation.
//!
//! Two engines live here: the schedule resolver, which turns assignment
//! labels such as `w4mon` into deadlines under a term calendar, and the tally
//! engine, which folds labeled submissions into per-student credit. The
//! remaining modules are the boundary around them: ingestion of raw platform
//! events, SQLite caches, class configuration and text rendering.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{minimize, ClassConfig, ClassRegistry, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::event::{EventId, EventValidationError, RawEvent, Reaction, SubmissionEvent};
pub use model::label::{is_label_shaped, Label, ResolverId};
pub use model::term::{DueDay, TermConfig, TermConfigError};
pub use model::user::{UserId, UserRecord, STAFF_ROLE_THRESHOLD};
pub use report::{render_daily_report, render_personal_report, render_roster_csv};
pub use repo::event_repo::SqliteEventRepository;
pub use repo::user_repo::SqliteUserRepository;
pub use repo::{NoUserSource, RepoError, RepoResult, UserLookup, UserSource};
pub use schedule::{
    SchemeConfig, ScheduleError, ScheduleResolver, ScheduleResult, WeeklyGridResolver,
};
pub use service::ingest_service::{
    merge_events, DropReason, IngestError, IngestOutcome, IngestService, Materialized,
};
pub use service::tally_service::{
    aggregate, daily_report, personal_report, roster_report, DailyEntry, PersonalReport,
    RosterRow, SenderTally, TallyError, TallyResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
