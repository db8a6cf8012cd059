//! Term calendar configuration.
//!
//! # Responsibility
//! - Describe one class term: first Monday, cutoff hour, week range and the
//!   weekdays on which assignments are due.
//! - Map week numbers onto calendar weeks, honoring gap weeks.
//!
//! # Invariants
//! - A `TermConfig` obtained through deserialization is already validated.
//! - `gaps` iterate in ascending order; `effective_week` depends on it.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound (exclusive) for `due_time`, in hours past midnight.
pub const MAX_DUE_TIME_HOURS: u32 = 48;
const MAX_UTC_OFFSET_HOURS: i32 = 23;

/// Weekday on which an assignment can be due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl DueDay {
    /// All due days in calendar order.
    pub const ALL: [DueDay; 5] = [
        DueDay::Mon,
        DueDay::Tue,
        DueDay::Wed,
        DueDay::Thu,
        DueDay::Fri,
    ];

    /// Three-letter lowercase code used inside labels.
    pub fn code(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
        }
    }

    /// Parses a label weekday code. Matching is case-sensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "mon" => Some(Self::Mon),
            "tue" => Some(Self::Tue),
            "wed" => Some(Self::Wed),
            "thu" => Some(Self::Thu),
            "fri" => Some(Self::Fri),
            _ => None,
        }
    }

    /// Day index within the week, Monday = 0.
    pub fn index(self) -> u32 {
        match self {
            Self::Mon => 0,
            Self::Tue => 1,
            Self::Wed => 2,
            Self::Thu => 3,
            Self::Fri => 4,
        }
    }
}

impl Display for DueDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Validation failures for term configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermConfigError {
    MaxWeekZero,
    NoDueDays,
    DueTimeOutOfRange(u32),
    UtcOffsetOutOfRange(i32),
    ZeroGap,
}

impl Display for TermConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxWeekZero => write!(f, "max_week must be at least 1"),
            Self::NoDueDays => write!(f, "due_days must name at least one weekday"),
            Self::DueTimeOutOfRange(hours) => write!(
                f,
                "due_time ({hours}) must be below {MAX_DUE_TIME_HOURS} hours"
            ),
            Self::UtcOffsetOutOfRange(hours) => write!(
                f,
                "utc_offset_hours ({hours}) must be within +/-{MAX_UTC_OFFSET_HOURS}"
            ),
            Self::ZeroGap => write!(f, "gaps must reference calendar weeks starting at 1"),
        }
    }
}

impl Error for TermConfigError {}

/// Calendar for one class term.
///
/// `start_date` is the day named by `w1mon`; together with `due_time` it
/// fixes the deadline of that label. Week numbers are mapped to calendar
/// weeks after skipping every week listed in `gaps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TermConfigInput")]
pub struct TermConfig {
    pub start_date: NaiveDate,
    /// Hours past midnight at which a due day closes.
    pub due_time: u32,
    pub max_week: u32,
    pub due_days: BTreeSet<DueDay>,
    /// Full label strings that never resolve.
    pub exceptions: BTreeSet<String>,
    /// Calendar weeks (1-based) with no numbered week.
    pub gaps: BTreeSet<u32>,
    /// Fixed offset of the local term clock.
    pub utc_offset_hours: i32,
}

#[derive(Deserialize)]
struct TermConfigInput {
    #[serde(deserialize_with = "deserialize_start_date")]
    start_date: NaiveDate,
    due_time: u32,
    #[serde(alias = "max_weeks")]
    max_week: u32,
    due_days: BTreeSet<DueDay>,
    #[serde(default)]
    exceptions: BTreeSet<String>,
    #[serde(default)]
    gaps: BTreeSet<u32>,
    #[serde(default)]
    utc_offset_hours: i32,
}

/// Native TOML date or `YYYY-MM-DD` text.
#[derive(Deserialize)]
#[serde(untagged)]
enum StartDateInput {
    Toml(toml::value::Datetime),
    Text(String),
}

fn deserialize_start_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    match StartDateInput::deserialize(deserializer)? {
        StartDateInput::Toml(value) => match (value.date, value.time) {
            (Some(date), None) => NaiveDate::from_ymd_opt(
                i32::from(date.year),
                u32::from(date.month),
                u32::from(date.day),
            )
            .ok_or_else(|| de::Error::custom(format!("start_date `{value}` is not a valid date"))),
            _ => Err(de::Error::custom(format!(
                "start_date `{value}` must be a date without a time of day"
            ))),
        },
        StartDateInput::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|err| de::Error::custom(format!("start_date `{text}` is not YYYY-MM-DD: {err}"))),
    }
}

impl TryFrom<TermConfigInput> for TermConfig {
    type Error = TermConfigError;

    fn try_from(input: TermConfigInput) -> Result<Self, Self::Error> {
        let config = Self {
            start_date: input.start_date,
            due_time: input.due_time,
            max_week: input.max_week,
            due_days: input.due_days,
            exceptions: input.exceptions,
            gaps: input.gaps,
            utc_offset_hours: input.utc_offset_hours,
        };
        config.validate()?;
        Ok(config)
    }
}

impl TermConfig {
    /// Creates a term with no exceptions, no gaps and a UTC clock.
    pub fn new(
        start_date: NaiveDate,
        due_time: u32,
        max_week: u32,
        due_days: impl IntoIterator<Item = DueDay>,
    ) -> Self {
        Self {
            start_date,
            due_time,
            max_week,
            due_days: due_days.into_iter().collect(),
            exceptions: BTreeSet::new(),
            gaps: BTreeSet::new(),
            utc_offset_hours: 0,
        }
    }

    pub fn with_exceptions<I, S>(mut self, exceptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exceptions = exceptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gaps(mut self, gaps: impl IntoIterator<Item = u32>) -> Self {
        self.gaps = gaps.into_iter().collect();
        self
    }

    pub fn with_utc_offset_hours(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// Checks structural invariants of the configuration.
    pub fn validate(&self) -> Result<(), TermConfigError> {
        if self.max_week == 0 {
            return Err(TermConfigError::MaxWeekZero);
        }
        if self.due_days.is_empty() {
            return Err(TermConfigError::NoDueDays);
        }
        if self.due_time >= MAX_DUE_TIME_HOURS {
            return Err(TermConfigError::DueTimeOutOfRange(self.due_time));
        }
        if self.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            return Err(TermConfigError::UtcOffsetOutOfRange(self.utc_offset_hours));
        }
        if self.gaps.contains(&0) {
            return Err(TermConfigError::ZeroGap);
        }
        Ok(())
    }

    /// Deadline instant of `w1mon`.
    pub fn start_instant(&self) -> Result<DateTime<FixedOffset>, TermConfigError> {
        self.validate()?;
        let offset = FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or(TermConfigError::UtcOffsetOutOfRange(self.utc_offset_hours))?;
        let local = self.start_date.and_time(NaiveTime::MIN)
            + Duration::hours(i64::from(self.due_time));
        local
            .and_local_timezone(offset)
            .single()
            .ok_or(TermConfigError::UtcOffsetOutOfRange(self.utc_offset_hours))
    }

    /// Calendar week that hosts numbered week `week`.
    ///
    /// Each gap at or before the running week pushes the week one calendar
    /// week later, so consecutive gaps are skipped together.
    pub fn effective_week(&self, week: u32) -> i64 {
        let mut effective = i64::from(week);
        for gap in &self.gaps {
            if effective >= i64::from(*gap) {
                effective += 1;
            }
        }
        effective
    }

    /// Whether a grammar-matching label survives the exclusion checks.
    pub fn admits(&self, raw: &str, week: u32, day: DueDay) -> bool {
        !self.exceptions.contains(raw) && week <= self.max_week && self.due_days.contains(&day)
    }
}
