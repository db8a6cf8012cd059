//! Organization user records.

use serde::{Deserialize, Serialize};

/// Platform user identifier.
pub type UserId = i64;

/// Highest role value that still counts as staff. Larger values are members.
pub const STAFF_ROLE_THRESHOLD: u32 = 300;

/// User data the tally needs from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Platform role level; see `STAFF_ROLE_THRESHOLD`.
    pub role: u32,
    pub delivery_email: String,
    pub full_name: String,
}

impl UserRecord {
    /// Regular member (student).
    pub fn is_member(&self) -> bool {
        self.role > STAFF_ROLE_THRESHOLD
    }

    /// Moderator, administrator or owner.
    pub fn is_privileged(&self) -> bool {
        !self.is_member()
    }
}
