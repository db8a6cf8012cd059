//! Read-through user cache backed by SQLite.
//!
//! # Responsibility
//! - Serve user records from the local cache when present.
//! - On a miss, fetch from the `UserSource`, store the record, return it.
//!
//! # Invariants
//! - A record fetched once is never fetched again for the same id unless it
//!   is replaced through `store_user`.

use super::{RepoError, RepoResult, UserLookup, UserSource};
use crate::model::user::{UserId, UserRecord};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT user_id, role, delivery_email, full_name FROM users";

/// SQLite user cache with a fallback supplier.
pub struct SqliteUserRepository<'conn, S: UserSource> {
    conn: &'conn Connection,
    source: S,
}

impl<'conn, S: UserSource> SqliteUserRepository<'conn, S> {
    pub fn new(conn: &'conn Connection, source: S) -> Self {
        Self { conn, source }
    }

    /// Returns the cached record without consulting the source.
    pub fn cached_user(&self, user_id: UserId) -> RepoResult<Option<UserRecord>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE user_id = ?1;"),
                params![user_id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Inserts or replaces one cached record.
    pub fn store_user(&self, user: &UserRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (user_id, role, delivery_email, full_name)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                delivery_email = excluded.delivery_email,
                full_name = excluded.full_name;",
            params![
                user.user_id,
                user.role,
                user.delivery_email.as_str(),
                user.full_name.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All cached users ordered by name, then id.
    pub fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY full_name ASC, user_id ASC;"))?;
        let users = stmt
            .query_map([], parse_user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Cached regular members whose name contains `fragment`, ignoring case.
    ///
    /// An empty or blank fragment matches nobody.
    pub fn find_members_by_name(&self, fragment: &str) -> RepoResult<Vec<UserRecord>> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .list_users()?
            .into_iter()
            .filter(UserRecord::is_member)
            .filter(|user| user.full_name.to_lowercase().contains(&needle))
            .collect())
    }
}

impl<S: UserSource> UserLookup for SqliteUserRepository<'_, S> {
    fn lookup_user(&self, user_id: UserId) -> RepoResult<UserRecord> {
        if let Some(user) = self.cached_user(user_id)? {
            return Ok(user);
        }

        debug!("event=user_cache_miss module=repo user_id={user_id}");
        let user = self.source.fetch_user(user_id).map_err(|err| {
            warn!("event=user_fetch module=repo status=error user_id={user_id} error={err}");
            err
        })?;
        if user.user_id != user_id {
            return Err(RepoError::InvalidData(format!(
                "source returned user {} for requested id {user_id}",
                user.user_id
            )));
        }
        self.store_user(&user)?;
        Ok(user)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user_id: row.get("user_id")?,
        role: row.get("role")?,
        delivery_email: row.get("delivery_email")?,
        full_name: row.get("full_name")?,
    })
}
