//! Database row types. SQLite stores ids and timestamps as text, Postgres natively.

use sqlx::FromRow;

use inspector_types::{DomainError, RepoError, User, UserId, UserStatus};

#[cfg(feature = "postgres")]
use chrono::{DateTime, Utc};
#[cfg(feature = "postgres")]
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str =
    "id, email, name, password_hash, status, is_admin, can_add_numbers, created_at";

/// Maps driver errors, turning a duplicate email into a conflict.
pub(crate) fn db_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict("User with this email already exists.".into())
        }
        _ => RepoError::Database(err.to_string()),
    }
}

fn parse_status(raw: &str) -> Result<UserStatus, RepoError> {
    raw.parse::<UserStatus>().map_err(RepoError::Domain)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct SqliteUserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub status: String,
    pub is_admin: bool,
    pub can_add_numbers: bool,
    pub created_at: String,
}

#[cfg(feature = "sqlite")]
impl SqliteUserRow {
    pub fn into_domain(self) -> Result<User, RepoError> {
        let id = self
            .id
            .parse::<UserId>()
            .map_err(|e| RepoError::Database(format!("Invalid user id: {}", e)))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| RepoError::Database(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(User {
            id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            status: parse_status(&self.status)?,
            is_admin: self.is_admin,
            can_add_numbers: self.can_add_numbers,
            created_at,
        })
    }
}

#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct SqliteSettingRow {
    pub key: String,
    pub value: String,
}

#[cfg(feature = "sqlite")]
impl SqliteSettingRow {
    /// A value that is not valid JSON is kept as a plain string.
    pub fn into_entry(self) -> (String, serde_json::Value) {
        let value = serde_json::from_str(&self.value)
            .unwrap_or(serde_json::Value::String(self.value));
        (self.key, value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Postgres rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgUserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub status: String,
    pub is_admin: bool,
    pub can_add_numbers: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "postgres")]
impl PgUserRow {
    pub fn into_domain(self) -> Result<User, RepoError> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            status: parse_status(&self.status)?,
            is_admin: self.is_admin,
            can_add_numbers: self.can_add_numbers,
            created_at: self.created_at,
        })
    }
}

#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgSettingRow {
    pub key: String,
    pub value: serde_json::Value,
}

/// Rejects keys outside the settings table's known set.
pub(crate) fn check_setting_keys(entries: &[(String, serde_json::Value)]) -> Result<(), RepoError> {
    match entries
        .iter()
        .find(|(key, _)| inspector_types::SettingKey::parse(key).is_none())
    {
        Some((key, _)) => Err(RepoError::Domain(DomainError::ValidationError(format!(
            "Unknown setting: {}",
            key
        )))),
        None => Ok(()),
    }
}
