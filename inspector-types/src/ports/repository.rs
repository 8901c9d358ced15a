//! Repository port trait.
//!
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait for the
//! two stores the dashboard needs: user accounts and the settings table.

use serde_json::Value;

use crate::domain::{User, UserId, UserStatus};
use crate::error::RepoError;

/// Storage for users and settings.
///
/// Emails are stored lowercased; implementations must reject a second user
/// with the same email with [`RepoError::Conflict`].
#[async_trait::async_trait]
pub trait DashboardRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a fully built user.
    async fn create_user(&self, user: User) -> Result<User, RepoError>;

    /// Gets a user by ID.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    /// Finds a user by (lowercased) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Lists all users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;

    /// Sets the status; returns `None` when the user does not exist.
    async fn update_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<Option<User>, RepoError>;

    /// Grants or revokes the permission to append to the number list.
    async fn update_user_number_permission(
        &self,
        id: UserId,
        can_add_numbers: bool,
    ) -> Result<Option<User>, RepoError>;

    /// Updates name and email; returns `None` when the user does not exist.
    async fn update_user_profile(
        &self,
        id: UserId,
        name: &str,
        email: &str,
    ) -> Result<Option<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings (key -> JSON value)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Reads one setting.
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, RepoError>;

    /// Reads every stored setting.
    async fn list_settings(&self) -> Result<Vec<(String, Value)>, RepoError>;

    /// Upserts the given settings. MUST be atomic: either all rows are written or none.
    async fn put_settings(&self, entries: Vec<(String, Value)>) -> Result<(), RepoError>;
}
