//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for a User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Whether a user may use the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "blocked" => Ok(UserStatus::Blocked),
            other => Err(DomainError::ValidationError(format!(
                "Unknown user status: {}",
                other
            ))),
        }
    }
}

/// A dashboard account as stored by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    pub status: UserStatus,
    pub is_admin: bool,
    /// May append numbers to the shared number list
    pub can_add_numbers: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active, non-admin user.
    ///
    /// # Validation
    /// - Name cannot be empty
    /// - Email must look like an address
    pub fn new(name: String, email: String, password_hash: String) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "User name cannot be empty".into(),
            ));
        }
        let email = normalize_email(&email);
        if !email.contains('@') {
            return Err(DomainError::ValidationError(format!(
                "Invalid email address: {}",
                email
            )));
        }

        Ok(Self {
            id: UserId::new(),
            email,
            name: name.trim().to_string(),
            password_hash,
            status: UserStatus::Active,
            is_admin: false,
            can_add_numbers: false,
            created_at: Utc::now(),
        })
    }

    /// Marks the user as an administrator.
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        if is_admin {
            self.can_add_numbers = true;
        }
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }

    /// Admins can always edit the number list.
    pub fn may_add_numbers(&self) -> bool {
        self.is_admin || self.can_add_numbers
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of a user (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "Alice")]
    pub name: String,
    pub status: UserStatus,
    pub is_admin: bool,
    pub can_add_numbers: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            status: user.status,
            is_admin: user.is_admin,
            can_add_numbers: user.can_add_numbers,
        }
    }
}
