//! PostgreSQL repository adapter.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use inspector_types::{DashboardRepository, RepoError, User, UserId, UserStatus};

use crate::types::{PgSettingRow, PgUserRow, USER_COLUMNS, check_setting_keys, db_error};

const SCHEMA: &str = include_str!("../migrations/postgres.sql");

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

pub struct PostgresRepo {
    pool: PgPool,
}

impl PostgresRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<PgUserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id.into_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(PgUserRow::into_domain).transpose()
    }

    /// Runs an UPDATE and returns the refreshed row, or `None` for an unknown id.
    async fn update_returning(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        id: UserId,
    ) -> Result<Option<User>, RepoError> {
        let result = query.execute(&self.pool).await.map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_user(id).await
    }
}

#[async_trait]
impl DashboardRepository for PostgresRepo {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, name, password_hash, status, is_admin, can_add_numbers, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(user.id.into_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.is_admin)
        .bind(user.can_add_numbers)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        self.fetch_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<PgUserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(PgUserRow::into_domain).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let rows: Vec<PgUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(PgUserRow::into_domain).collect()
    }

    async fn update_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<Option<User>, RepoError> {
        let query = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.into_uuid());
        self.update_returning(query, id).await
    }

    async fn update_user_number_permission(
        &self,
        id: UserId,
        can_add_numbers: bool,
    ) -> Result<Option<User>, RepoError> {
        let query = sqlx::query("UPDATE users SET can_add_numbers = $1 WHERE id = $2")
            .bind(can_add_numbers)
            .bind(id.into_uuid());
        self.update_returning(query, id).await
    }

    async fn update_user_profile(
        &self,
        id: UserId,
        name: &str,
        email: &str,
    ) -> Result<Option<User>, RepoError> {
        let query = sqlx::query("UPDATE users SET name = $1, email = $2 WHERE id = $3")
            .bind(name.to_string())
            .bind(email.to_string())
            .bind(id.into_uuid());
        self.update_returning(query, id).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>, RepoError> {
        let row: Option<PgSettingRow> =
            sqlx::query_as("SELECT key, value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(|r| r.value))
    }

    async fn list_settings(&self) -> Result<Vec<(String, Value)>, RepoError> {
        let rows: Vec<PgSettingRow> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn put_settings(&self, entries: Vec<(String, Value)>) -> Result<(), RepoError> {
        check_setting_keys(&entries)?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for (key, value) in &entries {
            sqlx::query(
                r#"INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW())
                   ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()"#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(count = entries.len(), "Settings saved");
        Ok(())
    }
}
