//! Postgres repositories for fines and profiles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contesto_core::models::{Fine, FineStatus, NewFine, UserProfile};
use contesto_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::stores::{FineStore, ProfileStore};

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    Ok(())
}

/// Row shape for the `fines` table. Status is stored as text and
/// converted on read.
#[derive(sqlx::FromRow)]
struct FineRow {
    id: Uuid,
    user_id: Uuid,
    file_url: String,
    file_name: String,
    file_size: i64,
    extracted_text: String,
    user_notes: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FineRow> for Fine {
    type Error = AppError;

    fn try_from(row: FineRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<FineStatus>()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(Fine {
            id: row.id,
            user_id: row.user_id,
            file_url: row.file_url,
            file_name: row.file_name,
            file_size: row.file_size,
            extracted_text: row.extracted_text,
            user_notes: row.user_notes,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for managing fines
#[derive(Clone)]
pub struct PgFineRepository {
    pool: PgPool,
}

impl PgFineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FineStore for PgFineRepository {
    #[tracing::instrument(skip(self, new_fine), fields(db.table = "fines", db.operation = "insert"))]
    async fn create_fine(&self, new_fine: NewFine) -> Result<Fine, AppError> {
        let row = sqlx::query_as::<Postgres, FineRow>(
            r#"
            INSERT INTO fines (user_id, file_url, file_name, file_size, user_notes, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, file_url, file_name, file_size, extracted_text,
                      user_notes, status, created_at, updated_at
            "#,
        )
        .bind(new_fine.user_id)
        .bind(&new_fine.file_url)
        .bind(&new_fine.file_name)
        .bind(new_fine.file_size)
        .bind(&new_fine.user_notes)
        .bind(FineStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self), fields(db.table = "fines", db.operation = "select", db.record_id = %fine_id))]
    async fn get_fine_for_user(
        &self,
        user_id: Uuid,
        fine_id: Uuid,
    ) -> Result<Option<Fine>, AppError> {
        let row = sqlx::query_as::<Postgres, FineRow>(
            r#"
            SELECT id, user_id, file_url, file_name, file_size, extracted_text,
                   user_notes, status, created_at, updated_at
            FROM fines
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(fine_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Fine::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "fines", db.operation = "update", db.record_id = %fine_id))]
    async fn update_fine_status(&self, fine_id: Uuid, status: FineStatus) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE fines SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(fine_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Fine not found: {}", fine_id)));
        }
        Ok(())
    }
}

/// Repository for managing user profiles
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    first_name: Option<String>,
    last_name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
}

#[async_trait]
impl ProfileStore for PgProfileRepository {
    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "select", db.record_id = %user_id))]
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<Postgres, ProfileRow>(
            "SELECT first_name, last_name, address, phone FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserProfile {
            first_name: r.first_name,
            last_name: r.last_name,
            address: r.address,
            phone: r.phone,
        }))
    }

    #[tracing::instrument(skip(self, profile), fields(db.table = "profiles", db.operation = "upsert", db.record_id = %user_id))]
    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, first_name, last_name, address, phone)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.address)
        .bind(&profile.phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
