//! User Repository
//!
//! Reads user records from `public.usuarios` and maintains their
//! last-access timestamp.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{DirectoryError, UserDirectory, UserRecord};

// ================================================================================================
// Repository
// ================================================================================================

/// User Repository
pub struct UserRepository;

impl UserRepository {
    /// Look up a user by exact username.
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT
                id::bigint AS id,
                username,
                rol AS role,
                documento_vinculado AS owning_document,
                activo AS active,
                password_hash
            FROM public.usuarios
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Set `ultimo_acceso` to now. Returns whether a row was updated.
    pub async fn touch_last_access(pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE public.usuarios SET ultimo_acceso = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ================================================================================================
// Directory
// ================================================================================================

/// [`UserDirectory`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(UserRepository::find_by_username(&self.pool, username).await?)
    }

    async fn record_access(&self, user_id: i64) -> Result<(), DirectoryError> {
        if !UserRepository::touch_last_access(&self.pool, user_id).await? {
            tracing::debug!(user_id, "No user row updated for last access");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
