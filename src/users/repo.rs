use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User, VerificationRefresh};

const USER_COLUMNS: &str = "id, username, email, password_hash, verify_code, verify_code_expiry, \
     is_verified, is_accepting_messages, messages";

/// Persistence operations the sign-up flow needs. Uniqueness of username and
/// email is left to the backing store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_verified_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn insert(&self, user: NewUser) -> anyhow::Result<User>;
    async fn refresh_verification(
        &self,
        id: Uuid,
        refresh: VerificationRefresh,
    ) -> anyhow::Result<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_verified_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_verified = TRUE"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find verified user by username")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, verify_code, verify_code_expiry)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.verify_code)
        .bind(user.verify_code_expiry)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(created)
    }

    async fn refresh_verification(
        &self,
        id: Uuid,
        refresh: VerificationRefresh,
    ) -> anyhow::Result<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET password_hash = $2,
                   verify_code = $3,
                   verify_code_expiry = $4
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&refresh.password_hash)
        .bind(&refresh.verify_code)
        .bind(refresh.verify_code_expiry)
        .fetch_one(&self.db)
        .await
        .context("refresh user verification")?;
        Ok(updated)
    }
}
