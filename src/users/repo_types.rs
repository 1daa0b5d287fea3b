use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// A message received by a user. Stored inside the owning user's row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 PHC string, never exposed
    #[serde(skip_serializing)]
    pub verify_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub verify_code_expiry: OffsetDateTime,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub messages: Json<Vec<Message>>, // chronological
}

/// Fields needed to insert a fresh, unverified user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expiry: OffsetDateTime,
}

/// Replacement values written when an unverified user signs up again.
/// Code and expiry always travel together.
#[derive(Debug, Clone)]
pub struct VerificationRefresh {
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expiry: OffsetDateTime,
}
