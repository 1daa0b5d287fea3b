use rand::Rng;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::{
    dto::SignUpRequest,
    password::hash_password,
    repo::UserStore,
    repo_types::{NewUser, User, VerificationRefresh},
};
use crate::email::{send_verification_email, EmailTransport};

pub const VERIFY_CODE_TTL: Duration = Duration::hours(1);
const VERIFY_CODE_MIN: u32 = 100_000;
const VERIFY_CODE_MAX: u32 = 999_999;

#[derive(Debug, Error)]
pub enum SignUpError {
    #[error("{0}")]
    Invalid(&'static str),

    /// Body missing, not JSON, wrong content type, or missing fields.
    #[error("Invalid request body")]
    MalformedBody,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("User already exists with this email")]
    EmailTaken,

    /// The record was written but the code never left. Carries the
    /// dispatcher's own message.
    #[error("{0}")]
    EmailDispatch(String),

    #[error("Error registering user")]
    Internal(#[from] anyhow::Error),
}

/// How the store was touched by a successful sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpKind {
    Created,
    Refreshed,
}

#[derive(Debug)]
pub struct SignUpOutcome {
    pub kind: SignUpKind,
    pub user: User,
}

/// Six decimal digits, uniform over 100000..=999999, so never zero-padded.
pub fn generate_verify_code() -> String {
    rand::thread_rng()
        .gen_range(VERIFY_CODE_MIN..=VERIFY_CODE_MAX)
        .to_string()
}

/// Reconciles a validated sign-up against existing records, writes at most
/// once, then sends the code. A failed send does not undo the write.
pub async fn sign_up(
    users: &dyn UserStore,
    email: &dyn EmailTransport,
    from: &str,
    req: SignUpRequest,
    now: OffsetDateTime,
) -> Result<SignUpOutcome, SignUpError> {
    if users.find_verified_by_username(&req.username).await?.is_some() {
        warn!(username = %req.username, "username already taken");
        return Err(SignUpError::UsernameTaken);
    }

    let existing = users.find_by_email(&req.email).await?;
    let verify_code = generate_verify_code();
    let verify_code_expiry = now + VERIFY_CODE_TTL;

    let outcome = match existing {
        Some(user) if user.is_verified => {
            warn!(email = %req.email, "email already registered");
            return Err(SignUpError::EmailTaken);
        }
        Some(user) => {
            let refresh = VerificationRefresh {
                password_hash: hash_password(&req.password)?,
                verify_code: verify_code.clone(),
                verify_code_expiry,
            };
            let user = users.refresh_verification(user.id, refresh).await?;
            debug!(user_id = %user.id, "unverified user refreshed");
            SignUpOutcome {
                kind: SignUpKind::Refreshed,
                user,
            }
        }
        None => {
            let new_user = NewUser {
                username: req.username.clone(),
                email: req.email.clone(),
                password_hash: hash_password(&req.password)?,
                verify_code: verify_code.clone(),
                verify_code_expiry,
            };
            let user = users.insert(new_user).await?;
            debug!(user_id = %user.id, "user created");
            SignUpOutcome {
                kind: SignUpKind::Created,
                user,
            }
        }
    };

    let dispatch =
        send_verification_email(email, from, &req.email, &req.username, &verify_code).await;
    if !dispatch.success {
        warn!(user_id = %outcome.user.id, "record persisted but verification email failed");
        return Err(SignUpError::EmailDispatch(dispatch.message));
    }

    info!(user_id = %outcome.user.id, kind = ?outcome.kind, "user registered");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::testing::RecordingTransport;
    use crate::users::password::verify_password;
    use crate::users::repo::memory::MemoryUserStore;
    use sqlx::types::Json;
    use time::macros::datetime;
    use uuid::Uuid;

    const FROM: &str = "Test <test@example.com>";
    const NOW: OffsetDateTime = datetime!(2024-06-01 09:30:00 UTC);

    fn req(username: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn stored_user(username: &str, email: &str, verified: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: hash_password("old-password").unwrap(),
            verify_code: "123456".into(),
            verify_code_expiry: datetime!(2024-01-01 00:00:00 UTC),
            is_verified: verified,
            is_accepting_messages: true,
            messages: Json(Vec::new()),
        }
    }

    fn assert_code_shape(code: &str) {
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        let n: u32 = code.parse().unwrap();
        assert!((100_000..=999_999).contains(&n));
    }

    #[test]
    fn generated_codes_are_six_digits_in_range() {
        for _ in 0..1000 {
            assert_code_shape(&generate_verify_code());
        }
    }

    #[tokio::test]
    async fn novel_user_is_created_unverified() {
        let store = MemoryUserStore::default();
        let mail = RecordingTransport::default();

        let out = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "secret1"), NOW)
            .await
            .unwrap();

        assert_eq!(out.kind, SignUpKind::Created);
        let users = store.users();
        assert_eq!(users.len(), 1);
        let u = &users[0];
        assert_eq!(u.username, "alice_99");
        assert!(!u.is_verified);
        assert!(u.is_accepting_messages);
        assert!(u.messages.0.is_empty());
        assert_code_shape(&u.verify_code);
        assert_eq!(u.verify_code_expiry, NOW + Duration::hours(1));
        assert_ne!(u.password_hash, "secret1");
        assert!(verify_password("secret1", &u.password_hash).unwrap());

        let sent = mail.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert!(sent[0].content.text.contains(&u.verify_code));
        assert!(sent[0].content.text.contains("alice_99"));
    }

    #[tokio::test]
    async fn verified_username_is_rejected_without_writes() {
        let store =
            MemoryUserStore::with_users(vec![stored_user("alice_99", "other@example.com", true)]);
        let mail = RecordingTransport::default();

        let err = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "secret1"), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, SignUpError::UsernameTaken));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.users().len(), 1);
        assert!(mail.sent().is_empty());
    }

    #[tokio::test]
    async fn unverified_username_does_not_block() {
        let store =
            MemoryUserStore::with_users(vec![stored_user("alice_99", "alice@example.com", false)]);
        let mail = RecordingTransport::default();

        let out = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "secret1"), NOW)
            .await
            .unwrap();
        assert_eq!(out.kind, SignUpKind::Refreshed);
    }

    #[tokio::test]
    async fn verified_email_is_rejected() {
        let store =
            MemoryUserStore::with_users(vec![stored_user("someone", "alice@example.com", true)]);
        let mail = RecordingTransport::default();

        let err = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "secret1"), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, SignUpError::EmailTaken));
        assert_eq!(store.writes(), 0);
        assert!(mail.sent().is_empty());
    }

    #[tokio::test]
    async fn unverified_email_is_overwritten_in_place() {
        let existing = stored_user("old_name", "alice@example.com", false);
        let id = existing.id;
        let old_hash = existing.password_hash.clone();
        let store = MemoryUserStore::with_users(vec![existing]);
        let mail = RecordingTransport::default();

        let out = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "newpass1"), NOW)
            .await
            .unwrap();

        assert_eq!(out.kind, SignUpKind::Refreshed);
        let users = store.users();
        assert_eq!(users.len(), 1);
        let u = &users[0];
        assert_eq!(u.id, id);
        assert!(!u.is_verified);
        assert_ne!(u.password_hash, old_hash);
        assert!(verify_password("newpass1", &u.password_hash).unwrap());
        assert_eq!(u.verify_code_expiry, NOW + Duration::hours(1));
        assert_code_shape(&u.verify_code);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn repeated_sign_up_changes_code_without_duplicating() {
        let store = MemoryUserStore::default();
        let mail = RecordingTransport::default();
        let input = || req("alice_99", "alice@example.com", "secret1");

        sign_up(&store, &mail, FROM, input(), NOW).await.unwrap();
        let first = store.users()[0].clone();

        // Codes repeat with probability 1/900000 per draw; retry keeps the test stable.
        let mut second = first.clone();
        for _ in 0..5 {
            sign_up(&store, &mail, FROM, input(), NOW).await.unwrap();
            second = store.users()[0].clone();
            if second.verify_code != first.verify_code {
                break;
            }
        }

        assert_eq!(store.users().len(), 1);
        assert_eq!(second.id, first.id);
        assert_ne!(second.verify_code, first.verify_code);
        assert!(!second.is_verified);
    }

    #[tokio::test]
    async fn email_failure_keeps_the_write() {
        let store = MemoryUserStore::default();
        let mail = RecordingTransport::failing();

        let err = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "secret1"), NOW)
            .await
            .unwrap_err();

        match err {
            SignUpError::EmailDispatch(msg) => {
                assert_eq!(msg, "Failed to send verification email")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn email_failure_keeps_the_refresh() {
        let existing = stored_user("alice_99", "alice@example.com", false);
        let id = existing.id;
        let old_hash = existing.password_hash.clone();
        let store = MemoryUserStore::with_users(vec![existing]);
        let mail = RecordingTransport::failing();

        let err = sign_up(&store, &mail, FROM, req("alice_99", "alice@example.com", "newpass1"), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, SignUpError::EmailDispatch(_)));

        let users = store.users();
        assert_eq!(users.len(), 1);
        let u = &users[0];
        assert_eq!(u.id, id);
        assert!(!u.is_verified);
        assert_ne!(u.password_hash, old_hash);
        assert!(verify_password("newpass1", &u.password_hash).unwrap());
        assert_code_shape(&u.verify_code);
        assert_eq!(u.verify_code_expiry, NOW + Duration::hours(1));
        assert_eq!(store.writes(), 1);

        // The code that failed to send is the one now stored.
        let sent = mail.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.text.contains(&u.verify_code));
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        // Same username, different email, unverified: the insert trips the
        // unique constraint on username.
        let store =
            MemoryUserStore::with_users(vec![stored_user("alice_99", "first@example.com", false)]);
        let mail = RecordingTransport::default();

        let err = sign_up(&store, &mail, FROM, req("alice_99", "second@example.com", "secret1"), NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, SignUpError::Internal(_)));
        assert_eq!(err.to_string(), "Error registering user");
        assert!(mail.sent().is_empty());
    }
}
