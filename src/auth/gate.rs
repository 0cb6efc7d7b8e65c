use scrypt::{
    Scrypt,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, session::{USER_ID, USER_NAME}};

/// How many accounts may ever exist. Two people, one room.
pub const USER_CAP: i64 = 2;

/// An identity that made it past the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthedUser {
    pub id: i64,
    pub name: String,
}

/// Maps requests to authenticated identities: credential checks against the
/// users table, session lookups for everything after login.
#[derive(Clone)]
pub struct SessionGate {
    pool: SqlitePool,
}

impl SessionGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the users table if it isn't there yet. Safe to call on every
    /// start.
    pub async fn init(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check a name/password pair. Unknown names and wrong passwords come
    /// out as the same `BadCredentials`; we verify against a throwaway hash
    /// when the name is unknown so both paths cost about the same.
    pub async fn authenticate(&self, name: &str, password: &str) -> AppResult<AuthedUser> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, password FROM users WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((id, name, hash)) if verify_password(&hash, password) => {
                Ok(AuthedUser { id, name })
            }
            Some(_) => Err(AppError::BadCredentials),
            None => {
                let decoy = hash_password(password)?;
                let _ = verify_password(&decoy, "");
                Err(AppError::BadCredentials)
            }
        }
    }

    /// Create an account. The guarded insert makes the two-user cap hold
    /// even when both registrations race: the count check and the insert are
    /// one statement.
    pub async fn register(&self, name: &str, password: &str) -> AppResult<AuthedUser> {
        let hash = hash_password(password)?;

        let inserted = sqlx::query(
            "INSERT INTO users (name, password)
             SELECT ?, ? WHERE (SELECT COUNT(*) FROM users) < ?",
        )
        .bind(name)
        .bind(&hash)
        .bind(USER_CAP)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateName,
            _ => AppError::Storage(err),
        })?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::CapacityExceeded);
        }

        let (id, name): (i64, String) =
            sqlx::query_as("SELECT id, name FROM users WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(AuthedUser { id, name })
    }

    /// The identity bound to this connection's session, or `Unauthenticated`.
    /// Every mutating handler calls this before touching anything else.
    pub async fn require_session(&self, session: &Session) -> AppResult<AuthedUser> {
        let id = session.get::<i64>(USER_ID).await?;
        let name = session.get::<String>(USER_NAME).await?;

        match (id, name) {
            (Some(id), Some(name)) => Ok(AuthedUser { id, name }),
            _ => Err(AppError::Unauthenticated),
        }
    }

    /// Bind an identity to the session after login or registration.
    pub async fn bind_session(&self, session: &Session, user: &AuthedUser) -> AppResult<()> {
        session.insert(USER_ID, user.id).await?;
        session.insert(USER_NAME, &user.name).await?;
        Ok(())
    }
}

fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("password hashing failed: {err}"))?
        .to_string();
    Ok(hash)
}

fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed).is_ok()
}
