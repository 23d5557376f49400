//! Session-cookie authentication: credential checks, session issue and
//! lookup. Tokens are random, stored only as SHA-256 hashes, and compared
//! in constant time.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};

const TOKEN_PREFIX: &str = "fs";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// The signed-in user, carried through request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

impl From<&UserRecord> for AuthenticatedUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Verify credentials and open a session; returns the cookie token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let candidate = hash_password(&user.password_salt, password);
        if candidate.ct_eq(&user.password_hash).unwrap_u8() != 1 {
            return Err(AuthError::InvalidCredentials);
        }

        // Each successful login doubles as a cleanup pass over stale rows.
        let now = OffsetDateTime::now_utc();
        self.sessions.delete_expired(now).await?;

        let token = generate_token();
        self.sessions
            .insert_session(SessionRecord {
                token_hash: hash_token(&token),
                user_id: user.id,
                expires_at: now + self.session_ttl,
            })
            .await?;

        Ok(token)
    }

    /// Resolve a cookie token to its user; expired sessions are discarded.
    pub async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedUser>, RepoError> {
        let token_hash = hash_token(token);
        let Some(session) = self.sessions.find_session(&token_hash).await? else {
            return Ok(None);
        };

        if session.expires_at <= OffsetDateTime::now_utc() {
            self.sessions.delete_session(&token_hash).await?;
            return Ok(None);
        }

        let user = self.users.find_by_id(session.user_id).await?;
        Ok(user.as_ref().map(AuthenticatedUser::from))
    }

    pub async fn logout(&self, token: &str) -> Result<(), RepoError> {
        self.sessions.delete_session(&hash_token(token)).await
    }

    /// Provision a user with a fresh salt; used by the `user add` command.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let salt = Uuid::new_v4().into_bytes().to_vec();
        let password_hash = hash_password(&salt, password);

        match self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                password_salt: salt,
                password_hash,
            })
            .await
        {
            Ok(user) => Ok(user),
            Err(RepoError::Duplicate { .. }) => Err(AuthError::UsernameTaken(username.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

fn generate_token() -> String {
    format!(
        "{TOKEN_PREFIX}_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_depends_on_salt() {
        let a = hash_password(b"salt-a", "hunter2");
        let b = hash_password(b"salt-b", "hunter2");
        assert_ne!(a, b);
        assert_eq!(a, hash_password(b"salt-a", "hunter2"));
    }

    #[test]
    fn tokens_are_unique_and_prefixed() {
        let one = generate_token();
        let two = generate_token();
        assert_ne!(one, two);
        assert!(one.starts_with("fs_"));
    }
}
