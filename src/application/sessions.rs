//! Opaque bearer session tokens.
//!
//! Tokens look like `ss_<prefix>_<secret>`. Only the prefix and a SHA-256 of
//! the secret are stored.

use std::sync::Arc;

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

const TOKEN_TAG: &str = "ss";
const PREFIX_LEN: usize = 12;
const SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("invalid session token")]
    Invalid,
    #[error("expired session token")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub record: SessionRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionsRepo>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionsRepo>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedSession, SessionError> {
        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_TAG}_{prefix}_{secret}");

        let record = self
            .repo
            .create_session(CreateSessionParams {
                user_id,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at: OffsetDateTime::now_utc() + self.ttl,
            })
            .await?;

        Ok(IssuedSession { record, token })
    }

    pub async fn authenticate(&self, token: &str) -> Result<SessionRecord, SessionError> {
        let parsed = Self::parse_token(token).ok_or(SessionError::Invalid)?;
        let record = self
            .repo
            .find_session_by_prefix(parsed.prefix)
            .await?
            .ok_or(SessionError::Invalid)?;

        let hashed_input = Self::hash_secret(parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionError::Invalid);
        }
        if record.expires_at <= OffsetDateTime::now_utc() {
            return Err(SessionError::Expired);
        }

        Ok(record)
    }

    /// Delete the session behind `token`. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        match self.authenticate(token).await {
            Ok(record) => Ok(self.repo.delete_session(record.id).await?),
            Err(SessionError::Invalid) => Ok(()),
            Err(SessionError::Expired) => {
                if let Some(parsed) = Self::parse_token(token)
                    && let Some(record) = self.repo.find_session_by_prefix(parsed.prefix).await?
                {
                    self.repo.delete_session(record.id).await?;
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn revoke_all(&self, user_id: Uuid) -> Result<(), SessionError> {
        Ok(self.repo.delete_sessions_for_user(user_id).await?)
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
    }

    fn generate_secret() -> String {
        let mut bytes = [0_u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_TAG {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if prefix.len() != PREFIX_LEN || secret.len() != SECRET_BYTES * 2 {
            return None;
        }
        Some(ParsedToken { prefix, secret })
    }
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemorySessions {
        rows: Mutex<Vec<SessionRecord>>,
    }

    #[async_trait]
    impl SessionsRepo for MemorySessions {
        async fn create_session(
            &self,
            params: CreateSessionParams,
        ) -> Result<SessionRecord, RepoError> {
            let record = SessionRecord {
                id: Uuid::new_v4(),
                user_id: params.user_id,
                prefix: params.prefix,
                hashed_secret: params.hashed_secret,
                expires_at: params.expires_at,
                created_at: OffsetDateTime::now_utc(),
            };
            self.rows.lock().await.push(record.clone());
            Ok(record)
        }

        async fn find_session_by_prefix(
            &self,
            prefix: &str,
        ) -> Result<Option<SessionRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .await
                .iter()
                .find(|row| row.prefix == prefix)
                .cloned())
        }

        async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
            self.rows.lock().await.retain(|row| row.id != id);
            Ok(())
        }

        async fn delete_sessions_for_user(&self, user_id: Uuid) -> Result<(), RepoError> {
            self.rows.lock().await.retain(|row| row.user_id != user_id);
            Ok(())
        }
    }

    fn service(ttl: Duration) -> (Arc<MemorySessions>, SessionService) {
        let repo = Arc::new(MemorySessions::default());
        (repo.clone(), SessionService::new(repo, ttl))
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let (_, sessions) = service(Duration::hours(1));
        let user_id = Uuid::new_v4();
        let issued = sessions.issue(user_id).await.unwrap();

        assert!(issued.token.starts_with("ss_"));
        let record = sessions.authenticate(&issued.token).await.unwrap();
        assert_eq!(record.user_id, user_id);
    }

    #[tokio::test]
    async fn tampered_secret_is_rejected() {
        let (_, sessions) = service(Duration::hours(1));
        let issued = sessions.issue(Uuid::new_v4()).await.unwrap();

        let mut tampered = issued.token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert!(matches!(
            sessions.authenticate(&tampered).await,
            Err(SessionError::Invalid)
        ));
        assert!(matches!(
            sessions.authenticate("garbage").await,
            Err(SessionError::Invalid)
        ));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_revocable() {
        let (repo, sessions) = service(Duration::seconds(-1));
        let issued = sessions.issue(Uuid::new_v4()).await.unwrap();

        assert!(matches!(
            sessions.authenticate(&issued.token).await,
            Err(SessionError::Expired)
        ));
        sessions.revoke(&issued.token).await.unwrap();
        assert!(repo.rows.lock().await.is_empty());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (repo, sessions) = service(Duration::hours(1));
        let issued = sessions.issue(Uuid::new_v4()).await.unwrap();

        sessions.revoke(&issued.token).await.unwrap();
        sessions.revoke(&issued.token).await.unwrap();
        assert!(repo.rows.lock().await.is_empty());
    }
}
