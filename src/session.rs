use async_trait::async_trait;
use axum::http::{HeaderMap, header::COOKIE};
use std::{collections::HashMap, fmt::Write};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "pof_session";

/// The signed-in user a request acts for. Views receive it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignInError {
    #[error("a display name is required")]
    MissingName,
}

/// Seam for the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, name: &str) -> Result<Session, SignInError>;
}

/// Accepts any non-empty name, deriving a stable uid from it. ASCII letters
/// and digits are kept as typed; every other character becomes `_{hex}_`, so
/// distinct trimmed names never share a uid.
pub struct LocalIdentityProvider;

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, name: &str) -> Result<Session, SignInError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SignInError::MissingName);
        }
        let uid = name.chars().fold(String::new(), |mut uid, c| {
            if c.is_ascii_alphanumeric() {
                uid.push(c);
            } else {
                let _ = write!(uid, "_{:x}_", u32::from(c));
            }
            uid
        });
        Ok(Session {
            uid,
            name: name.to_string(),
        })
    }
}

/// Live sessions keyed by the opaque token in the session cookie.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub async fn open(&self, session: Session) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.lock().await.insert(token, session);
        token
    }

    pub async fn resolve(&self, token: Uuid) -> Option<Session> {
        self.sessions.lock().await.get(&token).cloned()
    }

    pub async fn close(&self, token: Uuid) -> Option<Session> {
        self.sessions.lock().await.remove(&token)
    }
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, token)| Uuid::parse_str(token).ok())
}

pub fn session_cookie(token: Uuid) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
