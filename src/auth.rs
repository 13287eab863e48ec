use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{app::AppState, error::AppError};

/// In-memory admin sessions guarding the feed import endpoint.
#[derive(Clone)]
pub struct AdminManager {
    username: Arc<str>,
    password: Arc<str>,
    session_ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

struct Session {
    identity: AdminIdentity,
    expires_at: Instant,
}

/// Who is behind an authorized request; inserted into request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminIdentity {
    pub username: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Valid(AdminIdentity),
    Expired,
    Invalid,
}

impl AdminManager {
    pub fn new(username: String, password: String, session_ttl: Duration) -> Self {
        let session_ttl = if session_ttl.is_zero() {
            Duration::from_secs(300)
        } else {
            session_ttl
        };

        Self {
            username: Arc::from(username.trim()),
            password: Arc::from(password),
            session_ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Login is disabled until both credentials are configured.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.is_configured()
            && username.trim() == self.username.as_ref()
            && password == self.password.as_ref()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.session_ttl.as_secs()
    }

    pub async fn issue_session(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            identity: AdminIdentity {
                username: self.username.clone(),
            },
            expires_at: Instant::now() + self.session_ttl,
        };

        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(token.clone(), session);
        token
    }

    /// Looks the token up and slides its expiry forward when still valid.
    pub async fn validate_session(&self, token: &str) -> SessionStatus {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        match sessions.get_mut(token) {
            Some(session) if session.expires_at > now => {
                session.expires_at = now + self.session_ttl;
                SessionStatus::Valid(session.identity.clone())
            }
            Some(_) => {
                sessions.remove(token);
                SessionStatus::Expired
            }
            None => SessionStatus::Invalid,
        }
    }

    pub async fn revoke_session(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    match state.admin.validate_session(&token).await {
        SessionStatus::Valid(identity) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        SessionStatus::Expired => {
            tracing::info!(path = %req.uri().path(), "rejected expired admin session");
            Err(StatusCode::UNAUTHORIZED)
        }
        SessionStatus::Invalid => Err(StatusCode::UNAUTHORIZED),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

pub fn invalid_credentials_error() -> AppError {
    AppError::Unauthorized("invalid username or password".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(ttl: Duration) -> AdminManager {
        AdminManager::new(" admin ".into(), "secret".into(), ttl)
    }

    #[test]
    fn credentials_are_checked_exactly() {
        let admin = manager(Duration::from_secs(60));
        assert!(admin.verify_credentials("admin", "secret"));
        assert!(admin.verify_credentials(" admin", "secret"));
        assert!(!admin.verify_credentials("admin", "Secret"));
        assert!(!admin.verify_credentials("root", "secret"));
    }

    #[test]
    fn unconfigured_login_never_succeeds() {
        let admin = AdminManager::new(String::new(), String::new(), Duration::from_secs(60));
        assert!(!admin.is_configured());
        assert!(!admin.verify_credentials("", ""));
    }

    #[tokio::test]
    async fn sessions_can_be_issued_and_revoked() {
        let admin = manager(Duration::from_secs(60));
        let token = admin.issue_session().await;
        assert_eq!(admin.active_sessions().await, 1);
        match admin.validate_session(&token).await {
            SessionStatus::Valid(identity) => assert_eq!(identity.username.as_ref(), "admin"),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(admin.revoke_session(&token).await);
        assert!(!admin.revoke_session(&token).await);
        assert_eq!(admin.validate_session(&token).await, SessionStatus::Invalid);
    }

    #[tokio::test]
    async fn sessions_expire() {
        let admin = manager(Duration::from_millis(20));
        let token = admin.issue_session().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(admin.validate_session(&token).await, SessionStatus::Expired);
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc ".parse().unwrap());
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, "bearer   ".parse().unwrap());
        assert_eq!(extract_bearer(&headers), None);
    }

}
