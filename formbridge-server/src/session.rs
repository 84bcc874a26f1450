//! Server-side sessions keyed by an opaque cookie.
//!
//! The browser only ever holds the random session id. PKCE verifiers, OAuth
//! state and access tokens stay in this table and are dropped on logout,
//! expiry or process restart. Expired entries are evicted lazily whenever a
//! session is opened or looked up.

use std::collections::HashMap;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use formbridge::core::pkce::random_token;
use formbridge::io::config::ServerConfig;
use formbridge::io::oauth::AccessToken;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const SESSION_COOKIE: &str = "formbridge_sid";

const SESSION_ID_BYTES: usize = 32;

/// State and verifier of an authorization that has not called back yet.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub verifier: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub pending: Option<PendingAuthorization>,
    pub access_token: Option<AccessToken>,
    /// Local user id, known once the account has been synced.
    pub user_id: Option<String>,
    created_at: Instant,
    last_seen: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            pending: None,
            access_token: None,
            user_id: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Anonymous sessions expire after `ttl.login` without activity.
    /// Authenticated ones live as long as their access token.
    fn expired(&self, now: Instant, ttl: SessionTtl) -> bool {
        if self.access_token.is_some() {
            now.duration_since(self.created_at) >= ttl.authenticated
        } else {
            now.duration_since(self.last_seen) >= ttl.login
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    pub login: Duration,
    pub authenticated: Duration,
}

impl SessionTtl {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            login: Duration::from_secs(config.login_ttl_secs),
            authenticated: Duration::from_secs(config.session_ttl_secs),
        }
    }
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: SessionTtl,
}

impl SessionStore {
    pub fn new(ttl: SessionTtl) -> Self {
        Self {
            sessions: RwLock::default(),
            ttl,
        }
    }

    /// Return `existing` if it names a live session, otherwise open a new one.
    pub async fn ensure(&self, existing: Option<&str>) -> String {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions, now);
        if let Some(id) = existing {
            if let Some(session) = sessions.get_mut(id) {
                session.last_seen = now;
                return id.to_string();
            }
        }
        let id = random_token(SESSION_ID_BYTES);
        sessions.insert(id.clone(), Session::new(now));
        id
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions, now);
        let session = sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Apply `change` to a live session. Returns false if the id is unknown.
    pub async fn update(&self, id: &str, change: impl FnOnce(&mut Session)) -> bool {
        match self.sessions.write().await.get_mut(id) {
            Some(session) => {
                change(session);
                true
            }
            None => false,
        }
    }

    /// Remove and return the pending authorization, so each one is usable once.
    pub async fn take_pending(&self, id: &str) -> Option<PendingAuthorization> {
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions, Instant::now());
        sessions
            .get_mut(id)
            .and_then(|session| session.pending.take())
    }

    /// Replace the session `previous` with a fresh id holding `token`.
    ///
    /// The id seen before login never carries the access token.
    pub async fn authenticate(&self, previous: &str, token: AccessToken) -> String {
        let mut sessions = self.sessions.write().await;
        sessions.remove(previous);
        let mut session = Session::new(Instant::now());
        session.access_token = Some(token);
        let id = random_token(SESSION_ID_BYTES);
        sessions.insert(id.clone(), session);
        id
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        let ttl = self.ttl;
        sessions.retain(|_, session| !session.expired(now, ttl));
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// HttpOnly session cookie. Secure deployments use `SameSite=None` so a
/// frontend on another site can send it with credentialed requests.
pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
