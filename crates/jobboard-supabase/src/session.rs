//! Session management for signed-in users.
//!
//! Holds the current session with:
//! - Refresh margin so tokens are renewed before they expire
//! - Single-flight refresh behind a write lock
//! - Fallback to the existing token when a refresh fails but it is still usable
//! - Pluggable persistence and broadcast auth-change events

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::auth::AuthClient;
use crate::error::SupabaseResult;
use crate::metrics::record_auth_event;
use crate::types::{Session, SignUpOutcome, User};

// =============================================================================
// Constants
// =============================================================================

/// Refresh the session when it expires within this margin.
pub const SESSION_REFRESH_MARGIN_SECS: i64 = 60;

const EVENT_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// Events
// =============================================================================

/// Kind of auth state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthChangeEvent {
    /// Session restored (or found absent) at startup
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialSession => "initial_session",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
        }
    }
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An auth state change together with the resulting session.
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

// =============================================================================
// Persistence
// =============================================================================

/// Storage for the current session between runs.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> SupabaseResult<Option<Session>>;
    async fn save(&self, session: &Session) -> SupabaseResult<()>;
    async fn clear(&self) -> SupabaseResult<()>;
}

/// Keeps the session in memory only.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn load(&self) -> SupabaseResult<Option<Session>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, session: &Session) -> SupabaseResult<()> {
        *self.inner.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> SupabaseResult<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}

// =============================================================================
// Session Manager
// =============================================================================

/// Owns the current session and notifies subscribers when it changes.
pub struct SessionManager {
    auth: AuthClient,
    store: Arc<dyn SessionPersistence>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl SessionManager {
    pub fn new(auth: AuthClient, store: Arc<dyn SessionPersistence>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            auth,
            store,
            current: RwLock::new(None),
            events,
        }
    }

    /// Session manager that forgets everything on exit.
    pub fn in_memory(auth: AuthClient) -> Self {
        Self::new(auth, Arc::new(MemorySessionStore::new()))
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Receive every auth state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }

    /// Restore the persisted session, refreshing it if needed.
    ///
    /// Always emits `InitialSession`, with `None` when no usable session
    /// could be restored.
    pub async fn initialize(&self) -> SupabaseResult<Option<Session>> {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load stored session: {}", e);
                None
            }
        };

        *self.current.write().await = stored;
        let session = self.get_session().await?;

        debug!(signed_in = session.is_some(), "Session initialized");
        self.emit(AuthChangeEvent::InitialSession, session.clone());
        Ok(session)
    }

    /// Current session, refreshed first when it is about to expire.
    pub async fn get_session(&self) -> SupabaseResult<Option<Session>> {
        let margin = Duration::seconds(SESSION_REFRESH_MARGIN_SECS);

        // Fast path: check read lock first
        {
            let current = self.current.read().await;
            match current.as_ref() {
                None => return Ok(None),
                Some(session) if !session.expires_within(margin, Utc::now()) => {
                    return Ok(Some(session.clone()));
                }
                Some(_) => {}
            }
        }

        // Slow path: acquire write lock and refresh
        let mut current = self.current.write().await;

        // Double-check: another task may have refreshed while we waited
        let existing = match current.as_ref() {
            None => return Ok(None),
            Some(session) if !session.expires_within(margin, Utc::now()) => {
                return Ok(Some(session.clone()));
            }
            Some(session) => session.clone(),
        };

        match self.auth.refresh_session(&existing.refresh_token).await {
            Ok(session) => {
                *current = Some(session.clone());
                drop(current);
                self.persist(&session).await;
                debug!(user_id = %session.user.id, "Refreshed session");
                self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Ok(Some(session))
            }
            Err(e) if existing.is_usable(Utc::now()) => {
                warn!("Session refresh failed, using existing token: {}", e);
                Ok(Some(existing))
            }
            Err(e) if e.is_auth_rejection() => {
                warn!("Session expired and could not be refreshed: {}", e);
                *current = None;
                drop(current);
                self.forget().await;
                self.emit(AuthChangeEvent::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// User of the current session, if signed in.
    pub async fn current_user(&self) -> SupabaseResult<Option<User>> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    /// Access token of the current session, if signed in.
    pub async fn access_token(&self) -> SupabaseResult<Option<String>> {
        Ok(self.get_session().await?.map(|s| s.access_token))
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> SupabaseResult<SignUpOutcome> {
        let outcome = self.auth.sign_up(email, password, metadata).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.establish(session.clone()).await;
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SupabaseResult<Session> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        info!(user_id = %session.user.id, "Signed in");
        self.establish(session.clone()).await;
        Ok(session)
    }

    /// Sign out locally, revoking the token remotely when possible.
    ///
    /// A failed remote revocation is logged; the local session is cleared
    /// either way.
    pub async fn sign_out(&self) -> SupabaseResult<()> {
        let previous = self.current.write().await.take();

        if let Some(session) = &previous {
            if let Err(e) = self.auth.sign_out(&session.access_token).await {
                warn!("Remote sign-out failed: {}", e);
            }
            info!(user_id = %session.user.id, "Signed out");
        }

        self.forget().await;
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn establish(&self, session: Session) {
        *self.current.write().await = Some(session.clone());
        self.persist(&session).await;
        self.emit(AuthChangeEvent::SignedIn, Some(session));
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session).await {
            warn!("Failed to persist session: {}", e);
        }
    }

    async fn forget(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear stored session: {}", e);
        }
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        record_auth_event(event.as_str());
        // No subscribers is fine
        let _ = self.events.send(AuthStateChange { event, session });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_margin() {
        assert_eq!(SESSION_REFRESH_MARGIN_SECS, 60);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(AuthChangeEvent::InitialSession.to_string(), "initial_session");
        assert_eq!(AuthChangeEvent::TokenRefreshed.as_str(), "token_refreshed");
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
