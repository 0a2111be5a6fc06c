//! Observable auth state for the running process.
//!
//! `AuthStore` mirrors the session manager into a `watch` channel holding
//! `{user, session, loading}`. It starts out loading, is filled once from the
//! restored session and then follows every auth-change event.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use jobboard_supabase::{AuthChangeEvent, AuthStateChange, Session, SessionManager, SupabaseResult, User};

use crate::backend::Caller;

/// Point-in-time auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    /// True until the persisted session has been restored
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
        }
    }
}

impl AuthSnapshot {
    fn from_session(session: Option<Session>) -> Self {
        Self {
            user: session.as_ref().map(|s| s.user.clone()),
            session,
            loading: false,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn caller(&self) -> Option<Caller> {
        self.session.as_ref().map(Caller::from_session)
    }
}

/// Process-wide auth state, kept in sync with a `SessionManager`.
pub struct AuthStore {
    manager: Arc<SessionManager>,
    state: Arc<watch::Sender<AuthSnapshot>>,
}

impl AuthStore {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            manager,
            state: Arc::new(state),
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Restore the session and start following auth changes.
    ///
    /// The returned task ends when the session manager is dropped.
    pub async fn start(&self) -> SupabaseResult<JoinHandle<()>> {
        // Subscribe before initializing so no event is missed
        let events = self.manager.subscribe();
        let session = self.manager.initialize().await?;
        self.state.send_replace(AuthSnapshot::from_session(session));

        let state = Arc::clone(&self.state);
        Ok(tokio::spawn(follow_auth_changes(events, state)))
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Watch auth state; the receiver sees the current value first.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn caller(&self) -> Option<Caller> {
        self.state.borrow().caller()
    }

    /// Caller with a token refreshed if it was about to expire.
    pub async fn fresh_caller(&self) -> SupabaseResult<Option<Caller>> {
        Ok(self
            .manager
            .get_session()
            .await?
            .as_ref()
            .map(Caller::from_session))
    }
}

async fn follow_auth_changes(
    mut events: broadcast::Receiver<AuthStateChange>,
    state: Arc<watch::Sender<AuthSnapshot>>,
) {
    loop {
        match events.recv().await {
            Ok(change) => {
                debug!(event = %change.event, "Auth state changed");
                let session = match change.event {
                    AuthChangeEvent::SignedOut => None,
                    _ => change.session,
                };
                state.send_replace(AuthSnapshot::from_session(session));
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Auth listener lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
