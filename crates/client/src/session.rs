//! Process-wide session state.
//!
//! One [`SessionService`] is shared by every store. It owns the bearer
//! token, publishes the current [`AuthState`] on a watch channel, and
//! broadcasts [`SessionEvent`]s. Any request that comes back 401 ends up in
//! [`SessionService::expire`], wherever it was issued from.

use crate::token_store::TokenStore;
use estate_core::error::EstateResult;
use estate_core::{Session, SessionPatch};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Where a consumer should send the user after the session expires.
pub const LOGIN_ROUTE: &str = "/login";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Loading,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unauthenticated | Self::Loading => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    Updated(Session),
    LoggedOut,
    /// A request was rejected with 401; the session is gone.
    Expired { redirect_to: String },
}

pub struct SessionService {
    store: Arc<dyn TokenStore>,
    token: RwLock<Option<String>>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionService {
    /// Reads any persisted token. The state starts `Unauthenticated` until
    /// the user record is resolved.
    pub fn new(store: Arc<dyn TokenStore>) -> EstateResult<Self> {
        let token = store.load()?;
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tracing::debug!(has_token = token.is_some(), "session service ready");

        Ok(Self {
            store,
            token: RwLock::new(token),
            state,
            events,
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn begin_loading(&self) {
        self.state.send_replace(AuthState::Loading);
    }

    /// Drops back to `Unauthenticated` after a failed attempt, unless a 401
    /// already did so.
    pub(crate) fn abort_loading(&self) {
        self.state.send_if_modified(|state| {
            if *state == AuthState::Loading {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    /// Persists `token` (when given) and publishes the session.
    pub(crate) fn sign_in(&self, token: Option<&str>, session: Session) -> EstateResult<()> {
        if let Some(token) = token {
            self.store.save(token)?;
            *self.token.write() = Some(token.to_owned());
        }
        tracing::info!(user_id = %session.id, role = %session.role, "signed in");
        self.state
            .send_replace(AuthState::Authenticated(session.clone()));
        let _ = self.events.send(SessionEvent::SignedIn(session));
        Ok(())
    }

    /// Local-only merge into the current session. `None` when signed out.
    pub fn update(&self, patch: SessionPatch) -> Option<Session> {
        let mut updated = None;
        self.state.send_if_modified(|state| match state {
            AuthState::Authenticated(session) => {
                session.merge(patch);
                updated = Some(session.clone());
                true
            }
            AuthState::Unauthenticated | AuthState::Loading => false,
        });
        if let Some(session) = &updated {
            let _ = self.events.send(SessionEvent::Updated(session.clone()));
        }
        updated
    }

    pub(crate) fn logout(&self) -> EstateResult<()> {
        self.forget_token()?;
        self.state.send_replace(AuthState::Unauthenticated);
        let _ = self.events.send(SessionEvent::LoggedOut);
        tracing::info!("logged out");
        Ok(())
    }

    /// Clears the token and session after a 401 and asks consumers to
    /// navigate to [`LOGIN_ROUTE`].
    pub fn expire(&self) {
        if let Err(e) = self.forget_token() {
            tracing::warn!(error = %e, "failed to clear persisted token");
        }
        self.state.send_replace(AuthState::Unauthenticated);
        let _ = self.events.send(SessionEvent::Expired {
            redirect_to: LOGIN_ROUTE.to_owned(),
        });
        tracing::warn!("session expired");
    }

    /// Drops the token without touching the published state.
    pub(crate) fn forget_token(&self) -> EstateResult<()> {
        *self.token.write() = None;
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use estate_core::Role;

    fn buyer() -> Session {
        Session {
            id: "u1".into(),
            name: "A".into(),
            email: "a@b.com".into(),
            role: Role::Buyer,
        }
    }

    #[test]
    fn loads_persisted_token() {
        let store = Arc::new(MemoryTokenStore::with_token("t0"));
        let service = SessionService::new(store).unwrap();
        assert_eq!(service.token().as_deref(), Some("t0"));
        assert_eq!(service.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn sign_in_persists_and_publishes() {
        let store = Arc::new(MemoryTokenStore::default());
        let service = SessionService::new(store.clone()).unwrap();
        let mut events = service.subscribe_events();
        let rx = service.subscribe_state();

        service.sign_in(Some("t1"), buyer()).unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some("t1"));
        assert_eq!(*rx.borrow(), AuthState::Authenticated(buyer()));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(buyer()));
    }

    #[test]
    fn expire_clears_everything_and_redirects() {
        let store = Arc::new(MemoryTokenStore::default());
        let service = SessionService::new(store.clone()).unwrap();
        service.sign_in(Some("t1"), buyer()).unwrap();
        let mut events = service.subscribe_events();

        service.expire();

        assert_eq!(store.load().unwrap(), None);
        assert!(service.token().is_none());
        assert!(service.current().is_none());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Expired {
                redirect_to: "/login".into()
            }
        );
    }

    #[test]
    fn update_requires_a_session() {
        let service = SessionService::new(Arc::new(MemoryTokenStore::default())).unwrap();
        assert!(service
            .update(SessionPatch {
                name: Some("B".into()),
                ..SessionPatch::default()
            })
            .is_none());

        service.sign_in(None, buyer()).unwrap();
        let updated = service
            .update(SessionPatch {
                role: Some(Role::Agent),
                ..SessionPatch::default()
            })
            .unwrap();
        assert_eq!(updated.role, Role::Agent);
        assert_eq!(service.current().unwrap().role, Role::Agent);
    }

    #[test]
    fn abort_loading_keeps_authenticated_state() {
        let service = SessionService::new(Arc::new(MemoryTokenStore::default())).unwrap();
        service.begin_loading();
        service.abort_loading();
        assert_eq!(service.state(), AuthState::Unauthenticated);

        service.sign_in(None, buyer()).unwrap();
        service.abort_loading();
        assert!(service.current().is_some());
    }
}
