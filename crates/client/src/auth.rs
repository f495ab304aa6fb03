//! Login, registration, and current-user resolution.

use crate::api::{decode_record, unwrap_data, ApiClient};
use crate::session::SessionService;
use crate::transport::ApiRequest;
use estate_core::error::{EstateError, EstateResult};
use estate_core::{Credentials, Registration, Session, SessionPatch};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Deserialize)]
struct AuthPayload {
    token: String,
    user: Session,
}

pub struct AuthStore {
    api: ApiClient,
    last_error: RwLock<Option<String>>,
}

impl AuthStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            last_error: RwLock::new(None),
        }
    }

    pub fn session(&self) -> &Arc<SessionService> {
        self.api.session()
    }

    pub fn current(&self) -> Option<Session> {
        self.session().current()
    }

    pub fn error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// `POST /auth/login`. The session's email falls back to the one
    /// submitted when the user payload omits it.
    pub async fn login(&self, credentials: &Credentials) -> EstateResult<Session> {
        let body = to_json(credentials)?;
        self.authenticate(ApiRequest::post("/auth/login").json(body), &credentials.email)
            .await
    }

    /// `POST /auth/register`, handled like a login.
    pub async fn register(&self, registration: &Registration) -> EstateResult<Session> {
        let body = to_json(registration)?;
        self.authenticate(
            ApiRequest::post("/auth/register").json(body),
            &registration.email,
        )
        .await
    }

    pub fn logout(&self) -> EstateResult<()> {
        *self.last_error.write() = None;
        self.session().logout()
    }

    /// Resolves the stored token into a session via `GET /auth/me`.
    ///
    /// Without a token this does nothing. If the lookup fails the token is
    /// discarded.
    pub async fn load_user(&self) -> EstateResult<Option<Session>> {
        let session = self.session();
        if !session.has_token() {
            return Ok(None);
        }
        session.begin_loading();

        let result = self
            .api
            .get("/auth/me")
            .await
            .and_then(|body| decode_record::<Session>(body, "user"));

        match result {
            Ok(user) => {
                session.sign_in(None, user.clone())?;
                *self.last_error.write() = None;
                Ok(Some(user))
            }
            Err(e) => {
                if let Err(clear) = session.forget_token() {
                    tracing::warn!(error = %clear, "failed to discard token");
                }
                session.abort_loading();
                self.record(&e);
                Err(e)
            }
        }
    }

    /// Local merge only; nothing is sent to the server.
    pub fn update_user(&self, patch: SessionPatch) -> Option<Session> {
        self.session().update(patch)
    }

    async fn authenticate(&self, request: ApiRequest, email: &str) -> EstateResult<Session> {
        let session = self.session();
        session.begin_loading();

        let result = self.api.send(request).await.and_then(|body| {
            serde_json::from_value::<AuthPayload>(unwrap_data(body))
                .map_err(|e| EstateError::InvalidPayload(format!("malformed auth response: {e}")))
        });

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                session.abort_loading();
                self.record(&e);
                return Err(e);
            }
        };

        let mut user = payload.user;
        if user.email.is_empty() {
            user.email = email.to_owned();
        }
        session.sign_in(Some(&payload.token), user.clone())?;
        *self.last_error.write() = None;
        Ok(user)
    }

    fn record(&self, e: &EstateError) {
        *self.last_error.write() = Some(e.message().to_owned());
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> EstateResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| EstateError::InvalidInput(format!("encode request: {e}")))
}
