//! The single configured request path every store goes through.
//!
//! Request side: bearer token from the session, multipart content-type
//! left to the transport. Response side: 2xx bodies pass through, anything
//! else becomes a classified [`EstateError`]; a 401 also evicts the
//! session.

use crate::session::SessionService;
use crate::transport::ApiRequest;
use crate::Transport;
use estate_core::error::{EstateError, EstateResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionService>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionService>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionService> {
        &self.session
    }

    /// Sends `request` and returns the decoded JSON body (`null` if empty).
    pub async fn send(&self, mut request: ApiRequest) -> EstateResult<Value> {
        if let Some(token) = self.session.token() {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        if request.is_multipart() {
            request.remove_header("Content-Type");
        }

        let method = request.method;
        let path = request.path.clone();
        tracing::debug!(%method, path = %path, "request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, path = %path, error = %e, "no response");
                return Err(EstateError::Network(e.to_string()));
            }
        };

        let status = response.status;
        if (200..300).contains(&status) {
            return decode_success(&response.body);
        }

        let err = EstateError::from_status(status, decode_error_body(&response.body));
        if err.is_unauthorized() {
            self.session.expire();
        }
        tracing::warn!(%method, path = %path, status, message = err.message(), "request failed");
        Err(err)
    }

    pub async fn get(&self, path: impl Into<String>) -> EstateResult<Value> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> EstateResult<Value> {
        self.send(ApiRequest::delete(path)).await
    }
}

fn decode_success(body: &[u8]) -> EstateResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| EstateError::InvalidPayload(format!("response is not JSON: {e}")))
}

/// Error bodies are kept even when they are not JSON, as a plain string.
fn decode_error_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
    )
}

/// `body.data ?? body`: the server wraps most payloads in `{ data: … }`.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            _ => Value::Object(map),
        },
        other => other,
    }
}

/// Unwraps the envelope and requires an array of `T`.
pub fn decode_list<T: DeserializeOwned>(body: Value, what: &str) -> EstateResult<Vec<T>> {
    match unwrap_data(body) {
        Value::Array(items) => serde_json::from_value(Value::Array(items))
            .map_err(|e| EstateError::InvalidPayload(format!("malformed {what} list: {e}"))),
        other => Err(EstateError::InvalidPayload(format!(
            "expected a list of {what}, got {}",
            json_kind(&other)
        ))),
    }
}

/// Unwraps `data`, then an optional named wrapper (`{ property: … }`).
pub fn decode_record<T: DeserializeOwned>(body: Value, wrapper: &str) -> EstateResult<T> {
    let inner = match unwrap_data(body) {
        Value::Object(mut map) if map.get(wrapper).is_some_and(Value::is_object) => {
            map.remove(wrapper).unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner)
        .map_err(|e| EstateError::InvalidPayload(format!("malformed {wrapper}: {e}")))
}

/// Rejects ids that would change the shape of the request path.
pub fn path_id(id: &str) -> EstateResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '?', '#']) {
        return Err(EstateError::InvalidInput(format!("invalid id `{id}`")));
    }
    Ok(trimmed)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
