//! In-memory transport for tests.
//!
//! Responses are scripted per `(method, path)`. Each route plays its queue
//! in order and then keeps repeating the last entry. Unscripted routes
//! answer 404. Every request is recorded after the client's request-side
//! handling, so headers can be asserted on.

use crate::transport::{ApiRequest, Method, RawResponse, TransportError};
use crate::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Scripted {
    Reply {
        response: RawResponse,
        delay: Option<Duration>,
    },
    Fail(TransportError),
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(method, path, Scripted::Reply {
            response: RawResponse::new(status, body.to_string()),
            delay: None,
        });
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: Vec<u8>) {
        self.push(method, path, Scripted::Reply {
            response: RawResponse::new(status, body),
            delay: None,
        });
    }

    /// Like [`respond`](Self::respond), but the reply is held back for `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        status: u16,
        body: Value,
    ) {
        self.push(method, path, Scripted::Reply {
            response: RawResponse::new(status, body.to_string()),
            delay: Some(delay),
        });
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, Scripted::Fail(error));
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn push(&self, method: Method, path: &str, entry: Scripted) {
        self.routes
            .lock()
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(entry);
    }

    fn next(&self, method: Method, path: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&(method, path.to_owned()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let scripted = self.next(request.method, &request.path);
        self.log.lock().push(request);

        match scripted {
            Some(Scripted::Reply { response, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(RawResponse::new(404, r#"{"message":"no scripted route"}"#)),
        }
    }
}
