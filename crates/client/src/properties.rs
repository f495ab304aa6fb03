//! Listing reads, writes, and the canonical `properties` list.
//!
//! Reads go through [`PropertyCache`]. Concurrent misses on the same key
//! share one request: the first caller fetches, the rest wait on the key's
//! gate and then read the cache. A list response only replaces the
//! canonical list if it answers the most recently issued list request.

use crate::api::{decode_list, decode_record, path_id, unwrap_data, ApiClient};
use crate::cache::{list_key, PropertyCache, FEATURED_KEY};
use crate::config::DEFAULT_PREFETCH_CONCURRENCY;
use crate::transport::{ApiRequest, FormPart, Method};
use estate_core::error::{EstateError, EstateResult};
use estate_core::{Property, PropertyDraft, PropertyQuery};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ListState {
    properties: Vec<Property>,
    error: Option<String>,
    loading: bool,
}

/// Per-key lock shared by concurrent misses, with a count of registered callers.
struct Gate {
    lock: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

type Gates = Mutex<HashMap<String, Gate>>;

/// One caller's registration on a key's gate. Dropping it, including when
/// the caller's future is abandoned, unregisters the caller and forgets the
/// gate with its last user.
struct GateTicket<'a> {
    gates: &'a Gates,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock();
        let Some(gate) = gates.get_mut(&self.key) else {
            return;
        };
        gate.users = gate.users.saturating_sub(1);
        if gate.users == 0 {
            gates.remove(&self.key);
        }
    }
}

/// Outcome of [`PropertiesStore::prefetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub fetched: usize,
    pub already_cached: usize,
    pub failed: usize,
}

pub struct PropertiesStore {
    api: ApiClient,
    cache: Mutex<PropertyCache>,
    state: RwLock<ListState>,
    /// Sequence number of the latest issued `get_properties` call.
    list_seq: AtomicU64,
    gates: Gates,
    max_concurrent: usize,
}

impl PropertiesStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Mutex::new(PropertyCache::new()),
            state: RwLock::new(ListState::default()),
            list_seq: AtomicU64::new(0),
            gates: Mutex::new(HashMap::new()),
            max_concurrent: DEFAULT_PREFETCH_CONCURRENCY,
        }
    }

    /// Override max concurrent detail fetches during prefetch.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Snapshot of the canonical list.
    pub fn properties(&self) -> Vec<Property> {
        self.state.read().properties.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn cached_lists(&self) -> usize {
        self.cache.lock().list_count()
    }

    pub fn cached_properties(&self) -> usize {
        self.cache.lock().property_count()
    }

    /// Keys with a read in flight or waiting on one.
    pub fn in_flight(&self) -> usize {
        self.gates.lock().len()
    }

    /// Drops every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.lock().clear();
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// `GET /properties` with `query`, served from cache when possible.
    pub async fn get_properties(&self, query: &PropertyQuery) -> EstateResult<Vec<Property>> {
        let seq = self.list_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let key = list_key(query);

        let cached = self.cache.lock().list(&key);
        if let Some(items) = cached {
            tracing::debug!(key = %key, "list cache hit");
            self.apply_list(seq, &items);
            return Ok(items);
        }

        self.state.write().loading = true;
        let request = ApiRequest::get("/properties").with_query(query);
        let result = self.fetch_list_once(&key, query, request).await;

        match result {
            Ok(items) => {
                self.apply_list(seq, &items);
                Ok(items)
            }
            Err(e) => {
                self.fail_list(seq, &e);
                Err(e)
            }
        }
    }

    /// `GET /properties/featured`, cached under its own key. Does not touch
    /// the canonical list.
    pub async fn get_featured(&self) -> EstateResult<Vec<Property>> {
        let cached = self.cache.lock().list(FEATURED_KEY);
        if let Some(items) = cached {
            return Ok(items);
        }
        let query = PropertyQuery::new().with("featured", true);
        self.fetch_list_once(FEATURED_KEY, &query, ApiRequest::get("/properties/featured"))
            .await
            .inspect_err(|e| self.record_error(e))
    }

    /// `GET /properties/:id`, served from cache when possible.
    pub async fn get_property(&self, id: &str) -> EstateResult<Property> {
        let id = path_id(id)?;

        let cached = self.cache.lock().property(id);
        if let Some(p) = cached {
            tracing::debug!(id, "property cache hit");
            return Ok(p);
        }

        let ticket = self.gate(&detail_key(id));
        let _held = ticket.lock.lock().await;

        let cached = self.cache.lock().property(id);
        let result = match cached {
            Some(p) => Ok(p),
            None => self.fetch_property(id).await,
        };
        result.inspect_err(|e| self.record_error(e))
    }

    /// Warms the by-id cache for `ids`, at most `with_concurrency` requests
    /// in flight. Failures are counted, not returned.
    pub async fn prefetch(&self, ids: &[String]) -> PrefetchReport {
        let mut report = PrefetchReport::default();
        let mut wanted = HashSet::new();
        {
            let cache = self.cache.lock();
            for id in ids {
                if cache.contains_property(id) {
                    report.already_cached += 1;
                } else if path_id(id).is_ok() {
                    wanted.insert(id.trim().to_owned());
                } else {
                    report.failed += 1;
                }
            }
        }
        if wanted.is_empty() {
            return report;
        }

        let generation = self.cache.lock().generation();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.max_concurrent));
        tracing::info!(
            ids = wanted.len(),
            concurrency = self.max_concurrent,
            "prefetching properties"
        );

        let mut tasks = tokio::task::JoinSet::new();
        for id in wanted {
            let api = self.api.clone();
            let sem = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return Err(EstateError::InvalidInput("prefetch cancelled".into()));
                };
                let body = api.get(format!("/properties/{id}")).await?;
                decode_record::<Property>(body, "property")
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(property)) => {
                    self.cache.lock().insert_property(property, generation);
                    report.fetched += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "prefetch failed");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "prefetch task panicked");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            failed = report.failed,
            "prefetch done"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// `POST /properties`. The created record joins the canonical list
    /// exactly once.
    pub async fn create_property(&self, draft: &PropertyDraft) -> EstateResult<Property> {
        let request = write_request(Method::Post, "/properties".to_owned(), draft)?;
        let created = self
            .api
            .send(request)
            .await
            .and_then(|body| decode_record::<Property>(body, "property"))
            .inspect_err(|e| self.record_error(e))?;

        let dropped = self.cache.lock().record_write(&created.id, Some(&created));
        {
            let mut state = self.state.write();
            state.properties.retain(|p| p.id != created.id);
            state.properties.push(created.clone());
            state.error = None;
        }

        tracing::info!(id = %created.id, invalidated = dropped, "property created");
        Ok(created)
    }

    /// `PUT /properties/:id`. When the response is empty or only an
    /// acknowledgement, the draft is taken as the new version. A record
    /// that fails to decode is an error.
    pub async fn update_property(&self, id: &str, draft: &PropertyDraft) -> EstateResult<Property> {
        let id = path_id(id)?;
        let request = write_request(Method::Put, format!("/properties/{id}"), draft)?;
        let body = self
            .api
            .send(request)
            .await
            .inspect_err(|e| self.record_error(e))?;

        let payload = unwrap_data(body);
        let updated = if carries_record(&payload) {
            let p = decode_record::<Property>(payload, "property")
                .inspect_err(|e| self.record_error(e))?;
            if p.id != id {
                tracing::warn!(requested = id, returned = %p.id, "update returned a different id");
            }
            Property { id: id.to_owned(), ..p }
        } else {
            Property::from_draft(id, draft)
        };

        let dropped = self.cache.lock().record_write(id, Some(&updated));
        {
            let mut state = self.state.write();
            if let Some(slot) = state.properties.iter_mut().find(|p| p.id == id) {
                *slot = updated.clone();
            }
            state.error = None;
        }

        tracing::info!(id, invalidated = dropped, "property updated");
        Ok(updated)
    }

    /// `DELETE /properties/:id`.
    pub async fn delete_property(&self, id: &str) -> EstateResult<()> {
        let id = path_id(id)?;
        self.api
            .delete(format!("/properties/{id}"))
            .await
            .inspect_err(|e| self.record_error(e))?;

        let dropped = self.cache.lock().record_write(id, None);
        {
            let mut state = self.state.write();
            state.properties.retain(|p| p.id != id);
            state.error = None;
        }

        tracing::info!(id, invalidated = dropped, "property deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Single-flight list fetch for `key`.
    async fn fetch_list_once(
        &self,
        key: &str,
        query: &PropertyQuery,
        request: ApiRequest,
    ) -> EstateResult<Vec<Property>> {
        let ticket = self.gate(key);
        let _held = ticket.lock.lock().await;

        let cached = self.cache.lock().list(key);
        match cached {
            Some(items) => Ok(items),
            None => {
                let generation = self.cache.lock().generation();
                match self
                    .api
                    .send(request)
                    .await
                    .and_then(|body| decode_list::<Property>(body, "properties"))
                {
                    Ok(items) => {
                        let stored = self.cache.lock().insert_list(
                            key,
                            query.clone(),
                            items.clone(),
                            generation,
                        );
                        if !stored {
                            tracing::debug!(key, "list response predates a write; not cached");
                        }
                        Ok(items)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn fetch_property(&self, id: &str) -> EstateResult<Property> {
        let generation = self.cache.lock().generation();
        let body = self.api.get(format!("/properties/{id}")).await?;
        let property = decode_record::<Property>(body, "property")?;
        if !self
            .cache
            .lock()
            .insert_property(property.clone(), generation)
        {
            tracing::debug!(id, "detail response predates a write; not cached");
        }
        Ok(property)
    }

    fn gate(&self, key: &str) -> GateTicket<'_> {
        let mut gates = self.gates.lock();
        let gate = gates.entry(key.to_owned()).or_insert_with(|| Gate {
            lock: Arc::default(),
            users: 0,
        });
        gate.users += 1;
        GateTicket {
            gates: &self.gates,
            key: key.to_owned(),
            lock: Arc::clone(&gate.lock),
        }
    }

    fn apply_list(&self, seq: u64, items: &[Property]) {
        if seq != self.list_seq.load(Ordering::SeqCst) {
            tracing::debug!(seq, "superseded list response ignored");
            return;
        }
        let mut state = self.state.write();
        state.properties = items.to_vec();
        state.error = None;
        state.loading = false;
    }

    fn fail_list(&self, seq: u64, e: &EstateError) {
        if seq != self.list_seq.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.write();
        state.properties.clear();
        state.error = Some(e.message().to_owned());
        state.loading = false;
    }

    fn record_error(&self, e: &EstateError) {
        self.state.write().error = Some(e.message().to_owned());
    }
}

fn detail_key(id: &str) -> String {
    format!("properties/{id}")
}

/// An unwrapped update response holds a record unless it is empty or an
/// acknowledgement object without an id.
fn carries_record(payload: &Value) -> bool {
    match payload {
        Value::Null => false,
        Value::Object(map) => {
            map.get("property").is_some_and(Value::is_object)
                || map.contains_key("id")
                || map.contains_key("_id")
        }
        _ => true,
    }
}

/// JSON body without uploads; multipart form with them. In the form,
/// structured fields are JSON-encoded text parts and each upload is an
/// `images` file part.
fn write_request(method: Method, path: String, draft: &PropertyDraft) -> EstateResult<ApiRequest> {
    let body = serde_json::to_value(draft)
        .map_err(|e| EstateError::InvalidInput(format!("encode property: {e}")))?;

    if draft.uploads.is_empty() {
        return Ok(ApiRequest::new(method, path).json(body));
    }

    let serde_json::Value::Object(fields) = body else {
        return Err(EstateError::InvalidInput("property draft must encode as an object".into()));
    };
    let mut parts: Vec<FormPart> = fields
        .into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(s) => FormPart::text(name, s),
            other => FormPart::text(name, other.to_string()),
        })
        .collect();
    parts.extend(draft.uploads.iter().map(|u| FormPart::File {
        name: "images".to_owned(),
        file_name: u.file_name.clone(),
        content_type: u.content_type.clone(),
        bytes: u.bytes.clone(),
    }));

    Ok(ApiRequest::new(method, path).multipart(parts))
}
