use super::Transport;
use crate::endpoints::{Method, RequestDescriptor};
use crate::error::{GalleryError, Result};
use crate::model::{Album, EntityId, Photo, User};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

const COLLECTIONS: [&str; 3] = ["users", "albums", "photos"];

enum Failure {
    Offline,
    Status(u16),
    Body(Value),
}

struct BackendState {
    collections: BTreeMap<String, Vec<Value>>,
    next_id: u64,
    log: Vec<RequestDescriptor>,
    failures: VecDeque<Failure>,
}

/// In-process stand-in for the REST server.
///
/// Behaves like a json-server database with `users`, `albums` and `photos`
/// collections. Clones share the same data, so a test can keep a handle
/// while the API owns another.
#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(BackendState {
                collections: COLLECTIONS
                    .iter()
                    .map(|name| (name.to_string(), Vec::new()))
                    .collect(),
                next_id: 1,
                log: Vec::new(),
                failures: VecDeque::new(),
            })),
            gate: Arc::new(gate),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a record directly, assigning an id when it has none.
    pub fn seed(&self, collection: &str, item: Value) -> Value {
        self.lock().insert(collection, item)
    }

    pub fn seed_user(&self, name: &str) -> Result<User> {
        self.seed_typed("users", json!({ "name": name }))
    }

    pub fn seed_album(&self, user_id: &EntityId, title: &str) -> Result<Album> {
        self.seed_typed("albums", json!({ "userId": user_id, "title": title }))
    }

    pub fn seed_photo(&self, album_id: &EntityId, title: &str) -> Result<Photo> {
        self.seed_typed(
            "photos",
            json!({ "albumId": album_id, "title": title, "url": "https://picsum.photos/150" }),
        )
    }

    fn seed_typed<T: DeserializeOwned>(&self, collection: &str, item: Value) -> Result<T> {
        let stored = self.seed(collection, item);
        Ok(serde_json::from_value(stored)?)
    }

    pub fn items(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Number of requests received for `method` on exactly `path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// The next request fails with this HTTP status.
    pub fn fail_next_with_status(&self, status: u16) {
        self.lock().failures.push_back(Failure::Status(status));
    }

    /// The next request fails as if the server were unreachable.
    pub fn fail_next_offline(&self) {
        self.lock().failures.push_back(Failure::Offline);
    }

    /// The next request succeeds with `body` instead of the real answer.
    pub fn respond_next_with(&self, body: Value) {
        self.lock().failures.push_back(Failure::Body(body));
    }

    /// Requests are logged but not answered until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    pub fn release(&self) {
        self.gate.send_replace(false);
    }
}

impl BackendState {
    fn insert(&mut self, collection: &str, item: Value) -> Value {
        let mut record = match item {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match record.get("id").and_then(Value::as_u64) {
            Some(id) => self.next_id = self.next_id.max(id + 1),
            None if !record.contains_key("id") => {
                record.insert("id".to_string(), json!(self.next_id));
                self.next_id += 1;
            }
            None => {}
        }
        let record = Value::Object(record);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn route(&mut self, request: &RequestDescriptor) -> Result<Value> {
        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, [collection]) => {
                let items = self.collection(collection)?;
                let matching = items
                    .iter()
                    .filter(|item| {
                        request
                            .params
                            .iter()
                            .all(|(field, wanted)| field_matches(item, field, wanted))
                    })
                    .cloned()
                    .collect();
                Ok(Value::Array(matching))
            }
            (Method::Get, [collection, id]) => self
                .collection(collection)?
                .iter()
                .find(|item| field_matches(item, "id", id))
                .cloned()
                .ok_or_else(not_found),
            (Method::Post, [collection]) => {
                self.collection(collection)?;
                let body = request.body.clone().unwrap_or_else(|| json!({}));
                Ok(self.insert(collection, body))
            }
            (Method::Delete, [collection, id]) => {
                let items = self
                    .collections
                    .get_mut(*collection)
                    .ok_or_else(not_found)?;
                let position = items
                    .iter()
                    .position(|item| field_matches(item, "id", id))
                    .ok_or_else(not_found)?;
                items.remove(position);
                Ok(json!({}))
            }
            _ => Err(not_found()),
        }
    }

    fn collection(&self, name: &str) -> Result<&Vec<Value>> {
        self.collections.get(name).ok_or_else(not_found)
    }
}

/// Compares a record field against a query-string value the way a REST
/// server would: numbers and strings both match their textual form.
fn field_matches(item: &Value, field: &str, wanted: &str) -> bool {
    match item.get(field) {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Number(n)) => n.to_string() == wanted,
        Some(Value::Bool(b)) => b.to_string() == wanted,
        _ => false,
    }
}

fn not_found() -> GalleryError {
    GalleryError::Http {
        status: 404,
        body: "Not Found".to_string(),
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value> {
        let failure = {
            let mut state = self.lock();
            state.log.push(request.clone());
            state.failures.pop_front()
        };

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|held| !*held).await;

        match failure {
            Some(Failure::Offline) => Err(GalleryError::Network("connection refused".to_string())),
            Some(Failure::Status(status)) => Err(GalleryError::Http {
                status,
                body: "Injected failure".to_string(),
            }),
            Some(Failure::Body(body)) => Ok(body),
            None => self.lock().route(request),
        }
    }
}
