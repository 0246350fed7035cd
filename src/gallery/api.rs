//! # API Facade
//!
//! [`GalleryApi`] is the single entry point for every remote operation,
//! whatever drives it (the CLI, a test, another frontend). It owns the
//! [`Store`] and a [`Transport`], and looks operations up by name in an
//! [`EndpointRegistry`].
//!
//! ## Queries
//!
//! A query is observed through a [`Subscription`]. Observing a key that has
//! no data, or whose data went stale, issues a request; observing a key whose
//! request is already on the wire awaits that same request. The network call
//! runs in its own task, so an observer giving up does not cancel it: the
//! result lands in the cache, or is dropped when nobody is left to read it.
//!
//! ## Mutations
//!
//! A mutation runs, and on success invalidates the tags its endpoint names.
//! Every cached query carrying one of those tags turns stale. The ones that
//! still have subscribers are refetched before the mutation call returns. A
//! failed mutation touches neither the cache nor the tag index.
//!
//! ## Users
//!
//! Users are not cached per query. They live in the [`UsersSlice`], updated
//! by [`fetch_users`](GalleryApi::fetch_users), [`add_user`](GalleryApi::add_user)
//! and [`remove_user`](GalleryApi::remove_user). Overlapping user fetches
//! share one request, the same way queries do.
//!
//! ## Errors
//!
//! Request failures are data: they come back as rejected states. `Err` is
//! reserved for problems found before anything is sent, such as an unknown
//! operation name or an argument the endpoint cannot build a request from.

use crate::cache::{QueryEntry, QueryKey};
use crate::config::GalleryConfig;
use crate::endpoints::{names, Endpoint, EndpointRegistry, Tag};
use crate::error::{GalleryError, RequestError, Result};
use crate::lifecycle::{MutationState, RequestOutcome, RequestStatus, SharedRequest};
use crate::model::{Album, NewUser, Photo, User};
use crate::store::{Store, UsersSlice};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Snapshot of one cached query.
#[derive(Debug, Clone)]
pub struct QueryState<D = Value> {
    pub key: QueryKey,
    pub data: Option<D>,
    pub status: RequestStatus,
    pub error: Option<RequestError>,
    /// A request for this key is on the wire.
    pub is_fetching: bool,
    pub is_stale: bool,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl<D> QueryState<D> {
    /// Fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching && self.data.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.status == RequestStatus::Rejected
    }

    /// The data, or the error of a rejected fetch.
    pub fn into_result(self) -> Result<D> {
        if self.status == RequestStatus::Rejected {
            let error = self
                .error
                .unwrap_or_else(|| RequestError::internal(format!("{} was rejected", self.key)));
            return Err(GalleryError::Request(error));
        }
        let key = self.key;
        self.data.ok_or_else(|| {
            GalleryError::Request(RequestError::internal(format!("{} has no data yet", key)))
        })
    }
}

impl QueryState<Value> {
    fn from_entry(key: QueryKey, entry: Option<&QueryEntry>) -> Self {
        match entry {
            Some(entry) => Self {
                key,
                data: entry.data.clone(),
                status: entry.status,
                error: entry.error.clone(),
                is_fetching: entry.is_pending(),
                is_stale: entry.stale,
                fulfilled_at: entry.fulfilled_at,
            },
            None => Self {
                key,
                data: None,
                status: RequestStatus::Idle,
                error: None,
                is_fetching: false,
                is_stale: false,
                fulfilled_at: None,
            },
        }
    }

    /// Projects the cached JSON onto a typed view.
    pub fn decode<U: DeserializeOwned>(self) -> Result<QueryState<U>> {
        let data = self.data.map(serde_json::from_value::<U>).transpose()?;
        Ok(QueryState {
            key: self.key,
            data,
            status: self.status,
            error: self.error,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            fulfilled_at: self.fulfilled_at,
        })
    }
}

struct Inner<T> {
    transport: T,
    registry: EndpointRegistry,
    store: Mutex<Store>,
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, name: &str) -> Result<Endpoint> {
        self.registry.get(name).copied()
    }

    fn query_endpoint(&self, name: &str) -> Result<Endpoint> {
        let endpoint = self.endpoint(name)?;
        if !endpoint.is_query() {
            return Err(GalleryError::InvalidArgument(format!(
                "{} is a mutation, not a query",
                name
            )));
        }
        Ok(endpoint)
    }

    fn mutation_endpoint(&self, name: &str) -> Result<Endpoint> {
        let endpoint = self.endpoint(name)?;
        if endpoint.is_query() {
            return Err(GalleryError::InvalidArgument(format!(
                "{} is a query, not a mutation",
                name
            )));
        }
        Ok(endpoint)
    }

    /// Records the outcome of a query request and hands it to every waiter.
    fn settle_query(
        &self,
        endpoint: Endpoint,
        key: &QueryKey,
        arg: &Value,
        request_id: Uuid,
        outcome: Result<Value>,
    ) -> RequestOutcome {
        let mut store = self.lock();
        let current = store.in_flight.finish(key, request_id);

        let tagged = outcome.and_then(|data| {
            let tags = endpoint.tags_for(&data, arg)?;
            Ok((data, tags))
        });
        match tagged {
            Ok((data, tags)) => {
                debug!(%key, %request_id, tags = tags.len(), "query fulfilled");
                if current {
                    store.queries.settle_success(key, data.clone(), tags);
                }
                Ok(data)
            }
            Err(err) => {
                let error = RequestError::from(&err);
                warn!(%key, %request_id, error = %error, "query rejected");
                if current {
                    store.queries.settle_failure(key, error.clone());
                }
                Err(error)
            }
        }
    }
}

/// Facade over the store, the endpoint registry and a transport.
///
/// Cheap to clone; clones share the same store.
pub struct GalleryApi<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for GalleryApi<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> GalleryApi<T> {
    pub fn new(transport: T, config: &GalleryConfig) -> Self {
        Self::with_registry(transport, EndpointRegistry::standard(), config)
    }

    pub fn with_registry(transport: T, registry: EndpointRegistry, config: &GalleryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                registry,
                store: Mutex::new(Store::new(config)),
            }),
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.inner.registry
    }

    // --- Queries ---

    /// Starts observing `name(arg)`. Nothing is fetched until
    /// [`Subscription::fetch`] is awaited.
    pub fn subscribe(&self, name: &str, arg: &Value) -> Result<Subscription<T>> {
        let endpoint = self.inner.query_endpoint(name)?;
        let key = QueryKey::new(endpoint.name, arg);
        self.inner.lock().queries.subscribe(&key, arg);
        Ok(Subscription {
            api: self.clone(),
            endpoint,
            key,
            arg: arg.clone(),
        })
    }

    /// Observes `name(arg)` once: fetches if needed and returns what the
    /// cache holds afterwards.
    pub async fn query(&self, name: &str, arg: &Value) -> Result<QueryState> {
        let subscription = self.subscribe(name, arg)?;
        subscription.fetch().await?;
        Ok(subscription.state())
    }

    /// Reads the cached state of `name(arg)` without fetching.
    pub fn select(&self, name: &str, arg: &Value) -> Result<QueryState> {
        let endpoint = self.inner.query_endpoint(name)?;
        Ok(self.select_key(&QueryKey::new(endpoint.name, arg)))
    }

    fn select_key(&self, key: &QueryKey) -> QueryState {
        let store = self.inner.lock();
        QueryState::from_entry(key.clone(), store.queries.get(key))
    }

    async fn fetch_key(&self, endpoint: Endpoint, key: &QueryKey, arg: &Value) -> Result<()> {
        loop {
            let (request, joined) = {
                let mut store = self.inner.lock();
                if let Some(request) = store.in_flight.get(key) {
                    debug!(%key, "joining in-flight request");
                    (request, true)
                } else if store.queries.needs_fetch(key) {
                    (self.start_query(&mut store, endpoint, key, arg)?, false)
                } else {
                    return Ok(());
                }
            };

            // Failures are already recorded on the entry.
            let _ = request.await;

            // A joined request may have been issued before an invalidation
            // this caller needs to see.
            let outdated = self
                .inner
                .lock()
                .queries
                .get(key)
                .is_some_and(|entry| entry.stale && entry.status == RequestStatus::Fulfilled);
            if !joined || !outdated {
                return Ok(());
            }
        }
    }

    fn start_query(
        &self,
        store: &mut Store,
        endpoint: Endpoint,
        key: &QueryKey,
        arg: &Value,
    ) -> Result<SharedRequest> {
        let request = endpoint.build_request(arg)?;
        let request_id = Uuid::new_v4();
        store.queries.begin(key, arg, request_id);
        debug!(%key, %request, %request_id, "query started");

        let shared = spawn_request({
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            let arg = arg.clone();
            async move {
                let outcome = inner.transport.execute(&request).await;
                inner.settle_query(endpoint, &key, &arg, request_id, outcome)
            }
        });

        store.in_flight.insert(key.clone(), request_id, shared.clone());
        Ok(shared)
    }

    // --- Mutations ---

    /// Runs mutation `name(arg)`, then invalidates and refetches.
    pub async fn mutate(&self, name: &str, arg: &Value) -> Result<MutationState> {
        self.run_mutation(name, arg).await
    }

    async fn run_mutation<U: DeserializeOwned>(
        &self,
        name: &str,
        arg: &Value,
    ) -> Result<MutationState<U>> {
        let endpoint = self.inner.mutation_endpoint(name)?;
        let request = endpoint.build_request(arg)?;
        let mut state = MutationState::start(endpoint.name);
        debug!(%request, request_id = %state.request_id, "mutation started");

        let outcome = self.inner.transport.execute(&request).await.and_then(|data| {
            let tags = endpoint.tags_for(&data, arg)?;
            let data = serde_json::from_value::<U>(data)?;
            Ok((data, tags))
        });
        match outcome {
            Ok((data, tags)) => {
                state.fulfill(data)?;
                debug!(%request, request_id = %state.request_id, "mutation fulfilled");
                self.invalidate(&tags).await;
            }
            Err(err) => {
                let error = RequestError::from(&err);
                warn!(%request, request_id = %state.request_id, error = %error, "mutation rejected");
                state.reject(error)?;
            }
        }
        Ok(state)
    }

    /// Marks every query tagged with one of `tags` stale and refetches the
    /// observed ones. Returns all keys that were marked.
    pub async fn invalidate(&self, tags: &[Tag]) -> Vec<QueryKey> {
        let (affected, refetch) = {
            let mut store = self.inner.lock();
            let affected = store.queries.invalidate(tags);
            let refetch: Vec<(Endpoint, QueryKey, Value)> = affected
                .iter()
                .filter(|key| store.queries.is_observed(key))
                .filter_map(|key| {
                    let endpoint = self.inner.endpoint(key.endpoint).ok()?;
                    let arg = store.queries.get(key)?.arg.clone();
                    Some((endpoint, key.clone(), arg))
                })
                .collect();
            (affected, refetch)
        };

        let results = join_all(
            refetch
                .iter()
                .map(|(endpoint, key, arg)| self.fetch_key(*endpoint, key, arg)),
        )
        .await;
        for ((_, key, _), result) in refetch.iter().zip(results) {
            if let Err(err) = result {
                warn!(%key, error = %err, "refetch after invalidation failed");
            }
        }
        affected
    }

    /// Evicts cached queries nobody has observed for the keep window.
    ///
    /// Runs on its own once a key's window runs out; calling it directly
    /// only matters outside a tokio runtime.
    pub fn collect_garbage(&self) -> Vec<QueryKey> {
        self.inner.lock().queries.collect_garbage(Instant::now())
    }

    /// Sweeps the cache once `keep_unused_for` has passed, if the API is
    /// still alive by then.
    fn schedule_collection(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let keep = self.inner.lock().queries.keep_unused_for();
        let inner = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep(keep).await;
            if let Some(inner) = inner.upgrade() {
                let evicted = inner.lock().queries.collect_garbage(Instant::now());
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "evicted unused queries");
                }
            }
        });
    }

    /// Keys currently cached, sorted.
    pub fn cached_keys(&self) -> Vec<QueryKey> {
        let store = self.inner.lock();
        let mut keys: Vec<QueryKey> = store.queries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Keys the tag index holds under `tag`.
    pub fn tagged(&self, tag: &Tag) -> Vec<QueryKey> {
        self.inner.lock().queries.keys_for(tag)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    // --- Users ---

    pub fn users(&self) -> UsersSlice {
        self.inner.lock().users.clone()
    }

    /// Refreshes the users slice. Overlapping calls share one request and
    /// all see the slice it settled.
    pub async fn fetch_users(&self) -> Result<UsersSlice> {
        let endpoint = self.inner.query_endpoint(names::FETCH_USERS)?;
        let key = QueryKey::new(endpoint.name, &Value::Null);
        let request = {
            let mut store = self.inner.lock();
            match store.in_flight.get(&key) {
                Some(request) => {
                    debug!(%key, "joining in-flight request");
                    request
                }
                None => self.start_users_fetch(&mut store, endpoint, key)?,
            }
        };

        // Failures are already recorded on the slice.
        let _ = request.await;
        Ok(self.users())
    }

    fn start_users_fetch(
        &self,
        store: &mut Store,
        endpoint: Endpoint,
        key: QueryKey,
    ) -> Result<SharedRequest> {
        let request = endpoint.build_request(&Value::Null)?;
        let request_id = Uuid::new_v4();
        store.users.pending();
        debug!(%request, %request_id, "fetching users");

        let shared = spawn_request({
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            async move {
                let outcome = inner.transport.execute(&request).await;
                let users = outcome
                    .as_ref()
                    .map_err(RequestError::from)
                    .and_then(|data| {
                        serde_json::from_value::<Vec<User>>(data.clone())
                            .map_err(|e| RequestError::from(GalleryError::from(e)))
                    });

                let mut store = inner.lock();
                store.in_flight.finish(&key, request_id);
                match users {
                    Ok(users) => {
                        debug!(%request_id, count = users.len(), "users fetched");
                        store.users.fetch_fulfilled(users);
                    }
                    Err(error) => {
                        warn!(%request_id, error = %error, "fetching users failed");
                        store.users.rejected(error.clone());
                        return Err(error);
                    }
                }
                outcome.map_err(RequestError::from)
            }
        });

        store.in_flight.insert(key, request_id, shared.clone());
        Ok(shared)
    }

    pub async fn add_user(&self, user: &NewUser) -> Result<MutationState<User>> {
        self.inner.lock().users.pending();
        let result = self.run_mutation::<User>(names::ADD_USER, &to_arg(user)?).await;
        let mut store = self.inner.lock();
        match &result {
            Ok(state) => match (&state.data, &state.error) {
                (Some(created), _) => store.users.add_fulfilled(created.clone()),
                (None, Some(error)) => store.users.rejected(error.clone()),
                (None, None) => {}
            },
            Err(err) => store.users.rejected(RequestError::from(err)),
        }
        result
    }

    pub async fn remove_user(&self, user: &User) -> Result<MutationState> {
        self.inner.lock().users.pending();
        let result = self.run_mutation::<Value>(names::REMOVE_USER, &to_arg(user)?).await;
        let mut store = self.inner.lock();
        match &result {
            Ok(state) if state.is_success() => store.users.remove_fulfilled(user),
            Ok(state) => {
                if let Some(error) = &state.error {
                    store.users.rejected(error.clone());
                }
            }
            Err(err) => store.users.rejected(RequestError::from(err)),
        }
        result
    }

    // --- Albums ---

    pub async fn fetch_albums(&self, user: &User) -> Result<QueryState<Vec<Album>>> {
        self.query(names::FETCH_ALBUMS, &to_arg(user)?).await?.decode()
    }

    pub async fn add_album(&self, user: &User) -> Result<MutationState<Album>> {
        self.run_mutation(names::ADD_ALBUM, &to_arg(user)?).await
    }

    pub async fn remove_album(&self, album: &Album) -> Result<MutationState> {
        self.run_mutation(names::REMOVE_ALBUM, &to_arg(album)?).await
    }

    // --- Photos ---

    pub async fn fetch_photos(&self, album: &Album) -> Result<QueryState<Vec<Photo>>> {
        self.query(names::FETCH_PHOTOS, &to_arg(album)?).await?.decode()
    }

    pub async fn add_photo(&self, album: &Album) -> Result<MutationState<Photo>> {
        self.run_mutation(names::ADD_PHOTO, &to_arg(album)?).await
    }

    pub async fn remove_photo(&self, photo: &Photo) -> Result<MutationState> {
        self.run_mutation(names::REMOVE_PHOTO, &to_arg(photo)?).await
    }
}

fn to_arg<A: Serialize>(arg: &A) -> Result<Value> {
    Ok(serde_json::to_value(arg)?)
}

/// Runs `request` on its own task so dropping every waiter does not cancel
/// it, and hands out a future any number of waiters can share.
fn spawn_request<F>(request: F) -> SharedRequest
where
    F: Future<Output = RequestOutcome> + Send + 'static,
{
    let task = tokio::spawn(request);
    async move {
        task.await
            .unwrap_or_else(|e| Err(RequestError::internal(format!("request task failed: {}", e))))
    }
    .boxed()
    .shared()
}

/// Keeps one query observed while alive.
///
/// Dropping the last subscription for a key starts its keep window; with a
/// zero window the entry goes right away.
pub struct Subscription<T: Transport> {
    api: GalleryApi<T>,
    endpoint: Endpoint,
    key: QueryKey,
    arg: Value,
}

impl<T: Transport> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Fetches if the entry has no data or went stale, joining a request
    /// already on the wire.
    pub async fn fetch(&self) -> Result<()> {
        self.api.fetch_key(self.endpoint, &self.key, &self.arg).await
    }

    pub fn state(&self) -> QueryState {
        self.api.select_key(&self.key)
    }
}

impl<T: Transport> Drop for Subscription<T> {
    fn drop(&mut self) {
        let unused = self.api.inner.lock().queries.unsubscribe(&self.key);
        if unused {
            self.api.schedule_collection();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::{Method, TagKind};
    use crate::model::EntityRef;
    use crate::transport::memory::InMemoryBackend;
    use serde_json::json;

    fn setup() -> (GalleryApi<InMemoryBackend>, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let api = GalleryApi::new(backend.clone(), &GalleryConfig::default());
        (api, backend)
    }

    #[tokio::test]
    async fn query_caches_until_invalidated() {
        let (api, backend) = setup();
        let ann = backend.seed_user("Ann").unwrap();
        backend.seed_album(&ann.id, "Beach").unwrap();

        let first = api.fetch_albums(&ann).await.unwrap();
        assert_eq!(first.status, RequestStatus::Fulfilled);
        assert_eq!(first.data.unwrap()[0].title, "Beach");

        api.fetch_albums(&ann).await.unwrap();
        assert_eq!(backend.count(Method::Get, "/albums"), 1, "served from cache");

        api.invalidate(&[Tag::new(TagKind::UsersAlbums, ann.id.clone())])
            .await;
        api.fetch_albums(&ann).await.unwrap();
        assert_eq!(backend.count(Method::Get, "/albums"), 2);
    }

    #[tokio::test]
    async fn unknown_endpoints_and_kind_mismatches_are_errors() {
        let (api, backend) = setup();
        assert!(matches!(
            api.query("fetchComments", &json!({})).await,
            Err(GalleryError::UnknownEndpoint(_))
        ));
        assert!(matches!(
            api.query(names::ADD_ALBUM, &json!({"id": 1})).await,
            Err(GalleryError::InvalidArgument(_))
        ));
        assert!(matches!(
            api.mutate(names::FETCH_ALBUMS, &json!({"id": 1})).await,
            Err(GalleryError::InvalidArgument(_))
        ));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn rejected_query_is_data_not_err() {
        let (api, backend) = setup();
        backend.fail_next_with_status(500);

        let state = api
            .query(names::FETCH_ALBUMS, &json!(EntityRef::new(1u64)))
            .await
            .unwrap();
        assert!(state.is_error());
        assert_eq!(state.error.as_ref().unwrap().status, Some(500));
        assert!(state.into_result().is_err());
    }

    #[tokio::test]
    async fn select_does_not_fetch() {
        let (api, backend) = setup();
        let arg = json!(EntityRef::new(1u64));
        let state = api.select(names::FETCH_ALBUMS, &arg).unwrap();
        assert_eq!(state.status, RequestStatus::Idle);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn subscription_keeps_entry_for_refetch() {
        let (api, backend) = setup();
        let ann = backend.seed_user("Ann").unwrap();
        let arg = to_arg(&ann).unwrap();

        let subscription = api.subscribe(names::FETCH_ALBUMS, &arg).unwrap();
        subscription.fetch().await.unwrap();
        assert_eq!(subscription.state().data, Some(json!([])));

        let added = api.add_album(&ann).await.unwrap();
        assert!(added.is_success());

        let state = subscription.state();
        assert!(!state.is_stale, "refetched before the mutation returned");
        assert_eq!(state.data.unwrap().as_array().unwrap().len(), 1);
        assert_eq!(backend.count(Method::Get, "/albums"), 2);
    }

    #[tokio::test]
    async fn zero_keep_window_drops_entries_with_last_subscriber() {
        let backend = InMemoryBackend::new();
        let config = GalleryConfig {
            keep_unused_secs: 0,
            ..GalleryConfig::default()
        };
        let api = GalleryApi::new(backend.clone(), &config);

        api.query(names::FETCH_ALBUMS, &json!(EntityRef::new(1u64)))
            .await
            .unwrap();
        assert!(api.cached_keys().is_empty());
    }

    #[tokio::test]
    async fn garbage_collection_keeps_recent_entries() {
        let (api, _backend) = setup();
        api.query(names::FETCH_ALBUMS, &json!(EntityRef::new(1u64)))
            .await
            .unwrap();
        assert!(api.collect_garbage().is_empty());
        assert_eq!(api.cached_keys().len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_alone() {
        let (api, backend) = setup();
        let ann = backend.seed_user("Ann").unwrap();
        let album = backend.seed_album(&ann.id, "Beach").unwrap();
        api.fetch_albums(&ann).await.unwrap();

        backend.fail_next_offline();
        let removed = api.remove_album(&album).await.unwrap();
        assert!(removed.is_error());

        let key = QueryKey::new(names::FETCH_ALBUMS, &to_arg(&ann).unwrap());
        assert!(!api.select_key(&key).is_stale);
        assert_eq!(api.tagged(&Tag::new(TagKind::Album, album.id.clone())), vec![key]);
    }

    #[tokio::test]
    async fn users_slice_follows_mutations() {
        let (api, backend) = setup();
        backend.seed_user("Ann").unwrap();

        let users = api.fetch_users().await.unwrap();
        assert_eq!(users.data.len(), 1);

        let bo = api.add_user(&NewUser::new("Bo")).await.unwrap();
        let bo = bo.into_result().unwrap();
        assert_eq!(api.users().data.len(), 2);

        backend.fail_next_with_status(503);
        let failed = api.remove_user(&bo).await.unwrap();
        assert!(failed.is_error());
        let users = api.users();
        assert_eq!(users.status, RequestStatus::Rejected);
        assert_eq!(users.data.len(), 2);

        api.remove_user(&bo).await.unwrap();
        assert_eq!(api.users().data, vec![users.data[0].clone()]);
    }
}
