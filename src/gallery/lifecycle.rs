//! # Request Lifecycle
//!
//! Every request moves through `idle → pending → fulfilled | rejected`.
//! Terminal states are final: issuing the same operation again creates a new
//! [`RequestState`] with a fresh request id instead of rewinding the old one.
//!
//! [`InFlight`] is the de-duplication table. While a query key has a request
//! in flight, every other observer of that key awaits the same shared future
//! rather than issuing its own network call.

use crate::cache::QueryKey;
use crate::error::{GalleryError, RequestError, Result};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Fulfilled | RequestStatus::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Pending => "pending",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Rejected => "rejected",
        })
    }
}

/// One invocation of an operation.
#[derive(Debug, Clone)]
pub struct RequestState<T = Value> {
    pub request_id: Uuid,
    pub endpoint: &'static str,
    pub status: RequestStatus,
    pub data: Option<T>,
    pub error: Option<RequestError>,
    pub started_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
}

pub type MutationState<T = Value> = RequestState<T>;

impl<T> RequestState<T> {
    pub fn idle(endpoint: &'static str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            endpoint,
            status: RequestStatus::Idle,
            data: None,
            error: None,
            started_at: None,
            settled_at: None,
        }
    }

    /// A new invocation, already issued.
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            status: RequestStatus::Pending,
            started_at: Some(Utc::now()),
            ..Self::idle(endpoint)
        }
    }

    pub fn begin(&mut self) -> Result<()> {
        self.transition(RequestStatus::Idle, RequestStatus::Pending)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn fulfill(&mut self, data: T) -> Result<()> {
        self.transition(RequestStatus::Pending, RequestStatus::Fulfilled)?;
        self.data = Some(data);
        self.settled_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, error: RequestError) -> Result<()> {
        self.transition(RequestStatus::Pending, RequestStatus::Rejected)?;
        self.error = Some(error);
        self.settled_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, expected: RequestStatus, to: RequestStatus) -> Result<()> {
        if self.status != expected {
            return Err(GalleryError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == RequestStatus::Fulfilled
    }

    pub fn is_error(&self) -> bool {
        self.status == RequestStatus::Rejected
    }

    /// Hands back the data of a fulfilled request, or its error.
    pub fn into_result(self) -> Result<T> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(GalleryError::Request(error)),
            (None, None) => Err(GalleryError::Request(RequestError::internal(format!(
                "{} is still {}",
                self.endpoint, self.status
            )))),
        }
    }
}

pub type RequestOutcome = std::result::Result<Value, RequestError>;
pub type SharedRequest = Shared<BoxFuture<'static, RequestOutcome>>;

/// Requests currently on the wire, by query key.
#[derive(Default)]
pub struct InFlight {
    requests: HashMap<QueryKey, (Uuid, SharedRequest)>,
}

impl InFlight {
    pub fn get(&self, key: &QueryKey) -> Option<SharedRequest> {
        self.requests.get(key).map(|(_, request)| request.clone())
    }

    pub fn insert(&mut self, key: QueryKey, request_id: Uuid, request: SharedRequest) {
        self.requests.insert(key, (request_id, request));
    }

    /// Removes the entry if it still belongs to `request_id`.
    pub fn finish(&mut self, key: &QueryKey, request_id: Uuid) -> bool {
        match self.requests.get(key) {
            Some((id, _)) if *id == request_id => {
                self.requests.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.requests.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[test]
    fn pending_to_fulfilled() {
        let mut state: RequestState = RequestState::start("addAlbum");
        assert!(state.is_loading());
        assert!(state.started_at.is_some());

        state.fulfill(json!({"id": 1})).unwrap();
        assert!(state.is_success());
        assert_eq!(state.data, Some(json!({"id": 1})));
        assert!(state.settled_at.is_some());
    }

    #[test]
    fn idle_must_begin_before_settling() {
        let mut state: RequestState<u32> = RequestState::idle("fetchUsers");
        assert!(matches!(
            state.fulfill(1),
            Err(GalleryError::InvalidTransition {
                from: RequestStatus::Idle,
                to: RequestStatus::Fulfilled
            })
        ));
        state.begin().unwrap();
        state.fulfill(1).unwrap();
    }

    #[test]
    fn terminal_states_are_final() {
        let mut state: RequestState<u32> = RequestState::start("removeAlbum");
        state.reject(RequestError::internal("down")).unwrap();
        assert!(state.status.is_terminal());

        assert!(state.fulfill(2).is_err());
        assert!(state.reject(RequestError::internal("again")).is_err());
        assert!(state.begin().is_err());
        assert_eq!(state.data, None);
        assert_eq!(state.error.as_ref().unwrap().message, "down");
    }

    #[test]
    fn each_invocation_gets_its_own_id() {
        let a: RequestState = RequestState::start("addUser");
        let b: RequestState = RequestState::start("addUser");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn into_result_surfaces_the_error() {
        let mut state: RequestState<u32> = RequestState::start("fetchUsers");
        state.reject(RequestError::internal("nope")).unwrap();
        assert!(matches!(
            state.into_result(),
            Err(GalleryError::Request(e)) if e.message == "nope"
        ));
    }

    #[test]
    fn finish_ignores_superseded_requests() {
        let key = QueryKey::new("fetchAlbums", &json!({"id": 1}));
        let request = async { Ok(json!([])) }.boxed().shared();
        let first = Uuid::new_v4();
        let mut in_flight = InFlight::default();
        in_flight.insert(key.clone(), first, request);

        assert!(!in_flight.finish(&key, Uuid::new_v4()));
        assert!(in_flight.contains(&key));
        assert!(in_flight.finish(&key, first));
        assert!(in_flight.is_empty());
    }
}
