//! # Entity Store
//!
//! The process-wide state behind a [`GalleryApi`](crate::api::GalleryApi):
//!
//! - the users slice, a plain collection with its own request status, driven
//!   by the fetch/add/remove user operations;
//! - the [`QueryCache`] holding album and photo lists per query key;
//! - the [`InFlight`] table used to coalesce identical queries.
//!
//! The store is constructed explicitly and owned by the API, never reached
//! through a global.

use crate::cache::QueryCache;
use crate::config::GalleryConfig;
use crate::error::RequestError;
use crate::lifecycle::{InFlight, RequestStatus};
use crate::model::User;

/// Users and the status of the last request that touched them.
///
/// Data only changes on a fulfilled request. A rejected one records its error
/// and leaves the list as it was.
///
/// Requests are not ordered against each other: a fetch that settles after
/// an add or remove replaces the list with whatever the server returned when
/// the fetch was answered, which may predate the change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsersSlice {
    pub status: RequestStatus,
    pub data: Vec<User>,
    pub error: Option<RequestError>,
}

impl UsersSlice {
    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn pending(&mut self) {
        self.status = RequestStatus::Pending;
    }

    pub fn fetch_fulfilled(&mut self, users: Vec<User>) {
        self.settled();
        self.data = users;
    }

    pub fn add_fulfilled(&mut self, user: User) {
        self.settled();
        self.data.push(user);
    }

    pub fn remove_fulfilled(&mut self, user: &User) {
        self.settled();
        self.data.retain(|u| u.id != user.id);
    }

    pub fn rejected(&mut self, error: RequestError) {
        self.status = RequestStatus::Rejected;
        self.error = Some(error);
    }

    fn settled(&mut self) {
        self.status = RequestStatus::Fulfilled;
        self.error = None;
    }
}

pub struct Store {
    pub users: UsersSlice,
    pub queries: QueryCache,
    pub in_flight: InFlight,
}

impl Store {
    pub fn new(config: &GalleryConfig) -> Self {
        Self {
            users: UsersSlice::default(),
            queries: QueryCache::new(config.keep_unused_for()),
            in_flight: InFlight::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;

    fn user(id: u64, name: &str) -> User {
        User {
            id: EntityId::from(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn fetch_add_remove_scenario() {
        let mut slice = UsersSlice::default();
        slice.pending();
        assert!(slice.is_loading());

        slice.fetch_fulfilled(vec![user(1, "Ann")]);
        slice.pending();
        slice.add_fulfilled(user(2, "Bo"));
        assert_eq!(slice.data, vec![user(1, "Ann"), user(2, "Bo")]);

        slice.pending();
        slice.remove_fulfilled(&user(1, "Ann"));
        assert_eq!(slice.data, vec![user(2, "Bo")]);
        assert_eq!(slice.status, RequestStatus::Fulfilled);
    }

    #[test]
    fn rejection_keeps_data() {
        let mut slice = UsersSlice::default();
        slice.fetch_fulfilled(vec![user(1, "Ann")]);
        slice.pending();
        slice.rejected(RequestError::internal("offline"));

        assert_eq!(slice.data, vec![user(1, "Ann")]);
        assert_eq!(slice.status, RequestStatus::Rejected);
        assert!(!slice.is_loading());

        slice.pending();
        slice.fetch_fulfilled(vec![]);
        assert_eq!(slice.error, None, "a later success clears the error");
    }

    #[test]
    fn late_fetch_replaces_added_users() {
        let mut slice = UsersSlice::default();
        slice.fetch_fulfilled(vec![user(1, "Ann")]);

        slice.pending();
        slice.pending();
        slice.add_fulfilled(user(2, "Bo"));
        // A fetch answered before Bo existed settles last.
        slice.fetch_fulfilled(vec![user(1, "Ann")]);

        assert_eq!(slice.data, vec![user(1, "Ann")]);
        assert_eq!(slice.status, RequestStatus::Fulfilled);
    }
}
