//! # Endpoint Registry
//!
//! Every remote operation is described by an explicit [`Endpoint`] value:
//! its name, whether it is a query or a mutation, the HTTP method and path,
//! a function turning the argument into a [`RequestDescriptor`], and a
//! function computing cache tags from `(result, argument)`.
//!
//! For queries the tags are the ones the cached result *provides*; for
//! mutations they are the ones a successful call *invalidates*.
//!
//! Arguments and results travel as `serde_json::Value` so the cache can key
//! entries by the canonical serialized argument, independent of the Rust
//! type the caller used.

use crate::error::{GalleryError, Result};
use crate::model::{random_image_url, random_title, EntityId, NewAlbum, NewPhoto};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub mod names {
    pub const FETCH_USERS: &str = "fetchUsers";
    pub const ADD_USER: &str = "addUser";
    pub const REMOVE_USER: &str = "removeUser";
    pub const FETCH_ALBUMS: &str = "fetchAlbums";
    pub const ADD_ALBUM: &str = "addAlbum";
    pub const REMOVE_ALBUM: &str = "removeAlbum";
    pub const FETCH_PHOTOS: &str = "fetchPhotos";
    pub const ADD_PHOTO: &str = "addPhoto";
    pub const REMOVE_PHOTO: &str = "removePhoto";
}

/// Scope id of the tag carried by the unscoped user list.
const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            params: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// What a tag addresses: a single entity, or a collection scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagKind {
    User,
    Album,
    Photo,
    /// Every user.
    Users,
    /// All albums belonging to one user.
    UsersAlbums,
    /// All photos inside one album.
    AlbumsPhotos,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagKind::User => "user",
            TagKind::Album => "album",
            TagKind::Photo => "photo",
            TagKind::Users => "users",
            TagKind::UsersAlbums => "usersAlbums",
            TagKind::AlbumsPhotos => "albumsPhotos",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub kind: TagKind,
    pub id: EntityId,
}

impl Tag {
    pub fn new(kind: TagKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Query,
    Mutation,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointKind::Query => "query",
            EndpointKind::Mutation => "mutation",
        })
    }
}

pub type RequestFn = fn(&Value) -> Result<RequestDescriptor>;
pub type TagsFn = fn(&Value, &Value) -> Result<Vec<Tag>>;

#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub name: &'static str,
    pub kind: EndpointKind,
    pub method: Method,
    /// Human-readable path template, e.g. `/albums?userId={id}`.
    pub path: &'static str,
    pub request: RequestFn,
    pub tags: TagsFn,
}

impl Endpoint {
    pub fn build_request(&self, arg: &Value) -> Result<RequestDescriptor> {
        (self.request)(arg)
    }

    pub fn tags_for(&self, result: &Value, arg: &Value) -> Result<Vec<Tag>> {
        (self.tags)(result, arg)
    }

    pub fn is_query(&self) -> bool {
        self.kind == EndpointKind::Query
    }
}

/// Maps operation names to their [`Endpoint`] definitions.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<&'static str, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the users, albums and photos endpoints.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for endpoint in standard_endpoints() {
            registry.register(endpoint);
        }
        registry
    }

    /// Adds an endpoint, returning the one it replaced.
    pub fn register(&mut self, endpoint: Endpoint) -> Option<Endpoint> {
        self.endpoints.insert(endpoint.name, endpoint)
    }

    pub fn get(&self, name: &str) -> Result<&Endpoint> {
        self.endpoints
            .get(name)
            .ok_or_else(|| GalleryError::UnknownEndpoint(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn standard_endpoints() -> [Endpoint; 9] {
    [
        Endpoint {
            name: names::FETCH_USERS,
            kind: EndpointKind::Query,
            method: Method::Get,
            path: "/users",
            request: |_| Ok(RequestDescriptor::get("/users")),
            tags: |result, _| {
                let mut tags = entity_tags(TagKind::User, result)?;
                tags.push(Tag::new(TagKind::Users, ALL));
                Ok(tags)
            },
        },
        Endpoint {
            name: names::ADD_USER,
            kind: EndpointKind::Mutation,
            method: Method::Post,
            path: "/users",
            request: |arg| {
                if arg.get("name").and_then(Value::as_str).is_none() {
                    return Err(GalleryError::InvalidArgument(
                        "a new user needs a name".to_string(),
                    ));
                }
                Ok(RequestDescriptor::post("/users", arg.clone()))
            },
            tags: |_, _| Ok(vec![Tag::new(TagKind::Users, ALL)]),
        },
        Endpoint {
            name: names::REMOVE_USER,
            kind: EndpointKind::Mutation,
            method: Method::Delete,
            path: "/users/{id}",
            request: |arg| Ok(RequestDescriptor::delete(format!("/users/{}", arg_id(arg)?))),
            tags: |_, arg| Ok(vec![Tag::new(TagKind::User, arg_id(arg)?)]),
        },
        Endpoint {
            name: names::FETCH_ALBUMS,
            kind: EndpointKind::Query,
            method: Method::Get,
            path: "/albums?userId={id}",
            request: |arg| Ok(RequestDescriptor::get("/albums").with_param("userId", arg_id(arg)?)),
            tags: |result, user| {
                let mut tags = entity_tags(TagKind::Album, result)?;
                tags.push(Tag::new(TagKind::UsersAlbums, arg_id(user)?));
                Ok(tags)
            },
        },
        Endpoint {
            name: names::ADD_ALBUM,
            kind: EndpointKind::Mutation,
            method: Method::Post,
            path: "/albums",
            request: |user| {
                let body = NewAlbum {
                    user_id: arg_id(user)?,
                    title: random_title(&mut rand::thread_rng()),
                };
                Ok(RequestDescriptor::post("/albums", serde_json::to_value(body)?))
            },
            tags: |_, user| Ok(vec![Tag::new(TagKind::UsersAlbums, arg_id(user)?)]),
        },
        Endpoint {
            name: names::REMOVE_ALBUM,
            kind: EndpointKind::Mutation,
            method: Method::Delete,
            path: "/albums/{id}",
            request: |album| {
                Ok(RequestDescriptor::delete(format!(
                    "/albums/{}",
                    arg_id(album)?
                )))
            },
            tags: |_, album| Ok(vec![Tag::new(TagKind::Album, arg_id(album)?)]),
        },
        Endpoint {
            name: names::FETCH_PHOTOS,
            kind: EndpointKind::Query,
            method: Method::Get,
            path: "/photos?albumId={id}",
            request: |album| {
                Ok(RequestDescriptor::get("/photos").with_param("albumId", arg_id(album)?))
            },
            tags: |result, album| {
                let mut tags = entity_tags(TagKind::Photo, result)?;
                tags.push(Tag::new(TagKind::AlbumsPhotos, arg_id(album)?));
                Ok(tags)
            },
        },
        Endpoint {
            name: names::ADD_PHOTO,
            kind: EndpointKind::Mutation,
            method: Method::Post,
            path: "/photos",
            request: |album| {
                let mut rng = rand::thread_rng();
                let body = NewPhoto {
                    album_id: arg_id(album)?,
                    title: random_title(&mut rng),
                    url: random_image_url(&mut rng),
                };
                Ok(RequestDescriptor::post("/photos", serde_json::to_value(body)?))
            },
            tags: |_, album| Ok(vec![Tag::new(TagKind::AlbumsPhotos, arg_id(album)?)]),
        },
        Endpoint {
            name: names::REMOVE_PHOTO,
            kind: EndpointKind::Mutation,
            method: Method::Delete,
            path: "/photos/{id}",
            request: |photo| {
                Ok(RequestDescriptor::delete(format!(
                    "/photos/{}",
                    arg_id(photo)?
                )))
            },
            tags: |_, photo| Ok(vec![Tag::new(TagKind::Photo, arg_id(photo)?)]),
        },
    ]
}

/// The `id` field of an entity passed as argument.
fn arg_id(arg: &Value) -> Result<EntityId> {
    let id = arg
        .get("id")
        .ok_or_else(|| GalleryError::InvalidArgument(format!("missing id in {}", arg)))?;
    Ok(EntityId::deserialize(id)?)
}

#[derive(Deserialize)]
struct Identified {
    id: EntityId,
}

/// One tag per entity in a list result.
fn entity_tags(kind: TagKind, result: &Value) -> Result<Vec<Tag>> {
    let entities = Vec::<Identified>::deserialize(result)?;
    Ok(entities
        .into_iter()
        .map(|entity| Tag::new(kind, entity.id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn standard(name: &str) -> Endpoint {
        *EndpointRegistry::standard().get(name).unwrap()
    }

    #[test]
    fn registry_holds_every_operation() {
        let registry = EndpointRegistry::standard();
        assert_eq!(registry.len(), 9);
        assert_eq!(
            registry.iter().filter(|e| e.is_query()).count(),
            3,
            "three fetch endpoints"
        );
        assert!(matches!(
            registry.get("renameAlbum"),
            Err(GalleryError::UnknownEndpoint(_))
        ));
    }

    #[test]
    fn fetch_albums_scopes_by_user() {
        let user = json!({"id": 1, "name": "Ann"});
        let request = standard(names::FETCH_ALBUMS).build_request(&user).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/albums");
        assert_eq!(request.params, vec![("userId".to_string(), "1".to_string())]);
        assert_eq!(request.to_string(), "GET /albums?userId=1");
    }

    #[test]
    fn fetch_albums_tags_each_album_and_the_user_scope() {
        let user = json!({"id": 1, "name": "Ann"});
        let result = json!([
            {"id": 10, "userId": 1, "title": "A"},
            {"id": 11, "userId": 1, "title": "B"}
        ]);
        let mut tags = standard(names::FETCH_ALBUMS)
            .tags_for(&result, &user)
            .unwrap();
        tags.sort();
        assert_eq!(
            tags,
            vec![
                Tag::new(TagKind::Album, 10u64),
                Tag::new(TagKind::Album, 11u64),
                Tag::new(TagKind::UsersAlbums, 1u64),
            ]
        );
    }

    #[test]
    fn empty_result_still_carries_scope_tag() {
        let album = json!({"id": 4, "userId": 1, "title": "Empty"});
        let tags = standard(names::FETCH_PHOTOS)
            .tags_for(&json!([]), &album)
            .unwrap();
        assert_eq!(tags, vec![Tag::new(TagKind::AlbumsPhotos, 4u64)]);
    }

    #[test]
    fn add_album_posts_user_id_and_generated_title() {
        let user = json!({"id": 2, "name": "Bo"});
        let endpoint = standard(names::ADD_ALBUM);
        let request = endpoint.build_request(&user).unwrap();
        assert_eq!(request.method, Method::Post);
        let body = request.body.unwrap();
        assert_eq!(body["userId"], json!(2));
        assert!(!body["title"].as_str().unwrap().is_empty());
        assert_eq!(
            endpoint.tags_for(&Value::Null, &user).unwrap(),
            vec![Tag::new(TagKind::UsersAlbums, 2u64)]
        );
    }

    #[test]
    fn add_photo_posts_album_id_title_and_url() {
        let album = json!({"id": 5, "userId": 2, "title": "Trip"});
        let body = standard(names::ADD_PHOTO)
            .build_request(&album)
            .unwrap()
            .body
            .unwrap();
        assert_eq!(body["albumId"], json!(5));
        assert!(body["url"].as_str().unwrap().starts_with("https://"));
    }

    #[test]
    fn removals_target_the_entity_path_and_tag() {
        let album = json!({"id": 9, "userId": 2, "title": "Old"});
        let endpoint = standard(names::REMOVE_ALBUM);
        let request = endpoint.build_request(&album).unwrap();
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.path, "/albums/9");
        assert!(request.body.is_none());
        assert_eq!(
            endpoint.tags_for(&json!({}), &album).unwrap(),
            vec![Tag::new(TagKind::Album, 9u64)]
        );

        let user = json!({"id": "u-1", "name": "Ann"});
        assert_eq!(
            standard(names::REMOVE_USER)
                .build_request(&user)
                .unwrap()
                .path,
            "/users/u-1"
        );
    }

    #[test]
    fn missing_id_is_an_invalid_argument() {
        let err = standard(names::REMOVE_PHOTO)
            .build_request(&json!({"title": "no id"}))
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidArgument(_)));
    }

    #[test]
    fn add_user_requires_a_name() {
        let endpoint = standard(names::ADD_USER);
        assert!(endpoint.build_request(&json!({})).is_err());
        let request = endpoint.build_request(&json!({"name": "Bo"})).unwrap();
        assert_eq!(request.body, Some(json!({"name": "Bo"})));
    }

    #[test]
    fn malformed_results_fail_tagging() {
        let err = standard(names::FETCH_USERS)
            .tags_for(&json!({"not": "a list"}), &Value::Null)
            .unwrap_err();
        assert!(matches!(err, GalleryError::Serialization(_)));
    }

    #[test]
    fn tags_render_kind_and_id() {
        assert_eq!(Tag::new(TagKind::UsersAlbums, 3u64).to_string(), "usersAlbums:3");
        assert_eq!(Tag::new(TagKind::Album, "a-1").to_string(), "album:a-1");
    }
}
