//! # Gallery Architecture
//!
//! Gallery is a **client-side data layer** for a small REST backend serving
//! users, their albums, and the photos inside those albums. It keeps a
//! normalized cache of server data, tracks the status of every request, and
//! keeps cached lists consistent after writes through tag invalidation.
//!
//! The CLI is one consumer of that layer. Nothing below the CLI prints,
//! exits, or assumes a terminal.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders users → albums → photos        │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Queries, mutations, subscriptions, typed accessors       │
//! │  - De-duplicates in-flight queries, refetches after writes  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Endpoints (endpoints.rs) + Store (store.rs, cache.rs)      │
//! │  - Named operations with request builders and tag functions │
//! │  - Users slice, query cache, tag index, in-flight table      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport Layer (transport/)                               │
//! │  - Abstract Transport trait                                 │
//! │  - HttpTransport (production), InMemoryBackend (testing)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cache Tags
//!
//! Every cached query result carries tags computed from its result and
//! argument: `album:7` for each album it lists, `usersAlbums:1` for the
//! scope it covers. Every mutation names the tags it invalidates. After a
//! successful mutation the matching entries turn stale and are fetched again
//! the next time they are observed, immediately if someone is watching.
//!
//! ## Requests
//!
//! Each request goes `idle → pending → fulfilled | rejected` exactly once. A
//! failed request is reported as data on its state, and the previous cached
//! data stays in place. Identical queries issued while one is on the wire
//! share its result instead of going out again.
//!
//! ## Testing Strategy
//!
//! 1. **Cache, lifecycle, endpoints**: plain unit tests, no I/O.
//! 2. **API**: async tests against [`transport::memory::InMemoryBackend`],
//!    which can hold requests open and inject failures.
//! 3. **CLI**: binary tests with `assert_cmd`, run without a server.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`endpoints`]: Endpoint definitions, tags, and the registry
//! - [`cache`]: Query cache and tag index
//! - [`lifecycle`]: Request states and the in-flight table
//! - [`store`]: Users slice and the store that owns the cache
//! - [`transport`]: Transport trait with HTTP and in-memory implementations
//! - [`model`]: Core data types (`User`, `Album`, `Photo`)
//! - [`config`]: Configuration management
//! - [`error`]: Error types
//! - `cli`: Argument parsing and rendering for the binary (not part of the lib API)

pub mod api;
pub mod cache;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod store;
pub mod transport;
