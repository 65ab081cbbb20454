//! Platewise core library.
//!
//! Restaurants, menus, posts and reviews stored as Redis JSON documents, with
//! relation sets, unique reservations and denormalized counters maintained by
//! atomic store commands. The same command semantics run against an in-process
//! [`MemoryStore`] for tests and local use.

pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod id;
pub mod keys;
pub mod models;
pub mod registry;
pub mod repository;
pub mod runtime;
pub mod search;
pub mod store;
pub mod types;
pub mod validators;
pub mod workflows;

pub use client::{Client, CollectionHandle, ToggleOutcome};
pub use errors::{RepoError, ValidationError, ValidationIssue};
pub use search::{ListQuery, Page, SortOrder};
pub use store::{DocumentStore, MemoryStore, RedisStore};
pub use types::{Entity, EntityDescriptor};

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
