//! Redis-backed sessions with per-value expiry for axum services.
//!
//! This crate provides a server-side session store on top of a
//! Redis-compatible key-value cache with:
//! - Pluggable serialization (MessagePack by default, JSON for
//!   human-readable cache records)
//! - Per-value expiry nested inside the whole-session TTL
//! - A lazy per-request [`Session`] facade that defers cache I/O until a
//!   value is actually touched
//! - A tower [`SessionLayer`] and axum extractors for wiring sessions into
//!   a request pipeline
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use axum::{Router, routing::get};
//! use mallard_session::{RedisStore, Session, SessionLayer};
//!
//! let store = Arc::new(RedisStore::new("redis://127.0.0.1/", 10)?);
//!
//! async fn visits(session: Session) -> String {
//!     let count: u64 = session.get("count").unwrap().unwrap_or(0);
//!     session.set("count", count + 1, 0).unwrap();
//!     session.save().unwrap();
//!     format!("visit #{}", count + 1)
//! }
//!
//! let app = Router::new()
//!     .route("/", get(visits))
//!     .layer(SessionLayer::new(store, "mysession"));
//! ```

mod error;
mod extract;
mod layer;
mod memory;
mod options;
mod record;
mod redis_store;
mod serializer;
mod session;
mod store;
mod value;

pub use error::{Error, Result};
pub use layer::{SessionLayer, SessionService};
pub use memory::MemoryStore;
pub use options::SessionOptions;
pub use record::SessionRecord;
pub use redis_store::{ConnectionSource, PooledConn, RedisStore, StoreConfig};
pub use serializer::{JsonSerializer, MessagePackSerializer, SessionSerializer};
pub use session::{Session, Sessions};
pub use store::SessionStore;
pub use value::{Entry, SessionValues};
