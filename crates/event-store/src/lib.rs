//! Event Store
//!
//! Durable, append-only history of Kubernetes change events backed by SQLite.
//!
//! The watch pipeline is the only writer ([`EventStore::save`]); dashboards
//! and tooling read through [`EventStore::query`], [`EventStore::timeline`]
//! and [`EventStore::stats`]. Retention is enforced by
//! [`EventStore::cleanup`].
//!
//! ```
//! use event_store::{Action, ChangeEvent, EventStore, Filter};
//!
//! let store = EventStore::open_in_memory().unwrap();
//! let saved = store
//!     .save(ChangeEvent::new("Deployment", "prod", "web", Action::Added).with_diff("Deployment created"))
//!     .unwrap();
//! assert!(saved.id.is_some());
//!
//! let events = store.query(&Filter::default().namespace("prod")).unwrap();
//! assert_eq!(events.len(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;


pub use cache::{StatsCache, DEFAULT_STATS_TTL};
pub use error::{Result, StoreError};
pub use models::{Action, AppChangeCount, ChangeEvent, Filter, Stats};
pub use store::EventStore;
