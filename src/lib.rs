//! # Substore
//!
//! Derived partial views over an observable state store.
//!
//! Wrap any store exposing dispatch/state/subscribe and derive views that
//! expose just the fields they select. Views are stores themselves, so
//! they nest indefinitely.
//!
//! ## Core Concepts
//!
//! - **Selection**: the fields a view exposes, as a single key or a
//!   nested spec
//! - **Partial view**: a derived store presenting the selected shape,
//!   with memoized reference-stable reads
//! - **Multiplexer**: per-view registry fanning one lazily-held parent
//!   subscription out to field-level listeners
//! - **Change tracking**: listeners wake only when a field they selected
//!   actually changed value
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use substore::{MemoryStore, PartialStore, Store};
//!
//! let store = MemoryStore::new(json!({
//!     "profile": { "name": "ada", "theme": "dark" },
//!     "drafts": [],
//! }));
//! let root = PartialStore::wrap(store);
//!
//! let profile = root.partial("profile");
//! let sub = profile.subscribe(Arc::new(|| println!("profile changed")));
//!
//! // Wakes the profile listener; a drafts-only change would not.
//! root.dispatch(json!({
//!     "profile": { "name": "ada", "theme": "light" },
//!     "drafts": [],
//! }));
//!
//! assert_eq!(profile.state()["theme"], "light");
//! sub.unsubscribe();
//! ```

pub mod error;
pub mod partial;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use partial::PartialStore;
pub use state::assemble;
pub use store::{MemoryStore, Store};
pub use subscriptions::{Subscription, Watch};
pub use types::*;
