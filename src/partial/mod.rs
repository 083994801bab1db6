//! Partial views over a wrapped store.

mod cache;
mod view;

pub use view::PartialStore;
