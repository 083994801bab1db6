//! Subscription plumbing for partial views.
//!
//! Every view owns a [`Multiplexer`] its children register into: one
//! upstream subscription per view, attached while at least one field is
//! tracked, fanned out to the listeners of whichever fields actually
//! changed. Subscribers get back a [`Subscription`] guard; threads that
//! prefer polling or blocking over callbacks can use [`Watch`].

mod manager;
mod types;

pub(crate) use manager::Multiplexer;
pub use types::{Subscription, Watch};
