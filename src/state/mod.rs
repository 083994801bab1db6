//! Derived-state assembly.
//!
//! A selection names leaf paths into the source state; assembly rebuilds
//! exactly the selected shape as a fresh value, leaving the source alone.

mod assemble;

pub use assemble::assemble;
