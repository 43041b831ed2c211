//! Units of work.
//!
//! A unit of work is the span during which one session is bound to an
//! execution context, from `begin` to `end`. [`SessionRegistry`] holds the
//! bindings and [`PersistService`] drives the lifecycle on top of it.
mod persist_service;
mod registry;

pub use persist_service::*;
pub use registry::*;
