//! Graph client library abstractions.
//!
//! The wire protocol and the object-graph mapping layer live in a client
//! library; this module only fixes the contract the persistence core uses:
//!
//! - [`GraphDriverProvider`] builds a [`SessionFactory`] from configuration
//! - [`SessionFactoryProvider`] opens sessions
//! - [`GraphSessionProvider`] owns at most one transaction
//! - [`GraphTransactionProvider`] reports status and commits or rolls back
//!
//! Each provider trait is wrapped by a cheap, cloneable handle (`GraphDriver`,
//! `SessionFactory`, `GraphSession`, `GraphTransaction`) that dereferences to the
//! provider.
//!
//! # Drivers
//!
//! - **In-Memory**: [`memory::MemoryDriver`], a serverless client used for tests
//!   and demos.
mod driver;
pub mod memory;
mod session;
mod session_factory;
mod transaction;

pub use driver::*;
pub use session::*;
pub use session_factory::*;
pub use transaction::*;
