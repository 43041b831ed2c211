//! # graphpersist - Graph Database Sessions and Declarative Transactions
//!
//! graphpersist ties graph client sessions to execution contexts and runs
//! application operations inside transactions whose outcome on failure is
//! declared per operation.
//!
//! ## Key Features
//!
//! - **Units of work**: at most one session bound to each execution context,
//!   from `begin` to `end`
//! - **Lazy sessions**: `get` opens a session on first use
//! - **Declarative transactions**: rollback and ignore rules per operation or
//!   per declaring type
//! - **Nesting**: inner transactional calls join the outer transaction
//! - **Pluggable clients**: drivers implement a small set of provider traits;
//!   an in-memory client ships for tests and demos
//!
//! ## Quick Start
//!
//! ```rust
//! use graphpersist::client::memory::MemoryDriver;
//! use graphpersist::common::ContextId;
//! use graphpersist::errors::PersistError;
//! use graphpersist::transaction::{ErrorClass, OperationDescriptor, TransactionMetadata};
//! use graphpersist::PersistModule;
//!
//! # fn main() -> Result<(), PersistError> {
//! let driver = MemoryDriver::new();
//! let bindings = PersistModule::new()
//!     .package("com.example.domain")
//!     .driver(driver.clone())
//!     .for_type(
//!         "UserRepository",
//!         TransactionMetadata::new().rollback_on(ErrorClass::of::<PersistError>()),
//!     )
//!     .build()?;
//! bindings.service().start()?;
//!
//! let ctx = ContextId::new();
//! let create = OperationDescriptor::new("create").declared_in("UserRepository");
//! let id = bindings.interceptor().invoke(ctx, &create, |session| {
//!     Ok::<_, PersistError>(session.id().to_string())
//! })?;
//!
//! assert!(!id.is_empty());
//! assert_eq!(driver.stats().commits(), 1);
//! bindings.service().stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Pattern
//!
//! Services and client objects are cheap handles over shared state (`Arc`),
//! so clones observe the same sessions and lifecycle. Client libraries plug in
//! through provider traits wrapped by those handles.
//!
//! ## Module Organization
//!
//! - [`client`] - Graph client contract and the in-memory client
//! - [`common`] - Execution context ids, constants and utilities
//! - [`errors`] - Error types and result definitions
//! - [`persist_config`] - Connection configuration
//! - [`persist_module`] - Builder wiring a service and an interceptor
//! - [`transaction`] - Transaction metadata, policy and interceptor
//! - [`unit_of_work`] - Session registry and the persistence service

pub mod client;
pub mod common;
pub mod errors;
pub mod persist_config;
pub mod persist_module;
pub mod transaction;
pub mod unit_of_work;

pub use persist_config::PersistConfig;
pub use persist_module::{PersistBindings, PersistModule};
pub use unit_of_work::{PersistLifecycle, PersistService, SessionRegistry, UnitOfWork};

#[cfg(test)]
mod tests {
    #[ctor::ctor]
    fn init() {
        let _ = colog::basic_builder().try_init();
    }
}
