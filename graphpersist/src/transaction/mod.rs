//! Declarative transactions.
//!
//! An operation runs under [`TransactionalInterceptor`], which binds a unit of
//! work to the calling context, joins or opens a transaction and settles it
//! when the operation returns. How a failed operation's transaction is settled
//! is described by [`TransactionMetadata`]: ordered `rollback_on` and `ignore`
//! lists of [`ErrorClass`]es, looked up per operation in a [`MetadataTable`]
//! and evaluated by [`decide`].
mod interceptor;
mod metadata;
mod policy;

pub use interceptor::*;
pub use metadata::*;
pub use policy::*;
