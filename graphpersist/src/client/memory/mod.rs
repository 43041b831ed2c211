//! Serverless graph client.
//!
//! Every provider trait is implemented in memory. Sessions and transactions
//! are tracked in a shared [`MemoryStats`] so tests can assert how many
//! sessions were opened and released and how many commits and rollbacks
//! happened. [`MemoryFaults`] injects client failures into the same paths.
mod driver;
mod session;
mod stats;
mod transaction;

pub use driver::*;
pub use session::*;
pub use stats::*;
pub use transaction::*;
