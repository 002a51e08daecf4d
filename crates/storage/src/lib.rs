//! Storage boundary for custom fields.
//!
//! [`FieldStorage`] is the contract a backend implements; [`MemoryStorage`]
//! is the process-local backend used by tests and the CLI. Backends can be
//! checked against [`conformance::run_conformance_suite`].

mod error;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{FieldRecord, ValueChanges, ValueRow};
pub use traits::FieldStorage;
