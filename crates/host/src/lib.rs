//! Host-entity integration for custom fields.
//!
//! [`FieldService`] ties definitions, value records and filters to a
//! [`FieldStorage`](dynfields_storage::FieldStorage) backend and a
//! [`HostRegistry`](dynfields_core::HostRegistry) of allowed field types.

mod customizable;
mod descriptors;
mod error;
mod locks;
mod service;

pub use customizable::{Customizable, Host};
pub use descriptors::{parse_assignments, parse_filters, AssignDescriptor, FilterDescriptor};
pub use error::HostError;
pub use service::{AssignOutcome, FieldService, HostMatch, SaveOutcome};
