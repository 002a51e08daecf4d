//! Typed custom-field values for host records.
//!
//! Hosts declare custom fields at runtime. Each [`FieldDefinition`] pairs a
//! [`FieldType`] with constraints; its [`Caster`] coerces raw input to a
//! stored JSON encoding and back, and its [`Validator`] judges the typed
//! value. [`ValueRecord`] holds one host record's value for one field.

pub mod cast;
pub mod constraints;
pub mod error;
pub mod field;
pub mod registry;
pub mod types;
pub mod validate;
pub mod value;

pub use cast::{Caster, ScalarCaster};
pub use error::{FieldError, UsageError};
pub use field::{scopes_overlap, FieldDefinition, FieldKind};
pub use registry::{HostDeclaration, HostRegistry, HostRegistryBuilder};
pub use types::{FieldType, TypedValue};
pub use validate::{Bound, ErrorCode, ErrorSet, Errors, ValidationError, Validator};
pub use value::{HostRef, PendingValue, ValueRecord};
