pub(crate) mod cast;
pub(crate) mod field_file;
pub(crate) mod operators;
pub(crate) mod search;
pub(crate) mod validate;
