//! Query translation for custom-field values.
//!
//! A [`Finder`] turns `(operator, raw value)` into a [`FieldCondition`]
//! holding a [`Predicate`]. Conditions are evaluated in memory with SQL
//! three-valued logic, or rendered to PostgreSQL by [`FieldQuery::to_sql`].

pub mod finder;
pub mod operator;
pub mod predicate;
pub mod query;
pub mod sql;

pub use finder::{FieldCondition, FieldFinder, Finder};
pub use operator::Operation;
pub use predicate::{Cmp, ElementTest, Pattern, Predicate};
pub use query::FieldQuery;
pub use sql::{escape_like, quote_identifier, Sql, SqlConfig};
