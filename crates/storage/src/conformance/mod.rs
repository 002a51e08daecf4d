//! Backend-agnostic checks for [`FieldStorage`] implementations.
//!
//! Cases are grouped by concern:
//!
//! - **Fields**: definition CRUD and the error variants it returns
//! - **Scope**: scope matching on listing, name-taken rules
//! - **Values**: value CRUD, per-host uniqueness, atomic batches
//! - **Cascade**: field and host deletes removing their values
//! - **Concurrent**: racing inserts of the same value
//!
//! # Usage
//!
//! A backend's own tests hand [`run_conformance_suite`] a factory for empty
//! instances:
//!
//! ```ignore
//! use dynfields_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_backend_conforms() {
//!     let report = run_conformance_suite(|| async { PgStorage::connect_fresh().await }).await;
//!     assert!(report.is_clean(), "{report}");
//! }
//! ```

mod cascade;
mod concurrent;
mod fields;
mod scope;
mod values;

use std::fmt;
use std::future::Future;

use crate::record::{FieldRecord, ValueRow};
use crate::FieldStorage;

/// Outcome of one conformance case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub category: &'static str,
    pub name: &'static str,
    pub outcome: Result<(), String>,
}

impl CaseResult {
    fn new(category: &'static str, name: &'static str, outcome: Result<(), String>) -> Self {
        CaseResult {
            category,
            name,
            outcome,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Every case outcome of one suite run, in run order.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub results: Vec<CaseResult>,
}

impl ConformanceReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&CaseResult, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|msg| (r, msg.as_str())))
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed();
        writeln!(
            f,
            "storage conformance: {} of {} cases passed",
            self.total() - failed,
            self.total()
        )?;
        for (case, msg) in self.failures() {
            writeln!(f, "  {}::{} failed: {}", case.category, case.name, msg)?;
        }
        Ok(())
    }
}

/// Run every conformance case against a backend.
///
/// `factory` builds a fresh, empty backend; it is called once per case.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut report = ConformanceReport::default();
    report.results.extend(fields::run_field_tests(&factory).await);
    report.results.extend(scope::run_scope_tests(&factory).await);
    report.results.extend(values::run_value_tests(&factory).await);
    report.results.extend(cascade::run_cascade_tests(&factory).await);
    report.results.extend(concurrent::run_concurrent_tests(&factory).await);
    report
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_field(id: &str, name: &str, host_type: &str, scope: Option<&str>) -> FieldRecord {
    FieldRecord {
        id: id.to_string(),
        name: name.to_string(),
        field_type: "integer".to_string(),
        host_type: host_type.to_string(),
        scope: scope.map(str::to_string),
        constraints: serde_json::Map::new(),
        default_value: serde_json::Value::Null,
    }
}

fn make_value(id: &str, host_id: &str, field_id: &str, value: serde_json::Value) -> ValueRow {
    ValueRow {
        id: id.to_string(),
        host_type: "Author".to_string(),
        host_id: host_id.to_string(),
        field_id: field_id.to_string(),
        value,
    }
}

/// Fresh storage holding one unscoped `Author` field with id `f1`.
async fn with_field<S, F, Fut>(factory: &F) -> Result<S, String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("f1", "age", "Author", None))
        .await
        .map_err(|e| format!("insert field: {e}"))?;
    Ok(s)
}
