use std::future::Future;

use dynfields_core::HostRef;
use serde_json::json;

use super::{make_field, make_value, with_field, CaseResult};
use crate::FieldStorage;

pub(super) async fn run_cascade_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseResult::new(
        "cascade",
        "delete_field_removes_only_its_values",
        delete_field_removes_only_its_values(factory).await,
    ));
    results.push(CaseResult::new(
        "cascade",
        "delete_host_values_removes_only_that_host",
        delete_host_values_removes_only_that_host(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn seed<S: FieldStorage>(s: &S) -> Result<(), String> {
    s.insert_field(make_field("f2", "rank", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    for row in [
        make_value("v1", "1", "f1", json!(1)),
        make_value("v2", "2", "f1", json!(2)),
        make_value("v3", "1", "f2", json!(3)),
    ] {
        s.insert_value(row).await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn delete_field_removes_only_its_values<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    seed(&s).await?;

    let removed = s.delete_field("f1").await.map_err(|e| e.to_string())?;
    if removed != 2 {
        return Err(format!("expected 2 values removed, got {removed}"));
    }
    let left = s
        .list_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    let ids: Vec<&str> = left.iter().map(|r| r.id.as_str()).collect();
    if ids != ["v3"] {
        return Err(format!("expected [v3] to survive, got {ids:?}"));
    }
    Ok(())
}

async fn delete_host_values_removes_only_that_host<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    seed(&s).await?;

    let removed = s
        .delete_host_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    if removed != 2 {
        return Err(format!("expected 2 values removed, got {removed}"));
    }
    let left = s.scoped_values("f1").await.map_err(|e| e.to_string())?;
    let ids: Vec<&str> = left.iter().map(|r| r.id.as_str()).collect();
    if ids != ["v2"] {
        return Err(format!("expected [v2] to survive, got {ids:?}"));
    }
    Ok(())
}
