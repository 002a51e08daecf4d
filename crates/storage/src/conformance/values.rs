use std::future::Future;

use dynfields_core::HostRef;
use serde_json::json;

use super::{make_value, with_field, CaseResult};
use crate::{FieldStorage, StorageError, ValueChanges};

pub(super) async fn run_value_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseResult::new(
        "values",
        "insert_then_list_returns_value",
        insert_then_list_returns_value(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "second_value_for_host_and_field_rejected",
        second_value_for_host_and_field_rejected(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "insert_for_missing_field_rejected",
        insert_for_missing_field_rejected(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "update_replaces_value",
        update_replaces_value(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "update_and_delete_missing_value_rejected",
        update_and_delete_missing_value_rejected(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "apply_values_is_all_or_nothing",
        apply_values_is_all_or_nothing(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "apply_values_replaces_in_one_batch",
        apply_values_replaces_in_one_batch(factory).await,
    ));
    results.push(CaseResult::new(
        "values",
        "scoped_values_returns_field_rows",
        scoped_values_returns_field_rows(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn insert_then_list_returns_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    let row = make_value("v1", "1", "f1", json!(7));
    s.insert_value(row.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let listed = s
        .list_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    if listed != vec![row] {
        return Err(format!("expected the inserted row, got {listed:?}"));
    }
    let other = s
        .list_values(&HostRef::new("Author", "2"))
        .await
        .map_err(|e| e.to_string())?;
    if !other.is_empty() {
        return Err(format!("expected no values for another host, got {other:?}"));
    }
    Ok(())
}

async fn second_value_for_host_and_field_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    s.insert_value(make_value("v1", "1", "f1", json!(1)))
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    match s.insert_value(make_value("v2", "1", "f1", json!(2))).await {
        Err(StorageError::DuplicateValue { host_id, field_id, .. })
            if host_id == "1" && field_id == "f1" => {}
        other => return Err(format!("expected DuplicateValue, got {other:?}")),
    }
    // the same field on another host is fine
    s.insert_value(make_value("v3", "2", "f1", json!(2)))
        .await
        .map_err(|e| format!("other host insert: {e}"))?;
    Ok(())
}

async fn insert_for_missing_field_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.insert_value(make_value("v1", "1", "ghost", json!(1))).await {
        Err(StorageError::FieldNotFound { field_id }) if field_id == "ghost" => Ok(()),
        other => Err(format!("expected FieldNotFound, got {other:?}")),
    }
}

async fn update_replaces_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    s.insert_value(make_value("v1", "1", "f1", json!(1)))
        .await
        .map_err(|e| e.to_string())?;
    s.update_value(make_value("v1", "1", "f1", json!(9)))
        .await
        .map_err(|e| format!("update: {e}"))?;

    let listed = s
        .list_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    match listed.as_slice() {
        [row] if row.value == json!(9) => Ok(()),
        other => Err(format!("expected one row holding 9, got {other:?}")),
    }
}

async fn update_and_delete_missing_value_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    match s.update_value(make_value("nope", "1", "f1", json!(1))).await {
        Err(StorageError::ValueNotFound { value_id }) if value_id == "nope" => {}
        other => return Err(format!("update: expected ValueNotFound, got {other:?}")),
    }
    match s.delete_value("nope").await {
        Err(StorageError::ValueNotFound { .. }) => Ok(()),
        other => Err(format!("delete: expected ValueNotFound, got {other:?}")),
    }
}

/// A failing batch must leave every row as it was.
async fn apply_values_is_all_or_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    s.insert_value(make_value("v1", "1", "f1", json!(1)))
        .await
        .map_err(|e| e.to_string())?;

    let changes = ValueChanges {
        inserts: vec![make_value("v2", "2", "f1", json!(2))],
        updates: vec![make_value("v1", "1", "f1", json!(5))],
        deletes: vec!["missing".to_string()],
    };
    match s.apply_values(changes).await {
        Err(StorageError::ValueNotFound { .. }) => {}
        other => return Err(format!("expected ValueNotFound, got {other:?}")),
    }

    let host1 = s
        .list_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    let host2 = s
        .list_values(&HostRef::new("Author", "2"))
        .await
        .map_err(|e| e.to_string())?;
    if host1.len() != 1 || host1[0].value != json!(1) {
        return Err(format!("update leaked from a failed batch: {host1:?}"));
    }
    if !host2.is_empty() {
        return Err(format!("insert leaked from a failed batch: {host2:?}"));
    }
    Ok(())
}

/// Deleting a host's row and inserting a new one for the same field in a
/// single batch does not count as a duplicate.
async fn apply_values_replaces_in_one_batch<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    s.insert_value(make_value("v1", "1", "f1", json!(1)))
        .await
        .map_err(|e| e.to_string())?;

    let changes = ValueChanges {
        inserts: vec![make_value("v2", "1", "f1", json!(2))],
        updates: Vec::new(),
        deletes: vec!["v1".to_string()],
    };
    s.apply_values(changes)
        .await
        .map_err(|e| format!("replace batch: {e}"))?;

    let listed = s
        .list_values(&HostRef::new("Author", "1"))
        .await
        .map_err(|e| e.to_string())?;
    match listed.as_slice() {
        [row] if row.id == "v2" && row.value == json!(2) => Ok(()),
        other => Err(format!("expected only v2, got {other:?}")),
    }
}

async fn scoped_values_returns_field_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = with_field(factory).await?;
    s.insert_field(super::make_field("f2", "rank", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    for row in [
        make_value("v1", "1", "f1", json!(1)),
        make_value("v2", "2", "f1", json!(2)),
        make_value("v3", "1", "f2", json!(3)),
    ] {
        s.insert_value(row).await.map_err(|e| e.to_string())?;
    }

    let rows = s.scoped_values("f1").await.map_err(|e| e.to_string())?;
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    if ids != ["v1", "v2"] {
        return Err(format!("expected [v1, v2], got {ids:?}"));
    }
    match s.scoped_values("ghost").await {
        Err(StorageError::FieldNotFound { .. }) => Ok(()),
        other => Err(format!("expected FieldNotFound, got {other:?}")),
    }
}
