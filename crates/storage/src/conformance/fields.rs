use std::future::Future;

use super::{make_field, CaseResult};
use crate::{FieldStorage, StorageError};

pub(super) async fn run_field_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseResult::new(
        "fields",
        "insert_then_get_returns_field",
        insert_then_get_returns_field(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "duplicate_insert_returns_field_already_exists",
        duplicate_insert_returns_field_already_exists(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "get_missing_returns_field_not_found",
        get_missing_returns_field_not_found(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "update_replaces_definition",
        update_replaces_definition(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "update_missing_returns_field_not_found",
        update_missing_returns_field_not_found(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "delete_removes_field",
        delete_removes_field(factory).await,
    ));
    results.push(CaseResult::new(
        "fields",
        "delete_missing_returns_field_not_found",
        delete_missing_returns_field_not_found(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn insert_then_get_returns_field<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut field = make_field("f1", "age", "Author", Some("tenant-1"));
    field.constraints.insert("max".into(), serde_json::json!(10));
    s.insert_field(field.clone())
        .await
        .map_err(|e| e.to_string())?;

    let got = s.get_field("f1").await.map_err(|e| e.to_string())?;
    if got != field {
        return Err(format!("expected {field:?}, got {got:?}"));
    }
    Ok(())
}

async fn duplicate_insert_returns_field_already_exists<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("f1", "age", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    match s.insert_field(make_field("f1", "other", "Post", None)).await {
        Err(StorageError::FieldAlreadyExists { field_id }) if field_id == "f1" => Ok(()),
        other => Err(format!("expected FieldAlreadyExists, got {other:?}")),
    }
}

async fn get_missing_returns_field_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_field("nope").await {
        Err(StorageError::FieldNotFound { field_id }) if field_id == "nope" => Ok(()),
        other => Err(format!("expected FieldNotFound, got {other:?}")),
    }
}

async fn update_replaces_definition<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("f1", "age", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    let mut renamed = make_field("f1", "years", "Author", None);
    renamed.default_value = serde_json::json!(3);
    s.update_field(renamed.clone())
        .await
        .map_err(|e| e.to_string())?;

    let got = s.get_field("f1").await.map_err(|e| e.to_string())?;
    if got != renamed {
        return Err(format!("expected {renamed:?}, got {got:?}"));
    }
    Ok(())
}

async fn update_missing_returns_field_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.update_field(make_field("f1", "age", "Author", None)).await {
        Err(StorageError::FieldNotFound { .. }) => Ok(()),
        other => Err(format!("expected FieldNotFound, got {other:?}")),
    }
}

async fn delete_removes_field<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("f1", "age", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    let removed = s.delete_field("f1").await.map_err(|e| e.to_string())?;
    if removed != 0 {
        return Err(format!("expected 0 values removed, got {removed}"));
    }
    match s.get_field("f1").await {
        Err(StorageError::FieldNotFound { .. }) => Ok(()),
        other => Err(format!("expected FieldNotFound after delete, got {other:?}")),
    }
}

async fn delete_missing_returns_field_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.delete_field("nope").await {
        Err(StorageError::FieldNotFound { .. }) => Ok(()),
        other => Err(format!("expected FieldNotFound, got {other:?}")),
    }
}
