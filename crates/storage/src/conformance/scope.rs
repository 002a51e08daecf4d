use std::future::Future;

use super::{make_field, CaseResult};
use crate::FieldStorage;

pub(super) async fn run_scope_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseResult::new(
        "scope",
        "list_fields_matches_host_type_and_scope",
        list_fields_matches_host_type_and_scope(factory).await,
    ));
    results.push(CaseResult::new(
        "scope",
        "list_fields_keeps_insertion_order",
        list_fields_keeps_insertion_order(factory).await,
    ));
    results.push(CaseResult::new(
        "scope",
        "name_taken_rules",
        name_taken_rules(factory).await,
    ));
    results.push(CaseResult::new(
        "scope",
        "name_taken_excludes_self",
        name_taken_excludes_self(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn seed<S: FieldStorage>(s: &S) -> Result<(), String> {
    for field in [
        make_field("global", "a", "Author", None),
        make_field("t1", "b", "Author", Some("tenant-1")),
        make_field("t2", "c", "Author", Some("tenant-2")),
        make_field("post", "d", "Post", None),
    ] {
        s.insert_field(field).await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn ids<S: FieldStorage>(s: &S, host_type: &str, scope: Option<&str>) -> Result<Vec<String>, String> {
    Ok(s.list_fields(host_type, scope)
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|f| f.id)
        .collect())
}

/// Unscoped fields apply everywhere; scoped fields only to their scope.
async fn list_fields_matches_host_type_and_scope<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;

    let cases: [(&str, Option<&str>, &[&str]); 4] = [
        ("Author", None, &["global"]),
        ("Author", Some("tenant-1"), &["global", "t1"]),
        ("Author", Some("tenant-3"), &["global"]),
        ("Post", Some("tenant-1"), &["post"]),
    ];
    for (host_type, scope, expected) in cases {
        let got = ids(&s, host_type, scope).await?;
        if got != expected {
            return Err(format!(
                "list_fields({host_type}, {scope:?}): expected {expected:?}, got {got:?}"
            ));
        }
    }
    Ok(())
}

async fn list_fields_keeps_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for id in ["z", "a", "m"] {
        s.insert_field(make_field(id, id, "Author", None))
            .await
            .map_err(|e| e.to_string())?;
    }
    let got = ids(&s, "Author", None).await?;
    if got != ["z", "a", "m"] {
        return Err(format!("expected insertion order, got {got:?}"));
    }
    Ok(())
}

/// Same name and host type collide when either scope is NULL or the scopes
/// are equal.
async fn name_taken_rules<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("global", "age", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_field(make_field("t1", "tier", "Author", Some("tenant-1")))
        .await
        .map_err(|e| e.to_string())?;

    let cases = [
        ("age", "Author", None, true),
        ("age", "Author", Some("tenant-9"), true),
        ("age", "Post", None, false),
        ("tier", "Author", Some("tenant-1"), true),
        ("tier", "Author", None, true),
        ("tier", "Author", Some("tenant-2"), false),
        ("other", "Author", None, false),
    ];
    for (name, host_type, scope, expected) in cases {
        let got = s
            .field_name_taken(name, host_type, scope, None)
            .await
            .map_err(|e| e.to_string())?;
        if got != expected {
            return Err(format!(
                "field_name_taken({name}, {host_type}, {scope:?}): expected {expected}, got {got}"
            ));
        }
    }
    Ok(())
}

async fn name_taken_excludes_self<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_field(make_field("f1", "age", "Author", None))
        .await
        .map_err(|e| e.to_string())?;
    let taken = s
        .field_name_taken("age", "Author", None, Some("f1"))
        .await
        .map_err(|e| e.to_string())?;
    if taken {
        return Err("a field must not collide with itself".to_string());
    }
    Ok(())
}
