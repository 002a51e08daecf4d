use std::future::Future;
use std::sync::Arc;

use serde_json::json;

use super::{make_value, with_field, CaseResult};
use crate::{FieldStorage, StorageError};

const RACERS: usize = 8;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![CaseResult::new(
        "concurrent",
        "racing_value_inserts_one_wins",
        racing_value_inserts_one_wins(factory).await,
    )]
}

/// Several tasks insert a value for the same host and field at once.
/// Exactly one succeeds; the others see `DuplicateValue`.
async fn racing_value_inserts_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FieldStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = Arc::new(with_field(factory).await?);

    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let s = Arc::clone(&s);
            tokio::spawn(async move {
                s.insert_value(make_value(&format!("v{i}"), "1", "f1", json!(i)))
                    .await
            })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(()) => wins += 1,
            Err(StorageError::DuplicateValue { .. }) => {}
            Err(other) => return Err(format!("unexpected error: {other}")),
        }
    }
    if wins != 1 {
        return Err(format!("expected exactly one winner, got {wins}"));
    }
    let rows = s.scoped_values("f1").await.map_err(|e| e.to_string())?;
    if rows.len() != 1 {
        return Err(format!("expected one stored row, got {}", rows.len()));
    }
    Ok(())
}
