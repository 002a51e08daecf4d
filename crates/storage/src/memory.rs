//! In-memory `FieldStorage` backend.

use std::collections::HashSet;

use async_trait::async_trait;
use dynfields_core::{scopes_overlap, HostRef};
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{FieldRecord, ValueChanges, ValueRow};
use crate::traits::FieldStorage;

#[derive(Debug, Default)]
struct Tables {
    fields: IndexMap<String, FieldRecord>,
    values: IndexMap<String, ValueRow>,
}

impl Tables {
    fn require_field(&self, field_id: &str) -> Result<(), StorageError> {
        if self.fields.contains_key(field_id) {
            Ok(())
        } else {
            Err(StorageError::FieldNotFound {
                field_id: field_id.to_string(),
            })
        }
    }

    fn require_value(&self, value_id: &str) -> Result<&ValueRow, StorageError> {
        self.values
            .get(value_id)
            .ok_or_else(|| StorageError::ValueNotFound {
                value_id: value_id.to_string(),
            })
    }

    fn find_value(&self, host_type: &str, host_id: &str, field_id: &str) -> Option<&ValueRow> {
        self.values.values().find(|v| {
            v.host_type == host_type && v.host_id == host_id && v.field_id == field_id
        })
    }

    fn remove_values_where(&mut self, keep: impl Fn(&ValueRow) -> bool) -> usize {
        let before = self.values.len();
        self.values.retain(|_, v| keep(v));
        before - self.values.len()
    }
}

fn duplicate(row: &ValueRow) -> StorageError {
    StorageError::DuplicateValue {
        host_type: row.host_type.clone(),
        host_id: row.host_id.clone(),
        field_id: row.field_id.clone(),
    }
}

/// Process-local storage behind a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FieldStorage for MemoryStorage {
    async fn insert_field(&self, field: FieldRecord) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.fields.contains_key(&field.id) {
            return Err(StorageError::FieldAlreadyExists { field_id: field.id });
        }
        tables.fields.insert(field.id.clone(), field);
        Ok(())
    }

    async fn update_field(&self, field: FieldRecord) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        match tables.fields.get_mut(&field.id) {
            Some(slot) => {
                *slot = field;
                Ok(())
            }
            None => Err(StorageError::FieldNotFound { field_id: field.id }),
        }
    }

    async fn delete_field(&self, field_id: &str) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.fields.shift_remove(field_id).is_none() {
            return Err(StorageError::FieldNotFound {
                field_id: field_id.to_string(),
            });
        }
        let removed = tables.remove_values_where(|v| v.field_id != field_id);
        tracing::debug!(field_id, removed, "deleted field and its values");
        Ok(removed)
    }

    async fn get_field(&self, field_id: &str) -> Result<FieldRecord, StorageError> {
        let tables = self.tables.read().await;
        tables
            .fields
            .get(field_id)
            .cloned()
            .ok_or_else(|| StorageError::FieldNotFound {
                field_id: field_id.to_string(),
            })
    }

    async fn list_fields(
        &self,
        host_type: &str,
        scope: Option<&str>,
    ) -> Result<Vec<FieldRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .fields
            .values()
            .filter(|f| {
                f.host_type == host_type && (f.scope.is_none() || f.scope.as_deref() == scope)
            })
            .cloned()
            .collect())
    }

    async fn field_name_taken(
        &self,
        name: &str,
        host_type: &str,
        scope: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.fields.values().any(|f| {
            Some(f.id.as_str()) != exclude_id
                && f.name == name
                && f.host_type == host_type
                && scopes_overlap(f.scope.as_deref(), scope)
        }))
    }

    async fn insert_value(&self, row: ValueRow) -> Result<(), StorageError> {
        self.apply_values(ValueChanges {
            inserts: vec![row],
            ..ValueChanges::default()
        })
        .await
    }

    async fn update_value(&self, row: ValueRow) -> Result<(), StorageError> {
        self.apply_values(ValueChanges {
            updates: vec![row],
            ..ValueChanges::default()
        })
        .await
    }

    async fn delete_value(&self, value_id: &str) -> Result<(), StorageError> {
        self.apply_values(ValueChanges {
            deletes: vec![value_id.to_string()],
            ..ValueChanges::default()
        })
        .await
    }

    async fn apply_values(&self, changes: ValueChanges) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;

        // Check everything before writing anything.
        let deleting: HashSet<&str> = changes.deletes.iter().map(String::as_str).collect();
        for id in &changes.deletes {
            tables.require_value(id)?;
        }
        for row in &changes.updates {
            let existing = tables.require_value(&row.id)?;
            if deleting.contains(row.id.as_str()) {
                return Err(StorageError::ValueNotFound {
                    value_id: row.id.clone(),
                });
            }
            if existing.field_id != row.field_id
                || existing.host_type != row.host_type
                || existing.host_id != row.host_id
            {
                return Err(StorageError::Backend(format!(
                    "value {} cannot move to another host or field",
                    row.id
                )));
            }
        }
        let mut claimed = HashSet::new();
        for row in &changes.inserts {
            tables.require_field(&row.field_id)?;
            if tables.values.contains_key(&row.id) {
                return Err(duplicate(row));
            }
            let taken = tables
                .find_value(&row.host_type, &row.host_id, &row.field_id)
                .is_some_and(|existing| !deleting.contains(existing.id.as_str()));
            let key = (row.host_type.as_str(), row.host_id.as_str(), row.field_id.as_str());
            if taken || !claimed.insert(key) {
                return Err(duplicate(row));
            }
        }

        tracing::debug!(
            inserts = changes.inserts.len(),
            updates = changes.updates.len(),
            deletes = changes.deletes.len(),
            "applying value changes"
        );
        for id in &changes.deletes {
            tables.values.shift_remove(id);
        }
        for row in changes.updates {
            tables.values.insert(row.id.clone(), row);
        }
        for row in changes.inserts {
            tables.values.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn list_values(&self, host: &HostRef) -> Result<Vec<ValueRow>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .values
            .values()
            .filter(|v| v.host_type == host.host_type && v.host_id == host.host_id)
            .cloned()
            .collect())
    }

    async fn delete_host_values(&self, host: &HostRef) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_values_where(|v| {
            !(v.host_type == host.host_type && v.host_id == host.host_id)
        }))
    }

    async fn scoped_values(&self, field_id: &str) -> Result<Vec<ValueRow>, StorageError> {
        let tables = self.tables.read().await;
        tables.require_field(field_id)?;
        Ok(tables
            .values
            .values()
            .filter(|v| v.field_id == field_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;

    #[tokio::test]
    async fn memory_storage_passes_conformance() {
        let report = run_conformance_suite(|| async { MemoryStorage::new() }).await;
        assert!(report.is_clean(), "{report}");
        assert!(report.total() > 0);
    }
}
