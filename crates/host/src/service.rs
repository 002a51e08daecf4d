//! The host-facing custom-field service.

use std::collections::BTreeSet;
use std::sync::Arc;

use dynfields_core::{ErrorCode, Errors, FieldDefinition, HostRegistry, ValueRecord};
use dynfields_query::{FieldFinder, FieldQuery};
use dynfields_storage::{FieldRecord, FieldStorage, StorageError, ValueChanges, ValueRow};
use indexmap::IndexMap;
use serde_json::Value;

use crate::customizable::Customizable;
use crate::descriptors::{parse_assignments, parse_filters};
use crate::error::HostError;
use crate::locks::NameLocks;

/// Result of [`FieldService::save_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Invalid(Errors),
}

/// Result of [`FieldService::assign_fields`].
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOutcome {
    Saved {
        created: usize,
        updated: usize,
        destroyed: usize,
    },
    /// Per field name, the errors of each invalid record. Nothing was
    /// written.
    Invalid(IndexMap<String, Errors>),
}

/// Hosts selected by a [`FieldQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatch {
    /// The query has no conditions.
    All,
    Only(BTreeSet<String>),
}

impl HostMatch {
    pub fn contains(&self, host_id: &str) -> bool {
        match self {
            HostMatch::All => true,
            HostMatch::Only(ids) => ids.contains(host_id),
        }
    }
}

enum Change {
    Create(ValueRecord),
    Update(ValueRecord),
    Destroy(String),
}

/// Custom-field operations for host entities over a [`FieldStorage`].
pub struct FieldService<S> {
    storage: Arc<S>,
    registry: HostRegistry,
    locks: NameLocks,
}

impl<S: FieldStorage> FieldService<S> {
    pub fn new(storage: Arc<S>, registry: HostRegistry) -> Self {
        FieldService {
            storage,
            registry,
            locks: NameLocks::default(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    // ── Field definitions ────────────────────────────────────────────────────

    /// Validate and persist a definition, inserting or updating by id.
    ///
    /// Besides the definition's own checks this adds `type: inclusion` when
    /// the registry does not allow the type for the host, `type: invalid`
    /// when an update would change the stored type, and `name: taken` on a
    /// scope-overlapping name collision.
    pub async fn save_field(&self, field: &FieldDefinition) -> Result<SaveOutcome, HostError> {
        let mut errors = field.validate();
        if !self.registry.allows(field.host_type(), field.field_type()) {
            errors.add("type", ErrorCode::Inclusion);
        }

        let _guard = self.locks.acquire(field.name(), field.host_type()).await;

        let existing = match self.storage.get_field(field.id()).await {
            Ok(record) => Some(record),
            Err(StorageError::FieldNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        if let Some(existing) = &existing {
            if existing.field_type != field.field_type().as_str() {
                errors.add("type", ErrorCode::Invalid);
            }
        }
        let taken = self
            .storage
            .field_name_taken(field.name(), field.host_type(), field.scope(), Some(field.id()))
            .await?;
        if taken {
            errors.add("name", ErrorCode::Taken);
        }

        if !errors.is_empty() {
            tracing::debug!(field = field.name(), errors = %errors, "field not saved");
            return Ok(SaveOutcome::Invalid(errors));
        }

        let record = FieldRecord::from_definition(field);
        if existing.is_some() {
            self.storage.update_field(record).await?;
        } else {
            self.storage.insert_field(record).await?;
        }
        tracing::info!(
            field_id = field.id(),
            field = field.name(),
            host_type = field.host_type(),
            created = existing.is_none(),
            "field saved"
        );
        Ok(SaveOutcome::Saved)
    }

    /// Delete a definition and its values. Returns the number of values
    /// removed.
    pub async fn destroy_field(&self, field_id: &str) -> Result<usize, HostError> {
        let removed = self.storage.delete_field(field_id).await?;
        tracing::info!(field_id, values_removed = removed, "field destroyed");
        Ok(removed)
    }

    pub async fn field(&self, field_id: &str) -> Result<FieldDefinition, HostError> {
        Ok(self.storage.get_field(field_id).await?.to_definition()?)
    }

    /// Definitions applying to `host`: same host type, and unscoped or in
    /// the host's scope.
    pub async fn fields_for(
        &self,
        host: &impl Customizable,
    ) -> Result<Vec<Arc<FieldDefinition>>, HostError> {
        self.definitions(host.host_type(), host.scope()).await
    }

    async fn definitions(
        &self,
        host_type: &str,
        scope: Option<&str>,
    ) -> Result<Vec<Arc<FieldDefinition>>, HostError> {
        self.storage
            .list_fields(host_type, scope)
            .await?
            .iter()
            .map(|record| -> Result<_, HostError> { Ok(Arc::new(record.to_definition()?)) })
            .collect()
    }

    // ── Values ───────────────────────────────────────────────────────────────

    /// The host's persisted values, bound to their definitions. Rows whose
    /// definition no longer applies to the host are left out.
    pub async fn values_for(&self, host: &impl Customizable) -> Result<Vec<ValueRecord>, HostError> {
        let fields = self.fields_for(host).await?;
        let rows = self.storage.list_values(&host.host_ref()).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match fields.iter().find(|f| f.id() == row.field_id) {
                Some(field) => records.push(row.into_record(Arc::clone(field))?),
                None => tracing::debug!(
                    value_id = %row.id,
                    field_id = %row.field_id,
                    "value for a field that does not apply to the host skipped"
                ),
            }
        }
        Ok(records)
    }

    /// Unsaved records holding the default of every applicable field the
    /// host has no value for yet.
    pub async fn initialize_defaults(
        &self,
        host: &impl Customizable,
    ) -> Result<Vec<ValueRecord>, HostError> {
        let fields = self.fields_for(host).await?;
        let rows = self.storage.list_values(&host.host_ref()).await?;
        let mut records = Vec::new();
        for field in fields {
            if rows.iter().any(|r| r.field_id == field.id()) {
                continue;
            }
            records.push(ValueRecord::for_field(host.host_ref(), field)?);
        }
        Ok(records)
    }

    /// Apply a collection of `{name, value, _destroy}` descriptors to the
    /// host's values. Every touched record is validated first; nothing is
    /// written unless all of them are valid.
    pub async fn assign_fields(
        &self,
        host: &impl Customizable,
        attributes: &Value,
    ) -> Result<AssignOutcome, HostError> {
        let descriptors = parse_assignments(attributes)?;
        let fields = self.fields_for(host).await?;
        let existing: IndexMap<String, ValueRecord> = self
            .values_for(host)
            .await?
            .into_iter()
            .filter_map(|r| Some((r.field_id()?.to_string(), r)))
            .collect();

        let mut changes: IndexMap<String, (Arc<FieldDefinition>, Change)> = IndexMap::new();
        for descriptor in descriptors {
            let Some(field) = descriptor
                .name
                .as_deref()
                .and_then(|name| fields.iter().find(|f| f.name() == name))
            else {
                tracing::debug!(name = ?descriptor.name, "assignment for unknown field skipped");
                continue;
            };
            let field_id = field.id().to_string();
            let previous = changes.shift_remove(&field_id).map(|(_, c)| c);

            if descriptor.destroy {
                if let Some(record) = existing.get(&field_id) {
                    changes.insert(
                        field_id,
                        (Arc::clone(field), Change::Destroy(record.id().to_string())),
                    );
                }
                continue;
            }

            let change = match (previous, existing.get(&field_id)) {
                (Some(Change::Create(r)), _) => Change::Create(r),
                (Some(Change::Update(r)), _) => Change::Update(r),
                (_, Some(r)) => Change::Update(r.clone()),
                (_, None) => Change::Create(ValueRecord::new(host.host_ref())),
            };
            let change = match change {
                Change::Create(mut record) => {
                    if let Some(value) = descriptor.value {
                        record.assign(Some(value));
                    }
                    if record.field().is_none() {
                        record.bind(Arc::clone(field))?;
                    }
                    Change::Create(record)
                }
                Change::Update(mut record) => {
                    if let Some(value) = descriptor.value {
                        record.assign(Some(value));
                    }
                    Change::Update(record)
                }
                destroy => destroy,
            };
            changes.insert(field_id, (Arc::clone(field), change));
        }

        let mut invalid = IndexMap::new();
        for (field, change) in changes.values() {
            if let Change::Create(record) | Change::Update(record) = change {
                let errors = record.validate();
                if !errors.is_empty() {
                    invalid.insert(field.name().to_string(), errors);
                }
            }
        }
        if !invalid.is_empty() {
            tracing::debug!(
                host = %host.host_ref(),
                fields = ?invalid.keys().collect::<Vec<_>>(),
                "assignment invalid"
            );
            return Ok(AssignOutcome::Invalid(invalid));
        }

        let mut batch = ValueChanges::default();
        for (_, change) in changes.into_values() {
            match change {
                Change::Create(record) => batch.inserts.push(ValueRow::from_record(&record)?),
                Change::Update(record) if record.is_changed() => {
                    batch.updates.push(ValueRow::from_record(&record)?)
                }
                Change::Update(_) => {}
                Change::Destroy(id) => batch.deletes.push(id),
            }
        }
        let (created, updated, destroyed) =
            (batch.inserts.len(), batch.updates.len(), batch.deletes.len());
        if !batch.is_empty() {
            if let Err(e) = self.storage.apply_values(batch).await {
                if matches!(e, StorageError::DuplicateValue { .. }) {
                    tracing::warn!(host = %host.host_ref(), error = %e, "value uniqueness race");
                }
                return Err(e.into());
            }
        }
        tracing::info!(host = %host.host_ref(), created, updated, destroyed, "values saved");
        Ok(AssignOutcome::Saved {
            created,
            updated,
            destroyed,
        })
    }

    /// Remove every value of a destroyed host.
    pub async fn destroy_host(&self, host: &impl Customizable) -> Result<usize, HostError> {
        let removed = self.storage.delete_host_values(&host.host_ref()).await?;
        tracing::info!(host = %host.host_ref(), removed, "host values destroyed");
        Ok(removed)
    }

    // ── Filtering ────────────────────────────────────────────────────────────

    /// Build a query from a collection of `{name|n, operator|op, value|v}`
    /// descriptors. Unknown names are skipped; an unknown operator for a
    /// known field is a usage error.
    pub async fn where_by_fields(
        &self,
        host_type: &str,
        scope: Option<&str>,
        filters: &Value,
    ) -> Result<FieldQuery, HostError> {
        let descriptors = parse_filters(filters)?;
        let fields = self.definitions(host_type, scope).await?;
        let mut query = FieldQuery::new(host_type);
        for descriptor in descriptors {
            let Some(field) = descriptor
                .name
                .as_deref()
                .and_then(|name| fields.iter().find(|f| f.name() == name))
            else {
                tracing::debug!(name = ?descriptor.name, "filter on unknown field skipped");
                continue;
            };
            let condition = field
                .finder()
                .search(&descriptor.operator, descriptor.value.as_ref())?;
            query.push(condition);
        }
        Ok(query)
    }

    /// Run a query against each condition's scoped value relation and
    /// intersect the matching host ids.
    pub async fn matching_hosts(&self, query: &FieldQuery) -> Result<HostMatch, HostError> {
        if query.is_unconstrained() {
            return Ok(HostMatch::All);
        }
        let mut matched: Option<BTreeSet<String>> = None;
        for condition in query.conditions() {
            let rows = self.storage.scoped_values(&condition.field_id).await?;
            let ids: BTreeSet<String> = rows
                .into_iter()
                .filter(|row| row.host_type == query.host_type() && condition.matches(&row.value))
                .map(|row| row.host_id)
                .collect();
            matched = Some(match matched {
                None => ids,
                Some(acc) => acc.intersection(&ids).cloned().collect(),
            });
        }
        Ok(HostMatch::Only(matched.unwrap_or_default()))
    }
}
