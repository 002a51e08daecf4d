//! Host registry: which host types accept custom fields, and of which
//! field types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::FieldType;

/// Declaration of one host type, as written in configuration. A missing
/// `allowed_types` admits every field type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDeclaration {
    #[serde(default)]
    pub allowed_types: Option<Vec<FieldType>>,
}

/// Immutable after construction; build with [`HostRegistry::builder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRegistry {
    hosts: BTreeMap<String, BTreeSet<FieldType>>,
}

#[derive(Debug, Default)]
pub struct HostRegistryBuilder {
    hosts: BTreeMap<String, BTreeSet<FieldType>>,
}

impl HostRegistryBuilder {
    /// Register `host_type` accepting `types`. Registering the same host
    /// twice widens its set.
    pub fn host(mut self, host_type: impl Into<String>, types: impl IntoIterator<Item = FieldType>) -> Self {
        self.hosts.entry(host_type.into()).or_default().extend(types);
        self
    }

    pub fn host_all_types(self, host_type: impl Into<String>) -> Self {
        self.host(host_type, FieldType::ALL)
    }

    pub fn declaration(self, host_type: impl Into<String>, decl: &HostDeclaration) -> Self {
        match &decl.allowed_types {
            Some(types) => self.host(host_type, types.iter().copied()),
            None => self.host_all_types(host_type),
        }
    }

    pub fn build(self) -> HostRegistry {
        HostRegistry { hosts: self.hosts }
    }
}

impl HostRegistry {
    pub fn builder() -> HostRegistryBuilder {
        HostRegistryBuilder::default()
    }

    pub fn from_declarations<'a>(
        decls: impl IntoIterator<Item = (&'a String, &'a HostDeclaration)>,
    ) -> HostRegistry {
        decls
            .into_iter()
            .fold(HostRegistry::builder(), |b, (name, decl)| {
                b.declaration(name.clone(), decl)
            })
            .build()
    }

    pub fn is_registered(&self, host_type: &str) -> bool {
        self.hosts.contains_key(host_type)
    }

    pub fn allowed_types(&self, host_type: &str) -> Option<&BTreeSet<FieldType>> {
        self.hosts.get(host_type)
    }

    pub fn allows(&self, host_type: &str, field_type: FieldType) -> bool {
        self.hosts
            .get(host_type)
            .is_some_and(|types| types.contains(&field_type))
    }

    /// Host types accepting `field_type`, in name order.
    pub fn hosts_allowing(&self, field_type: FieldType) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|(_, types)| types.contains(&field_type))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn host_types(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_types_per_host() {
        let registry = HostRegistry::builder()
            .host("Post", [FieldType::Text, FieldType::Boolean])
            .host_all_types("Author")
            .build();

        assert!(registry.allows("Post", FieldType::Text));
        assert!(!registry.allows("Post", FieldType::Integer));
        assert!(registry.allows("Author", FieldType::DateTimeArray));
        assert!(!registry.allows("Comment", FieldType::Text));
        assert_eq!(registry.hosts_allowing(FieldType::Integer), vec!["Author"]);
        assert_eq!(
            registry.hosts_allowing(FieldType::Boolean),
            vec!["Author", "Post"]
        );
    }

    #[test]
    fn declarations_from_toml() {
        let decls: BTreeMap<String, HostDeclaration> = toml_like();
        let registry = HostRegistry::from_declarations(&decls);
        assert!(registry.allows("Author", FieldType::Enum));
        assert!(registry.allows("Post", FieldType::Integer));
        assert!(!registry.allows("Post", FieldType::Enum));
    }

    fn toml_like() -> BTreeMap<String, HostDeclaration> {
        serde_json::from_value(serde_json::json!({
            "Author": {},
            "Post": { "allowed_types": ["integer", "text"] }
        }))
        .unwrap()
    }
}
