use dynfields_core::HostRef;

/// A host entity that carries custom fields.
///
/// `scope` narrows which definitions apply: unscoped definitions apply to
/// every host of the type, scoped ones only to hosts in the same scope.
pub trait Customizable {
    fn host_type(&self) -> &str;

    fn host_id(&self) -> &str;

    fn scope(&self) -> Option<&str> {
        None
    }

    fn host_ref(&self) -> HostRef {
        HostRef::new(self.host_type(), self.host_id())
    }
}

/// A plain host handle for callers without their own entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub host_type: String,
    pub host_id: String,
    pub scope: Option<String>,
}

impl Host {
    pub fn new(host_type: impl Into<String>, host_id: impl Into<String>) -> Self {
        Host {
            host_type: host_type.into(),
            host_id: host_id.into(),
            scope: None,
        }
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl Customizable for Host {
    fn host_type(&self) -> &str {
        &self.host_type
    }

    fn host_id(&self) -> &str {
        &self.host_id
    }

    fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}
