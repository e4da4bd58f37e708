use serde::{Deserialize, Serialize};

use crate::descriptor::{ComponentDescriptor, OCI_REGISTRY_TYPE};

/// A registry location a descriptor is (or will be) published to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryContext {
    #[serde(rename = "type")]
    pub type_: String,
    pub base_url: String,
}

impl RepositoryContext {
    pub fn new(type_: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            base_url: base_url.into(),
        }
    }

    /// An OCI registry context.
    pub fn oci_registry(base_url: impl Into<String>) -> Self {
        Self::new(OCI_REGISTRY_TYPE, base_url)
    }
}

/// Append `{type, base_url}` unless an equal context is already present.
///
/// Existing order is preserved and new contexts go to the end. Returns `true`
/// if the context was appended.
pub fn add_repository_context(
    contexts: &mut Vec<RepositoryContext>,
    type_: &str,
    base_url: &str,
) -> bool {
    if contexts
        .iter()
        .any(|c| c.type_ == type_ && c.base_url == base_url)
    {
        return false;
    }
    contexts.push(RepositoryContext::new(type_, base_url));
    true
}

impl ComponentDescriptor {
    /// Append a repository context to this descriptor, see [`add_repository_context`].
    pub fn add_repository_context(&mut self, type_: &str, base_url: &str) -> bool {
        add_repository_context(&mut self.component.repository_contexts, type_, base_url)
    }

    /// The most recently added repository context.
    pub fn effective_repository_context(&self) -> Option<&RepositoryContext> {
        self.component.repository_contexts.last()
    }
}
