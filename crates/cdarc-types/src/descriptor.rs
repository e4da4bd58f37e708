//! The component descriptor data model.
//!
//! Field names follow the v2 component descriptor schema: the document has a
//! `meta` block carrying `schemaVersion` and a `component` block carrying the
//! identity, provider, repository contexts and the three entry collections.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{Identifiable, IdentityObjectMeta, Label};
use crate::repository::RepositoryContext;

/// The single supported schema version.
pub const SCHEMA_VERSION: &str = "v2";

/// Access type of content hosted in an OCI registry.
pub const OCI_REGISTRY_TYPE: &str = "ociRegistry";

/// Access type of a blob stored inside the component archive itself.
pub const LOCAL_FILESYSTEM_BLOB_TYPE: &str = "localFilesystemBlob";

/// Schema metadata of a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub schema_version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Who provides a component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Internal,
    External,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
        }
    }
}

/// A versioned, named metadata graph describing one software component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub meta: Metadata,
    pub component: ComponentSpec,
}

/// The component block of a descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub repository_contexts: Vec<RepositoryContext>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub component_references: Vec<ComponentReference>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl ComponentDescriptor {
    /// An empty descriptor for the given component with no entries.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            meta: Metadata::default(),
            component: ComponentSpec {
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn version(&self) -> &str {
        &self.component.version
    }
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

/// Pointer to content hosted outside the descriptor.
///
/// Only `type` is interpreted; every other key (`imageReference`,
/// `filename`, `repoUrl`, ...) is carried verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Access {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Access {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field (builder style).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Access to an image in an OCI registry.
    pub fn oci_registry(image_reference: impl Into<String>) -> Self {
        Self::new(OCI_REGISTRY_TYPE).with_field("imageReference", image_reference.into())
    }

    /// Access to a blob stored in the archive's blob directory.
    pub fn local_filesystem_blob(filename: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::new(LOCAL_FILESYSTEM_BLOB_TYPE)
            .with_field("filename", filename.into())
            .with_field("mediaType", media_type.into())
    }

    /// A string-valued field, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Whether a resource is built and versioned with the component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Local,
    External,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Reference from a resource to the sources it was built from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub identity_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

/// An artifact owned or referenced by a component.
///
/// `relation` and `access` are optional so that a partial template can update
/// a single field of an existing resource; a stored resource must carry both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(flatten)]
    pub meta: IdentityObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub src_refs: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
}

impl Resource {
    pub fn new(meta: IdentityObjectMeta, relation: Relation) -> Self {
        Self {
            meta,
            relation: Some(relation),
            ..Default::default()
        }
    }

    /// Set the access (builder style).
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }
}

impl Identifiable for Resource {
    fn meta(&self) -> &IdentityObjectMeta {
        &self.meta
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// The origin repository of a component's code.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(flatten)]
    pub meta: IdentityObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
}

impl Source {
    pub fn new(meta: IdentityObjectMeta) -> Self {
        Self { meta, access: None }
    }
}

impl Identifiable for Source {
    fn meta(&self) -> &IdentityObjectMeta {
        &self.meta
    }
}

// ---------------------------------------------------------------------------
// ComponentReference
// ---------------------------------------------------------------------------

/// A dependency edge to another component's descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    #[serde(flatten)]
    pub meta: IdentityObjectMeta,
    #[serde(default)]
    pub component_name: String,
}

impl ComponentReference {
    pub fn new(meta: IdentityObjectMeta, component_name: impl Into<String>) -> Self {
        Self {
            meta,
            component_name: component_name.into(),
        }
    }
}

impl Identifiable for ComponentReference {
    fn meta(&self) -> &IdentityObjectMeta {
        &self.meta
    }
}
