use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied key/value pairs that disambiguate entries sharing a
/// name, version and type.
pub type ExtraIdentity = BTreeMap<String, String>;

/// Identity keys reserved for the built-in identity fields.
pub const RESERVED_IDENTITY_KEYS: [&str; 2] = ["name", "version"];

/// A free-form label attached to an entry. Labels never take part in identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: serde_json::Value,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity-bearing metadata shared by resources, sources and component
/// references.
///
/// Serialized flattened into the owning entry, so a resource document reads
/// `name: ..., version: ..., type: ...` at its top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_identity: ExtraIdentity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

impl IdentityObjectMeta {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        type_: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            type_: type_.into(),
            ..Default::default()
        }
    }

    /// Add an extra identity pair (builder style).
    pub fn with_extra_identity(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_identity.insert(key.into(), value.into());
        self
    }

    /// Add a label (builder style).
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// The identity key of this metadata.
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            version: self.version.clone(),
            type_: self.type_.clone(),
            extra: self.extra_identity.clone(),
        }
    }
}

/// The equality key of every descriptor collection.
///
/// Two entries are the same entry iff name, version, type and every extra
/// identity pair are equal. Relation, access, input and labels are never
/// part of the identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub name: String,
    pub version: String,
    pub type_: String,
    pub extra: ExtraIdentity,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)?;
        if !self.type_.is_empty() {
            write!(f, " ({})", self.type_)?;
        }
        if !self.extra.is_empty() {
            let pairs: Vec<String> = self.extra.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " [{}]", pairs.join(","))?;
        }
        Ok(())
    }
}

/// Anything that can be keyed by an [`Identity`].
pub trait Identifiable {
    /// The identity-bearing metadata of this entry.
    fn meta(&self) -> &IdentityObjectMeta;

    fn identity(&self) -> Identity {
        self.meta().identity()
    }

    /// Compare identities without allocating an [`Identity`].
    fn same_identity<O: Identifiable + ?Sized>(&self, other: &O) -> bool {
        let (a, b) = (self.meta(), other.meta());
        a.name == b.name
            && a.version == b.version
            && a.type_ == b.type_
            && a.extra_identity == b.extra_identity
    }
}

impl Identifiable for IdentityObjectMeta {
    fn meta(&self) -> &IdentityObjectMeta {
        self
    }
}
