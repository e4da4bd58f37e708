//! Entry templates: the documents callers feed into the add commands.
//!
//! Source and component reference templates are plain [`Source`] and
//! [`ComponentReference`] documents. A resource template may additionally
//! carry an `input` block describing local content to be stored in the
//! archive instead of an `access`.
//!
//! [`Source`]: crate::Source
//! [`ComponentReference`]: crate::ComponentReference

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::{Access, Resource};
use crate::error::{TypeError, TypeResult};

/// Kind of local input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    File,
    Dir,
}

/// A local blob specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInput {
    #[serde(rename = "type")]
    pub kind: InputKind,
    /// Path to the file or directory, relative to the template's directory
    /// unless absolute.
    pub path: PathBuf,
    /// Gzip the content before digesting and storing it.
    #[serde(default)]
    pub compress: bool,
    /// Glob pattern of directory entries to leave out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    /// Overrides the media type derived from `type` and `compress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl BlobInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: InputKind::File,
            path: path.into(),
            compress: false,
            exclude: None,
            media_type: None,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: InputKind::Dir,
            ..Self::file(path)
        }
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }
}

/// Where a resource's content comes from. Exactly one of the two.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceSource {
    /// Externally hosted content.
    Access(Access),
    /// Local content to be stored in the archive.
    Input(BlobInput),
}

/// A resource document as written by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<BlobInput>,
}

impl ResourceTemplate {
    /// The content source of this template.
    ///
    /// Both `access` and `input` set is rejected. Neither set yields `None`: such a
    /// template can only update fields of an existing resource, and the merged
    /// result is rejected by validation if it still lacks an access.
    pub fn source(&self) -> TypeResult<Option<ResourceSource>> {
        match (&self.resource.access, &self.input) {
            (Some(_), Some(_)) => Err(TypeError::ConflictingResourceSource {
                name: self.resource.meta.name.clone(),
            }),
            (Some(access), None) => Ok(Some(ResourceSource::Access(access.clone()))),
            (None, Some(input)) => Ok(Some(ResourceSource::Input(input.clone()))),
            (None, None) => Ok(None),
        }
    }

    /// Split the template into the resource to merge and the input to resolve.
    pub fn into_parts(self) -> TypeResult<(Resource, Option<BlobInput>)> {
        self.source()?;
        Ok((self.resource, self.input))
    }
}

impl From<Resource> for ResourceTemplate {
    fn from(resource: Resource) -> Self {
        Self {
            resource,
            input: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Relation;

    #[test]
    fn input_template_from_yaml() {
        let doc = r#"
name: myconfig
type: json
relation: local
input:
  type: dir
  path: /my/path
  compress: true
  exclude: "*.txt"
"#;
        let t: ResourceTemplate = serde_yaml::from_str(doc).unwrap();
        assert_eq!(t.resource.relation, Some(Relation::Local));
        assert!(t.resource.meta.version.is_empty());
        let input = t.input.clone().unwrap();
        assert_eq!(input.kind, InputKind::Dir);
        assert!(input.compress);
        assert_eq!(input.exclude.as_deref(), Some("*.txt"));
        assert!(matches!(t.source(), Ok(Some(ResourceSource::Input(_)))));
    }

    #[test]
    fn compress_defaults_to_false() {
        let input: BlobInput = serde_yaml::from_str("type: file\npath: some/path\n").unwrap();
        assert_eq!(input, BlobInput::file("some/path"));
    }

    #[test]
    fn access_and_input_conflict() {
        let mut t = ResourceTemplate::default();
        t.resource.meta.name = "both".into();
        t.resource.access = Some(Access::oci_registry("r/img:1"));
        t.input = Some(BlobInput::file("f"));
        assert_eq!(
            t.source().unwrap_err(),
            TypeError::ConflictingResourceSource { name: "both".into() }
        );
        assert!(t.into_parts().is_err());
    }

    #[test]
    fn neither_source_is_a_partial_template() {
        let t = ResourceTemplate::default();
        assert_eq!(t.source().unwrap(), None);
    }
}
