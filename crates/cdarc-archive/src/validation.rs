//! Schema validation of component descriptors.
//!
//! Validation is pluggable through [`Validator`]. [`DefaultValidator`]
//! implements the v2 schema rules. Per-entry rules live in [`EntryRules`] so
//! the add pipeline can check a freshly merged entry on its own before the
//! whole descriptor is validated.

use std::collections::HashSet;
use std::fmt;

use cdarc_merge::DescriptorEntry;
use cdarc_types::identity::RESERVED_IDENTITY_KEYS;
use cdarc_types::{
    ComponentDescriptor, ComponentReference, Identifiable, IdentityObjectMeta, Resource, Source,
    SCHEMA_VERSION,
};

/// One schema violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaError {
    /// Field path, e.g. `component.resources[0].version`.
    pub field: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A descriptor validation rule set.
pub trait Validator: Send + Sync {
    /// Human-readable name of the rule set.
    fn name(&self) -> &str;

    /// All violations found in `descriptor`. Empty means valid.
    fn validate(&self, descriptor: &ComponentDescriptor) -> Vec<SchemaError>;
}

/// Whether `version` is a semantic version.
///
/// A leading `v` is accepted, and so are versions with fewer than three
/// numeric components (`1`, `1.2`), which are read as if padded with zeros.
pub fn is_semver(version: &str) -> bool {
    let version = version.strip_prefix('v').unwrap_or(version);
    if semver::Version::parse(version).is_ok() {
        return true;
    }
    let split = version.find(['-', '+']).unwrap_or(version.len());
    let (core, rest) = version.split_at(split);
    let parts = core.split('.').count();
    if core.is_empty() || parts >= 3 {
        return false;
    }
    let padded = format!("{core}{}{rest}", ".0".repeat(3 - parts));
    semver::Version::parse(&padded).is_ok()
}

fn check_meta(meta: &IdentityObjectMeta, path: &str, errors: &mut Vec<SchemaError>) {
    if meta.name.trim().is_empty() {
        errors.push(SchemaError::new(format!("{path}.name"), "must not be empty"));
    }
    if meta.type_.trim().is_empty() {
        errors.push(SchemaError::new(format!("{path}.type"), "must not be empty"));
    }
    if !is_semver(&meta.version) {
        errors.push(SchemaError::new(
            format!("{path}.version"),
            format!("{:?} is not a valid semantic version", meta.version),
        ));
    }
    for key in meta.extra_identity.keys() {
        if RESERVED_IDENTITY_KEYS.contains(&key.as_str()) {
            errors.push(SchemaError::new(
                format!("{path}.extraIdentity.{key}"),
                "key is reserved for the built-in identity",
            ));
        }
    }
}

/// Rules that apply to a single entry, independent of its siblings.
pub trait EntryRules: DescriptorEntry {
    /// Name of the descriptor field holding this collection.
    const FIELD: &'static str;

    /// Append the violations of this entry, found at `path`, to `errors`.
    fn check(&self, path: &str, errors: &mut Vec<SchemaError>);
}

impl EntryRules for Resource {
    const FIELD: &'static str = "resources";

    fn check(&self, path: &str, errors: &mut Vec<SchemaError>) {
        check_meta(&self.meta, path, errors);
        if self.relation.is_none() {
            errors.push(SchemaError::new(
                format!("{path}.relation"),
                "must be one of local, external",
            ));
        }
        match &self.access {
            None => errors.push(SchemaError::new(format!("{path}.access"), "must be set")),
            Some(access) if access.type_.trim().is_empty() => errors.push(SchemaError::new(
                format!("{path}.access.type"),
                "must not be empty",
            )),
            Some(_) => {}
        }
    }
}

impl EntryRules for Source {
    const FIELD: &'static str = "sources";

    fn check(&self, path: &str, errors: &mut Vec<SchemaError>) {
        check_meta(&self.meta, path, errors);
    }
}

impl EntryRules for ComponentReference {
    const FIELD: &'static str = "componentReferences";

    fn check(&self, path: &str, errors: &mut Vec<SchemaError>) {
        check_meta(&self.meta, path, errors);
        if self.component_name.trim().is_empty() {
            errors.push(SchemaError::new(
                format!("{path}.componentName"),
                "must not be empty",
            ));
        }
    }
}

/// Violations of a single entry found at `index` of its collection.
pub fn check_entry<T: EntryRules>(entry: &T, index: usize) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    entry.check(&format!("component.{}[{index}]", T::FIELD), &mut errors);
    errors
}

fn check_collection<T: EntryRules>(descriptor: &ComponentDescriptor, errors: &mut Vec<SchemaError>) {
    let mut seen = HashSet::new();
    for (i, entry) in T::collection(descriptor).iter().enumerate() {
        let path = format!("component.{}[{i}]", T::FIELD);
        entry.check(&path, errors);
        if !seen.insert(entry.identity()) {
            errors.push(SchemaError::new(path, "duplicate identity"));
        }
    }
}

/// The v2 component descriptor rule set.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultValidator;

impl Validator for DefaultValidator {
    fn name(&self) -> &str {
        "v2"
    }

    fn validate(&self, descriptor: &ComponentDescriptor) -> Vec<SchemaError> {
        let mut errors = Vec::new();

        if descriptor.meta.schema_version != SCHEMA_VERSION {
            errors.push(SchemaError::new(
                "meta.schemaVersion",
                format!("unsupported schema version {:?}", descriptor.meta.schema_version),
            ));
        }

        let component = &descriptor.component;
        if component.name.trim().is_empty() {
            errors.push(SchemaError::new("component.name", "must not be empty"));
        }
        if !is_semver(&component.version) {
            errors.push(SchemaError::new(
                "component.version",
                format!("{:?} is not a valid semantic version", component.version),
            ));
        }

        for (i, ctx) in component.repository_contexts.iter().enumerate() {
            if ctx.type_.trim().is_empty() {
                errors.push(SchemaError::new(
                    format!("component.repositoryContexts[{i}].type"),
                    "must not be empty",
                ));
            }
            if ctx.base_url.trim().is_empty() {
                errors.push(SchemaError::new(
                    format!("component.repositoryContexts[{i}].baseUrl"),
                    "must not be empty",
                ));
            }
        }

        check_collection::<Source>(descriptor, &mut errors);
        check_collection::<ComponentReference>(descriptor, &mut errors);
        check_collection::<Resource>(descriptor, &mut errors);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_types::{Access, Relation};

    fn valid() -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new("example.com/component", "v0.1.0");
        cd.add_repository_context("ociRegistry", "example.registry");
        cd.component.resources.push(
            Resource::new(IdentityObjectMeta::new("img", "1.0.0", "ociImage"), Relation::External)
                .with_access(Access::oci_registry("example.registry/img:1.0.0")),
        );
        cd.component
            .sources
            .push(Source::new(IdentityObjectMeta::new("repo", "v0.0.1", "git")));
        cd
    }

    #[test]
    fn semver_forms() {
        assert!(is_semver("1.2.3"));
        assert!(is_semver("v0.0.1"));
        assert!(is_semver("1.2.3-rc.1+build.5"));
        assert!(is_semver("1.2"));
        assert!(is_semver("v1"));
        assert!(!is_semver(""));
        assert!(!is_semver("latest"));
        assert!(!is_semver("1.2.3.4"));
        assert!(!is_semver("1..2"));
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(DefaultValidator.validate(&valid()).is_empty());
    }

    #[test]
    fn component_rules() {
        let mut cd = valid();
        cd.meta.schema_version = "v3".into();
        cd.component.name.clear();
        cd.component.version = "next".into();
        let fields: Vec<_> = DefaultValidator
            .validate(&cd)
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec!["meta.schemaVersion", "component.name", "component.version"]
        );
    }

    #[test]
    fn resource_without_access_is_invalid() {
        let res = Resource::new(IdentityObjectMeta::new("cfg", "1.0.0", "json"), Relation::Local);
        let errors = check_entry(&res, 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "component.resources[3].access");
    }

    #[test]
    fn reserved_extra_identity_keys() {
        let src = Source::new(
            IdentityObjectMeta::new("repo", "1.0.0", "git").with_extra_identity("name", "x"),
        );
        let errors = check_entry(&src, 0);
        assert_eq!(errors[0].field, "component.sources[0].extraIdentity.name");
    }

    #[test]
    fn component_reference_needs_component_name() {
        let r = ComponentReference::new(IdentityObjectMeta::new("dep", "1.0.0", "component"), "");
        let errors = check_entry(&r, 0);
        assert_eq!(errors[0].field, "component.componentReferences[0].componentName");
    }

    #[test]
    fn duplicate_identities_are_reported() {
        let mut cd = valid();
        let dup = cd.component.sources[0].clone();
        cd.component.sources.push(dup);
        let errors = DefaultValidator.validate(&cd);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "component.sources[1]");
        assert_eq!(errors[0].message, "duplicate identity");
    }

    #[test]
    fn empty_repository_context_fields() {
        let mut cd = valid();
        cd.component
            .repository_contexts
            .push(cdarc_types::RepositoryContext::new("", ""));
        assert_eq!(DefaultValidator.validate(&cd).len(), 2);
    }
}
