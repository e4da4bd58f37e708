use cdarc_types::{ComponentReference, Identifiable, IdentityObjectMeta, Relation, Resource, Source};

use crate::error::{MergeError, MergeResult};

/// Result of an [`upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The identity was new; the entry was appended at this position.
    Inserted(usize),
    /// An entry with the same identity was merged in place at this position.
    Updated(usize),
}

impl MergeOutcome {
    /// Position of the entry in the collection.
    pub fn index(&self) -> usize {
        match self {
            Self::Inserted(i) | Self::Updated(i) => *i,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// An entry type with a field-level merge rule.
pub trait Mergeable: Identifiable + Default {
    /// Merge `incoming` onto `existing`. The result keeps the incoming
    /// identity; every other field comes from `incoming` when set.
    fn merge_fields(existing: Self, incoming: Self) -> Self;

    /// Fill fields the caller may leave out, given the owning component's
    /// version. Applied to incoming entries before they are merged.
    fn apply_defaults(&mut self, _component_version: &str) {}
}

fn pick_vec<T>(existing: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    if incoming.is_empty() {
        existing
    } else {
        incoming
    }
}

fn pick_string(existing: String, incoming: String) -> String {
    if incoming.is_empty() {
        existing
    } else {
        incoming
    }
}

fn merge_meta(existing: IdentityObjectMeta, incoming: IdentityObjectMeta) -> IdentityObjectMeta {
    IdentityObjectMeta {
        name: incoming.name,
        version: incoming.version,
        type_: incoming.type_,
        extra_identity: incoming.extra_identity,
        labels: pick_vec(existing.labels, incoming.labels),
    }
}

impl Mergeable for Resource {
    fn merge_fields(existing: Self, incoming: Self) -> Self {
        Self {
            meta: merge_meta(existing.meta, incoming.meta),
            relation: incoming.relation.or(existing.relation),
            src_refs: pick_vec(existing.src_refs, incoming.src_refs),
            access: incoming.access.or(existing.access),
        }
    }

    /// Local resources are versioned in lockstep with their component.
    fn apply_defaults(&mut self, component_version: &str) {
        if self.relation == Some(Relation::Local) && self.meta.version.is_empty() {
            self.meta.version = component_version.to_string();
        }
    }
}

impl Mergeable for Source {
    fn merge_fields(existing: Self, incoming: Self) -> Self {
        Self {
            meta: merge_meta(existing.meta, incoming.meta),
            access: incoming.access.or(existing.access),
        }
    }
}

impl Mergeable for ComponentReference {
    fn merge_fields(existing: Self, incoming: Self) -> Self {
        Self {
            meta: merge_meta(existing.meta, incoming.meta),
            component_name: pick_string(existing.component_name, incoming.component_name),
        }
    }
}

/// Position of the entry sharing `probe`'s identity, if any.
///
/// Fails if more than one entry has that identity.
pub fn find_index<T, P>(collection: &[T], probe: &P) -> MergeResult<Option<usize>>
where
    T: Identifiable,
    P: Identifiable + ?Sized,
{
    let mut found = None;
    for (i, entry) in collection.iter().enumerate() {
        if !entry.same_identity(probe) {
            continue;
        }
        if let Some(first) = found {
            return Err(MergeError::DuplicateIdentity {
                identity: probe.identity(),
                first,
                second: i,
            });
        }
        found = Some(i);
    }
    Ok(found)
}

/// Insert `incoming`, or merge it into the entry with the same identity.
///
/// A merged entry is replaced in place; the order of the collection is
/// otherwise unchanged.
pub fn upsert<T: Mergeable>(collection: &mut Vec<T>, incoming: T) -> MergeResult<MergeOutcome> {
    match find_index(collection, &incoming)? {
        None => {
            collection.push(incoming);
            Ok(MergeOutcome::Inserted(collection.len() - 1))
        }
        Some(i) => {
            let existing = std::mem::take(&mut collection[i]);
            collection[i] = T::merge_fields(existing, incoming);
            Ok(MergeOutcome::Updated(i))
        }
    }
}

/// Owned form of [`upsert`].
pub fn merge<T: Mergeable>(mut collection: Vec<T>, incoming: T) -> MergeResult<Vec<T>> {
    upsert(&mut collection, incoming)?;
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_types::{Access, Label, SourceRef};
    use proptest::prelude::*;

    fn meta(name: &str, version: &str) -> IdentityObjectMeta {
        IdentityObjectMeta::new(name, version, "ociImage")
    }

    fn image(name: &str, version: &str, reference: &str) -> Resource {
        Resource::new(meta(name, version), Relation::External)
            .with_access(Access::oci_registry(reference))
    }

    #[test]
    fn new_identity_is_appended() {
        let mut resources = vec![image("a", "1.0.0", "r/a:1")];
        let outcome = upsert(&mut resources, image("b", "1.0.0", "r/b:1")).unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted(1));
        assert_eq!(resources.len(), 2);
    }

    #[test]
    fn same_identity_is_replaced_in_place() {
        let mut resources = vec![
            image("a", "1.0.0", "r/a:1"),
            image("b", "1.0.0", "r/b:1"),
            image("c", "1.0.0", "r/c:1"),
        ];
        let outcome = upsert(&mut resources, image("a", "1.0.0", "r/a:2")).unwrap();
        assert_eq!(outcome, MergeOutcome::Updated(0));
        let names: Vec<_> = resources.iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(
            resources[0].access.as_ref().unwrap().get_str("imageReference"),
            Some("r/a:2")
        );
    }

    #[test]
    fn different_access_is_still_the_same_entry() {
        let mut resources = vec![image("a", "1.0.0", "r/a:1")];
        let local = Resource::new(meta("a", "1.0.0"), Relation::Local)
            .with_access(Access::local_filesystem_blob("sha256/ab/ab", "application/x-tar"));
        upsert(&mut resources, local).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].relation, Some(Relation::Local));
    }

    #[test]
    fn access_only_template_keeps_other_fields() {
        let existing = Resource {
            meta: meta("a", "1.0.0")
                .with_extra_identity("arch", "amd64")
                .with_label(Label::new("team", "core")),
            relation: Some(Relation::External),
            src_refs: vec![SourceRef::default()],
            access: Some(Access::oci_registry("r/a:1")),
        };
        let mut resources = vec![existing.clone()];

        let partial = Resource {
            meta: meta("a", "1.0.0").with_extra_identity("arch", "amd64"),
            access: Some(Access::oci_registry("r/a:2")),
            ..Default::default()
        };
        upsert(&mut resources, partial).unwrap();

        let merged = &resources[0];
        assert_eq!(merged.meta.extra_identity, existing.meta.extra_identity);
        assert_eq!(merged.meta.labels, existing.meta.labels);
        assert_eq!(merged.relation, existing.relation);
        assert_eq!(merged.src_refs, existing.src_refs);
        assert_eq!(merged.access, Some(Access::oci_registry("r/a:2")));
    }

    #[test]
    fn component_reference_name_is_kept_when_omitted() {
        let mut refs = vec![ComponentReference::new(
            IdentityObjectMeta::new("dep", "1.0.0", "component"),
            "example.com/dep",
        )];
        let partial = ComponentReference {
            meta: IdentityObjectMeta::new("dep", "1.0.0", "component")
                .with_label(Label::new("critical", true)),
            component_name: String::new(),
        };
        upsert(&mut refs, partial).unwrap();
        assert_eq!(refs[0].component_name, "example.com/dep");
        assert_eq!(refs[0].meta.labels.len(), 1);
    }

    #[test]
    fn source_access_is_merged() {
        let git = Access::new("git").with_field("repoUrl", "github.com/example/repo");
        let mut sources = vec![Source::new(IdentityObjectMeta::new("repo", "v0.0.1", "git"))];
        let incoming = Source {
            meta: IdentityObjectMeta::new("repo", "v0.0.1", "git"),
            access: Some(git.clone()),
        };
        upsert(&mut sources, incoming).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].access, Some(git));
    }

    #[test]
    fn duplicate_identities_are_reported() {
        let mut resources = vec![image("a", "1.0.0", "r/1"), image("a", "1.0.0", "r/2")];
        let err = upsert(&mut resources, image("a", "1.0.0", "r/3")).unwrap_err();
        assert!(matches!(
            err,
            MergeError::DuplicateIdentity {
                first: 0,
                second: 1,
                ..
            }
        ));
    }

    #[test]
    fn local_version_defaults_to_component_version() {
        let mut local = Resource::new(meta("cfg", ""), Relation::Local);
        local.apply_defaults("1.2.3");
        assert_eq!(local.meta.version, "1.2.3");

        let mut pinned = Resource::new(meta("cfg", "0.1.0"), Relation::Local);
        pinned.apply_defaults("1.2.3");
        assert_eq!(pinned.meta.version, "0.1.0");

        let mut external = Resource::new(meta("img", ""), Relation::External);
        external.apply_defaults("1.2.3");
        assert!(external.meta.version.is_empty());
    }

    #[test]
    fn owned_merge() {
        let merged = merge(Vec::new(), image("a", "1.0.0", "r/a:1")).unwrap();
        assert_eq!(merged.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_resource() -> impl Strategy<Value = Resource> {
        (
            prop::sample::select(vec!["a", "b", "c"]),
            prop::sample::select(vec!["1.0.0", "2.0.0"]),
            prop::option::of(prop::sample::select(vec!["amd64", "arm64"])),
            prop::option::of(prop::sample::select(vec!["r/x:1", "r/x:2", "r/y:1"])),
            prop::option::of(prop::sample::select(vec![Relation::Local, Relation::External])),
            prop::collection::vec(prop::sample::select(vec!["team", "tier"]), 0..2),
        )
            .prop_map(|(name, version, arch, reference, relation, labels)| {
                let mut meta = IdentityObjectMeta::new(name, version, "ociImage");
                if let Some(arch) = arch {
                    meta = meta.with_extra_identity("arch", arch);
                }
                for label in labels {
                    meta = meta.with_label(Label::new(label, "x"));
                }
                Resource {
                    meta,
                    relation,
                    src_refs: Vec::new(),
                    access: reference.map(Access::oci_registry),
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn identities_stay_unique(entries in prop::collection::vec(arb_resource(), 0..40)) {
            let mut resources = Vec::new();
            for entry in entries {
                upsert(&mut resources, entry).unwrap();
            }
            for (i, a) in resources.iter().enumerate() {
                for b in &resources[i + 1..] {
                    prop_assert!(!a.same_identity(b));
                }
            }
        }

        #[test]
        fn merging_twice_equals_merging_once(
            existing in prop::collection::vec(arb_resource(), 0..10),
            incoming in arb_resource(),
        ) {
            let mut once = Vec::new();
            for entry in existing {
                upsert(&mut once, entry).unwrap();
            }
            upsert(&mut once, incoming.clone()).unwrap();
            let mut twice = once.clone();
            upsert(&mut twice, incoming).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
