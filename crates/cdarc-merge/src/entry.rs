use cdarc_types::{ComponentDescriptor, ComponentReference, Resource, Source};
use tracing::debug;

use crate::error::MergeResult;
use crate::merge::{upsert, MergeOutcome, Mergeable};

/// An entry type stored in one of the descriptor's collections.
pub trait DescriptorEntry: Mergeable {
    /// Human-readable collection name, used in logs and messages.
    const KIND: &'static str;

    fn collection(descriptor: &ComponentDescriptor) -> &[Self];

    fn collection_mut(descriptor: &mut ComponentDescriptor) -> &mut Vec<Self>;
}

impl DescriptorEntry for Resource {
    const KIND: &'static str = "resource";

    fn collection(descriptor: &ComponentDescriptor) -> &[Self] {
        &descriptor.component.resources
    }

    fn collection_mut(descriptor: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut descriptor.component.resources
    }
}

impl DescriptorEntry for Source {
    const KIND: &'static str = "source";

    fn collection(descriptor: &ComponentDescriptor) -> &[Self] {
        &descriptor.component.sources
    }

    fn collection_mut(descriptor: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut descriptor.component.sources
    }
}

impl DescriptorEntry for ComponentReference {
    const KIND: &'static str = "component reference";

    fn collection(descriptor: &ComponentDescriptor) -> &[Self] {
        &descriptor.component.component_references
    }

    fn collection_mut(descriptor: &mut ComponentDescriptor) -> &mut Vec<Self> {
        &mut descriptor.component.component_references
    }
}

/// Upsert `incoming` into the matching collection of `descriptor`.
pub fn merge_into_descriptor<T: DescriptorEntry>(
    descriptor: &mut ComponentDescriptor,
    incoming: T,
) -> MergeResult<MergeOutcome> {
    let identity = incoming.identity();
    let outcome = upsert(T::collection_mut(descriptor), incoming)?;
    debug!(
        kind = T::KIND,
        name = %identity.name,
        version = %identity.version,
        inserted = outcome.is_insert(),
        index = outcome.index(),
        "entry merged"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_types::{Access, IdentityObjectMeta, Relation};

    #[test]
    fn entries_land_in_their_collections() {
        let mut cd = ComponentDescriptor::new("example.com/comp", "1.0.0");
        merge_into_descriptor(
            &mut cd,
            Resource::new(IdentityObjectMeta::new("img", "1.0.0", "ociImage"), Relation::External)
                .with_access(Access::oci_registry("r/img:1")),
        )
        .unwrap();
        merge_into_descriptor(&mut cd, Source::new(IdentityObjectMeta::new("repo", "1.0.0", "git")))
            .unwrap();
        merge_into_descriptor(
            &mut cd,
            ComponentReference::new(IdentityObjectMeta::new("dep", "1.0.0", "component"), "example.com/dep"),
        )
        .unwrap();

        assert_eq!(Resource::collection(&cd).len(), 1);
        assert_eq!(Source::collection(&cd).len(), 1);
        assert_eq!(ComponentReference::collection(&cd).len(), 1);
    }

    #[test]
    fn second_merge_updates() {
        let mut cd = ComponentDescriptor::new("example.com/comp", "1.0.0");
        let src = Source::new(IdentityObjectMeta::new("repo", "1.0.0", "git"));
        assert!(merge_into_descriptor(&mut cd, src.clone()).unwrap().is_insert());
        assert_eq!(
            merge_into_descriptor(&mut cd, src).unwrap(),
            MergeOutcome::Updated(0)
        );
    }
}
