//! The add pipeline: template documents in, committed descriptor entries out.
//!
//! Every document is handled in isolation:
//!
//! 1. decode it, filling defaults (local resources take the component version)
//! 2. resolve and store its blob, if it carries an `input`
//! 3. merge it into a working copy of the descriptor
//! 4. validate the merged entry, then the whole descriptor
//! 5. persist the working copy atomically and adopt it
//!
//! A failure stops the pipeline at that document. Documents committed before
//! it stay on disk.

use std::path::Path;

use cdarc_input::BlobResolver;
use cdarc_merge::{merge_into_descriptor, DescriptorEntry, MergeOutcome, Mergeable};
use cdarc_template::{decode, TemplateSource};
use cdarc_types::{
    Access, BlobInfo, ComponentReference, Identifiable, Identity, Resource, ResourceTemplate,
    Source,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{ArchiveError, ArchiveResult};
use crate::store::{ArchiveStore, ComponentArchive};
use crate::validation::{check_entry, EntryRules};

/// A caller document that becomes one descriptor entry.
pub trait EntryTemplate: DeserializeOwned {
    type Entry: EntryRules;

    /// Identity of the entry this template produces.
    fn identity(&self) -> Identity;

    /// Fill defaults that depend on the owning component.
    fn apply_defaults(&mut self, component_version: &str);

    /// Turn the template into an entry, storing any blob content it carries.
    fn prepare(
        self,
        store: &ArchiveStore,
        archive: &ComponentArchive,
        base_dir: &Path,
    ) -> ArchiveResult<Prepared<Self::Entry>>;
}

/// An entry ready to merge, plus the blob stored for it.
#[derive(Clone, Debug)]
pub struct Prepared<E> {
    pub entry: E,
    pub blob: Option<BlobInfo>,
}

impl<E> Prepared<E> {
    fn plain(entry: E) -> Self {
        Self { entry, blob: None }
    }
}

impl EntryTemplate for ResourceTemplate {
    type Entry = Resource;

    fn identity(&self) -> Identity {
        self.resource.identity()
    }

    fn apply_defaults(&mut self, component_version: &str) {
        self.resource.apply_defaults(component_version);
    }

    fn prepare(
        self,
        store: &ArchiveStore,
        archive: &ComponentArchive,
        base_dir: &Path,
    ) -> ArchiveResult<Prepared<Resource>> {
        let resolver = BlobResolver::new(store.fs(), base_dir)
            .with_spool_threshold(store.config().spool_threshold);
        let resolved = resolver.resolve_template(&self)?;
        let (mut resource, _) = self.into_parts()?;
        let Some(mut blob) = resolved else {
            return Ok(Prepared::plain(resource));
        };

        let stored = store.put_blob(archive, &blob.digest, blob.content.as_mut())?;
        debug!(
            name = %resource.meta.name,
            digest = %blob.digest,
            written = stored.written,
            "input blob stored"
        );
        let info = blob.info();
        resource.access = Some(Access::local_filesystem_blob(
            stored.filename,
            blob.media_type,
        ));
        Ok(Prepared {
            entry: resource,
            blob: Some(info),
        })
    }
}

impl EntryTemplate for Source {
    type Entry = Source;

    fn identity(&self) -> Identity {
        Identifiable::identity(self)
    }

    fn apply_defaults(&mut self, component_version: &str) {
        Mergeable::apply_defaults(self, component_version);
    }

    fn prepare(
        self,
        _store: &ArchiveStore,
        _archive: &ComponentArchive,
        _base_dir: &Path,
    ) -> ArchiveResult<Prepared<Source>> {
        Ok(Prepared::plain(self))
    }
}

impl EntryTemplate for ComponentReference {
    type Entry = ComponentReference;

    fn identity(&self) -> Identity {
        Identifiable::identity(self)
    }

    fn apply_defaults(&mut self, component_version: &str) {
        Mergeable::apply_defaults(self, component_version);
    }

    fn prepare(
        self,
        _store: &ArchiveStore,
        _archive: &ComponentArchive,
        _base_dir: &Path,
    ) -> ArchiveResult<Prepared<ComponentReference>> {
        Ok(Prepared::plain(self))
    }
}

/// One committed document.
#[derive(Clone, Debug, PartialEq)]
pub struct CommittedEntry {
    pub origin: String,
    pub index: usize,
    pub identity: Identity,
    pub outcome: MergeOutcome,
    pub blob: Option<BlobInfo>,
}

/// Everything an add run committed, in processing order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddReport {
    pub committed: Vec<CommittedEntry>,
}

impl AddReport {
    pub fn inserted(&self) -> usize {
        self.committed.iter().filter(|c| c.outcome.is_insert()).count()
    }

    pub fn updated(&self) -> usize {
        self.committed.len() - self.inserted()
    }
}

impl ArchiveStore {
    /// Add or update resources from resource templates.
    pub fn add_resources(
        &self,
        archive: &mut ComponentArchive,
        sources: Vec<TemplateSource>,
    ) -> ArchiveResult<AddReport> {
        self.add_entries::<ResourceTemplate>(archive, sources)
    }

    /// Add or update sources.
    pub fn add_sources(
        &self,
        archive: &mut ComponentArchive,
        sources: Vec<TemplateSource>,
    ) -> ArchiveResult<AddReport> {
        self.add_entries::<Source>(archive, sources)
    }

    /// Add or update component references.
    pub fn add_component_references(
        &self,
        archive: &mut ComponentArchive,
        sources: Vec<TemplateSource>,
    ) -> ArchiveResult<AddReport> {
        self.add_entries::<ComponentReference>(archive, sources)
    }

    /// Run the pipeline over `sources` in order.
    pub fn add_entries<T: EntryTemplate>(
        &self,
        archive: &mut ComponentArchive,
        sources: Vec<TemplateSource>,
    ) -> ArchiveResult<AddReport> {
        let mut report = AddReport::default();
        for source in sources {
            let base_dir = source.base_dir.clone();
            let version = archive.descriptor.version().to_string();
            let mut documents =
                decode::<T>(source).with_defaults(move |t: &mut T| t.apply_defaults(&version));
            let origin = documents.origin().to_string();

            while let Some(document) = documents.next() {
                let index = documents.position();
                let template = document.map_err(|e| ArchiveError::Document {
                    origin: origin.clone(),
                    index,
                    identity: None,
                    source: Box::new(e.into()),
                })?;
                let identity = template.identity();
                let (outcome, blob) = self
                    .commit_document(archive, template, &base_dir)
                    .map_err(|e| ArchiveError::Document {
                        origin: origin.clone(),
                        index,
                        identity: Some(identity.clone()),
                        source: Box::new(e),
                    })?;
                info!(
                    origin = %origin,
                    index,
                    name = %identity.name,
                    version = %identity.version,
                    inserted = outcome.is_insert(),
                    "document committed"
                );
                report.committed.push(CommittedEntry {
                    origin: origin.clone(),
                    index,
                    identity,
                    outcome,
                    blob,
                });
            }
        }
        Ok(report)
    }

    fn commit_document<T: EntryTemplate>(
        &self,
        archive: &mut ComponentArchive,
        template: T,
        base_dir: &Path,
    ) -> ArchiveResult<(MergeOutcome, Option<BlobInfo>)> {
        let prepared = template.prepare(self, archive, base_dir)?;

        let mut working = ComponentArchive::new(&archive.root, archive.descriptor.clone());
        let outcome = merge_into_descriptor(&mut working.descriptor, prepared.entry)?;

        let merged = &T::Entry::collection(&working.descriptor)[outcome.index()];
        let errors = check_entry(merged, outcome.index());
        if !errors.is_empty() {
            return Err(ArchiveError::SchemaValidation(errors));
        }

        self.persist(&working)?;
        *archive = working;
        Ok((outcome, prepared.blob))
    }
}
