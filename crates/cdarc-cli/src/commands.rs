use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use cdarc_archive::{
    encode_descriptor, is_semver, AddReport, ArchiveConfig, ArchiveStore, BuilderOptions,
};
use cdarc_store::{FileSystem, OsFileSystem};
use cdarc_template::{ordered_sources, TemplateSource};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

#[derive(Clone, Copy)]
enum EntryKind {
    Resources,
    Sources,
    ComponentReferences,
}

impl EntryKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Resources => "resource",
            Self::Sources => "source",
            Self::ComponentReferences => "component reference",
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(cli.config.as_deref())?;
    match cli.command {
        Command::Init(args) => cmd_init(&store, args),
        Command::Resources(EntryCommand { action: EntryAction::Add(args) }) => {
            cmd_add(&store, EntryKind::Resources, args)
        }
        Command::Sources(EntryCommand { action: EntryAction::Add(args) }) => {
            cmd_add(&store, EntryKind::Sources, args)
        }
        Command::ComponentReferences(EntryCommand { action: EntryAction::Add(args) }) => {
            cmd_add(&store, EntryKind::ComponentReferences, args)
        }
        Command::Export(args) => cmd_export(&store, args),
        Command::Show(args) => cmd_show(&store, args),
    }
}

fn open_store(config: Option<&Path>) -> anyhow::Result<ArchiveStore> {
    let config = match config {
        Some(path) => ArchiveConfig::load(path)?,
        None => ArchiveConfig::default(),
    };
    debug!(?config, "archive configuration");
    Ok(ArchiveStore::new(Arc::new(OsFileSystem)).with_config(config))
}

fn cmd_init(store: &ArchiveStore, args: InitArgs) -> anyhow::Result<()> {
    let path = args.archive.resolve()?;
    if args.name.trim().is_empty() {
        bail!("a component name must be given");
    }
    if !is_semver(&args.component_version) {
        bail!("component version {} is not a semantic version", args.component_version);
    }
    let archive = store.init(&path, &args.name, &args.component_version, &args.oci_registry)?;
    println!(
        "{} Initialized component archive in {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    println!(
        "  Component: {} {}",
        archive.descriptor.name().cyan(),
        archive.descriptor.version().yellow()
    );
    for ctx in &archive.descriptor.component.repository_contexts {
        println!("  Repository: {} {}", ctx.type_.dimmed(), ctx.base_url.blue());
    }
    Ok(())
}

fn template_sources(
    fs: &dyn FileSystem,
    template: Option<&Path>,
) -> anyhow::Result<Vec<TemplateSource>> {
    let file = template
        .map(|path| TemplateSource::file(fs, path))
        .transpose()?;
    let stdin = io::stdin();
    let piped = if stdin.is_terminal() {
        None
    } else {
        TemplateSource::piped(stdin.lock(), ".")?
    };
    Ok(ordered_sources(file, piped))
}

fn cmd_add(store: &ArchiveStore, kind: EntryKind, args: AddArgs) -> anyhow::Result<()> {
    let path = args.archive.resolve()?;
    let options = args.builder_options();
    let mut archive = store.open_or_create(&path, &options)?;
    if options != BuilderOptions::default() {
        store.persist(&archive)?;
    }

    let sources = template_sources(store.fs(), args.template.as_deref())?;
    if sources.is_empty() {
        bail!("no {} templates given: pass --template or pipe documents on stdin", kind.noun());
    }

    let report = match kind {
        EntryKind::Resources => store.add_resources(&mut archive, sources),
        EntryKind::Sources => store.add_sources(&mut archive, sources),
        EntryKind::ComponentReferences => store.add_component_references(&mut archive, sources),
    }
    .with_context(|| format!("unable to add {}s to {}", kind.noun(), path.display()))?;

    print_report(kind, &report, &path);
    Ok(())
}

fn print_report(kind: EntryKind, report: &AddReport, path: &Path) {
    for entry in &report.committed {
        let verb = if entry.outcome.is_insert() {
            "added".green()
        } else {
            "updated".yellow()
        };
        println!("  {} {} {}", verb, kind.noun(), entry.identity.to_string().bold());
        if let Some(blob) = &entry.blob {
            println!(
                "    blob {} {} bytes {}",
                blob.digest.short_hex().cyan(),
                blob.size,
                blob.media_type.dimmed()
            );
        }
    }
    println!(
        "{} {} added, {} updated in {}",
        "✓".green().bold(),
        report.inserted(),
        report.updated(),
        path.display()
    );
}

fn cmd_export(store: &ArchiveStore, args: ExportArgs) -> anyhow::Result<()> {
    let path = args.archive.resolve()?;
    let blob = store.export_to(&path, &args.out, args.format.into())?;
    println!(
        "{} Exported {} to {}",
        "✓".green().bold(),
        path.display(),
        args.out.display().to_string().bold()
    );
    println!("  Digest: {}", blob.digest.to_string().cyan());
    println!("  Size: {} bytes ({})", blob.size, blob.media_type);
    Ok(())
}

fn cmd_show(store: &ArchiveStore, args: ShowArgs) -> anyhow::Result<()> {
    let path = args.archive.resolve()?;
    let archive = store.load(&path)?;
    let rendered = match args.output {
        OutputFormat::Yaml => encode_descriptor(&archive.descriptor)?,
        OutputFormat::Json => serde_json::to_string_pretty(&archive.descriptor)
            .context("unable to encode component descriptor as JSON")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
