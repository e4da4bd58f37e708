use std::path::PathBuf;

use cdarc_archive::{BuilderOptions, ExportFormat, ARCHIVE_PATH_ENV};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "cdarc",
    about = "Build component archives from resource, source and reference templates",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Archive configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a component archive with an empty descriptor
    Init(InitArgs),
    /// Manage the resources of a component archive
    Resources(EntryCommand),
    /// Manage the sources of a component archive
    Sources(EntryCommand),
    /// Manage the component references of a component archive
    #[command(name = "component-references", alias = "refs")]
    ComponentReferences(EntryCommand),
    /// Package a component archive into a single tar file
    Export(ExportArgs),
    /// Print the component descriptor of an archive
    Show(ShowArgs),
}

#[derive(Args)]
pub struct ArchiveArg {
    /// Path to the component archive directory
    pub path: Option<PathBuf>,
    #[arg(long = "archive", env = ARCHIVE_PATH_ENV, value_name = "PATH")]
    pub archive: Option<PathBuf>,
}

impl ArchiveArg {
    pub fn resolve(&self) -> anyhow::Result<PathBuf> {
        self.path
            .clone()
            .or_else(|| self.archive.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no archive path given: pass it as argument, with --archive or in {ARCHIVE_PATH_ENV}"
                )
            })
    }
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub archive: ArchiveArg,
    #[arg(long)]
    pub name: String,
    #[arg(long = "version")]
    pub component_version: String,
    /// Base URL of an OCI registry repository context (repeatable)
    #[arg(long = "oci-registry", required = true, value_name = "URL")]
    pub oci_registry: Vec<String>,
}

#[derive(Args)]
pub struct EntryCommand {
    #[command(subcommand)]
    pub action: EntryAction,
}

#[derive(Subcommand)]
pub enum EntryAction {
    /// Add or update entries from a template file and/or piped documents
    Add(AddArgs),
}

#[derive(Args)]
pub struct AddArgs {
    #[command(flatten)]
    pub archive: ArchiveArg,
    /// Template file with one or more YAML or JSON documents
    #[arg(short = 'r', long = "template", alias = "resource", value_name = "FILE")]
    pub template: Option<PathBuf>,
    #[arg(long)]
    pub component_name: Option<String>,
    #[arg(long)]
    pub component_version: Option<String>,
    /// Repository context base URL to append
    #[arg(long, value_name = "URL")]
    pub repo_ctx: Option<String>,
}

impl AddArgs {
    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            component_name: self.component_name.clone(),
            component_version: self.component_version.clone(),
            repository_context: self.repo_ctx.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ArchiveFormat {
    Tar,
    Tgz,
}

impl From<ArchiveFormat> for ExportFormat {
    fn from(format: ArchiveFormat) -> Self {
        match format {
            ArchiveFormat::Tar => ExportFormat::Tar,
            ArchiveFormat::Tgz => ExportFormat::TarGz,
        }
    }
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub archive: ArchiveArg,
    #[arg(short, long, value_name = "FILE")]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value = "tar")]
    pub format: ArchiveFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub archive: ArchiveArg,
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub output: OutputFormat,
}
