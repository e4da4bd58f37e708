use std::io::Read;
use std::path::{Path, PathBuf};

use cdarc_store::{FileSystem, StoreError};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// Origin label of piped input.
pub const PIPED_ORIGIN: &str = "stdin";

/// One origin of template documents, fully read into memory.
///
/// `base_dir` is where relative `input` paths inside the documents resolve:
/// the template file's directory, or the working directory for piped input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSource {
    pub origin: String,
    pub base_dir: PathBuf,
    pub(crate) data: Vec<u8>,
}

impl TemplateSource {
    /// A source over in-memory bytes.
    pub fn from_bytes(
        origin: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            origin: origin.into(),
            base_dir: base_dir.into(),
            data: data.into(),
        }
    }

    /// Read a template file.
    pub fn file(fs: &dyn FileSystem, path: &Path) -> TemplateResult<Self> {
        let data = fs.read(path).map_err(|e| match e {
            StoreError::NotFound(_) => TemplateError::NotFound(path.to_path_buf()),
            other => TemplateError::Read {
                origin: path.display().to_string(),
                reason: other.to_string(),
            },
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self::from_bytes(path.display().to_string(), base_dir, data))
    }

    /// Read piped input. Returns `None` when the pipe carried no bytes, so an
    /// empty pipe is indistinguishable from no pipe at all.
    pub fn piped(
        mut reader: impl Read,
        base_dir: impl Into<PathBuf>,
    ) -> TemplateResult<Option<Self>> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| TemplateError::Read {
                origin: PIPED_ORIGIN.to_string(),
                reason: e.to_string(),
            })?;
        let source = Self::from_bytes(PIPED_ORIGIN, base_dir, data);
        if source.is_blank() {
            debug!("piped input is empty, skipping");
            return Ok(None);
        }
        Ok(Some(source))
    }

    /// Whether the source holds no documents at all.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(u8::is_ascii_whitespace)
    }
}

/// The sources of one command in processing order: the template file first,
/// then piped input.
pub fn ordered_sources(
    file: Option<TemplateSource>,
    piped: Option<TemplateSource>,
) -> Vec<TemplateSource> {
    file.into_iter().chain(piped).collect()
}
