use std::io::{Seek, Write};
use std::path::Path;

use cdarc_crypto::DigestingWriter;
use cdarc_input::{package_dir, MEDIA_TYPE_GZIP, MEDIA_TYPE_TAR};
use cdarc_types::BlobInfo;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::SpooledTempFile;
use tracing::info;

use crate::error::{ArchiveError, ArchiveResult};
use crate::store::ArchiveStore;

/// Container format of an exported archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Tar,
    TarGz,
}

impl ExportFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Tar => MEDIA_TYPE_TAR,
            Self::TarGz => MEDIA_TYPE_GZIP,
        }
    }
}

impl ArchiveStore {
    /// Package the archive at `root` into a single deterministic tar stream.
    ///
    /// The archive is loaded and validated first, so only well-formed
    /// archives are exported.
    pub fn export<W: Write>(&self, root: &Path, format: ExportFormat, out: W) -> ArchiveResult<W> {
        let archive = self.load(root)?;
        self.check(&archive.descriptor)?;
        let out = match format {
            ExportFormat::Tar => package_dir(self.fs(), root, None, out)?,
            ExportFormat::TarGz => {
                let gz = GzEncoder::new(out, Compression::default());
                package_dir(self.fs(), root, None, gz)?
                    .finish()
                    .map_err(|e| export_error(root, e))?
            }
        };
        Ok(out)
    }

    /// Export the archive at `root` into the file `dest`, replacing it
    /// atomically.
    pub fn export_to(
        &self,
        root: &Path,
        dest: &Path,
        format: ExportFormat,
    ) -> ArchiveResult<BlobInfo> {
        let sink = DigestingWriter::new(SpooledTempFile::new(self.config().spool_threshold));
        let (mut spool, digest, size) = self.export(root, format, sink)?.finish();
        spool.rewind().map_err(|e| export_error(root, e))?;
        self.fs().write_atomic(dest, &mut spool)?;
        info!(
            path = %root.display(),
            dest = %dest.display(),
            digest = %digest,
            size,
            "component archive exported"
        );
        Ok(BlobInfo {
            media_type: format.media_type().to_string(),
            digest,
            size,
        })
    }
}

fn export_error(root: &Path, e: std::io::Error) -> ArchiveError {
    ArchiveError::Input(cdarc_input::InputError::Packaging {
        path: root.to_path_buf(),
        source: e,
    })
}
