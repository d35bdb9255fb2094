pub mod artifacts;

pub use artifacts::{ArtifactManifest, ArtifactSet, ArtifactStore};

use std::{fs::File, io::Write, path::Path};

/// Writes one artifact blob to disk. Separated out so publishing can be
/// exercised against failing writers.
pub trait BlobWriter: Send + Sync {
    fn write_blob(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;
}

/// Writes and fsyncs each blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobWriter;

impl BlobWriter for FsBlobWriter {
    fn write_blob(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}
