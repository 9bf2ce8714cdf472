//! Temp-file-and-rename writes for snapshots and blobs

use crate::error::StorageResult;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes to a uniquely named sibling temp file and renames it over the
/// target on commit. Readers observe either the old or the new content.
pub(crate) struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: Option<File>,
}

impl AtomicWriter {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let final_path = path.as_ref().to_path_buf();

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Unique suffix so concurrent writers of the same target never share a temp file
        let temp_path = temp_path_for(&final_path);
        let file = File::create(&temp_path)?;

        Ok(Self {
            temp_path,
            final_path,
            file: Some(file),
        })
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(data)?;
        }
        Ok(())
    }

    pub(crate) fn commit(mut self) -> StorageResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&self.temp_path, &self.final_path)?;
        Ok(())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // No-op after a successful rename
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Write `data` to `path` in one atomic step
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut writer = AtomicWriter::new(path)?;
    writer.write(data)?;
    writer.commit()
}

/// Temp files carry a `.tmp-` marker so directory scans can skip them
pub(crate) fn is_temp_file(name: &str) -> bool {
    name.contains(".tmp-")
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut temp = final_path.as_os_str().to_owned();
    temp.push(format!(".tmp-{}", uuid::Uuid::new_v4().simple()));
    PathBuf::from(temp)
}
