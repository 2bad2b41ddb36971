//! Scratch output guard
//!
//! Encoder output never lands on the destination directly. The encoder writes
//! to a uniquely named sibling of the destination (same directory, so the
//! final rename stays on one filesystem and is atomic); only `commit()` moves
//! it over the destination. Dropping an uncommitted guard removes the scratch
//! file on every exit path and leaves the destination exactly as it was,
//! whether that is the source itself or a pre-existing output file.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

const SCRATCH_PREFIX: &str = ".vid_shrink-";

#[derive(Debug)]
pub struct ScratchFile {
    temp: TempPath,
    dest: PathBuf,
}

impl ScratchFile {
    /// Creates an empty scratch file next to `dest`, keeping its extension
    /// (ffmpeg picks the container from it).
    pub fn beside(dest: &Path) -> io::Result<Self> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let suffix = dest
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| ".mp4".to_string());

        let temp = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&dir)?
            .into_temp_path();

        debug!(scratch = ?temp.to_path_buf(), dest = ?dest, "Created scratch file");

        Ok(Self {
            temp,
            dest: dest.to_path_buf(),
        })
    }

    /// Path the encoder should write to.
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Atomically renames the scratch file over the destination and returns it.
    pub fn commit(self) -> io::Result<PathBuf> {
        let Self { temp, dest } = self;
        // on failure the TempPath comes back and is deleted when dropped
        temp.persist(&dest).map_err(|e| e.error)?;
        debug!(dest = ?dest, "Scratch file committed");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_scratch_is_sibling_with_same_extension() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mkv");
        fs::write(&source, b"original").unwrap();

        let scratch = ScratchFile::beside(&source).unwrap();
        assert_eq!(scratch.path().parent(), Some(dir.path()));
        assert_eq!(scratch.path().extension().unwrap(), "mkv");
        assert_ne!(scratch.path(), source.as_path());
    }

    #[test]
    fn test_drop_removes_scratch_and_keeps_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, b"original").unwrap();

        {
            let scratch = ScratchFile::beside(&source).unwrap();
            fs::write(scratch.path(), b"half-written").unwrap();
        }

        assert_eq!(entries(dir.path()), vec!["clip.mp4".to_string()]);
        assert_eq!(fs::read(&source).unwrap(), b"original");
    }

    #[test]
    fn test_commit_replaces_existing_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, b"original").unwrap();

        let scratch = ScratchFile::beside(&source).unwrap();
        fs::write(scratch.path(), b"smaller").unwrap();
        let final_path = scratch.commit().unwrap();

        assert_eq!(final_path, source);
        assert_eq!(fs::read(&source).unwrap(), b"smaller");
        assert_eq!(entries(dir.path()), vec!["clip.mp4".to_string()]);
    }

    #[test]
    fn test_commit_creates_missing_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp4");

        let scratch = ScratchFile::beside(&dest).unwrap();
        fs::write(scratch.path(), b"fits").unwrap();
        assert_eq!(scratch.commit().unwrap(), dest);
        assert_eq!(fs::read(&dest).unwrap(), b"fits");
        assert_eq!(entries(dir.path()), vec!["out.mp4".to_string()]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("no_such_dir").join("out.mp4");
        assert!(ScratchFile::beside(&dest).is_err());
    }
}
