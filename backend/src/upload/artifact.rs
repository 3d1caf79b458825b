use std::path::{Path, PathBuf};

/// Scratch file owned by a single request. The file is removed when the
/// guard is dropped; removal errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(dir: &Path, filename: &str) -> Self {
        Self {
            path: dir.join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temporary file {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::new(dir.path(), "scratch.jpg");
        std::fs::write(artifact.path(), b"scratch").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn dropping_without_a_file_is_silent() {
        let artifact = TempArtifact::new(Path::new("/nonexistent"), "never-written.jpg");
        drop(artifact);
    }
}
