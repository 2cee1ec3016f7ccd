//! Temporary script files

use crate::error::ExecutionError;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, warn};

/// Extension of every temporary script
pub const SCRIPT_EXTENSION: &str = ".py";

/// A script persisted for the lifetime of one call
///
/// The file name is `<prefix>_<unix millis>_<random>.py`. The file is removed
/// by [`ScriptArtifact::cleanup`], or on drop if a call unwinds before that.
#[derive(Debug)]
pub struct ScriptArtifact {
    path: TempPath,
}

impl ScriptArtifact {
    /// Write `source` to a fresh file in `dir`
    pub fn write(dir: &Path, prefix: &str, source: &str) -> Result<Self, ExecutionError> {
        let write_error = |source| ExecutionError::ScriptWrite {
            path: dir.to_path_buf(),
            source,
        };

        let file_prefix = format!("{}_{}_", prefix, chrono::Utc::now().timestamp_millis());
        let mut file = tempfile::Builder::new()
            .prefix(&file_prefix)
            .suffix(SCRIPT_EXTENSION)
            .tempfile_in(dir)
            .map_err(write_error)?;

        file.write_all(source.as_bytes()).map_err(write_error)?;
        file.flush().map_err(write_error)?;

        // Close our handle so the interpreter can open the file on every platform.
        let path = file.into_temp_path();
        debug!(script = %path.display(), bytes = source.len(), "Wrote temporary script");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Failure is logged and never escalated.
    pub fn cleanup(self) {
        let script = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(script = %script, "Removed temporary script"),
            Err(e) => warn!(script = %script, error = %e, "Failed to remove temporary script"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ScriptArtifact::write(dir.path(), "scriptbridge", "print(1)\n").unwrap();

        let path = artifact.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print(1)\n");

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("scriptbridge_"));
        assert!(name.ends_with(".py"));

        artifact.cleanup();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let first = ScriptArtifact::write(dir.path(), "p", "").unwrap();
        let second = ScriptArtifact::write(dir.path(), "p", "").unwrap();

        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_dropped_artifact_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = ScriptArtifact::write(dir.path(), "p", "x").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = ScriptArtifact::write(&missing, "p", "x").unwrap_err();
        assert!(matches!(err, ExecutionError::ScriptWrite { .. }));
    }
}
