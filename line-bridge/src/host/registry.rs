//! Worker executable registry
//!
//! This module maps worker names to executables discovered in a directory
//! on disk, so hosts can spawn workers by name without hardcoding paths.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::host::worker::{WorkerError, WorkerProcess};

/// Default directory scanned for worker executables.
pub const DEFAULT_WORKER_DIR: &str = "resources/workers";

/// Name to executable mapping for the workers available to a host.
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    /// Worker name (file name) to executable path.
    programs: HashMap<String, PathBuf>,
}

impl WorkerRegistry {
    /// Build a registry from the files found directly in `dir`.
    ///
    /// Every regular file is registered under its file name;
    /// subdirectories are skipped. An unreadable directory yields an
    /// empty registry rather than an error, matching a deployment where
    /// no workers are installed.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut programs = HashMap::new();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    let name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
                    if let Some(name) = name {
                        programs.insert(name, path);
                    }
                }
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Worker directory not readable");
            }
        }

        info!(dir = %dir.display(), workers = programs.len(), "Worker registry loaded");
        Self { programs }
    }

    /// Build a registry from the `WORKER_DIR` environment variable.
    ///
    /// Falls back to [`DEFAULT_WORKER_DIR`] when the variable is unset.
    pub fn from_env() -> Self {
        let dir = std::env::var("WORKER_DIR").unwrap_or_else(|_| DEFAULT_WORKER_DIR.to_string());
        Self::from_dir(dir)
    }

    /// Look up the executable path registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.programs.get(name).map(PathBuf::as_path)
    }

    /// Get the number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.programs.len()
    }

    /// Spawn the worker registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::UnknownWorker` if no executable is registered
    /// under `name`, or `WorkerError::SpawnError` if it cannot be started.
    pub fn spawn<I, A>(&self, name: &str, args: I) -> Result<WorkerProcess, WorkerError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let program = self
            .get(name)
            .ok_or_else(|| WorkerError::UnknownWorker(name.to_string()))?;
        WorkerProcess::spawn(program, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_from_dir_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("echo-worker"));
        touch(&dir.path().join("transcode"));

        let registry = WorkerRegistry::from_dir(dir.path());
        assert_eq!(registry.worker_count(), 2);
        assert!(registry.get("echo-worker").is_some());
        assert!(registry.get("transcode").is_some());
    }

    #[test]
    fn test_from_dir_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("echo-worker"));

        let registry = WorkerRegistry::from_dir(dir.path());
        assert_eq!(registry.worker_count(), 1);
        assert!(registry.get("nested").is_none());
    }

    #[test]
    fn test_missing_dir_yields_empty_registry() {
        let registry = WorkerRegistry::from_dir("/definitely/not/a/real/dir");
        assert_eq!(registry.worker_count(), 0);
    }

    #[test]
    fn test_spawn_unknown_worker_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WorkerRegistry::from_dir(dir.path());

        let outcome = registry.spawn("missing", Vec::<String>::new());
        assert!(matches!(outcome, Err(WorkerError::UnknownWorker(_))));
    }
}
