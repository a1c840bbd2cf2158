//! Working directory and search path used to resolve and launch children.

use std::{
    env,
    ffi::OsString,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::Command,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub working_dir: PathBuf,
    pub search_path: Vec<PathBuf>,
}

impl ExecutionEnvironment {
    pub fn new(working_dir: impl Into<PathBuf>, search_path: Vec<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            search_path,
        }
    }

    /// Snapshot of the process's own cwd and `PATH`.
    pub fn current() -> std::io::Result<Self> {
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();
        Ok(Self::new(env::current_dir()?, search_path))
    }

    pub fn with_working_dir(self, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..self
        }
    }

    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Names with a `/` are paths; bare names are looked up on the search path.
    pub fn resolve_program(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            return Some(self.resolve_path(name));
        }
        if name.is_empty() {
            return None;
        }
        self.search_path
            .iter()
            .map(|dir| self.resolve_path(dir).join(name))
            .find(|candidate| is_executable(candidate))
    }

    pub fn joined_search_path(&self) -> Option<OsString> {
        env::join_paths(&self.search_path).ok()
    }

    /// Child runs in `working_dir` and sees our search path as `PATH`.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.current_dir(&self.working_dir);
        match self.joined_search_path() {
            Some(path) => cmd.env("PATH", path),
            None => cmd.env_remove("PATH"),
        };
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
