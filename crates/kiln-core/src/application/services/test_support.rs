//! In-crate fakes for service tests.
//!
//! The real in-memory filesystem lives in `kiln-adapters`, which depends on
//! this crate, so core tests carry their own minimal copy.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::application::{ApplicationError, ports::Filesystem};
use crate::error::KilnResult;

#[derive(Default)]
struct Inner {
    files: BTreeMap<PathBuf, (String, u64)>,
    dirs: BTreeSet<PathBuf>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn mkdirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// Cloneable handle; clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeFs {
    inner: Arc<Mutex<Inner>>,
}

impl FakeFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parents.
    pub(crate) fn with_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                inner.mkdirs(parent);
            }
            let stamp = inner.tick();
            inner
                .files
                .insert(path.to_path_buf(), (content.to_string(), stamp));
        }
        self
    }

    pub(crate) fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.inner.lock().unwrap().mkdirs(path.as_ref());
        self
    }

    pub(crate) fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|(c, _)| c.clone())
    }

    fn missing(path: &Path) -> ApplicationError {
        ApplicationError::FilesystemError {
            path: path.to_path_buf(),
            reason: "No such file or directory".into(),
        }
    }
}

impl Filesystem for FakeFs {
    fn read_to_string(&self, path: &Path) -> KilnResult<String> {
        self.content(path).ok_or_else(|| Self::missing(path).into())
    }

    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let parent_ok = path.parent().is_none_or(|p| inner.dirs.contains(p));
        if !parent_ok {
            return Err(Self::missing(path).into());
        }
        let stamp = inner.tick();
        inner
            .files
            .insert(path.to_path_buf(), (content.to_string(), stamp));
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> KilnResult<()> {
        let content = self.read_to_string(from)?;
        self.write_file(to, &content)
    }

    fn create_dir_all(&self, path: &Path) -> KilnResult<()> {
        self.inner.lock().unwrap().mkdirs(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.files.contains_key(path) || inner.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    fn remove_file(&self, path: &Path) -> KilnResult<()> {
        self.inner
            .lock()
            .unwrap()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::missing(path).into())
    }

    fn list_files(&self, dir: &Path) -> KilnResult<Vec<PathBuf>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .files
            .keys()
            .filter(|p| p.starts_with(dir) && p.as_path() != dir)
            .cloned()
            .collect())
    }

    fn modified(&self, path: &Path) -> KilnResult<SystemTime> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(path)
            .map(|(_, stamp)| SystemTime::UNIX_EPOCH + Duration::from_secs(*stamp))
            .ok_or_else(|| Self::missing(path).into())
    }
}
