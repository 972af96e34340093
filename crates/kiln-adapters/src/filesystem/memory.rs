//! Filesystem held entirely in memory.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::{Duration, SystemTime},
};

use kiln_core::{
    application::{ApplicationError, ports::Filesystem},
    error::KilnResult,
};

/// Workspace stand-in for previews and tests.
///
/// Modification times come from a logical clock that ticks on every write,
/// so "newest file" lookups are deterministic.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, MemoryFile>,
    directories: BTreeSet<PathBuf>,
    clock: u64,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified: u64,
}

impl MemoryFilesystemInner {
    fn add_directories(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }

    fn put(&mut self, path: &Path, content: String) {
        self.clock += 1;
        self.files.insert(
            path.to_path_buf(),
            MemoryFile {
                content,
                modified: self.clock,
            },
        );
    }
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryFilesystemInner::default())),
        }
    }

    /// Seed a file, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        if let Ok(mut inner) = self.inner.write() {
            if let Some(parent) = path.parent() {
                inner.add_directories(parent);
            }
            inner.put(path, content.into());
        }
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path.as_ref()).map(|f| f.content.clone())
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> ApplicationError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: "No such file".into(),
    }
}

impl Filesystem for MemoryFilesystem {
    fn read_to_string(&self, path: &Path) -> KilnResult<String> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner
            .files
            .get(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| not_found(path).into())
    }

    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "Parent directory does not exist".into(),
                }
                .into());
            }
        }

        inner.put(path, content.to_string());
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> KilnResult<()> {
        let content = self.read_to_string(from)?;
        self.write_file(to, &content)
    }

    fn create_dir_all(&self, path: &Path) -> KilnResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner.add_directories(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.read().is_ok_and(|inner| {
            inner.files.contains_key(path) || inner.directories.contains(path)
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner
            .read()
            .is_ok_and(|inner| inner.directories.contains(path))
    }

    fn remove_file(&self, path: &Path) -> KilnResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path).into())
    }

    fn list_files(&self, dir: &Path) -> KilnResult<Vec<PathBuf>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner
            .files
            .keys()
            .filter(|p| p.starts_with(dir) && p.as_path() != dir)
            .cloned()
            .collect())
    }

    fn modified(&self, path: &Path) -> KilnResult<SystemTime> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner
            .files
            .get(path)
            .map(|f| SystemTime::UNIX_EPOCH + Duration::from_secs(f.modified))
            .ok_or_else(|| not_found(path).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/ws/config/a.yml"), "x").is_err());

        fs.create_dir_all(Path::new("/ws/config")).unwrap();
        fs.write_file(Path::new("/ws/config/a.yml"), "x").unwrap();
        assert_eq!(fs.read_file("/ws/config/a.yml").unwrap(), "x");
    }

    #[test]
    fn later_writes_are_newer() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/ws/db/migrate/b.rb", "b");
        fs.insert_file("/ws/db/migrate/a.rb", "a");

        let a = fs.modified(Path::new("/ws/db/migrate/a.rb")).unwrap();
        let b = fs.modified(Path::new("/ws/db/migrate/b.rb")).unwrap();
        assert!(a > b);
    }

    #[test]
    fn list_files_is_sorted_and_scoped() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/ws/b.rb", "");
        fs.insert_file("/ws/a/z.rb", "");
        fs.insert_file("/other/x.rb", "");

        assert_eq!(
            fs.list_files(Path::new("/ws")).unwrap(),
            [PathBuf::from("/ws/a/z.rb"), PathBuf::from("/ws/b.rb")]
        );
    }
}
