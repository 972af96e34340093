//! Cleanup of temporary directories when `kiln` is interrupted.
//!
//! Normal exits release template clones through `Drop`. SIGINT, SIGTERM and
//! SIGHUP skip destructors, so every live clone is also recorded here and a
//! watcher thread deletes them before exiting with `128 + signal`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing::{debug, warn};

fn registry() -> &'static Mutex<BTreeSet<PathBuf>> {
    static REGISTRY: OnceLock<Mutex<BTreeSet<PathBuf>>> = OnceLock::new();
    REGISTRY.get_or_init(Mutex::default)
}

/// Keeps `path` on the interrupt cleanup list until dropped.
#[derive(Debug)]
pub struct TempRegistration {
    path: PathBuf,
}

impl TempRegistration {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Ok(mut paths) = registry().lock() {
            paths.insert(path.clone());
        }
        Self { path }
    }
}

impl Drop for TempRegistration {
    fn drop(&mut self) {
        if let Ok(mut paths) = registry().lock() {
            paths.remove(&self.path);
        }
    }
}

#[cfg(test)]
fn is_registered(path: &Path) -> bool {
    registry().lock().is_ok_and(|paths| paths.contains(path))
}

/// Delete every registered directory. Missing ones are ignored.
pub fn remove_registered() {
    if let Ok(mut paths) = registry().lock() {
        remove_all(std::mem::take(&mut *paths));
    }
}

fn remove_all(paths: impl IntoIterator<Item = PathBuf>) {
    for path in paths {
        remove(&path);
    }
}

fn remove(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temporary directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove temporary directory"),
    }
}

/// Start the signal watcher. Later calls are no-ops.
#[cfg(unix)]
pub fn init_signal_handlers() -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    static INSTALLED: OnceLock<()> = OnceLock::new();
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            warn!(signal, "Interrupted, removing temporary directories");
            remove_registered();
            std::process::exit(128 + signal);
        }
    });
    let _ = INSTALLED.set(());
    Ok(())
}

#[cfg(not(unix))]
pub fn init_signal_handlers() -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn registration_is_dropped_with_guard() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kiln-clone");

        let registration = TempRegistration::new(&path);
        assert!(is_registered(&path));

        drop(registration);
        assert!(!is_registered(&path));
    }

    #[test]
    fn registered_directories_are_removed() {
        let tmp = TempDir::new().unwrap();
        let clone = tmp.path().join("kiln-abc123");
        std::fs::create_dir_all(clone.join("templates")).unwrap();
        std::fs::write(clone.join("templates/Procfile"), "web\n").unwrap();
        let missing = tmp.path().join("kiln-gone");

        remove_all([clone.clone(), missing]);

        assert!(!clone.exists());
        assert!(tmp.path().exists());
    }
}
