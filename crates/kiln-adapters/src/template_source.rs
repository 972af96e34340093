//! Template source resolution.
//!
//! A template source is the read-only directory copy steps read from. It is
//! either a local directory or a git repository cloned into a temporary
//! directory for the lifetime of the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use kiln_core::{application::ApplicationError, error::KilnResult};
use tempfile::TempDir;
use tracing::{debug, info, instrument};

/// Where templates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSourceSpec {
    Local(PathBuf),
    Git { url: String, branch: Option<String> },
}

impl TemplateSourceSpec {
    /// Classify a user-supplied source string.
    pub fn parse(source: &str, branch: Option<String>) -> Self {
        if is_remote(source) {
            Self::Git {
                url: source.to_string(),
                branch,
            }
        } else {
            Self::Local(PathBuf::from(source))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Git { .. })
    }

    /// Make the source available on disk.
    ///
    /// The returned value owns any temporary clone; dropping it deletes the
    /// clone.
    #[instrument(skip_all, fields(source = %self))]
    pub fn resolve(&self) -> KilnResult<ResolvedTemplateSource> {
        match self {
            Self::Local(path) => resolve_local(path),
            Self::Git { url, branch } => clone_git(url, branch.as_deref()),
        }
    }
}

impl fmt::Display for TemplateSourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Git {
                url,
                branch: Some(b),
            } => write!(f, "{url}#{b}"),
            Self::Git { url, branch: None } => f.write_str(url),
        }
    }
}

/// A template source present on disk.
#[derive(Debug)]
pub struct ResolvedTemplateSource {
    root: PathBuf,
    _guard: Option<TempDir>,
}

impl ResolvedTemplateSource {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the root is a temporary clone that disappears on drop.
    pub fn is_temporary(&self) -> bool {
        self._guard.is_some()
    }

    /// The temporary directory holding the clone, if any.
    pub fn temp_dir(&self) -> Option<&Path> {
        self._guard.as_ref().map(TempDir::path)
    }
}

/// Whether `source` names a remote git repository.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://")
        || source.starts_with("https://")
        || source.starts_with("git@")
        || source.starts_with("ssh://")
        || source.starts_with("file://")
        || source.ends_with(".git")
}

fn resolve_local(path: &Path) -> KilnResult<ResolvedTemplateSource> {
    if !path.exists() {
        return Err(ApplicationError::TemplateSourceUnavailable {
            reason: format!("Local path does not exist: {}", path.display()),
        }
        .into());
    }
    if !path.is_dir() {
        return Err(ApplicationError::TemplateSourceUnavailable {
            reason: format!("Local path is not a directory: {}", path.display()),
        }
        .into());
    }

    debug!("Using local template source");
    Ok(ResolvedTemplateSource {
        root: path.to_path_buf(),
        _guard: None,
    })
}

fn clone_git(url: &str, branch: Option<&str>) -> KilnResult<ResolvedTemplateSource> {
    clone_git_in(&std::env::temp_dir(), url, branch)
}

fn clone_git_in(
    base: &Path,
    url: &str,
    branch: Option<&str>,
) -> KilnResult<ResolvedTemplateSource> {
    let temp_dir = tempfile::Builder::new()
        .prefix("kiln-")
        .tempdir_in(base)
        .map_err(|e| ApplicationError::TemplateSourceUnavailable {
            reason: format!("Failed to create temp directory: {e}"),
        })?;

    let repo_name = repo_name(url);
    let repo_path = temp_dir.path().join(repo_name);

    info!(%url, "Cloning template repository");

    let mut cmd = Command::new("git");
    cmd.args(["clone", "--quiet", "--depth", "1"]);
    if let Some(branch) = branch {
        cmd.args(["--branch", branch]);
    }
    let output = cmd
        .arg(url)
        .arg(&repo_path)
        .current_dir(temp_dir.path())
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ApplicationError::TemplateSourceUnavailable {
            reason: format!("Failed to run git: {e}"),
        })?;

    if !output.status.success() {
        return Err(ApplicationError::TemplateSourceUnavailable {
            reason: format!(
                "Failed to clone {url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
        .into());
    }

    debug!(path = %repo_path.display(), "Template repository cloned");
    Ok(ResolvedTemplateSource {
        root: repo_path,
        _guard: Some(temp_dir),
    })
}

fn repo_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .map(|s| s.strip_suffix(".git").unwrap_or(s))
        .filter(|s| !s.is_empty())
        .unwrap_or("template")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sources() {
        assert!(is_remote("https://github.com/acme/jumpstart"));
        assert!(is_remote("git@github.com:acme/jumpstart.git"));
        assert!(is_remote("../templates.git"));
        assert!(!is_remote("./templates"));
        assert!(!is_remote("/opt/kiln/templates"));
    }

    #[test]
    fn parse_keeps_branch_for_git_only() {
        assert_eq!(
            TemplateSourceSpec::parse("https://x.test/t.git", Some("main".into())),
            TemplateSourceSpec::Git {
                url: "https://x.test/t.git".into(),
                branch: Some("main".into())
            }
        );
        assert_eq!(
            TemplateSourceSpec::parse("templates", Some("main".into())),
            TemplateSourceSpec::Local(PathBuf::from("templates"))
        );
    }

    #[test]
    fn repo_names() {
        assert_eq!(repo_name("https://github.com/acme/jumpstart.git"), "jumpstart");
        assert_eq!(repo_name("git@github.com:acme/site"), "site");
        assert_eq!(repo_name("https://host/acme/tpl/"), "tpl");
    }

    #[test]
    fn local_source_must_be_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(TemplateSourceSpec::Local(file).resolve().is_err());
        assert!(
            TemplateSourceSpec::Local(tmp.path().join("missing"))
                .resolve()
                .is_err()
        );

        let resolved = TemplateSourceSpec::Local(tmp.path().to_path_buf())
            .resolve()
            .unwrap();
        assert_eq!(resolved.root(), tmp.path());
        assert!(!resolved.is_temporary());
        assert!(resolved.temp_dir().is_none());
    }

    #[test]
    fn failed_clone_leaves_no_temp_dir() {
        let base = TempDir::new().unwrap();
        assert!(clone_git_in(base.path(), "/nonexistent/kiln/repo.git", None).is_err());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn clone_is_deleted_on_drop() {
        let git_ok = Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success());
        if !git_ok {
            return;
        }

        let origin = TempDir::new().unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .args(["-c", "user.name=kiln", "-c", "user.email=kiln@example.test"])
                .args(args)
                .current_dir(origin.path())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        git(&["init", "--quiet"]);
        std::fs::write(origin.path().join("Procfile"), "web: bin/rails s\n").unwrap();
        git(&["add", "."]);
        git(&["commit", "--quiet", "-m", "templates"]);

        let url = format!("file://{}", origin.path().display());
        let spec = TemplateSourceSpec::Git { url, branch: None };
        let resolved = spec.resolve().unwrap();
        let root = resolved.root().to_path_buf();

        assert!(resolved.is_temporary());
        assert!(root.join("Procfile").is_file());
        let temp = resolved.temp_dir().unwrap().to_path_buf();
        assert!(root.starts_with(&temp));

        drop(resolved);
        assert!(!root.exists());
        assert!(!temp.exists());
    }
}
