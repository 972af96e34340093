//! Framework version detection from the workspace.
//!
//! A generated Rails app pins its framework in `Gemfile.lock`; the resolved
//! version sits under `specs:` as `    rails (6.0.3.4)`.

use std::path::Path;

use kiln_core::{
    application::{ApplicationError, parse_lenient_version},
    error::KilnResult,
};
use semver::Version;
use tracing::{debug, warn};

pub const LOCKFILE: &str = "Gemfile.lock";

/// Read the locked Rails version of the app in `workspace`.
///
/// `Ok(None)` when there is no lockfile, it does not lock `rails`, or the
/// locked version cannot be read as semver.
pub fn detect_rails_version(workspace: &Path) -> KilnResult<Option<Version>> {
    let lockfile = workspace.join(LOCKFILE);
    if !lockfile.is_file() {
        debug!(path = %lockfile.display(), "No lockfile, framework version unknown");
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(&lockfile).map_err(|e| ApplicationError::FilesystemError {
            path: lockfile.clone(),
            reason: e.to_string(),
        })?;

    let Some(raw) = locked_version(&content, "rails") else {
        debug!("Lockfile does not lock rails");
        return Ok(None);
    };
    match gem_version(raw) {
        Some(version) => {
            debug!(%version, "Detected framework version");
            Ok(Some(version))
        }
        None => {
            warn!(version = raw, "Unreadable rails version in lockfile");
            Ok(None)
        }
    }
}

/// The resolved version of `gem` in a Bundler lockfile.
fn locked_version<'a>(lockfile: &'a str, gem: &str) -> Option<&'a str> {
    lockfile.lines().find_map(|line| {
        line.strip_prefix("    ")
            .filter(|rest| !rest.starts_with(' '))
            .and_then(|rest| rest.strip_prefix(gem))
            .and_then(|rest| rest.strip_prefix(" ("))
            .and_then(|rest| rest.strip_suffix(')'))
    })
}

/// Convert a RubyGems version to semver.
///
/// `6.0.3.4` drops the patch-level segment; `6.0.0.beta1` becomes the
/// prerelease `6.0.0-beta1`.
fn gem_version(raw: &str) -> Option<Version> {
    let mut numeric = Vec::new();
    let mut prerelease = Vec::new();
    for segment in raw.split('.') {
        if prerelease.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            numeric.push(segment);
        } else {
            prerelease.push(segment);
        }
    }
    if numeric.is_empty() {
        return None;
    }

    let core = numeric.iter().take(3).copied().collect::<Vec<_>>().join(".");
    let text = if prerelease.is_empty() {
        core
    } else {
        format!("{core}-{}", prerelease.join("."))
    };
    parse_lenient_version(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCK: &str = "\
GEM
  remote: https://rubygems.org/
  specs:
    railties (6.0.3.4)
      actionpack (= 6.0.3.4)
    rails (6.0.3.4)
      actioncable (= 6.0.3.4)
    sprockets-rails (3.2.2)

DEPENDENCIES
  rails (~> 6.0.3, >= 6.0.3.4)
";

    #[test]
    fn reads_resolved_rails_spec() {
        assert_eq!(locked_version(LOCK, "rails"), Some("6.0.3.4"));
        assert_eq!(locked_version(LOCK, "sprockets-rails"), Some("3.2.2"));
        assert_eq!(locked_version(LOCK, "devise"), None);
    }

    #[test]
    fn converts_gem_versions() {
        assert_eq!(gem_version("6.0.3.4"), Some(Version::new(6, 0, 3)));
        assert_eq!(gem_version("5.2"), Some(Version::new(5, 2, 0)));
        assert_eq!(
            gem_version("6.0.0.beta1"),
            Some(Version::parse("6.0.0-beta1").unwrap())
        );
        assert_eq!(gem_version("beta"), None);
    }

    #[test]
    fn detects_from_workspace() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(detect_rails_version(tmp.path()).unwrap(), None);

        std::fs::write(tmp.path().join(LOCKFILE), LOCK).unwrap();
        assert_eq!(
            detect_rails_version(tmp.path()).unwrap(),
            Some(Version::new(6, 0, 3))
        );
    }
}
