//! Recipe steps.
//!
//! A [`Step`] is one immutable action in a recipe. Steps are executed once,
//! in declaration order, by the recipe runner.

use std::collections::BTreeMap;
use std::fmt;

use semver::{Version, VersionReq};

use crate::domain::{
    entities::{
        common::RelativePath,
        patch::{Insertion, Substitution},
    },
    error::DomainError,
    value_objects::Environment,
};

// ── ToolInvocation ───────────────────────────────────────────────────────────

/// An external command, described declaratively.
///
/// Tools always run in the workspace root. With `shell` set, `program` is a
/// full command line handed to `sh -c` and `args` must be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub environment: Option<Environment>,
    pub env: BTreeMap<String, String>,
    pub expected_exit_codes: Vec<i32>,
    pub destructive: bool,
    pub shell: bool,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            environment: None,
            env: BTreeMap::new(),
            expected_exit_codes: vec![0],
            destructive: false,
            shell: false,
        }
    }

    /// A command line interpreted by the shell (pipes, `yes |`, env prefixes).
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self {
            shell: true,
            ..Self::new(command_line)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn in_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn expect_exit_codes(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.expected_exit_codes = codes.into();
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// Whether `code` counts as success. A signal death (`None`) never does.
    pub fn accepts(&self, code: Option<i32>) -> bool {
        code.is_some_and(|c| self.expected_exit_codes.contains(&c))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.program.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "program" });
        }
        if self.shell && !self.args.is_empty() {
            return Err(DomainError::InvalidRecipe(format!(
                "shell command '{}' cannot take separate arguments",
                self.program
            )));
        }
        if self.expected_exit_codes.is_empty() {
            return Err(DomainError::MissingRequiredField {
                field: "expected_exit_codes",
            });
        }
        Ok(())
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(env) = self.environment {
            write!(f, "[{env}] ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ── FileTarget ───────────────────────────────────────────────────────────────

/// How a patch step names the file it edits.
///
/// Generated files often have unpredictable names (timestamped
/// migrations), so a target may be resolved against the workspace at apply
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// A fixed path.
    Path(RelativePath),
    /// Most recently modified regular file directly in `dir`.
    NewestIn { dir: RelativePath },
    /// Lexicographically first file under `dir` (recursive) whose name ends
    /// with `suffix`.
    FirstMatching { dir: RelativePath, suffix: String },
}

impl FileTarget {
    pub fn path(path: impl Into<RelativePath>) -> Self {
        Self::Path(path.into())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Path(p) if p.is_empty() => {
                Err(DomainError::MissingRequiredField { field: "path" })
            }
            Self::FirstMatching { suffix, .. } if suffix.is_empty() => {
                Err(DomainError::MissingRequiredField { field: "suffix" })
            }
            _ => Ok(()),
        }
    }
}

impl From<&str> for FileTarget {
    fn from(s: &str) -> Self {
        Self::Path(RelativePath::new(s))
    }
}

impl fmt::Display for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{p}"),
            Self::NewestIn { dir } => write!(f, "newest file in {dir}"),
            Self::FirstMatching { dir, suffix } => write!(f, "{dir}/**/*{suffix}"),
        }
    }
}

// ── StepAction ───────────────────────────────────────────────────────────────

/// What a step does.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    RunExternal(ToolInvocation),
    /// Invoke the framework's generator (`<generator prefix> <generator> <args>`).
    Generate {
        generator: String,
        args: Vec<String>,
        environment: Option<Environment>,
    },
    CopyFile {
        src: RelativePath,
        dst: RelativePath,
        force: bool,
    },
    CopyDirectory {
        src: RelativePath,
        dst: RelativePath,
        force: bool,
    },
    RemoveFile {
        path: RelativePath,
    },
    Patch {
        target: FileTarget,
        insertion: Insertion,
    },
    Substitute {
        target: FileTarget,
        substitution: Substitution,
    },
    Announce {
        message: String,
    },
}

impl StepAction {
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::RunExternal(_) => StepKind::RunExternal,
            Self::Generate { .. } => StepKind::Generate,
            Self::CopyFile { .. } => StepKind::CopyFile,
            Self::CopyDirectory { .. } => StepKind::CopyDirectory,
            Self::RemoveFile { .. } => StepKind::RemoveFile,
            Self::Patch { .. } => StepKind::Patch,
            Self::Substitute { .. } => StepKind::Substitute,
            Self::Announce { .. } => StepKind::Announce,
        }
    }
}

/// Discriminant of [`StepAction`], used for display and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    RunExternal,
    Generate,
    CopyFile,
    CopyDirectory,
    RemoveFile,
    Patch,
    Substitute,
    Announce,
}

impl StepKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RunExternal => "run",
            Self::Generate => "generate",
            Self::CopyFile => "copy",
            Self::CopyDirectory => "copy-dir",
            Self::RemoveFile => "remove",
            Self::Patch => "patch",
            Self::Substitute => "substitute",
            Self::Announce => "announce",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Step ─────────────────────────────────────────────────────────────────────

/// One labelled recipe action, optionally restricted to a framework
/// version range.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub label: String,
    pub action: StepAction,
    pub guard: Option<VersionReq>,
}

impl Step {
    pub fn new(label: impl Into<String>, action: StepAction) -> Self {
        Self {
            label: label.into(),
            action,
            guard: None,
        }
    }

    /// Only run when the framework version satisfies `req`.
    pub fn when(mut self, req: VersionReq) -> Self {
        self.guard = Some(req);
        self
    }

    pub const fn kind(&self) -> StepKind {
        self.action.kind()
    }

    pub fn is_destructive(&self) -> bool {
        matches!(&self.action, StepAction::RunExternal(tool) if tool.destructive)
    }

    /// Whether the guard admits `version`.
    ///
    /// Unguarded steps always run. Guarded steps need a known version.
    pub fn admits(&self, version: Option<&Version>) -> bool {
        match (&self.guard, version) {
            (None, _) => true,
            (Some(req), Some(v)) => req.matches(v),
            (Some(_), None) => false,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.label.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "label" });
        }
        match &self.action {
            StepAction::RunExternal(tool) => tool.validate(),
            StepAction::Generate { generator, .. } if generator.trim().is_empty() => {
                Err(DomainError::MissingRequiredField { field: "generator" })
            }
            StepAction::Patch { target, insertion } => {
                target.validate()?;
                insertion.validate()
            }
            StepAction::Substitute {
                target,
                substitution,
            } => {
                target.validate()?;
                substitution.validate()
            }
            StepAction::CopyFile { src, .. } | StepAction::CopyDirectory { src, .. }
                if src.is_empty() =>
            {
                Err(DomainError::MissingRequiredField { field: "src" })
            }
            StepAction::CopyFile { dst, .. } | StepAction::CopyDirectory { dst, .. }
                if dst.is_empty() =>
            {
                Err(DomainError::MissingRequiredField { field: "dst" })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::pattern::Pattern;

    #[test]
    fn tool_display_quotes_spaced_args() {
        let tool = ToolInvocation::new("git")
            .args(["commit", "-m", "Initial commit"])
            .in_environment(Environment::Test);
        assert_eq!(tool.to_string(), "[test] git commit -m \"Initial commit\"");
    }

    #[test]
    fn tool_accepts_expected_codes_only() {
        let tool = ToolInvocation::new("bundle").expect_exit_codes(vec![0, 1]);
        assert!(tool.accepts(Some(1)));
        assert!(!tool.accepts(Some(2)));
        assert!(!tool.accepts(None));
    }

    #[test]
    fn shell_tool_rejects_separate_args() {
        let tool = ToolInvocation::shell("yes | rails haml:erb2haml").arg("x");
        assert!(tool.validate().is_err());
    }

    #[test]
    fn empty_program_is_invalid() {
        let step = Step::new("noop", StepAction::RunExternal(ToolInvocation::new("  ")));
        assert!(matches!(
            step.validate(),
            Err(DomainError::MissingRequiredField { field: "program" })
        ));
    }

    #[test]
    fn copy_needs_both_paths() {
        let copy = |src: &str, dst: &str| {
            Step::new(
                "procfile",
                StepAction::CopyFile {
                    src: src.into(),
                    dst: dst.into(),
                    force: false,
                },
            )
        };
        assert!(copy("Procfile", "Procfile").validate().is_ok());
        assert!(matches!(
            copy("", "Procfile").validate(),
            Err(DomainError::MissingRequiredField { field: "src" })
        ));
        assert!(matches!(
            copy("Procfile", "").validate(),
            Err(DomainError::MissingRequiredField { field: "dst" })
        ));

        let dir = Step::new(
            "views",
            StepAction::CopyDirectory {
                src: "app/views".into(),
                dst: "".into(),
                force: false,
            },
        );
        assert!(dir.validate().is_err());
    }

    #[test]
    fn guard_requires_known_version() {
        let step = Step::new(
            "pin sqlite",
            StepAction::Announce {
                message: "x".into(),
            },
        )
        .when(VersionReq::parse(">=5.2.0, <6.0.0-beta1").unwrap());

        assert!(step.admits(Some(&Version::new(5, 2, 3))));
        assert!(!step.admits(Some(&Version::new(6, 0, 0))));
        assert!(!step.admits(None));
    }

    #[test]
    fn unguarded_step_always_admitted() {
        let step = Step::new("hi", StepAction::Announce { message: "hi".into() });
        assert!(step.admits(None));
    }

    #[test]
    fn destructive_flag_is_detected() {
        let step = Step::new(
            "reset db",
            StepAction::RunExternal(ToolInvocation::new("bin/rails").arg("db:reset").destructive()),
        );
        assert!(step.is_destructive());
    }

    #[test]
    fn patch_with_empty_anchor_is_invalid() {
        let step = Step::new(
            "bad",
            StepAction::Patch {
                target: "config/routes.rb".into(),
                insertion: Insertion::after(Pattern::literal(""), "x"),
            },
        );
        assert!(step.validate().is_err());
    }

    #[test]
    fn file_target_display() {
        let t = FileTarget::FirstMatching {
            dir: RelativePath::new("db/migrate"),
            suffix: "friendly_id_slugs.rb".into(),
        };
        assert_eq!(t.to_string(), "db/migrate/**/*friendly_id_slugs.rb");
    }
}
