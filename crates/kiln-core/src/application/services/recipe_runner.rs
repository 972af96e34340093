//! Recipe Runner - executes a recipe's steps against a workspace.
//!
//! Steps run strictly in order, one at a time. The first failing step stops
//! the run; nothing is retried or rolled back. A runner is single-use:
//!
//! ```text
//! Pending ──run()──▶ Running{step} ──▶ Done
//!                          │
//!                          └──────────▶ Failed{step}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, info_span, instrument, warn};

use crate::{
    application::{
        ApplicationError, RunConfig,
        ports::{Filesystem, NoProgress, ProgressSink, ToolCommand, ToolRunner},
    },
    domain::{
        DomainValidator as validator, FileTarget, Insertion, Recipe, RelativePath,
        RenderContext, Step, StepAction, StepKind, Substitution, ToolInvocation,
    },
    error::{KilnError, KilnResult},
};

/// Lifecycle of a [`RecipeRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    /// Executing the 1-based step `step`.
    Running { step: usize },
    Done,
    /// `step` is `None` when the recipe was rejected before any step ran.
    Failed { step: Option<usize> },
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepStatus {
    Applied,
    Skipped { reason: String },
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub number: usize,
    pub label: String,
    pub kind: StepKind,
    pub status: StepStatus,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// `name@version` of the recipe that ran.
    pub recipe: String,
    pub outcomes: Vec<StepOutcome>,
    /// Rendered `Announce` messages, in order.
    pub announcements: Vec<String>,
    /// Rendered farewell lines.
    pub farewell: Vec<String>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Applied)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}

/// What a dry run predicts for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum PlanDisposition {
    Run,
    Skip { reason: String },
    /// Destructive and not allowed; the real run would stop here.
    Refuse,
}

/// Dry-run description of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub number: usize,
    pub label: String,
    pub kind: StepKind,
    pub summary: String,
    pub destructive: bool,
    pub disposition: PlanDisposition,
}

/// Executes recipes against a workspace.
///
/// Owns its collaborators as trait objects, the same way the other
/// services do. Built per run from an immutable [`RunConfig`].
pub struct RecipeRunner {
    filesystem: Box<dyn Filesystem>,
    tools: Box<dyn ToolRunner>,
    progress: Box<dyn ProgressSink>,
    config: RunConfig,
    context: RenderContext,
    state: RunState,
}

impl RecipeRunner {
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        tools: Box<dyn ToolRunner>,
        config: RunConfig,
    ) -> Self {
        let context = config.render_context();
        Self {
            filesystem,
            tools,
            progress: Box::new(NoProgress),
            config,
            context,
            state: RunState::Pending,
        }
    }

    /// Report step progress to `progress` while running.
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every step of `recipe` in order.
    ///
    /// # Errors
    ///
    /// - `RunnerConsumed` if this runner already ran
    /// - the recipe's validation error if it is malformed
    /// - `StepFailed` wrapping the cause of the first failing step
    #[instrument(skip_all, fields(recipe = %recipe.id()))]
    pub fn run(&mut self, recipe: &Recipe) -> KilnResult<RunReport> {
        if self.state != RunState::Pending {
            return Err(ApplicationError::RunnerConsumed.into());
        }

        if let Err(e) = validator::validate_recipe(recipe) {
            self.state = RunState::Failed { step: None };
            return Err(e.into());
        }

        info!(
            steps = recipe.step_count(),
            workspace = %self.config.workspace_root().display(),
            "Running recipe"
        );

        let total = recipe.step_count();
        let mut outcomes = Vec::with_capacity(total);
        let mut announcements = Vec::new();

        for (index, step) in recipe.steps.iter().enumerate() {
            let number = index + 1;
            self.state = RunState::Running { step: number };

            let span = info_span!("step", step = %step.label, number, kind = %step.kind());
            let _entered = span.enter();

            self.progress.step_started(number, total, step);

            let status = match self.execute(step, &mut announcements) {
                Ok(status) => status,
                Err(source) => {
                    error!(error = %source, "Step failed");
                    self.state = RunState::Failed { step: Some(number) };
                    return Err(ApplicationError::StepFailed {
                        number,
                        step: step.label.clone(),
                        source: Box::new(source),
                    }
                    .into());
                }
            };

            match &status {
                StepStatus::Applied => debug!("Step applied"),
                StepStatus::Skipped { reason } => info!(%reason, "Step skipped"),
            }
            self.progress.step_finished(number, step, &status);

            outcomes.push(StepOutcome {
                number,
                label: step.label.clone(),
                kind: step.kind(),
                status,
            });
        }

        self.state = RunState::Done;

        let report = RunReport {
            recipe: recipe.id(),
            outcomes,
            announcements,
            farewell: recipe
                .farewell
                .iter()
                .map(|line| self.context.render(line))
                .collect(),
        };
        info!(
            applied = report.applied(),
            skipped = report.skipped(),
            "Recipe completed successfully"
        );
        Ok(report)
    }

    /// Describe what `run` would do, without touching anything.
    pub fn plan(&self, recipe: &Recipe) -> Vec<PlannedStep> {
        recipe
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| PlannedStep {
                number: index + 1,
                label: step.label.clone(),
                kind: step.kind(),
                summary: self.summarize(&step.action),
                destructive: step.is_destructive(),
                disposition: if let Some(reason) = self.skip_reason(step) {
                    PlanDisposition::Skip { reason }
                } else if step.is_destructive() && !self.config.allow_destructive() {
                    PlanDisposition::Refuse
                } else {
                    PlanDisposition::Run
                },
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Step execution
    // -------------------------------------------------------------------------

    fn execute(&self, step: &Step, announcements: &mut Vec<String>) -> KilnResult<StepStatus> {
        if let Some(reason) = self.skip_reason(step) {
            return Ok(StepStatus::Skipped { reason });
        }

        if step.is_destructive() {
            if !self.config.allow_destructive() {
                return Err(ApplicationError::DestructiveStepRefused {
                    step: step.label.clone(),
                }
                .into());
            }
            warn!("Running destructive step");
        }

        match &step.action {
            StepAction::RunExternal(tool) => self.run_tool(tool),
            StepAction::Generate {
                generator,
                args,
                environment,
            } => {
                let mut tool = self.generator_invocation(generator, args);
                tool.environment = *environment;
                self.run_tool(&tool)
            }
            StepAction::CopyFile { src, dst, force } => self.copy_file(src, dst, *force),
            StepAction::CopyDirectory { src, dst, force } => {
                self.copy_directory(src, dst, *force)
            }
            StepAction::RemoveFile { path } => self.remove_file(path),
            StepAction::Patch { target, insertion } => self.patch(target, insertion),
            StepAction::Substitute {
                target,
                substitution,
            } => self.substitute(target, substitution),
            StepAction::Announce { message } => {
                let message = self.context.render(message);
                self.progress.announce(&message);
                announcements.push(message);
                Ok(StepStatus::Applied)
            }
        }
    }

    fn skip_reason(&self, step: &Step) -> Option<String> {
        if step.admits(self.config.framework_version()) {
            return None;
        }
        let req = step.guard.as_ref().map(|r| r.to_string()).unwrap_or_default();
        Some(match self.config.framework_version() {
            Some(v) => format!("framework {v} does not match {req}"),
            None => format!("framework version unknown, step requires {req}"),
        })
    }

    fn run_tool(&self, tool: &ToolInvocation) -> KilnResult<StepStatus> {
        let command = self.resolve_tool(tool);
        debug!(command = %command, "Running external tool");

        let outcome = self.tools.run(&command)?;
        if tool.accepts(outcome.code) {
            Ok(StepStatus::Applied)
        } else {
            Err(ApplicationError::ToolFailed {
                command: command.to_string(),
                code: outcome.code,
            }
            .into())
        }
    }

    fn generator_invocation(&self, generator: &str, args: &[String]) -> ToolInvocation {
        // RunConfigBuilder guarantees a non-empty prefix.
        let (program, prefix_args) = match self.config.generator().split_first() {
            Some((program, rest)) => (program.as_str(), rest),
            None => ("", &[][..]),
        };
        ToolInvocation::new(program)
            .args(prefix_args.iter().cloned())
            .arg(generator)
            .args(args.iter().cloned())
    }

    fn resolve_tool(&self, tool: &ToolInvocation) -> ToolCommand {
        let mut env = BTreeMap::new();
        if let Some(environment) = tool.environment {
            env.insert(
                self.config.environment_variable().to_string(),
                environment.as_str().to_string(),
            );
        }
        for (key, value) in &tool.env {
            env.insert(key.clone(), self.context.render(value));
        }

        ToolCommand {
            program: self.context.render(&tool.program),
            args: tool.args.iter().map(|a| self.context.render(a)).collect(),
            cwd: self.config.workspace_root().to_path_buf(),
            env,
            shell: tool.shell,
        }
    }

    fn copy_file(
        &self,
        src: &RelativePath,
        dst: &RelativePath,
        force: bool,
    ) -> KilnResult<StepStatus> {
        let src = self.render_path(src)?.under(self.config.template_root());
        let dst_rel = self.render_path(dst)?;
        let dst = dst_rel.under(self.config.workspace_root());

        if !self.filesystem.exists(&src) || self.filesystem.is_dir(&src) {
            return Err(ApplicationError::SourceMissing { path: src }.into());
        }
        if self.filesystem.exists(&dst) && !force {
            return Err(ApplicationError::DestinationExists {
                path: dst_rel.into_path_buf(),
            }
            .into());
        }
        self.require_parent(&dst)?;

        debug!(from = %src.display(), to = %dst.display(), "Copying template file");
        self.filesystem.copy_file(&src, &dst)?;
        Ok(StepStatus::Applied)
    }

    fn copy_directory(
        &self,
        src: &RelativePath,
        dst: &RelativePath,
        force: bool,
    ) -> KilnResult<StepStatus> {
        let src = self.render_path(src)?.under(self.config.template_root());
        let dst_rel = self.render_path(dst)?;
        let dst = dst_rel.under(self.config.workspace_root());

        if !self.filesystem.is_dir(&src) {
            return Err(ApplicationError::SourceMissing { path: src }.into());
        }
        self.require_parent(&dst)?;

        let mut pairs = Vec::new();
        for file in self.filesystem.list_files(&src)? {
            let relative = file.strip_prefix(&src).map_err(|_| KilnError::Internal {
                message: format!("{} listed outside {}", file.display(), src.display()),
            })?;
            pairs.push((dst.join(relative), dst_rel.as_path().join(relative), file));
        }

        // Check every destination first so a refused copy writes nothing.
        if !force {
            if let Some((_, shown, _)) =
                pairs.iter().find(|(to, _, _)| self.filesystem.exists(to))
            {
                return Err(ApplicationError::DestinationExists {
                    path: shown.clone(),
                }
                .into());
            }
        }

        self.filesystem.create_dir_all(&dst)?;
        for (to, _, from) in &pairs {
            if let Some(parent) = to.parent() {
                self.filesystem.create_dir_all(parent)?;
            }
            self.filesystem.copy_file(from, to)?;
        }
        debug!(files = pairs.len(), to = %dst.display(), "Copied template directory");
        Ok(StepStatus::Applied)
    }

    fn remove_file(&self, path: &RelativePath) -> KilnResult<StepStatus> {
        let path = self.render_path(path)?.under(self.config.workspace_root());
        if !self.filesystem.exists(&path) {
            return Ok(StepStatus::Skipped {
                reason: "already absent".into(),
            });
        }
        self.filesystem.remove_file(&path)?;
        Ok(StepStatus::Applied)
    }

    fn patch(&self, target: &FileTarget, insertion: &Insertion) -> KilnResult<StepStatus> {
        let (path, shown) = self.resolve_target(target)?;
        let rendered = Insertion {
            text: self.context.render(&insertion.text),
            ..insertion.clone()
        };

        let content = self.filesystem.read_to_string(&path)?;
        let patched = rendered.apply(&shown, &content)?;
        self.filesystem.write_file(&path, &patched)?;
        debug!(file = %shown, "Inserted text");
        Ok(StepStatus::Applied)
    }

    fn substitute(
        &self,
        target: &FileTarget,
        substitution: &Substitution,
    ) -> KilnResult<StepStatus> {
        let (path, shown) = self.resolve_target(target)?;
        let rendered = Substitution {
            replacement: self.context.render(&substitution.replacement),
            ..substitution.clone()
        };

        let content = self.filesystem.read_to_string(&path)?;
        let replaced = rendered.apply(&shown, &content)?;
        self.filesystem.write_file(&path, &replaced)?;
        debug!(file = %shown, "Substituted text");
        Ok(StepStatus::Applied)
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn render_path(&self, path: &RelativePath) -> KilnResult<RelativePath> {
        let raw = path.as_path().to_string_lossy();
        if !raw.contains("{{") {
            return Ok(path.clone());
        }
        Ok(RelativePath::try_new(self.context.render(&raw))?)
    }

    fn require_parent(&self, dst: &Path) -> KilnResult<()> {
        match dst.parent() {
            Some(parent) if !self.filesystem.is_dir(parent) => {
                Err(ApplicationError::FilesystemError {
                    path: parent.to_path_buf(),
                    reason: "destination directory does not exist".into(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Resolve a target to an absolute path plus its workspace-relative form.
    fn resolve_target(&self, target: &FileTarget) -> KilnResult<(PathBuf, String)> {
        let root = self.config.workspace_root();
        let not_found = || -> KilnError {
            ApplicationError::TargetNotFound {
                target: target.to_string(),
            }
            .into()
        };

        let path = match target {
            FileTarget::Path(p) => {
                let path = self.render_path(p)?.under(root);
                if !self.filesystem.exists(&path) || self.filesystem.is_dir(&path) {
                    return Err(not_found());
                }
                path
            }
            FileTarget::NewestIn { dir } => {
                let dir = self.render_path(dir)?.under(root);
                if !self.filesystem.is_dir(&dir) {
                    return Err(not_found());
                }
                let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
                for file in self.filesystem.list_files(&dir)? {
                    if file.parent() != Some(dir.as_path()) {
                        continue;
                    }
                    let modified = self.filesystem.modified(&file)?;
                    if newest.as_ref().is_none_or(|(best, _)| modified >= *best) {
                        newest = Some((modified, file));
                    }
                }
                newest.map(|(_, file)| file).ok_or_else(not_found)?
            }
            FileTarget::FirstMatching { dir, suffix } => {
                let dir = self.render_path(dir)?.under(root);
                if !self.filesystem.is_dir(&dir) {
                    return Err(not_found());
                }
                self.filesystem
                    .list_files(&dir)?
                    .into_iter()
                    .find(|file| {
                        file.file_name()
                            .is_some_and(|name| name.to_string_lossy().ends_with(suffix.as_str()))
                    })
                    .ok_or_else(not_found)?
            }
        };

        let shown = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .display()
            .to_string();
        debug!(target = %target, resolved = %shown, "Resolved patch target");
        Ok((path, shown))
    }

    fn summarize(&self, action: &StepAction) -> String {
        match action {
            StepAction::RunExternal(tool) => self.resolve_tool(tool).to_string(),
            StepAction::Generate {
                generator,
                args,
                environment,
            } => {
                let mut tool = self.generator_invocation(generator, args);
                tool.environment = *environment;
                self.resolve_tool(&tool).to_string()
            }
            StepAction::CopyFile { src, dst, force } => format!(
                "copy {} -> {}{}",
                self.context.render(&src.to_string()),
                self.context.render(&dst.to_string()),
                if *force { " (force)" } else { "" }
            ),
            StepAction::CopyDirectory { src, dst, force } => format!(
                "copy {}/ -> {}/{}",
                self.context.render(&src.to_string()),
                self.context.render(&dst.to_string()),
                if *force { " (force)" } else { "" }
            ),
            StepAction::RemoveFile { path } => {
                format!("remove {}", self.context.render(&path.to_string()))
            }
            StepAction::Patch { target, insertion } => format!(
                "insert {} {} in {target}",
                insertion.position, insertion.anchor
            ),
            StepAction::Substitute {
                target,
                substitution,
            } => format!(
                "replace {} {} in {target}",
                substitution.occurrence, substitution.pattern
            ),
            StepAction::Announce { message } => format!("say \"{}\"", self.context.render(message)),
        }
    }
}
