//! Integration tests for kiln-core's public API.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use kiln_core::application::{ApplicationError, PlanDisposition, RunState};
use kiln_core::prelude::*;

/// Workspace stand-in for recipes that only run tools.
struct NoFiles;

impl Filesystem for NoFiles {
    fn read_to_string(&self, path: &Path) -> KilnResult<String> {
        Err(missing(path))
    }
    fn write_file(&self, path: &Path, _: &str) -> KilnResult<()> {
        Err(missing(path))
    }
    fn copy_file(&self, from: &Path, _: &Path) -> KilnResult<()> {
        Err(missing(from))
    }
    fn create_dir_all(&self, _: &Path) -> KilnResult<()> {
        Ok(())
    }
    fn exists(&self, _: &Path) -> bool {
        false
    }
    fn is_dir(&self, _: &Path) -> bool {
        false
    }
    fn remove_file(&self, path: &Path) -> KilnResult<()> {
        Err(missing(path))
    }
    fn list_files(&self, _: &Path) -> KilnResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
    fn modified(&self, path: &Path) -> KilnResult<SystemTime> {
        Err(missing(path))
    }
}

fn missing(path: &Path) -> KilnError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: "not available".into(),
    }
    .into()
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl ToolRunner for Recorder {
    fn run(&self, command: &ToolCommand) -> KilnResult<ToolOutcome> {
        self.seen.lock().unwrap().push(command.to_string());
        if self.fail_on.is_some_and(|p| command.program == p) {
            return Ok(ToolOutcome::exited(3));
        }
        Ok(ToolOutcome::exited(0))
    }
}

fn tool_recipe() -> Recipe {
    Recipe::builder()
        .name("tools-only")
        .step(Step::new(
            "install",
            StepAction::RunExternal(ToolInvocation::new("bundle").arg("install")),
        ))
        .step(Step::new(
            "scaffold",
            StepAction::Generate {
                generator: "scaffold".into(),
                args: vec!["{{APP_NAME_PASCAL}}Post".into(), "title".into()],
                environment: None,
            },
        ))
        .step(Step::new(
            "commit",
            StepAction::RunExternal(
                ToolInvocation::new("git").args(["commit", "-m", "Initial commit"]),
            ),
        ))
        .farewell("cd {{APP_NAME}} && bin/rails s")
        .build()
        .unwrap()
}

fn config() -> RunConfig {
    RunConfig::builder("blog").workspace_root("/tmp/blog").build().unwrap()
}

#[test]
fn test_tools_run_in_declaration_order() {
    let tools = Recorder::default();
    let mut runner = RecipeRunner::new(Box::new(NoFiles), Box::new(tools.clone()), config());

    let report = runner.run(&tool_recipe()).unwrap();

    assert_eq!(
        *tools.seen.lock().unwrap(),
        [
            "bundle install",
            "bin/rails generate scaffold BlogPost title",
            "git commit -m \"Initial commit\"",
        ]
    );
    assert_eq!(report.farewell, ["cd blog && bin/rails s"]);
    assert_eq!(runner.state(), RunState::Done);
}

#[test]
fn test_failure_stops_later_tools() {
    let tools = Recorder {
        fail_on: Some("bin/rails"),
        ..Recorder::default()
    };
    let mut runner = RecipeRunner::new(Box::new(NoFiles), Box::new(tools.clone()), config());

    let err = runner.run(&tool_recipe()).unwrap_err();

    assert_eq!(tools.seen.lock().unwrap().len(), 2);
    assert_eq!(err.tool_exit_code(), Some(3));
    assert_eq!(err.failed_step(), Some("scaffold"));
    assert_eq!(runner.state(), RunState::Failed { step: Some(2) });
}

#[test]
fn test_plan_touches_nothing() {
    let tools = Recorder::default();
    let runner = RecipeRunner::new(Box::new(NoFiles), Box::new(tools.clone()), config());

    let plan = runner.plan(&tool_recipe());

    assert_eq!(plan.len(), 3);
    assert!(plan.iter().all(|p| p.disposition == PlanDisposition::Run));
    assert!(tools.seen.lock().unwrap().is_empty());
}
