//! Immutable per-run configuration handed to the recipe runner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;

use crate::domain::{DomainError, RenderContext};

/// Everything a run needs to know up front.
///
/// Built once before the run starts and never mutated afterwards; steps
/// read framework version, roots, and safety switches from here.
#[derive(Debug, Clone)]
pub struct RunConfig {
    app_name: String,
    workspace_root: PathBuf,
    template_root: PathBuf,
    framework_version: Option<Version>,
    allow_destructive: bool,
    environment_variable: String,
    generator: Vec<String>,
    variables: BTreeMap<String, String>,
}

impl RunConfig {
    pub const DEFAULT_ENVIRONMENT_VARIABLE: &'static str = "RAILS_ENV";

    pub fn builder(app_name: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder::new(app_name)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn template_root(&self) -> &Path {
        &self.template_root
    }

    pub fn framework_version(&self) -> Option<&Version> {
        self.framework_version.as_ref()
    }

    pub fn allow_destructive(&self) -> bool {
        self.allow_destructive
    }

    pub fn environment_variable(&self) -> &str {
        &self.environment_variable
    }

    /// Command prefix for generator steps, e.g. `["bin/rails", "generate"]`.
    pub fn generator(&self) -> &[String] {
        &self.generator
    }

    /// Render context with built-ins plus user variables.
    pub fn render_context(&self) -> RenderContext {
        let mut ctx = RenderContext::new(&self.app_name);
        if let Some(v) = &self.framework_version {
            ctx = ctx.with_variable("FRAMEWORK_VERSION", v.to_string());
        }
        self.variables
            .iter()
            .fold(ctx, |ctx, (k, v)| ctx.with_variable(k, v))
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    app_name: String,
    workspace_root: PathBuf,
    template_root: PathBuf,
    framework_version: Option<Version>,
    allow_destructive: bool,
    environment_variable: String,
    generator: Vec<String>,
    variables: BTreeMap<String, String>,
}

impl RunConfigBuilder {
    fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            workspace_root: PathBuf::from("."),
            template_root: PathBuf::from("."),
            framework_version: None,
            allow_destructive: false,
            environment_variable: RunConfig::DEFAULT_ENVIRONMENT_VARIABLE.to_string(),
            generator: vec!["bin/rails".into(), "generate".into()],
            variables: BTreeMap::new(),
        }
    }

    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = path.into();
        self
    }

    pub fn template_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_root = path.into();
        self
    }

    pub fn framework_version(mut self, version: Version) -> Self {
        self.framework_version = Some(version);
        self
    }

    /// Parse and set the framework version. Accepts `6.0` as `6.0.0`.
    pub fn framework_version_str(self, raw: &str) -> Result<Self, DomainError> {
        let version = parse_lenient_version(raw)?;
        Ok(self.framework_version(version))
    }

    pub fn allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    pub fn environment_variable(mut self, name: impl Into<String>) -> Self {
        self.environment_variable = name.into();
        self
    }

    pub fn generator<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generator = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<RunConfig, DomainError> {
        if self.app_name.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "app_name" });
        }
        if self.generator.is_empty() {
            return Err(DomainError::MissingRequiredField { field: "generator" });
        }
        Ok(RunConfig {
            app_name: self.app_name,
            workspace_root: self.workspace_root,
            template_root: self.template_root,
            framework_version: self.framework_version,
            allow_destructive: self.allow_destructive,
            environment_variable: self.environment_variable,
            generator: self.generator,
            variables: self.variables,
        })
    }
}

/// Parse `X`, `X.Y` or a full semver string.
pub fn parse_lenient_version(raw: &str) -> Result<Version, DomainError> {
    let trimmed = raw.trim().trim_start_matches('v');
    let padded = match trimmed.split(['-', '+']).next().map(|core| core.matches('.').count()) {
        Some(0) => pad_version(trimmed, ".0.0"),
        Some(1) => pad_version(trimmed, ".0"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|e| DomainError::InvalidVersion {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn pad_version(raw: &str, suffix: &str) -> String {
    match raw.find(['-', '+']) {
        Some(at) => format!("{}{suffix}{}", &raw[..at], &raw[at..]),
        None => format!("{raw}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RunConfig::builder("shop").build().unwrap();
        assert_eq!(cfg.environment_variable(), "RAILS_ENV");
        assert_eq!(cfg.generator(), ["bin/rails", "generate"]);
        assert!(!cfg.allow_destructive());
        assert!(cfg.framework_version().is_none());
    }

    #[test]
    fn empty_app_name_rejected() {
        assert!(RunConfig::builder(" ").build().is_err());
    }

    #[test]
    fn lenient_versions() {
        assert_eq!(parse_lenient_version("6").unwrap(), Version::new(6, 0, 0));
        assert_eq!(parse_lenient_version("v5.2").unwrap(), Version::new(5, 2, 0));
        assert_eq!(parse_lenient_version("6.0.3").unwrap(), Version::new(6, 0, 3));
        assert_eq!(
            parse_lenient_version("6.0-beta1").unwrap(),
            Version::parse("6.0.0-beta1").unwrap()
        );
        assert!(parse_lenient_version("six").is_err());
    }

    #[test]
    fn render_context_carries_variables_and_version() {
        let cfg = RunConfig::builder("blog")
            .framework_version(Version::new(6, 0, 0))
            .variable("HOST", "example.test")
            .build()
            .unwrap();
        let ctx = cfg.render_context();
        assert_eq!(ctx.get("HOST"), Some("example.test"));
        assert_eq!(ctx.get("FRAMEWORK_VERSION"), Some("6.0.0"));
        assert_eq!(ctx.get("APP_NAME_PASCAL"), Some("Blog"));
    }
}
