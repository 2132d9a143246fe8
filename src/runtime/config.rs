use crate::hooks::reference::HookReference;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_WORKERS: usize = 4;

/// Fully merged run configuration.
///
/// All instances must be constructed via [`RunConfig::builder`] or [`RunConfig::new`]
/// so invariants are validated before any hook observes the values. The same
/// `Arc<RunConfig>` is handed to the setup and teardown hooks as their sole argument.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    config_dir: PathBuf,
    global_setup: Option<HookReference>,
    global_teardown: Option<HookReference>,
    global_timeout: Option<Duration>,
    workers: usize,
    projects: Vec<String>,
    metadata: serde_json::Value,
}

pub struct RunConfigParams {
    pub config_dir: PathBuf,
    pub global_setup: Option<HookReference>,
    pub global_teardown: Option<HookReference>,
    pub global_timeout: Option<Duration>,
    pub workers: usize,
    pub projects: Vec<String>,
    pub metadata: serde_json::Value,
}

impl RunConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// A zero `global_timeout` is normalized to `None` (unbounded).
    pub fn new(params: RunConfigParams) -> Result<Self> {
        let RunConfigParams {
            config_dir,
            global_setup,
            global_teardown,
            global_timeout,
            workers,
            projects,
            metadata,
        } = params;

        let config = Self {
            config_dir,
            global_setup,
            global_teardown,
            global_timeout: global_timeout.filter(|timeout| !timeout.is_zero()),
            workers,
            projects: projects
                .into_iter()
                .map(|name| name.trim().to_owned())
                .collect(),
            metadata,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses the `globalSetup`/`globalTeardown`/`globalTimeout` surface of a
    /// merged configuration object. Keys this crate does not consume are ignored.
    pub fn from_json_str(json: &str, config_dir: impl Into<PathBuf>) -> Result<Self> {
        let raw: RawRunConfig =
            serde_json::from_str(json).context("failed to parse run configuration")?;
        raw.into_config(config_dir.into())
    }

    /// Directory containing the configuration file; hook references resolve from here.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Module invoked once before any test runs.
    pub fn global_setup(&self) -> Option<&HookReference> {
        self.global_setup.as_ref()
    }

    /// Module invoked once after all tests, if setup succeeded.
    pub fn global_teardown(&self) -> Option<&HookReference> {
        self.global_teardown.as_ref()
    }

    /// Deadline for setup plus the test execution phase. `None` means unbounded.
    pub fn global_timeout(&self) -> Option<Duration> {
        self.global_timeout
    }

    /// Maximum number of test workers running at once.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Project names, trimmed and unique.
    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    /// Free-form values passed through to hooks.
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if !self.config_dir.is_absolute() {
            bail!(
                "config_dir must be an absolute path, got {}",
                self.config_dir.display()
            );
        }

        if self.workers == 0 {
            bail!("workers must be greater than 0");
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            if project.is_empty() {
                bail!("project names cannot be empty");
            }
            if !seen.insert(project.as_str()) {
                bail!("duplicate project name {project}");
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunConfigBuilder {
    config_dir: Option<PathBuf>,
    global_setup: Option<HookReference>,
    global_teardown: Option<HookReference>,
    global_timeout: Option<Duration>,
    workers: Option<usize>,
    projects: Vec<String>,
    metadata: Option<serde_json::Value>,
}

impl RunConfigBuilder {
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn global_setup(mut self, reference: HookReference) -> Self {
        self.global_setup = Some(reference);
        self
    }

    pub fn global_teardown(mut self, reference: HookReference) -> Self {
        self.global_teardown = Some(reference);
        self
    }

    pub fn global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = Some(timeout);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn project(mut self, name: impl Into<String>) -> Self {
        self.projects.push(name.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> Result<RunConfig> {
        let params = RunConfigParams {
            config_dir: self.config_dir.context("config_dir is required")?,
            global_setup: self.global_setup,
            global_teardown: self.global_teardown,
            global_timeout: self.global_timeout,
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            projects: self.projects,
            metadata: self.metadata.unwrap_or(serde_json::Value::Null),
        };

        RunConfig::new(params)
    }
}

/// Wire shape of the configuration keys consumed by the lifecycle.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRunConfig {
    #[serde(default)]
    pub global_setup: Option<String>,
    #[serde(default)]
    pub global_teardown: Option<String>,
    /// Milliseconds; zero or absent means unbounded.
    #[serde(default)]
    pub global_timeout: Option<u64>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl RawRunConfig {
    pub fn into_config(self, config_dir: PathBuf) -> Result<RunConfig> {
        let mut builder = RunConfig::builder()
            .config_dir(config_dir)
            .metadata(self.metadata);

        if let Some(setup) = self.global_setup {
            builder = builder
                .global_setup(HookReference::parse(&setup).context("invalid globalSetup")?);
        }
        if let Some(teardown) = self.global_teardown {
            builder = builder.global_teardown(
                HookReference::parse(&teardown).context("invalid globalTeardown")?,
            );
        }
        if let Some(millis) = self.global_timeout {
            builder = builder.global_timeout(Duration::from_millis(millis));
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        for project in self.projects {
            builder = builder.project(project);
        }

        builder.build()
    }
}
