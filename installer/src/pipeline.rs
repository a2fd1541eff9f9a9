//! Pipeline orchestration.
//!
//! A [`Pipeline`] is an ordered list of named [`Stage`]s run by a single loop.
//! The first failing stage aborts the run; later stages never execute. The
//! patched installer script, if one was written, is deleted before
//! [`Pipeline::run`] returns on every path, and by the guard's destructor if a
//! stage panics.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::interrupt::InterruptFlag;
use crate::output::{stage_banner, write_stderr_line};
use crate::process::CommandExecutor;
use crate::stages::{ArtifactScope, BuiltinStage};
use crate::template::TransientScript;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// One named unit of pipeline work.
pub trait Stage {
    /// Stable stage name used in progress output and errors.
    fn name(&self) -> &str;

    /// Run the stage against the shared run state.
    ///
    /// # Errors
    ///
    /// Returns the stage's failure; the pipeline aborts on any error.
    fn execute(&self, run: &mut RunContext<'_>) -> Result<()>;
}

/// The pipeline variants exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Clean, build, stage, verify, patch the template, and compile the installer.
    All,
    /// Clean, build, and stage the application without packaging it.
    Update,
    /// Package previously staged output into an installer.
    Installer,
}

impl PipelineKind {
    /// Name shown in banners and summaries.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::All => "build-all",
            Self::Update => "update-from-project",
            Self::Installer => "build-installer",
        }
    }

    /// Built-in stages for this variant, in execution order.
    #[must_use]
    pub fn stages(self) -> Vec<BuiltinStage> {
        match self {
            Self::All => vec![
                BuiltinStage::CleanWorkspace,
                BuiltinStage::BuildAndPublish,
                BuiltinStage::CopyAuxiliaryAsset,
                BuiltinStage::VerifyRequiredFiles(ArtifactScope::All),
                BuiltinStage::VerifyExternalTool,
                BuiltinStage::GenerateDynamicScript,
                BuiltinStage::InvokeInstallerCompiler,
            ],
            Self::Update => vec![
                BuiltinStage::CleanWorkspace,
                BuiltinStage::BuildAndPublish,
                BuiltinStage::CopyAuxiliaryAsset,
                BuiltinStage::VerifyRequiredFiles(ArtifactScope::Staged),
            ],
            Self::Installer => vec![
                BuiltinStage::VerifyExternalTool,
                BuiltinStage::VerifyRequiredFiles(ArtifactScope::All),
                BuiltinStage::GenerateDynamicScript,
                BuiltinStage::InvokeInstallerCompiler,
            ],
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable state shared by the stages of one run.
pub struct RunContext<'a> {
    config: &'a PipelineConfig,
    executor: &'a dyn CommandExecutor,
    progress: &'a mut dyn Write,
    quiet: bool,
    script: Option<TransientScript>,
    artifact_name: Option<String>,
}

impl<'a> RunContext<'a> {
    /// Create the state for a fresh run.
    pub fn new(
        config: &'a PipelineConfig,
        executor: &'a dyn CommandExecutor,
        progress: &'a mut dyn Write,
        quiet: bool,
    ) -> Self {
        Self {
            config,
            executor,
            progress,
            quiet,
            script: None,
            artifact_name: None,
        }
    }

    /// The run's immutable configuration.
    #[must_use]
    pub fn config(&self) -> &'a PipelineConfig {
        self.config
    }

    /// The executor used for external commands.
    #[must_use]
    pub fn executor(&self) -> &'a dyn CommandExecutor {
        self.executor
    }

    /// Write a progress line unless the run is quiet.
    pub fn report(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(&mut *self.progress, message);
        }
    }

    /// Take ownership of the patched script and remember the artifact it names.
    ///
    /// Callers release any previous script first; the path is well-known and
    /// shared between successive scripts.
    pub fn store_script(&mut self, script: TransientScript, artifact_name: String) {
        self.script = Some(script);
        self.artifact_name = Some(artifact_name);
    }

    /// Path of the patched script, if one was written during this run.
    #[must_use]
    pub fn script_path(&self) -> Option<&Utf8Path> {
        self.script.as_ref().map(TransientScript::path)
    }

    /// Installer file name announced by the patched script.
    #[must_use]
    pub fn artifact_name(&self) -> Option<&str> {
        self.artifact_name.as_deref()
    }

    /// Delete the patched script if one exists.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file exists but cannot be removed.
    pub fn release_script(&mut self) -> Result<()> {
        match self.script.take() {
            Some(script) => {
                log::debug!("removing transient script {}", script.path());
                script.release()
            }
            None => Ok(()),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Pipeline name.
    pub pipeline: String,
    /// Product name.
    pub product_name: String,
    /// Human product version.
    pub product_version: String,
    /// Four-part installer version.
    pub installer_version: String,
    /// Build timestamp label.
    pub build_timestamp: String,
    /// Installer file name, when the pipeline compiled one.
    pub artifact: Option<String>,
    /// Expected location of the installer, when the pipeline compiled one.
    pub artifact_path: Option<Utf8PathBuf>,
    /// Publish output directory.
    pub publish_dir: Utf8PathBuf,
    /// Names of the stages that ran, in order.
    pub stages: Vec<String>,
}

/// An ordered list of stages.
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Create the pipeline for a command-line variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_installer::pipeline::{Pipeline, PipelineKind};
    ///
    /// let pipeline = Pipeline::for_kind(PipelineKind::Update);
    /// assert_eq!(
    ///     pipeline.stage_names(),
    ///     ["clean-workspace", "build-and-publish", "copy-auxiliary-asset", "verify-required-files"]
    /// );
    /// ```
    #[must_use]
    pub fn for_kind(kind: PipelineKind) -> Self {
        kind.stages()
            .into_iter()
            .fold(Self::new(kind.name()), Self::with_stage)
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// The patched installer script is deleted before this returns, whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageFailed`] naming the first failing stage,
    /// [`PipelineError::Interrupted`] if the operator interrupted the run, or
    /// an I/O error if the patched script could not be deleted after an
    /// otherwise successful run.
    pub fn run(
        &self,
        config: &PipelineConfig,
        executor: &dyn CommandExecutor,
        interrupt: &InterruptFlag,
        progress: &mut dyn Write,
        quiet: bool,
    ) -> Result<RunSummary> {
        log::info!("starting pipeline {} for {}", self.name, config.product_name);

        let mut run = RunContext::new(config, executor, progress, quiet);
        let outcome = self.run_stages(&mut run, interrupt);
        let artifact = run.artifact_name().map(ToOwned::to_owned);
        let cleanup = run.release_script();

        match (outcome, cleanup) {
            (Ok(stages), Ok(())) => Ok(self.summary(config, artifact, stages)),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                log::warn!("failed to remove transient script after abort: {cleanup_err}");
                Err(err)
            }
        }
    }

    fn run_stages(&self, run: &mut RunContext<'_>, interrupt: &InterruptFlag) -> Result<Vec<String>> {
        let total = self.stages.len();
        let mut completed = Vec::with_capacity(total);

        for (index, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            if interrupt.is_raised() {
                return Err(interrupted(name));
            }

            log::info!("stage {name} started");
            run.report(stage_banner(index + 1, total, name));

            if let Err(source) = stage.execute(run) {
                if interrupt.is_raised() {
                    log::warn!("stage {name} stopped by interrupt: {source}");
                    return Err(interrupted(name));
                }
                log::error!("stage {name} failed: {source}");
                return Err(PipelineError::StageFailed {
                    stage: name.to_owned(),
                    source: Box::new(source),
                });
            }

            log::info!("stage {name} completed");
            run.report("");
            completed.push(name.to_owned());
        }

        Ok(completed)
    }

    fn summary(
        &self,
        config: &PipelineConfig,
        artifact: Option<String>,
        stages: Vec<String>,
    ) -> RunSummary {
        RunSummary {
            pipeline: self.name.clone(),
            product_name: config.product_name.clone(),
            product_version: config.product_version.clone(),
            installer_version: config.installer_version().to_string(),
            build_timestamp: config.build_timestamp.clone(),
            artifact_path: artifact.as_ref().map(|name| config.root.join(name)),
            artifact,
            publish_dir: config.publish_dir.clone(),
            stages,
        }
    }
}

fn interrupted(stage: &str) -> PipelineError {
    PipelineError::Interrupted {
        stage: stage.to_owned(),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
