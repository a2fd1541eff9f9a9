//! Built-in release stages.
//!
//! Each stage is also exposed as a free function over [`PipelineConfig`] so
//! it can be exercised without a pipeline.

use crate::config::{ArtifactOrigin, PipelineConfig, RequiredArtifact};
use crate::error::{PipelineError, Result};
use crate::pipeline::{RunContext, Stage};
use crate::process::{CommandExecutor, Invocation, ProcessResult, invoke, tool_exists};
use crate::template::{PatchFields, TransientScript, write_patched_script};
use camino::Utf8Path;
use filetime::FileTime;
use std::fs;

const UPDATE_HINT: &str = "; run the update pipeline first";

/// Which required artifacts a verification stage checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactScope {
    /// Only artifacts produced by the build and staging stages.
    Staged,
    /// Every required artifact, including static inputs.
    All,
}

impl ArtifactScope {
    /// Returns true when `artifact` falls inside this scope.
    #[must_use]
    pub fn includes(self, artifact: &RequiredArtifact) -> bool {
        match self {
            Self::All => true,
            Self::Staged => artifact.origin == ArtifactOrigin::Staged,
        }
    }
}

/// The stages a release pipeline is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStage {
    /// Remove and recreate the staging directory.
    CleanWorkspace,
    /// Clean and publish the project into the staging directory.
    BuildAndPublish,
    /// Copy the application icon into the publish output.
    CopyAuxiliaryAsset,
    /// Check that required files exist.
    VerifyRequiredFiles(ArtifactScope),
    /// Check that the installer compiler exists.
    VerifyExternalTool,
    /// Write the patched installer script.
    GenerateDynamicScript,
    /// Compile the patched installer script.
    InvokeInstallerCompiler,
}

impl BuiltinStage {
    /// Stable stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CleanWorkspace => "clean-workspace",
            Self::BuildAndPublish => "build-and-publish",
            Self::CopyAuxiliaryAsset => "copy-auxiliary-asset",
            Self::VerifyRequiredFiles(_) => "verify-required-files",
            Self::VerifyExternalTool => "verify-external-tool",
            Self::GenerateDynamicScript => "generate-dynamic-script",
            Self::InvokeInstallerCompiler => "invoke-installer-compiler",
        }
    }
}

impl Stage for BuiltinStage {
    fn name(&self) -> &str {
        BuiltinStage::name(*self)
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<()> {
        let config = run.config();
        match *self {
            Self::CleanWorkspace => {
                clean_workspace(config)?;
                run.report(format!("Recreated {}", config.publish_dir));
            }
            Self::BuildAndPublish => {
                run.report(format!("Publishing {} ...", config.project_file));
                build_and_publish(config, run.executor())?;
                run.report(format!("Published to {}", config.publish_dir));
            }
            Self::CopyAuxiliaryAsset => {
                copy_auxiliary_asset(config)?;
                run.report(format!("Copied icon to {}", config.icon_destination));
            }
            Self::VerifyRequiredFiles(scope) => {
                let artifacts: Vec<&RequiredArtifact> = config
                    .required_artifacts
                    .iter()
                    .filter(|artifact| scope.includes(artifact))
                    .collect();
                verify_required_files(artifacts.iter().copied(), |path| path.exists())?;
                for artifact in artifacts {
                    run.report(format!("Found {}: {}", artifact.description, artifact.path));
                }
            }
            Self::VerifyExternalTool => {
                verify_external_tool(config)?;
                run.report(format!("Found installer compiler: {}", config.compiler));
            }
            Self::GenerateDynamicScript => {
                run.release_script()?;
                let script = generate_dynamic_script(config)?;
                let artifact_name = config.artifact_name();
                run.report(format!("Installer file name: {artifact_name}"));
                run.report(format!("Installer version: {}", config.installer_version()));
                run.store_script(script, artifact_name);
            }
            Self::InvokeInstallerCompiler => {
                let Some(script) = run.script_path() else {
                    return Err(PipelineError::StageOrder {
                        stage: Self::InvokeInstallerCompiler.name(),
                        requirement: "a patched installer script",
                    });
                };
                invoke_installer_compiler(config, run.executor(), script)?;
                run.report("Installer compiled");
            }
        }
        Ok(())
    }
}

/// Remove the staging directory and recreate the publish output directory.
///
/// # Errors
///
/// Returns [`PipelineError::Workspace`] if removal or creation fails.
pub fn clean_workspace(config: &PipelineConfig) -> Result<()> {
    if config.staging_dir.exists() {
        fs::remove_dir_all(&config.staging_dir).map_err(|source| PipelineError::Workspace {
            path: config.staging_dir.clone(),
            source,
        })?;
        log::debug!("removed {}", config.staging_dir);
    }

    fs::create_dir_all(&config.publish_dir).map_err(|source| PipelineError::Workspace {
        path: config.publish_dir.clone(),
        source,
    })
}

/// Clean the project, then publish it into the publish output directory.
///
/// Both commands run with the project directory as their working directory;
/// the process's own working directory is never changed.
///
/// # Errors
///
/// Returns [`PipelineError::ProjectNotFound`] if the project directory is
/// missing, [`PipelineError::BuildFailed`] if either command exits
/// unsuccessfully, or [`PipelineError::ToolLaunch`] if the build tool cannot
/// be started.
pub fn build_and_publish(config: &PipelineConfig, executor: &dyn CommandExecutor) -> Result<()> {
    if !config.project_dir.is_dir() {
        return Err(PipelineError::ProjectNotFound {
            path: config.project_dir.clone(),
        });
    }

    for invocation in build_invocations(config) {
        let step = format!("{} {}", invocation.program, invocation.args.join(" "));
        invoke(executor, &invocation).map_err(|err| as_build_failure(err, &invocation))?;
        log::debug!("{step} succeeded");
    }
    Ok(())
}

/// The clean and publish invocations, in order.
#[must_use]
pub fn build_invocations(config: &PipelineConfig) -> [Invocation; 2] {
    let project = config.project_file.as_str();
    let configuration = config.build_configuration.as_str();
    [
        Invocation::new(&config.build_tool, ["clean", project, "-c", configuration])
            .in_dir(&config.project_dir),
        Invocation::new(
            &config.build_tool,
            [
                "publish",
                project,
                "-c",
                configuration,
                "-o",
                config.publish_dir.as_str(),
            ],
        )
        .in_dir(&config.project_dir),
    ]
}

fn as_build_failure(err: PipelineError, invocation: &Invocation) -> PipelineError {
    match err {
        PipelineError::ExternalToolFailed { diagnostic, .. } => PipelineError::BuildFailed {
            step: format!(
                "{} {}",
                invocation.program,
                invocation.args.first().map_or("", String::as_str)
            ),
            reason: diagnostic,
        },
        other => other,
    }
}

/// Copy the icon from the project into the publish output, keeping its
/// access and modification times.
///
/// # Errors
///
/// Returns [`PipelineError::AssetNotFound`] if the icon is missing, or an I/O
/// error if copying fails.
pub fn copy_auxiliary_asset(config: &PipelineConfig) -> Result<()> {
    let source = &config.icon_source;
    let destination = &config.icon_destination;

    if !source.is_file() {
        return Err(PipelineError::AssetNotFound {
            path: source.clone(),
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;

    let metadata = fs::metadata(source)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;
    Ok(())
}

/// Check artifacts in order and fail on the first one `exists` rejects.
///
/// Artifacts after the first missing one are not checked.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] naming the first missing path.
/// Artifacts produced by the build carry a hint to run the update pipeline.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use release_installer::config::{ArtifactOrigin, RequiredArtifact};
/// use release_installer::stages::verify_required_files;
///
/// let artifacts = [RequiredArtifact::new("license file", Utf8PathBuf::from("LICENSE.txt"), ArtifactOrigin::Static)];
/// assert!(verify_required_files(&artifacts, |_| true).is_ok());
/// assert!(verify_required_files(&artifacts, |_| false).is_err());
/// ```
pub fn verify_required_files<'a, I, F>(artifacts: I, mut exists: F) -> Result<()>
where
    I: IntoIterator<Item = &'a RequiredArtifact>,
    F: FnMut(&Utf8Path) -> bool,
{
    for artifact in artifacts {
        if !exists(&artifact.path) {
            let hint = match artifact.origin {
                ArtifactOrigin::Staged => UPDATE_HINT.to_owned(),
                ArtifactOrigin::Static => String::new(),
            };
            return Err(PipelineError::MissingArtifact {
                description: artifact.description.clone(),
                path: artifact.path.clone(),
                hint,
            });
        }
    }
    Ok(())
}

/// Check that the configured installer compiler exists.
///
/// # Errors
///
/// Returns [`PipelineError::ToolNotFound`] if it does not.
pub fn verify_external_tool(config: &PipelineConfig) -> Result<()> {
    if tool_exists(&config.compiler) {
        Ok(())
    } else {
        Err(PipelineError::ToolNotFound {
            path: config.compiler.clone(),
        })
    }
}

/// Write the patched installer script to the transient path.
///
/// # Errors
///
/// Propagates [`write_patched_script`] failures.
pub fn generate_dynamic_script(config: &PipelineConfig) -> Result<TransientScript> {
    let artifact_name = config.artifact_name();
    let installer_version = config.installer_version();
    let fields = PatchFields {
        artifact_name: &artifact_name,
        installer_version: installer_version.as_str(),
    };
    write_patched_script(&config.template, &config.transient_script, &fields)
}

/// Run the installer compiler on `script` from the working root.
///
/// # Errors
///
/// Returns [`PipelineError::ExternalToolFailed`] carrying the compiler's
/// diagnostic output if it exits unsuccessfully.
pub fn invoke_installer_compiler(
    config: &PipelineConfig,
    executor: &dyn CommandExecutor,
    script: &Utf8Path,
) -> Result<ProcessResult> {
    let invocation =
        Invocation::new(config.compiler.as_str(), [script.as_str()]).in_dir(&config.root);
    invoke(executor, &invocation)
}

#[cfg(test)]
#[path = "stages_tests.rs"]
mod tests;
