//! Error types for the release pipeline.
//!
//! Every variant is fatal for the current run. Messages name the path or the
//! captured diagnostic text and, where the operator can act on it, a recovery
//! hint.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while running a release pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An expected input or build output is missing.
    #[error("{description} not found at {path}{hint}")]
    MissingArtifact {
        /// Human description of the artifact (for example "license file").
        description: String,
        /// Path that was checked.
        path: Utf8PathBuf,
        /// Recovery hint, already prefixed with a separator, or empty.
        hint: String,
    },

    /// The installer compiler executable is not installed where configured.
    #[error(
        "installer compiler not found at {path}; install NSIS from \
         https://nsis.sourceforge.io/Download or set `compiler` in release.toml"
    )]
    ToolNotFound {
        /// Configured compiler path.
        path: Utf8PathBuf,
    },

    /// A build toolchain command exited unsuccessfully.
    #[error("{step} failed: {reason}")]
    BuildFailed {
        /// Which build step failed (for example "dotnet publish").
        step: String,
        /// Captured diagnostic output.
        reason: String,
    },

    /// An external tool exited with a nonzero status.
    #[error("{program} exited with {}: {diagnostic}", exit_code_label(.code))]
    ExternalToolFailed {
        /// Program that was run.
        program: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured stderr, or stdout when stderr was empty.
        diagnostic: String,
    },

    /// An external tool could not be started at all.
    #[error("failed to launch {program}")]
    ToolLaunch {
        /// Program that could not be spawned.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The installer-script template does not exist.
    #[error("installer script template not found at {path}")]
    TemplateNotFound {
        /// Configured template path.
        path: Utf8PathBuf,
    },

    /// The installer-script template lacks a line the patcher must rewrite.
    #[error("installer script template {path} has no line starting with `{keyword}`")]
    TemplateFieldMissing {
        /// Template path.
        path: Utf8PathBuf,
        /// Line prefix that was not found.
        keyword: &'static str,
    },

    /// The icon or other auxiliary resource is missing from the project.
    #[error("auxiliary asset not found at {path}")]
    AssetNotFound {
        /// Expected source path of the asset.
        path: Utf8PathBuf,
    },

    /// The source project directory is missing.
    #[error("project directory not found at {path}")]
    ProjectNotFound {
        /// Expected project directory.
        path: Utf8PathBuf,
    },

    /// The staging workspace could not be cleaned or recreated.
    #[error("failed to prepare staging directory {path}")]
    Workspace {
        /// Directory being prepared.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// A stage needed state that an earlier stage did not produce.
    #[error("stage {stage} requires {requirement}")]
    StageOrder {
        /// Stage that could not run.
        stage: &'static str,
        /// What was missing.
        requirement: &'static str,
    },

    /// Release settings failed validation.
    #[error("invalid release settings: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// The release settings file could not be read or parsed.
    #[error("failed to load release settings from {path}: {reason}")]
    ConfigRead {
        /// Settings file path.
        path: Utf8PathBuf,
        /// Description of the read or parse error.
        reason: String,
    },

    /// A named stage failed and the pipeline was aborted.
    #[error("stage {stage} failed: {source}")]
    StageFailed {
        /// Name of the failing stage.
        stage: String,
        /// The stage's own error.
        #[source]
        source: Box<PipelineError>,
    },

    /// The operator interrupted the run.
    #[error("interrupted by user during stage {stage}")]
    Interrupted {
        /// Stage that was running or about to run.
        stage: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PipelineError {
    /// Returns the innermost stage error, unwrapping [`PipelineError::StageFailed`].
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::StageFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the name of the stage this error was attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage, .. } | Self::Interrupted { stage } => Some(stage.as_str()),
            _ => None,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit code (terminated by signal)".to_owned(),
        |code| format!("exit code {code}"),
    )
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_suggests_download_site() {
        let err = PipelineError::ToolNotFound {
            path: Utf8PathBuf::from("C:/NSIS/makensis.exe"),
        };
        let msg = err.to_string();
        assert!(msg.contains("C:/NSIS/makensis.exe"));
        assert!(msg.contains("nsis.sourceforge.io"));
    }

    #[test]
    fn external_tool_failure_includes_diagnostic_and_code() {
        let err = PipelineError::ExternalToolFailed {
            program: "makensis".to_owned(),
            code: Some(1),
            diagnostic: "syntax error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("makensis"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn external_tool_failure_without_code_mentions_signal() {
        let err = PipelineError::ExternalToolFailed {
            program: "dotnet".to_owned(),
            code: None,
            diagnostic: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn missing_artifact_appends_hint() {
        let err = PipelineError::MissingArtifact {
            description: "executable".to_owned(),
            path: Utf8PathBuf::from("publish/App.exe"),
            hint: "; run the update pipeline first".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "executable not found at publish/App.exe; run the update pipeline first"
        );
    }

    #[test]
    fn stage_failed_exposes_root_cause_and_stage() {
        let err = PipelineError::StageFailed {
            stage: "verify-external-tool".to_owned(),
            source: Box::new(PipelineError::ToolNotFound {
                path: Utf8PathBuf::from("makensis.exe"),
            }),
        };
        assert_eq!(err.stage(), Some("verify-external-tool"));
        assert!(matches!(
            err.root_cause(),
            PipelineError::ToolNotFound { .. }
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn workspace_error_preserves_source() {
        let err = PipelineError::Workspace {
            path: Utf8PathBuf::from("publish"),
            source: std::io::Error::other("permission denied"),
        };
        assert!(err.to_string().contains("publish"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
