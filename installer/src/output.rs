//! Output formatting for the release CLI.
//!
//! Progress lines, the closing summary, and dry-run plans are built here as
//! plain strings so they can be tested without a terminal.

use crate::config::PipelineConfig;
use crate::pipeline::{Pipeline, RunSummary};
use std::fmt;
use std::io::Write;

const BANNER_RULE: &str = "========================================";

/// Write one line to a progress stream, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Banner announcing stage `index` of `total`.
///
/// # Example
///
/// ```
/// use release_installer::output::stage_banner;
///
/// assert_eq!(stage_banner(2, 7, "build-and-publish"), "[2/7] build-and-publish");
/// ```
#[must_use]
pub fn stage_banner(index: usize, total: usize, name: &str) -> String {
    format!("[{index}/{total}] {name}")
}

/// Human-readable summary printed after a successful run.
#[must_use]
pub fn summary_text(summary: &RunSummary) -> String {
    let mut lines = vec![
        BANNER_RULE.to_owned(),
        format!("{} completed successfully", summary.pipeline),
        BANNER_RULE.to_owned(),
        format!("Product: {}", summary.product_name),
        format!(
            "Version: {} (installer {})",
            summary.product_version, summary.installer_version
        ),
        format!("Build timestamp: {}", summary.build_timestamp),
        format!("Publish output: {}", summary.publish_dir),
    ];

    if let Some(path) = &summary.artifact_path {
        lines.push(format!("Installer: {path}"));
    }

    lines.join("\n")
}

/// What a run would do, for `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use release_installer::config::{PipelineConfig, ReleaseSettings};
/// use release_installer::output::DryRunInfo;
/// use release_installer::pipeline::{Pipeline, PipelineKind};
///
/// let config = PipelineConfig::new(Utf8Path::new("/work"), ReleaseSettings::default())?;
/// let pipeline = Pipeline::for_kind(PipelineKind::Installer);
/// let info = DryRunInfo { config: &config, pipeline: &pipeline };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("invoke-installer-compiler"));
/// # Ok::<(), release_installer::error::PipelineError>(())
/// ```
#[derive(Clone, Copy)]
pub struct DryRunInfo<'a> {
    /// Resolved configuration.
    pub config: &'a PipelineConfig,
    /// Pipeline that would run.
    pub pipeline: &'a Pipeline,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Pipeline: {}", self.pipeline.name()),
            format!("Working root: {}", config.root),
            format!("Product: {}", config.product_name),
            format!(
                "Version: {} (installer {})",
                config.product_version,
                config.installer_version()
            ),
            format!("Build timestamp: {}", config.build_timestamp),
            format!("Project: {}", config.project_dir.join(&config.project_file)),
            format!("Publish output: {}", config.publish_dir),
            format!("Template: {}", config.template),
            format!("Installer compiler: {}", config.compiler),
            format!("Installer file name: {}", config.artifact_name()),
            String::new(),
            "Stages:".to_owned(),
        ];

        for (index, name) in self.pipeline.stage_names().iter().enumerate() {
            lines.push(format!("  {}. {name}", index + 1));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseSettings;
    use crate::pipeline::PipelineKind;
    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::{fixture, rstest};

    #[fixture]
    fn summary() -> RunSummary {
        RunSummary {
            pipeline: "build-all".to_owned(),
            product_name: "App".to_owned(),
            product_version: "1.0.002".to_owned(),
            installer_version: "1.0.2.0".to_owned(),
            build_timestamp: "20250101_0000".to_owned(),
            artifact: Some("App_v1.0.002_Build_20250101_0000_Setup.exe".to_owned()),
            artifact_path: Some(Utf8PathBuf::from(
                "/work/App_v1.0.002_Build_20250101_0000_Setup.exe",
            )),
            publish_dir: Utf8PathBuf::from("/work/publish/framework-dependent"),
            stages: Vec::new(),
        }
    }

    #[rstest]
    fn summary_names_artifact_and_version(summary: RunSummary) {
        let text = summary_text(&summary);
        assert!(text.contains("build-all completed successfully"));
        assert!(text.contains("Version: 1.0.002 (installer 1.0.2.0)"));
        assert!(text.contains("Build timestamp: 20250101_0000"));
        assert!(text.contains("Installer: /work/App_v1.0.002_Build_20250101_0000_Setup.exe"));
    }

    #[rstest]
    fn summary_omits_installer_without_artifact(mut summary: RunSummary) {
        summary.artifact = None;
        summary.artifact_path = None;
        let text = summary_text(&summary);
        assert!(!text.contains("Installer:"));
        assert!(text.contains("Publish output: /work/publish/framework-dependent"));
    }

    #[test]
    fn dry_run_lists_stages_in_order() {
        let config = PipelineConfig::new(Utf8Path::new("/work"), ReleaseSettings::default())
            .expect("default settings are valid");
        let pipeline = Pipeline::for_kind(PipelineKind::Update);
        let text = DryRunInfo {
            config: &config,
            pipeline: &pipeline,
        }
        .display_text();

        let stages: Vec<&str> = text
            .lines()
            .skip_while(|line| *line != "Stages:")
            .skip(1)
            .collect();
        assert_eq!(
            stages,
            [
                "  1. clean-workspace",
                "  2. build-and-publish",
                "  3. copy-auxiliary-asset",
                "  4. verify-required-files",
            ]
        );
        assert!(text.contains("Installer file name: CreateNewFile_v1.0.002_Build_20250930_1613_Setup.exe"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
