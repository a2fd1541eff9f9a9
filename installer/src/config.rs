//! Release settings and the immutable pipeline configuration.
//!
//! [`ReleaseSettings`] is the operator-editable part, read from an optional
//! `release.toml` at the working root. [`PipelineConfig`] resolves those
//! settings against the working root into every path the stages touch and is
//! passed by shared reference to each stage.

use crate::error::{PipelineError, Result};
use crate::version::InstallerVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Product name used when no settings file overrides it.
pub const DEFAULT_PRODUCT_NAME: &str = "CreateNewFile";

/// Product version used when no settings file overrides it.
pub const DEFAULT_PRODUCT_VERSION: &str = "1.0.002";

/// Build timestamp label used when no settings file overrides it.
pub const DEFAULT_BUILD_TIMESTAMP: &str = "20250930_1613";

/// Default location of the NSIS compiler on Windows.
pub const DEFAULT_COMPILER_PATH: &str = r"C:\Program Files (x86)\NSIS\makensis.exe";

/// Default build toolchain executable.
pub const DEFAULT_BUILD_TOOL: &str = "dotnet";

/// Default build configuration passed to the toolchain.
pub const DEFAULT_BUILD_CONFIGURATION: &str = "Release";

/// Name of the settings file looked up at the working root.
pub const SETTINGS_FILENAME: &str = "release.toml";

/// Name of the patched installer script written during a run.
pub const TRANSIENT_SCRIPT_FILENAME: &str = "temp_installer.nsi";

const STAGING_DIRNAME: &str = "publish";
const PUBLISH_DIRNAME: &str = "framework-dependent";
const RESOURCES_DIRNAME: &str = "Resources";
const LICENSE_FILENAME: &str = "LICENSE.txt";
const INSTALLER_EXTENSION: &str = "exe";
/// Extension of the published application binary.
pub const EXECUTABLE_EXTENSION: &str = "exe";

/// Operator-editable release settings.
///
/// Every field is optional in `release.toml`; omitted fields keep their
/// compiled default.
///
/// # Examples
///
/// ```
/// use release_installer::config::ReleaseSettings;
///
/// let settings = ReleaseSettings::parse("product_version = \"2.3.004\"\n")?;
/// assert_eq!(settings.product_version, "2.3.004");
/// assert_eq!(settings.product_name, "CreateNewFile");
/// # Ok::<(), release_installer::error::PipelineError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSettings {
    /// Product name; also the project, executable and icon base name.
    pub product_name: String,
    /// Human product version, for example `1.0.002`.
    pub product_version: String,
    /// Build timestamp label embedded in the installer file name.
    pub build_timestamp: String,
    /// Path to the NSIS compiler executable.
    pub compiler: Utf8PathBuf,
    /// Build toolchain executable.
    pub build_tool: String,
    /// Build configuration passed to the toolchain.
    pub build_configuration: String,
    /// Source project directory, relative to the working root.
    pub project_dir: Option<Utf8PathBuf>,
    /// Installer script template, relative to the working root.
    pub template: Option<Utf8PathBuf>,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            product_name: DEFAULT_PRODUCT_NAME.to_owned(),
            product_version: DEFAULT_PRODUCT_VERSION.to_owned(),
            build_timestamp: DEFAULT_BUILD_TIMESTAMP.to_owned(),
            compiler: Utf8PathBuf::from(DEFAULT_COMPILER_PATH),
            build_tool: DEFAULT_BUILD_TOOL.to_owned(),
            build_configuration: DEFAULT_BUILD_CONFIGURATION.to_owned(),
            project_dir: None,
            template: None,
        }
    }
}

impl ReleaseSettings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the text is not valid TOML
    /// or names an unknown key.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PipelineError::InvalidConfig {
            reason: format!("TOML parse error: {e}"),
        })
    }

    /// Read and parse a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigRead`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| PipelineError::ConfigRead {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
        Self::parse(&contents).map_err(|e| PipelineError::ConfigRead {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Load settings from an explicit path, from `release.toml` at the working
    /// root when it exists, or fall back to the compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigRead`] if a settings file exists but
    /// cannot be read or parsed. An explicit path that does not exist is an
    /// error; a missing `release.toml` is not.
    pub fn discover(root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = root.join(SETTINGS_FILENAME);
        if candidate.is_file() {
            log::debug!("loading release settings from {candidate}");
            return Self::load(&candidate);
        }

        log::debug!("no {SETTINGS_FILENAME} at {root}; using compiled defaults");
        Ok(Self::default())
    }

    /// Check the settings for values that would produce a broken installer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_label("product_name", &self.product_name)?;
        validate_label("build_timestamp", &self.build_timestamp)?;
        validate_product_version(&self.product_version)?;

        if self.build_tool.trim().is_empty() {
            return Err(invalid("build_tool must not be empty"));
        }
        if self.build_configuration.trim().is_empty() {
            return Err(invalid("build_configuration must not be empty"));
        }
        if self.compiler.as_str().is_empty() {
            return Err(invalid("compiler must not be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig {
        reason: reason.into(),
    }
}

/// Labels end up in file names, so they must be non-empty and free of path
/// separators.
fn validate_label(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    if value.contains(['/', '\\']) {
        return Err(invalid(format!(
            "{field} must not contain path separators: {value}"
        )));
    }
    Ok(())
}

fn validate_product_version(version: &str) -> Result<()> {
    let parts: Vec<&str> = version.split('.').collect();
    if !(2..=4).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
        return Err(invalid(format!(
            "product_version must have 2 to 4 non-empty dot-separated components: {version:?}"
        )));
    }
    Ok(())
}

/// Where a required artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// Produced by the build and staging stages.
    Staged,
    /// Checked-in input that no stage produces.
    Static,
}

/// A file that must exist before the installer is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredArtifact {
    /// Human description used in progress and error messages.
    pub description: String,
    /// Absolute or root-relative path of the artifact.
    pub path: Utf8PathBuf,
    /// Whether a stage produces the artifact.
    pub origin: ArtifactOrigin,
}

impl RequiredArtifact {
    /// Create a required artifact entry.
    #[must_use]
    pub fn new(description: impl Into<String>, path: Utf8PathBuf, origin: ArtifactOrigin) -> Self {
        Self {
            description: description.into(),
            path,
            origin,
        }
    }
}

/// Immutable configuration for one pipeline run.
///
/// All paths are resolved against the working root at construction time.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Product name.
    pub product_name: String,
    /// Human product version.
    pub product_version: String,
    /// Build timestamp label.
    pub build_timestamp: String,
    /// Working root that relative paths are resolved against.
    pub root: Utf8PathBuf,
    /// Source project directory.
    pub project_dir: Utf8PathBuf,
    /// Project file name inside [`Self::project_dir`].
    pub project_file: String,
    /// Staging directory removed and recreated by the clean stage.
    pub staging_dir: Utf8PathBuf,
    /// Publish output directory inside the staging directory.
    pub publish_dir: Utf8PathBuf,
    /// Icon inside the source project.
    pub icon_source: Utf8PathBuf,
    /// Icon destination inside the publish output.
    pub icon_destination: Utf8PathBuf,
    /// Installer script template.
    pub template: Utf8PathBuf,
    /// Well-known path of the patched installer script.
    pub transient_script: Utf8PathBuf,
    /// NSIS compiler executable.
    pub compiler: Utf8PathBuf,
    /// Build toolchain executable.
    pub build_tool: String,
    /// Build configuration passed to the toolchain.
    pub build_configuration: String,
    /// File extension of the produced installer.
    pub installer_extension: String,
    /// Files checked before compiling the installer, in check order.
    pub required_artifacts: Vec<RequiredArtifact>,
}

impl PipelineConfig {
    /// Resolve validated settings against the working root.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the settings fail
    /// [`ReleaseSettings::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use release_installer::config::{PipelineConfig, ReleaseSettings};
    ///
    /// let config = PipelineConfig::new(Utf8Path::new("/work/NSIS_installer"), ReleaseSettings::default())?;
    /// assert!(config.publish_dir.ends_with("publish/framework-dependent"));
    /// # Ok::<(), release_installer::error::PipelineError>(())
    /// ```
    pub fn new(root: &Utf8Path, settings: ReleaseSettings) -> Result<Self> {
        settings.validate()?;

        let ReleaseSettings {
            product_name,
            product_version,
            build_timestamp,
            compiler,
            build_tool,
            build_configuration,
            project_dir,
            template,
        } = settings;

        let project_dir = project_dir.map_or_else(
            || root.join("..").join(&product_name),
            |dir| root.join(dir),
        );
        let template = template.map_or_else(
            || root.join(format!("{product_name}_Installer.nsi")),
            |path| root.join(path),
        );
        let staging_dir = root.join(STAGING_DIRNAME);
        let publish_dir = staging_dir.join(PUBLISH_DIRNAME);
        let icon_filename = format!("{product_name}.ico");
        let icon_source = project_dir.join(RESOURCES_DIRNAME).join(&icon_filename);
        let icon_destination = publish_dir.join(RESOURCES_DIRNAME).join(&icon_filename);

        let required_artifacts = vec![
            RequiredArtifact::new(
                "executable",
                publish_dir.join(format!("{product_name}.{EXECUTABLE_EXTENSION}")),
                ArtifactOrigin::Staged,
            ),
            RequiredArtifact::new("icon file", icon_destination.clone(), ArtifactOrigin::Staged),
            RequiredArtifact::new(
                "license file",
                root.join(LICENSE_FILENAME),
                ArtifactOrigin::Static,
            ),
        ];

        Ok(Self {
            project_file: format!("{product_name}.csproj"),
            product_name,
            product_version,
            build_timestamp,
            root: root.to_owned(),
            project_dir,
            staging_dir,
            publish_dir,
            icon_source,
            icon_destination,
            template,
            transient_script: root.join(TRANSIENT_SCRIPT_FILENAME),
            compiler,
            build_tool,
            build_configuration,
            installer_extension: INSTALLER_EXTENSION.to_owned(),
            required_artifacts,
        })
    }

    /// Four-part version written into the installer script.
    #[must_use]
    pub fn installer_version(&self) -> InstallerVersion {
        InstallerVersion::from_product_version(&self.product_version)
    }

    /// File name of the installer the compiler produces.
    ///
    /// Follows `{product}_v{version}_Build_{timestamp}_Setup.{extension}`.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!(
            "{}_v{}_Build_{}_Setup.{}",
            self.product_name, self.product_version, self.build_timestamp, self.installer_extension
        )
    }
}
