//! Shared test utilities for the release pipeline.
//!
//! [`StubExecutor`] replays canned command results, optionally creating the
//! files a real tool would have produced. [`ReleaseWorkspace`] lays out a
//! throwaway working root with the directory structure the pipeline expects.

use crate::config::{PipelineConfig, ReleaseSettings};
use crate::error::{PipelineError, Result};
use crate::process::{CommandExecutor, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

/// Template used by [`ReleaseWorkspace::with_template`] callers that do not
/// care about the exact contents.
pub const SAMPLE_TEMPLATE: &str = concat!(
    "; App installer script\n",
    "; OutFile \"decoy.exe\"\n",
    "!define PRODUCT_NAME \"App\"\n",
    "!define PRODUCT_VERSION \"0.0.0.0\"\n",
    "Name \"${PRODUCT_NAME}\"\n",
    "OutFile \"old.exe\"\n",
    "Section \"Install\"\n",
    "SectionEnd\n",
);

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` (exit code 1) with the given stderr.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The invocation the stub expects next.
    pub invocation: Invocation,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    /// Files written when the call is made, standing in for tool output.
    pub creates: Vec<Utf8PathBuf>,
}

impl ExpectedCall {
    /// Expect `invocation` and report success.
    #[must_use]
    pub fn success(invocation: Invocation) -> Self {
        Self {
            invocation,
            result: Ok(success_output()),
            creates: Vec::new(),
        }
    }

    /// Expect `invocation` and report exit code 1 with `stderr`.
    #[must_use]
    pub fn failure(invocation: Invocation, stderr: &str) -> Self {
        Self {
            invocation,
            result: Ok(failure_output(stderr)),
            creates: Vec::new(),
        }
    }

    /// Write a placeholder file at `path` when the call is made.
    #[must_use]
    pub fn creating(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Expected invocations are consumed in order; any other invocation yields
/// [`PipelineError::StubMismatch`].
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    calls: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Invocations received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.calls.borrow_mut().push(invocation.clone());

        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PipelineError::StubMismatch {
                message: format!("unexpected invocation `{invocation}`"),
            });
        };

        if call.invocation != *invocation {
            return Err(PipelineError::StubMismatch {
                message: format!(
                    "expected `{}` in {:?}, got `{invocation}` in {:?}",
                    call.invocation, call.invocation.current_dir, invocation.current_dir
                ),
            });
        }

        for path in &call.creates {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, b"stub output")?;
        }

        call.result
    }
}

/// A temporary working root laid out like a real release checkout.
///
/// The product is `App`, version `1.0.002`, timestamp `20250101_0000`. The
/// working root is `<base>/NSIS_installer` and the project lives at
/// `<base>/App`. Nothing exists until the `with_*` helpers create it.
pub struct ReleaseWorkspace {
    _dir: TempDir,
    /// Temporary base directory.
    pub base: Utf8PathBuf,
    /// Working root the pipeline runs from.
    pub root: Utf8PathBuf,
    /// Configuration resolved against [`Self::root`].
    pub config: PipelineConfig,
}

impl ReleaseWorkspace {
    /// Create an empty working root.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created or is not UTF-8.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let base =
            Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("temp dir path not UTF-8");
        let root = base.join("NSIS_installer");
        fs::create_dir_all(&root).expect("failed to create working root");

        let settings = ReleaseSettings {
            product_name: "App".to_owned(),
            product_version: "1.0.002".to_owned(),
            build_timestamp: "20250101_0000".to_owned(),
            compiler: base.join("tools").join("makensis.exe"),
            ..ReleaseSettings::default()
        };
        let config = PipelineConfig::new(&root, settings).expect("valid test settings");

        Self {
            _dir: dir,
            base,
            root,
            config,
        }
    }

    /// Create a working root with every static input in place: project
    /// directory, icon, license, template, and compiler.
    #[must_use]
    pub fn complete() -> Self {
        let workspace = Self::new();
        workspace.with_project();
        workspace.with_icon();
        workspace.with_license();
        workspace.with_template(SAMPLE_TEMPLATE);
        workspace.with_compiler();
        workspace
    }

    /// Create the project directory and project file.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_project(&self) {
        write_file(
            &self.config.project_dir.join(&self.config.project_file),
            "<Project />",
        );
    }

    /// Create the icon inside the project.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_icon(&self) {
        write_file(&self.config.icon_source, "icon");
    }

    /// Create the license file at the working root.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_license(&self) {
        write_file(&self.root.join("LICENSE.txt"), "license");
    }

    /// Write the installer script template.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_template(&self, contents: &str) {
        write_file(&self.config.template, contents);
    }

    /// Create a placeholder compiler executable.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_compiler(&self) {
        write_file(&self.config.compiler, "makensis");
    }

    /// Populate the publish output as a successful build would.
    ///
    /// # Panics
    ///
    /// Panics on filesystem errors.
    pub fn with_published_output(&self) {
        write_file(&self.executable_path(), "exe");
        write_file(&self.config.icon_destination, "icon");
    }

    /// Path of the published executable.
    #[must_use]
    pub fn executable_path(&self) -> Utf8PathBuf {
        self.config.publish_dir.join("App.exe")
    }

    /// Expected calls for a successful clean and publish. The publish call
    /// creates the executable.
    #[must_use]
    pub fn successful_build_calls(&self) -> Vec<ExpectedCall> {
        let [clean, publish] = crate::stages::build_invocations(&self.config);
        vec![
            ExpectedCall::success(clean),
            ExpectedCall::success(publish).creating(self.executable_path()),
        ]
    }

    /// The compiler invocation for the patched script.
    #[must_use]
    pub fn compiler_invocation(&self) -> Invocation {
        Invocation::new(
            self.config.compiler.as_str(),
            [self.config.transient_script.as_str()],
        )
        .in_dir(&self.root)
    }
}

impl Default for ReleaseWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent directory");
    }
    fs::write(path, contents).expect("failed to write file");
}
