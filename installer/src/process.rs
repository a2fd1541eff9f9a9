//! External process invocation.
//!
//! Stages never change the process working directory. Each [`Invocation`]
//! carries the directory its child should run in, and every call goes through
//! the [`CommandExecutor`] seam so tests can substitute canned output.

use crate::error::{PipelineError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::process::{Command, Output};

/// Description of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run, either a bare name resolved via `PATH` or a path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Working directory of the child process; inherits when `None`.
    pub current_dir: Option<Utf8PathBuf>,
}

impl Invocation {
    /// Create an invocation that inherits the working directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_installer::process::Invocation;
    ///
    /// let invocation = Invocation::new("dotnet", ["clean", "App.csproj"]).in_dir("/src/App");
    /// assert_eq!(invocation.to_string(), "dotnet clean App.csproj");
    /// ```
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
        }
    }

    /// Run the child in `dir` instead of the inherited working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs the invocation to completion and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// Blocks until the child exits; no timeout is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        cmd.output().map_err(|source| PipelineError::ToolLaunch {
            program: invocation.program.clone(),
            source,
        })
    }
}

/// Captured result of a successful external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, when the platform reports one.
    pub code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl ProcessResult {
    fn from_output(output: &Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Trimmed stderr, or trimmed stdout when stderr is empty.
    ///
    /// Some toolchains (`dotnet` among them) report build errors on stdout.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Run an invocation and require a zero exit status.
///
/// # Errors
///
/// Returns [`PipelineError::ToolLaunch`] if the program cannot be started and
/// [`PipelineError::ExternalToolFailed`] carrying the captured diagnostic text
/// if it exits unsuccessfully.
pub fn invoke(executor: &dyn CommandExecutor, invocation: &Invocation) -> Result<ProcessResult> {
    match &invocation.current_dir {
        Some(dir) => log::debug!("running `{invocation}` in {dir}"),
        None => log::debug!("running `{invocation}`"),
    }

    let output = executor.run(invocation)?;
    let result = ProcessResult::from_output(&output);

    if !output.status.success() {
        log::debug!("`{}` failed with {:?}", invocation.program, result.code);
        return Err(PipelineError::ExternalToolFailed {
            program: invocation.program.clone(),
            code: result.code,
            diagnostic: result.diagnostic().to_owned(),
        });
    }

    Ok(result)
}

/// Returns true when `path` names an existing file.
#[must_use]
pub fn tool_exists(path: &Utf8Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{failure_output, success_output};
    use mockall::predicate::eq;

    fn compiler_invocation() -> Invocation {
        Invocation::new("makensis", ["temp_installer.nsi"]).in_dir("/work")
    }

    #[test]
    fn invoke_returns_captured_output_on_success() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .with(eq(compiler_invocation()))
            .times(1)
            .returning(|_| {
                let mut output = success_output();
                output.stdout = b"Output: \"App_Setup.exe\"".to_vec();
                Ok(output)
            });

        let result = invoke(&executor, &compiler_invocation()).expect("invoke should succeed");
        assert_eq!(result.code, Some(0));
        assert!(result.stdout.contains("App_Setup.exe"));
    }

    #[test]
    fn invoke_surfaces_stderr_on_failure() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_| Ok(failure_output("syntax error")));

        let err = invoke(&executor, &compiler_invocation()).expect_err("invoke should fail");
        match err {
            PipelineError::ExternalToolFailed {
                program,
                code,
                diagnostic,
            } => {
                assert_eq!(program, "makensis");
                assert_eq!(code, Some(1));
                assert_eq!(diagnostic, "syntax error");
            }
            other => panic!("expected ExternalToolFailed, got {other:?}"),
        }
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let result = ProcessResult {
            code: Some(1),
            stdout: "  error CS1002: ; expected\n".to_owned(),
            stderr: "\n".to_owned(),
        };
        assert_eq!(result.diagnostic(), "error CS1002: ; expected");
    }

    #[test]
    fn system_executor_reports_launch_failure() {
        let invocation = Invocation::new("release-installer-no-such-program", Vec::<String>::new());
        let err = SystemCommandExecutor
            .run(&invocation)
            .expect_err("spawning a missing program should fail");
        assert!(matches!(err, PipelineError::ToolLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_runs_in_requested_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let invocation = Invocation::new("pwd", Vec::<String>::new()).in_dir(path.clone());

        let result = invoke(&SystemCommandExecutor, &invocation).expect("pwd should run");
        let reported = Utf8PathBuf::from(result.stdout.trim());
        let expected = path.canonicalize_utf8().expect("canonical temp dir");
        assert_eq!(
            reported.canonicalize_utf8().expect("canonical pwd output"),
            expected
        );
    }

    #[test]
    fn display_joins_program_and_args() {
        let invocation = Invocation::new("dotnet", ["publish", "App.csproj", "-c", "Release"]);
        assert_eq!(invocation.to_string(), "dotnet publish App.csproj -c Release");
    }
}
