//! CLI argument definitions for the release installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::pipeline::PipelineKind;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Publish the application and package it into an NSIS installer.
#[derive(Parser, Debug)]
#[command(name = "release-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Publish the application and package it into an NSIS installer.\n\n",
    "The default pipeline cleans the staging directory, publishes the project ",
    "with dotnet, copies the application icon, verifies the required files, ",
    "writes a patched copy of the installer script, and compiles it with ",
    "makensis. The patched script is always deleted before the run ends.\n\n",
    "Settings are read from release.toml in the working root when present.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and package in one go:\n",
    "    $ release-installer\n\n",
    "  Refresh the published output without packaging:\n",
    "    $ release-installer update\n\n",
    "  Package previously published output:\n",
    "    $ release-installer installer\n\n",
    "  Preview the resolved configuration:\n",
    "    $ release-installer --dry-run",
))]
pub struct Cli {
    /// Pipeline to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Options shared by every pipeline.
    #[command(flatten)]
    pub run: RunArgs,
}

/// Available pipelines.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clean, publish, stage, verify, and compile the installer (default).
    All,

    /// Clean, publish, and stage the application without packaging it.
    Update,

    /// Package previously published output into an installer.
    Installer,
}

/// Options shared by every pipeline.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Working root containing the installer template [default: current directory].
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<Utf8PathBuf>,

    /// Settings file to read instead of release.toml in the working root.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Show the resolved configuration and stages, then exit.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Exit without waiting for Enter when attached to a terminal.
    #[arg(long, global = true)]
    pub no_pause: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

impl Cli {
    /// The pipeline selected on the command line; `all` when none is given.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use release_installer::cli::Cli;
    /// use release_installer::pipeline::PipelineKind;
    ///
    /// let cli = Cli::parse_from(["release-installer", "update"]);
    /// assert_eq!(cli.kind(), PipelineKind::Update);
    /// ```
    #[must_use]
    pub fn kind(&self) -> PipelineKind {
        match self.command {
            None | Some(Command::All) => PipelineKind::All,
            Some(Command::Update) => PipelineKind::Update,
            Some(Command::Installer) => PipelineKind::Installer,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
