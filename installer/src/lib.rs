//! Release installer library.
//!
//! This crate publishes a .NET application, stages its output, and packages it
//! into an NSIS installer through an ordered pipeline of named stages. It is
//! used by the `release-installer` CLI binary and can be driven
//! programmatically with a substitute [`process::CommandExecutor`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Release settings and resolved pipeline configuration
//! - [`error`] - Semantic error types with recovery hints
//! - [`interrupt`] - Operator interruption flag
//! - [`output`] - Progress, summary, and dry-run formatting
//! - [`pipeline`] - Stage sequencing and transient script cleanup
//! - [`process`] - External command invocation
//! - [`stages`] - Built-in release stages
//! - [`template`] - Installer script template patching
//! - [`version`] - Four-part installer version formatting

pub mod cli;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod stages;
pub mod template;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
