//! Installer-script template patching.
//!
//! The NSIS template is treated as opaque text apart from two lines: the
//! `OutFile` declaration and the `PRODUCT_VERSION` definition. Matching is
//! case-sensitive against the start of the line and only the first matching
//! line for each keyword is rewritten, so commented-out or indented copies and
//! later duplicates pass through untouched.

use crate::error::{PipelineError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Line prefix of the installer output declaration.
pub const OUTFILE_KEYWORD: &str = "OutFile ";

/// Line prefix of the product version definition.
pub const VERSION_KEYWORD: &str = "!define PRODUCT_VERSION ";

/// Values substituted into the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchFields<'a> {
    /// Installer file name written into the `OutFile` line.
    pub artifact_name: &'a str,
    /// Four-part version written into the `PRODUCT_VERSION` line.
    pub installer_version: &'a str,
}

/// Rewrite the two patched lines of `template`.
///
/// Lines are split on `\n`; a trailing `\r` on a rewritten line is kept so
/// CRLF templates stay CRLF.
///
/// # Errors
///
/// Returns [`PipelineError::TemplateFieldMissing`] if either keyword has no
/// matching line. `source` only labels the error.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use release_installer::template::{PatchFields, patch_template_text};
///
/// let fields = PatchFields { artifact_name: "App_Setup.exe", installer_version: "1.0.2.0" };
/// let patched = patch_template_text(
///     "OutFile \"old.exe\"\n!define PRODUCT_VERSION \"0.0.0.0\"\n",
///     &fields,
///     Utf8Path::new("App_Installer.nsi"),
/// )?;
/// assert_eq!(patched, "OutFile \"App_Setup.exe\"\n!define PRODUCT_VERSION \"1.0.2.0\"\n");
/// # Ok::<(), release_installer::error::PipelineError>(())
/// ```
pub fn patch_template_text(
    template: &str,
    fields: &PatchFields<'_>,
    source: &Utf8Path,
) -> Result<String> {
    let mut outfile_patched = false;
    let mut version_patched = false;

    let lines: Vec<String> = template
        .split('\n')
        .map(|line| {
            if !outfile_patched && line.starts_with(OUTFILE_KEYWORD) {
                outfile_patched = true;
                rewrite_line(line, &format!("OutFile \"{}\"", fields.artifact_name))
            } else if !version_patched && line.starts_with(VERSION_KEYWORD) {
                version_patched = true;
                rewrite_line(
                    line,
                    &format!("!define PRODUCT_VERSION \"{}\"", fields.installer_version),
                )
            } else {
                line.to_owned()
            }
        })
        .collect();

    if !outfile_patched {
        return Err(missing_field(source, OUTFILE_KEYWORD));
    }
    if !version_patched {
        return Err(missing_field(source, VERSION_KEYWORD));
    }

    Ok(lines.join("\n"))
}

fn rewrite_line(original: &str, replacement: &str) -> String {
    if original.ends_with('\r') {
        format!("{replacement}\r")
    } else {
        replacement.to_owned()
    }
}

fn missing_field(path: &Utf8Path, keyword: &'static str) -> PipelineError {
    PipelineError::TemplateFieldMissing {
        path: path.to_owned(),
        keyword: keyword.trim_end(),
    }
}

/// Read `template`, patch it, and write the result to `destination`.
///
/// Any previous file at `destination` is overwritten. The returned guard
/// deletes the written file when released or dropped.
///
/// # Errors
///
/// Returns [`PipelineError::TemplateNotFound`] if the template does not exist,
/// [`PipelineError::TemplateFieldMissing`] if it lacks a patched line (nothing
/// is written in that case), or an I/O error if reading or writing fails.
pub fn write_patched_script(
    template: &Utf8Path,
    destination: &Utf8Path,
    fields: &PatchFields<'_>,
) -> Result<TransientScript> {
    if !template.is_file() {
        return Err(PipelineError::TemplateNotFound {
            path: template.to_owned(),
        });
    }

    let contents = fs::read_to_string(template)?;
    let patched = patch_template_text(&contents, fields, template)?;

    let script = TransientScript::claim(destination.to_owned());
    fs::write(script.path(), patched)?;
    log::debug!("wrote patched installer script to {destination}");
    Ok(script)
}

/// Scoped ownership of the patched installer script.
///
/// The file is removed by [`TransientScript::release`] or, failing that, when
/// the guard is dropped, which also covers unwinding panics.
#[derive(Debug)]
pub struct TransientScript {
    path: Utf8PathBuf,
    released: bool,
}

impl TransientScript {
    /// Take ownership of `path`; the file is deleted when the guard goes away.
    #[must_use]
    pub fn claim(path: Utf8PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Path of the patched script.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Delete the file now.
    ///
    /// A file that is already gone counts as released.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file exists but cannot be removed.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_if_present(&self.path)
    }
}

impl Drop for TransientScript {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = remove_if_present(&self.path) {
            log::warn!("failed to remove transient script {}: {err}", self.path);
        }
    }
}

fn remove_if_present(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
