//! Conversion from product versions to NSIS installer versions.
//!
//! NSIS `VIProductVersion` requires exactly four dot-separated components,
//! while product versions are written with a zero-padded build number such as
//! `1.0.002`. [`InstallerVersion::from_product_version`] bridges the two.

use std::fmt;

/// Version used when the product version has an unexpected shape.
pub const DEFAULT_INSTALLER_VERSION: &str = "1.0.0.0";

/// A four-part installer version such as `1.0.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallerVersion(String);

impl InstallerVersion {
    /// Derive the installer version from a product version string.
    ///
    /// - Three components `A.B.C` become `A.B.<C without leading zeros>.0`.
    ///   A non-numeric `C` is kept as written.
    /// - Four components pass through unchanged.
    /// - Anything else yields [`DEFAULT_INSTALLER_VERSION`].
    ///
    /// # Examples
    ///
    /// ```
    /// use release_installer::version::InstallerVersion;
    ///
    /// assert_eq!(InstallerVersion::from_product_version("1.0.002").as_str(), "1.0.2.0");
    /// assert_eq!(InstallerVersion::from_product_version("1.0.abc").as_str(), "1.0.abc.0");
    /// assert_eq!(InstallerVersion::from_product_version("2.1.0.7").as_str(), "2.1.0.7");
    /// assert_eq!(InstallerVersion::from_product_version("5").as_str(), "1.0.0.0");
    /// ```
    #[must_use]
    pub fn from_product_version(product_version: &str) -> Self {
        let parts: Vec<&str> = product_version.split('.').collect();
        let formatted = match parts.as_slice() {
            [major, minor, build] => {
                let build = normalise_build(build).unwrap_or(build);
                format!("{major}.{minor}.{build}.0")
            }
            [_, _, _, _] => product_version.to_owned(),
            _ => DEFAULT_INSTALLER_VERSION.to_owned(),
        };
        Self(formatted)
    }

    /// Get the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strip leading zeros from an unsigned decimal build number.
///
/// Surrounding whitespace and a leading `+` are accepted. Returns `None` when
/// the component is not a plain non-negative integer.
fn normalise_build(build: &str) -> Option<&str> {
    let trimmed = build.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    match digits.trim_start_matches('0') {
        "" => Some("0"),
        significant => Some(significant),
    }
}

impl fmt::Display for InstallerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstallerVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero_padded_build("1.0.002", "1.0.2.0")]
    #[case::all_zero_build("1.0.000", "1.0.0.0")]
    #[case::unpadded_build("3.4.15", "3.4.15.0")]
    #[case::whitespace_padded_build("1.0. 007 ", "1.0.7.0")]
    #[case::plus_signed_build("1.0.+05", "1.0.5.0")]
    #[case::build_wider_than_u64(
        "1.0.0000123456789012345678901234567890",
        "1.0.123456789012345678901234567890.0"
    )]
    #[case::empty_build("1.0.", "1.0..0")]
    #[case::non_numeric_build("1.0.abc", "1.0.abc.0")]
    #[case::signed_build("1.0.-1", "1.0.-1.0")]
    #[case::four_components("1.2.3.4", "1.2.3.4")]
    #[case::four_components_kept_verbatim("1.0.002.0", "1.0.002.0")]
    #[case::two_components("1.0", "1.0.0.0")]
    #[case::five_components("1.2.3.4.5", "1.0.0.0")]
    #[case::empty("", "1.0.0.0")]
    fn formats_installer_version(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(InstallerVersion::from_product_version(input).as_str(), expected);
    }

    #[test]
    fn display_matches_inner_string() {
        let version = InstallerVersion::from_product_version("1.0.010");
        assert_eq!(version.to_string(), "1.0.10.0");
    }
}
