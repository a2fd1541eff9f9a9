//! Tests for release CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["release-installer"]);
    assert!(cli.command.is_none());
    assert_eq!(cli.kind(), PipelineKind::All);
    assert!(cli.run.root.is_none());
    assert!(cli.run.config.is_none());
    assert!(!cli.run.dry_run);
    assert!(!cli.run.json);
    assert!(!cli.run.no_pause);
    assert_eq!(cli.run.verbosity, 0);
    assert!(!cli.run.quiet);
}

#[rstest]
#[case::all("all", PipelineKind::All)]
#[case::update("update", PipelineKind::Update)]
#[case::installer("installer", PipelineKind::Installer)]
fn cli_maps_subcommands_to_pipelines(#[case] subcommand: &str, #[case] expected: PipelineKind) {
    let cli = Cli::parse_from(["release-installer", subcommand]);
    assert_eq!(cli.kind(), expected);
}

#[test]
fn cli_accepts_options_after_subcommand() {
    let cli = Cli::parse_from([
        "release-installer",
        "installer",
        "--root",
        "/work/NSIS_installer",
        "--no-pause",
        "--json",
    ]);
    assert_eq!(cli.command, Some(Command::Installer));
    assert_eq!(cli.run.root, Some(Utf8PathBuf::from("/work/NSIS_installer")));
    assert!(cli.run.no_pause);
    assert!(cli.run.json);
}

#[test]
fn cli_parses_config_path() {
    let cli = Cli::parse_from(["release-installer", "--config", "ci/release.toml"]);
    assert_eq!(cli.run.config, Some(Utf8PathBuf::from("ci/release.toml")));
}

#[rstest]
#[case::single(&["release-installer", "-v"], 1)]
#[case::double(&["release-installer", "-vv"], 2)]
#[case::long(&["release-installer", "--verbose", "--verbose"], 2)]
fn cli_counts_verbosity(#[case] args: &[&str], #[case] expected: u8) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.run.verbosity, expected);
}

#[test]
fn cli_rejects_quiet_with_verbose() {
    let result = Cli::try_parse_from(["release-installer", "-q", "-v"]);
    assert!(result.is_err());
}

#[test]
fn cli_rejects_unknown_subcommand() {
    let result = Cli::try_parse_from(["release-installer", "deploy"]);
    assert!(result.is_err());
}
