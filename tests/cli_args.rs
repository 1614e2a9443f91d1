// tests/cli_args.rs

use clap::Parser;
use tracing::Level;

use topoctl::cli::{CliArgs, LogLevel, OutputFormat};
use topoctl::logging::resolve_level;

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["topoctl"]).unwrap();

    assert_eq!(args.config, "Topoctl.toml");
    assert_eq!(args.output, OutputFormat::Text);
    assert!(args.partitions.is_empty());
    assert!(!args.batch);
    assert!(!args.dry_run);
}

#[test]
fn batch_flags_and_repeated_partitions() {
    let args = CliArgs::try_parse_from([
        "topoctl",
        "--config",
        "demos/Topoctl.toml",
        "--partition",
        "a",
        "--partition",
        "b",
        "--batch",
        "--cmds",
        ".run",
        ".config",
        "--output",
        "json",
        "--timeout",
        "5s",
    ])
    .unwrap();

    assert_eq!(args.partitions, vec!["a", "b"]);
    assert_eq!(args.cmds, vec![".run", ".config"]);
    assert_eq!(args.output, OutputFormat::Json);
    assert_eq!(args.timeout.as_deref(), Some("5s"));
    assert!(args.batch);
}

#[test]
fn unknown_output_format_is_rejected() {
    assert!(CliArgs::try_parse_from(["topoctl", "--output", "xml"]).is_err());
}

#[test]
fn cli_level_beats_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Debug), Some("error")), Level::DEBUG);
    assert_eq!(resolve_level(None, Some("warning")), Level::WARN);
    assert_eq!(resolve_level(None, Some(" TRACE ")), Level::TRACE);
    assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
    assert_eq!(resolve_level(None, None), Level::INFO);
}
