//! CLI argument parsing tests

use clap::Parser;

use crate::{Cli, Commands, ConfigAction, DoctorsAction, GraphAction, OutputFormat};

#[test]
fn test_classify_joins_words() {
    let cli = Cli::try_parse_from(["medibot", "classify", "chest", "pain"]).unwrap();
    match cli.command {
        Commands::Classify { text } => assert_eq!(text.join(" "), "chest pain"),
        _ => panic!("expected classify"),
    }
    assert_eq!(cli.format, OutputFormat::Text);
    assert!(!cli.quiet);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "medibot",
        "doctors",
        "search",
        "Cardiology",
        "--top-k",
        "1",
        "--format",
        "json",
        "--catalog",
        "/tmp/doctors.json",
    ])
    .unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    assert_eq!(cli.catalog.as_deref(), Some(std::path::Path::new("/tmp/doctors.json")));
    match cli.command {
        Commands::Doctors {
            action: DoctorsAction::Search { query, top_k, mode },
        } => {
            assert_eq!(query, "Cardiology");
            assert_eq!(top_k, 1);
            assert!(mode.is_none());
        }
        _ => panic!("expected doctors search"),
    }
}

#[test]
fn test_search_defaults() {
    let cli = Cli::try_parse_from(["medibot", "doctors", "search", "skin"]).unwrap();
    match cli.command {
        Commands::Doctors {
            action: DoctorsAction::Search { top_k, .. },
        } => assert_eq!(top_k, 3),
        _ => panic!("expected doctors search"),
    }
}

#[test]
fn test_resolve_requires_utterance() {
    assert!(Cli::try_parse_from(["medibot", "resolve"]).is_err());
    assert!(Cli::try_parse_from(["medibot", "classify"]).is_err());
}

#[test]
fn test_graph_and_config_actions() {
    let cli = Cli::try_parse_from(["medibot", "graph", "symptoms"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Graph {
            action: GraphAction::Symptoms
        }
    ));

    let cli = Cli::try_parse_from(["medibot", "-q", "config", "set", "matcher.mode", "semantic"]).unwrap();
    assert!(cli.quiet);
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Set { .. }
        }
    ));
}

#[test]
fn test_unknown_format_rejected() {
    assert!(Cli::try_parse_from(["medibot", "--format", "xml", "doctor"]).is_err());
}
