use clap::{ColorChoice, Parser, Subcommand};

use crate::config::logging::*;

#[derive(Parser, Debug)]
#[clap(author, version, color = ColorChoice::Always)]
pub struct Opts {
    #[clap(flatten)]
    pub logging_opts: LoggingOpts,

    #[clap(subcommand)]
    pub command: SubCommands,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    /// Decode a HAR file and summarize it
    Inspect(crate::inspect::InspectCommandConfig),
    /// Print the request timeline recorded in a HAR file
    Import(crate::import::ImportCommandConfig),
    /// Build a HAR file from a capture description
    Export(crate::export::ExportCommandConfig),
}

#[test]
fn test_parse_export() {
    let opts = Opts::parse_from([
        "harkit",
        "-d",
        "export",
        "--capture",
        "capture.yaml",
        "--output",
        "out.har",
        "--include-content",
    ]);

    assert_eq!(1, opts.logging_opts.debug);
    match opts.command {
        SubCommands::Export(export) => {
            assert!(export.include_content);
            assert_eq!(std::path::PathBuf::from("out.har"), export.output);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_logging_flags_conflict() {
    let result = Opts::try_parse_from(["harkit", "-w", "-e", "inspect", "--har", "a.har"]);
    assert!(result.is_err());
}
