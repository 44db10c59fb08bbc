//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand};

/// Nightly infant sleep digest
///
/// Pulls the last night of sleep telemetry, asks a text model for a note to
/// the parent and publishes a summary.
#[derive(Parser, Debug)]
#[command(name = "zzzgram")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline once and print the result envelope
    Run(RunArgs),

    /// Log in and print telemetry only (no insight, no notification)
    Fetch(FetchArgs),

    /// Print the effective configuration with secrets redacted
    Config,

    /// Run diagnostics
    Doctor,

    /// Show version
    Version,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Hours of history to analyze (defaults to the configured lookback)
    #[arg(long)]
    pub hours_back: Option<u32>,

    /// Wrap the envelope in a serverless HTTP response
    #[arg(long)]
    pub lambda: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Hours of history to fetch (defaults to the configured lookback)
    #[arg(long)]
    pub hours_back: Option<u32>,

    /// Print the vendor payload as received, without normalization
    #[arg(long)]
    pub raw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from(["zzzgram", "run", "--hours-back", "12", "--lambda"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.hours_back, Some(12));
                assert!(args.lambda);
                assert!(!args.pretty);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_defaults() {
        let cli = Cli::try_parse_from(["zzzgram", "fetch"]).unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.hours_back, None);
                assert!(!args.raw);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_lookback() {
        assert!(Cli::try_parse_from(["zzzgram", "run", "--hours-back", "-3"]).is_err());
    }
}
