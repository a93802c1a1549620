//! Command-line interface, clap-based.

use clap::{Parser, Subcommand};

/// Crediflow — lending back-office engine.
#[derive(Debug, Parser)]
#[command(name = "crediflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enables verbose logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs the built-in lifecycle demo against in-memory backends.
    Demo {
        /// Webhook URL that receives the demo's automation events.
        #[arg(long)]
        webhook_url: Option<String>,
    },

    /// Prints a sample automation envelope for a given state name, for
    /// wiring external automations.
    Envelope {
        /// New-state name to embed in the sample payload.
        state: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_demo_subcommand() {
        let cli = Cli::parse_from(["crediflow", "demo", "--webhook-url", "https://example.com"]);
        match cli.command {
            Command::Demo { webhook_url } => {
                assert_eq!(webhook_url.as_deref(), Some("https://example.com"));
            }
            _ => panic!("expected Demo command"),
        }
    }

    #[test]
    fn cli_parses_envelope_subcommand() {
        let cli = Cli::parse_from(["crediflow", "--verbose", "envelope", "EN ESTUDIO"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Envelope { state } => assert_eq!(state, "EN ESTUDIO"),
            _ => panic!("expected Envelope command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
