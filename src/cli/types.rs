//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::config::ConfigCommands;
use super::commands::evaluate::EvaluateArgs;

#[derive(Parser)]
#[command(name = "hostwarden")]
#[command(about = "hostwarden - host failure detection, recovery and fencing", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to hostwarden.yaml and hostwarden.local.yaml)
    #[arg(short, long, global = true, env = "HOSTWARDEN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run evaluation cycles against a simulated cluster
    Evaluate(EvaluateArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "hostwarden",
            "evaluate",
            "--fixture",
            "cluster.yaml",
            "--host",
            "kvm-01,kvm-02",
            "--rounds",
            "3",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.hosts, vec!["kvm-01", "kvm-02"]);
                assert_eq!(args.rounds, 3);
                assert!(!args.live_agent);
            }
            Commands::Config(_) => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_parse_config_show() {
        let cli =
            Cli::try_parse_from(["hostwarden", "config", "show", "--cluster", "rack-a"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Show { cluster }) => {
                assert_eq!(cluster.as_deref(), Some("rack-a"));
            }
            Commands::Evaluate(_) => panic!("expected config show"),
        }
    }
}
