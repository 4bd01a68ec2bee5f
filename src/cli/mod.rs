//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for SimArena.

use clap::{Parser, Subcommand};

use crate::api::{AgentRequest, CreateSimulationRequest, Depth, Language};

#[derive(Parser, Debug, Clone)]
#[command(name = "simarena")]
#[command(about = "SimArena simulation client")]
#[command(long_about = "Start multi-agent simulations and follow them live")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, default_value = "simarena.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List simulations
    List,

    /// Show one simulation
    Show {
        /// Simulation id
        id: String,
    },

    /// Start a simulation and follow it until it finishes
    Start(StartArgs),

    /// Follow a running simulation until it finishes
    Watch {
        /// Simulation id
        id: String,
    },

    /// Delete a simulation
    Delete {
        /// Simulation id
        id: String,
    },

    /// Show or change the interface language
    Locale {
        /// Language code to store (en, ru)
        code: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct StartArgs {
    /// What the simulation is about
    #[arg(long)]
    pub description: String,

    /// Situation the agents start from
    #[arg(long, default_value = "")]
    pub preconditions: String,

    /// Number of rounds
    #[arg(long, default_value_t = 3)]
    pub rounds: u32,

    /// Participant as NAME or NAME:ROLE, repeatable
    #[arg(long = "agent")]
    pub agents: Vec<AgentRequest>,

    /// Simulation language (en, ru); defaults to the interface language
    #[arg(long)]
    pub language: Option<Language>,

    /// Answer depth (shallow, medium, deep)
    #[arg(long, default_value = "medium")]
    pub depth: Depth,

    /// Only record the final result
    #[arg(long)]
    pub show_only_result: bool,
}

impl StartArgs {
    /// Build the create request, using `fallback_language` when none was given
    pub fn to_request(&self, fallback_language: Language) -> CreateSimulationRequest {
        CreateSimulationRequest {
            description: self.description.clone(),
            preconditions: self.preconditions.clone(),
            rounds: self.rounds,
            show_only_result: self.show_only_result,
            agents: self.agents.clone(),
            language: self.language.unwrap_or(fallback_language),
            depth: self.depth,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration to the config file
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self, configured: &str) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level
                .clone()
                .unwrap_or_else(|| configured.to_string())
        }
    }
}
