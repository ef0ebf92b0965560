//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use zoomlod::{ConfigError, LodError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be loaded
    Config(ConfigError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to read a scenario file
    ScenarioRead { path: String, error: std::io::Error },
    /// Scenario file is not valid JSON for a scenario
    ScenarioParse {
        path: String,
        error: serde_json::Error,
    },
    /// A replayed step failed
    Replay { step: usize, error: LodError },
    /// Failed to serialize output
    Output(serde_json::Error),
}

impl CliError {
    /// Exit the process with an error message and status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::ScenarioParse { .. } = self {
            eprintln!();
            eprintln!("A scenario is a JSON object with a \"steps\" array, e.g.:");
            eprintln!("  {{\"steps\": [{{\"zoom\": 5, \"extent\": [0, 0, 100, 100]}}]}}");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::ScenarioRead { path, error } => {
                write!(f, "Failed to read scenario '{}': {}", path, error)
            }
            CliError::ScenarioParse { path, error } => {
                write!(f, "Invalid scenario '{}': {}", path, error)
            }
            CliError::Replay { step, error } => write!(f, "Step {} failed: {}", step, error),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::ScenarioRead { error, .. } => Some(error),
            CliError::ScenarioParse { error, .. } => Some(error),
            CliError::Replay { error, .. } => Some(error),
            CliError::Output(e) => Some(e),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}
