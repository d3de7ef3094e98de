//! Generation backend abstraction.
//!
//! The [`Generator`] trait decouples the orchestrator from the actual model
//! backend (currently a configurable CLI command). Tests use scripted
//! generators that return predetermined completions without spawning
//! processes.

use std::fmt;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::io::config::GeneratorConfig;
use crate::io::process::run_command_with_timeout;

/// Parameters for a single generation attempt.
#[derive(Debug, Clone)]
pub struct GenRequest {
    /// Prompt text to feed to the model.
    pub prompt: String,
    /// Hard time budget for this attempt.
    pub timeout: Duration,
    /// Truncate captured model output beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Why a generation attempt failed before its output could be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Backend could not be reached or exited unsuccessfully.
    Transport(String),
    /// The attempt exceeded its time budget. The child is killed, so it does
    /// not keep running past the caller's deadline.
    Timeout(Duration),
}

impl GenerateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Transport(_) => "transport",
            GenerateError::Timeout(_) => "timeout",
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Transport(detail) => write!(f, "transport failure: {detail}"),
            GenerateError::Timeout(budget) => {
                write!(f, "generation timed out after {budget:?}")
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Abstraction over model backends.
pub trait Generator {
    /// Run one generation attempt and return the raw completion text.
    fn generate(&self, request: &GenRequest) -> Result<String, GenerateError>;
}

/// Generator that spawns a configured CLI command, feeding the prompt on
/// stdin and reading the completion from stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: Vec<String>,
}

impl CommandGenerator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.command.clone())
    }
}

impl Generator for CommandGenerator {
    #[instrument(skip_all, fields(timeout_secs = request.timeout.as_secs(), prompt_bytes = request.prompt.len()))]
    fn generate(&self, request: &GenRequest) -> Result<String, GenerateError> {
        let Some(program) = self.command.first() else {
            return Err(GenerateError::Transport(
                "generator command is empty".to_string(),
            ));
        };
        info!(program = %program, "starting generation command");

        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]);

        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .map_err(|err| GenerateError::Transport(format!("{err:#}")))?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "generation timed out");
            return Err(GenerateError::Timeout(request.timeout));
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(exit_code = ?output.status.code(), "generation command failed");
            return Err(GenerateError::Transport(format!(
                "exit status {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        debug!(output_bytes = output.stdout.len(), "generation completed");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
