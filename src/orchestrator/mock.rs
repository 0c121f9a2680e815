//! Recording command runner for tests.
//!
//! Responses are matched against the rendered command line (`CommandSpec::display`)
//! by prefix; the first matching rule wins. Unmatched commands get the default
//! response, which is a successful empty output unless overridden.

use super::script_runner::{CommandOutput, CommandRunner, CommandSpec, RunError};
use async_trait::async_trait;
use std::sync::Mutex;

enum Response {
    Output(CommandOutput),
    NotFound,
}

/// A test-double that records commands and serves pre-configured outputs.
pub struct MockRunner {
    rules: Vec<(String, Response)>,
    default: CommandOutput,
    commands: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner {
            rules: Vec::new(),
            default: CommandOutput::ok(""),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Respond to commands starting with `prefix`
    pub fn on(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push((prefix.to_string(), Response::Output(output)));
        self
    }

    /// Commands starting with `prefix` fail to spawn
    pub fn missing(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Response::NotFound));
        self
    }

    /// Response for commands that match no rule
    pub fn otherwise(mut self, output: CommandOutput) -> Self {
        self.default = output;
        self
    }

    /// Rendered command lines, in execution order
    pub fn executed_commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Whether any executed command starts with `prefix`
    pub fn ran(&self, prefix: &str) -> bool {
        self.executed_commands().iter().any(|c| c.starts_with(prefix))
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let line = spec.display();
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(line.clone());
        }

        match self.rules.iter().find(|(prefix, _)| line.starts_with(prefix)) {
            Some((_, Response::Output(output))) => Ok(output.clone()),
            Some((_, Response::NotFound)) => Err(RunError::NotFound(spec.program_name().to_string())),
            None => Ok(self.default.clone()),
        }
    }
}
