use async_trait::async_trait;
use indicatif::{ProgressBar as IndicatifProgressBar, ProgressStyle};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// A single external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Kill the process if it runs longer than this
    pub timeout: Option<Duration>,
    /// Spinner message; no spinner when unset
    pub label: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
            label: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Program file name without its directory (e.g., "npm" for "/usr/bin/npm")
    pub fn program_name(&self) -> &str {
        std::path::Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// Shell-like rendering for logs and error messages
    pub fn display(&self) -> String {
        let mut out = self.program_name().to_string();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(char::is_whitespace) {
                out.push_str(&format!("'{}'", arg));
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; None when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Errors from running external commands
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Command '{0}' not found. Please ensure it is installed and in your PATH.")]
    NotFound(String),

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },

    #[error("Command '{command}' failed with exit code {code:?}\nStderr: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Executes external commands on behalf of the installer
///
/// `run` returns `Ok` for any exit status; only spawn failures and timeouts
/// are errors. `run_checked` additionally turns a non-zero exit into
/// [`RunError::Failed`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError>;

    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let output = self.run(spec).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(RunError::Failed {
                command: spec.display(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runner that spawns real processes
#[derive(Default)]
pub struct ScriptRunner {
    /// Stream command output to the terminal instead of showing a spinner
    verbose: bool,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    pub fn verbose(verbose: bool) -> Self {
        Self { verbose }
    }

    fn spinner(&self, spec: &CommandSpec) -> Option<IndicatifProgressBar> {
        if self.verbose {
            return None;
        }
        let label = spec.label.as_ref()?;

        let pb = IndicatifProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "))
        {
            pb.set_style(style);
        }
        pb.set_message(label.clone());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    async fn spawn_and_collect(
        &self,
        spec: &CommandSpec,
        progress: Option<&IndicatifProgressBar>,
    ) -> Result<CommandOutput, RunError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunError::NotFound(spec.program_name().to_string())
            } else {
                RunError::Spawn {
                    program: spec.program.clone(),
                    source: e,
                }
            }
        })?;

        let io_err = |source: std::io::Error| RunError::Spawn {
            program: spec.program.clone(),
            source,
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            io_err(std::io::Error::new(std::io::ErrorKind::Other, "stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            io_err(std::io::Error::new(std::io::ErrorKind::Other, "stderr not captured"))
        })?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let mut output = String::new();
        let mut stderr_output = String::new();
        let mut stdout_done = false;
        let mut stderr_done = false;

        // Drain both pipes concurrently to avoid backpressure deadlock
        while !stdout_done || !stderr_done {
            tokio::select! {
                line = stdout_reader.next_line(), if !stdout_done => {
                    match line.map_err(io_err)? {
                        Some(line) => {
                            if let Some(pb) = progress {
                                let short_line = if line.chars().count() > 60 {
                                    let truncated: String = line.chars().take(60).collect();
                                    format!("{}...", truncated)
                                } else {
                                    line.clone()
                                };
                                pb.set_message(short_line);
                            } else if self.verbose {
                                println!("{}", line);
                            }
                            output.push_str(&line);
                            output.push('\n');
                        }
                        None => stdout_done = true,
                    }
                }
                line = stderr_reader.next_line(), if !stderr_done => {
                    match line.map_err(io_err)? {
                        Some(line) => {
                            if self.verbose {
                                eprintln!("{}", line);
                            }
                            stderr_output.push_str(&line);
                            stderr_output.push('\n');
                        }
                        None => stderr_done = true,
                    }
                }
            }
        }

        let status = child.wait().await.map_err(io_err)?;

        Ok(CommandOutput {
            code: status.code(),
            stdout: output,
            stderr: stderr_output,
        })
    }
}

#[async_trait]
impl CommandRunner for ScriptRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let started = Instant::now();
        tracing::debug!(command = %spec.display(), "running");

        let progress = self.spinner(spec);
        let result = match spec.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.spawn_and_collect(spec, progress.as_ref())).await {
                    Ok(result) => result,
                    Err(_) => Err(RunError::TimedOut {
                        command: spec.display(),
                        secs: limit.as_secs(),
                    }),
                }
            }
            None => self.spawn_and_collect(spec, progress.as_ref()).await,
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        match &result {
            Ok(output) => tracing::debug!(
                command = %spec.display(),
                code = ?output.code,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished"
            ),
            Err(e) => tracing::debug!(command = %spec.display(), error = %e, "failed to run"),
        }

        result
    }
}
