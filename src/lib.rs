// Reinstaller - Convergent installer for npm-distributed CLI tools
// Removes every known copy of a tool and reinstalls it on a known-good Node.js runtime

pub mod channels;
pub mod cli;
pub mod host;
pub mod models;
pub mod orchestrator;
pub mod patch;
pub mod prompt;
pub mod runtime;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use host::{Host, OsFamily};
pub use models::{InstallError, InstallerConfig, ShellKind, Stage};
pub use orchestrator::{CommandRunner, Installer, ScriptRunner};
