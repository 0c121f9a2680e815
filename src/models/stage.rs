use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a convergence run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// OS family check
    Preflight,
    /// Discovery and removal of every known instance
    Removal,
    /// Auxiliary tools, best-effort
    OptionalTools,
    /// Runtime and version manager
    Runtime,
    /// Global install of the target package
    TargetInstall,
    /// PATH resolution and version probe
    Verify,
    /// Final report
    Summary,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Preflight => "Preflight",
            Stage::Removal => "Removal",
            Stage::OptionalTools => "Optional tools",
            Stage::Runtime => "Runtime",
            Stage::TargetInstall => "Target install",
            Stage::Verify => "Verify",
            Stage::Summary => "Summary",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Stage::Preflight => "🔍",
            Stage::Removal => "🧹",
            Stage::OptionalTools => "🧰",
            Stage::Runtime => "⚙️ ",
            Stage::TargetInstall => "📦",
            Stage::Verify => "🔎",
            Stage::Summary => "✅",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that end a convergence run
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error("Aborted: {0}")]
    Cancelled(String),
}

impl InstallError {
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        InstallError::Stage {
            stage,
            message: message.into(),
        }
    }

    /// Stage the run stopped in, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            InstallError::Stage { stage, .. } => Some(*stage),
            InstallError::Cancelled(_) => None,
        }
    }
}
