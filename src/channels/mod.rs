//! Removal channels
//!
//! A channel is one way the target tool can be present on a host. The sweep
//! probes and removes through every channel in order and never stops early:
//! a failing channel is reported and the next one runs.

pub mod config_dirs;
pub mod loose_files;
pub mod npm;
pub mod os_package;
pub mod path_fallback;

pub use config_dirs::ConfigDirChannel;
pub use loose_files::LooseFileChannel;
pub use npm::NpmGlobalChannel;
pub use os_package::OsPackageChannel;
pub use path_fallback::PathFallbackChannel;

use crate::host::Host;
use crate::models::{RuntimeConfig, TargetConfig};
use crate::orchestrator::CommandRunner;
use crate::prompt::Prompter;
use async_trait::async_trait;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a channel needs to look at and act on the host
pub struct SweepContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub host: &'a Host,
    pub target: &'a TargetConfig,
    pub runtime: &'a RuntimeConfig,
    pub prompter: &'a dyn Prompter,
}

/// What a successful removal did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub removed: Vec<String>,
    /// Found but intentionally kept (unconfirmed config directories)
    pub preserved: Vec<String>,
}

/// A channel that could not remove everything it found
#[derive(Debug, Clone, thiserror::Error)]
#[error("{channel}: {}", .failures.join("; "))]
pub struct ChannelError {
    pub channel: String,
    pub failures: Vec<String>,
    /// Instances that were removed before or after the failures
    pub removed: Vec<String>,
}

#[async_trait]
pub trait RemovalChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Instances of the target present through this channel
    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String>;

    /// Remove the probed instances
    async fn remove(&self, ctx: &SweepContext<'_>, found: &[String]) -> Result<Removal, ChannelError>;
}

/// Channels in sweep order
pub fn default_channels() -> Vec<Box<dyn RemovalChannel>> {
    vec![
        Box::new(NpmGlobalChannel),
        Box::new(LooseFileChannel),
        Box::new(OsPackageChannel),
        Box::new(PathFallbackChannel),
        Box::new(ConfigDirChannel),
    ]
}

/// Per-channel sweep result
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    pub found: Vec<String>,
    pub removed: Vec<String>,
    pub preserved: Vec<String>,
    pub failures: Vec<String>,
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a full removal sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub outcomes: Vec<ChannelOutcome>,
    /// Where the binary still resolves after the sweep
    pub still_resolvable: Option<PathBuf>,
}

impl SweepReport {
    pub fn failed_channels(&self) -> Vec<&ChannelOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded()).collect()
    }

    pub fn removed_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.removed.len()).sum()
    }

    pub fn outcome(&self, channel: &str) -> Option<&ChannelOutcome> {
        self.outcomes.iter().find(|o| o.channel == channel)
    }
}

/// Probe every channel without touching anything
pub async fn discover(
    channels: &[Box<dyn RemovalChannel>],
    ctx: &SweepContext<'_>,
) -> Vec<(&'static str, Vec<String>)> {
    let mut found = Vec::with_capacity(channels.len());
    for channel in channels {
        found.push((channel.name(), channel.probe(ctx).await));
    }
    found
}

/// Probe and remove through every channel, then re-check PATH resolution
pub async fn sweep(channels: &[Box<dyn RemovalChannel>], ctx: &SweepContext<'_>) -> SweepReport {
    let mut report = SweepReport::default();

    for channel in channels {
        let found = channel.probe(ctx).await;
        if found.is_empty() {
            println!("   {} {}: nothing found", "·".dimmed(), channel.name());
            report.outcomes.push(ChannelOutcome {
                channel: channel.name().to_string(),
                found,
                removed: Vec::new(),
                preserved: Vec::new(),
                failures: Vec::new(),
            });
            continue;
        }

        println!("   {} {}: {}", "→".cyan(), channel.name(), found.join(", "));

        let outcome = match channel.remove(ctx, &found).await {
            Ok(removal) => {
                for item in &removal.removed {
                    println!("     ✓ removed {}", item);
                }
                for item in &removal.preserved {
                    println!("     {} kept {}", "•".yellow(), item);
                }
                ChannelOutcome {
                    channel: channel.name().to_string(),
                    found,
                    removed: removal.removed,
                    preserved: removal.preserved,
                    failures: Vec::new(),
                }
            }
            Err(err) => {
                tracing::warn!(channel = channel.name(), error = %err, "removal channel failed");
                for item in &err.removed {
                    println!("     ✓ removed {}", item);
                }
                for failure in &err.failures {
                    println!("     {}", format!("⚠️  {}", failure).yellow());
                }
                ChannelOutcome {
                    channel: channel.name().to_string(),
                    found,
                    removed: err.removed,
                    preserved: Vec::new(),
                    failures: err.failures,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    report.still_resolvable = ctx.host.resolve(&ctx.target.binary);
    report
}

/// Delete a file, symlink or directory; retries with `sudo rm -rf` on permission errors
pub(crate) async fn remove_path(ctx: &SweepContext<'_>, path: &Path) -> Result<(), String> {
    let metadata = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(format!("{}: {}", path.display(), e)),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::debug!(path = %path.display(), "permission denied, retrying privileged");
            let spec = ctx
                .host
                .privileged("rm")
                .arg("-rf")
                .arg(path.to_string_lossy());
            ctx.runner
                .run_checked(&spec)
                .await
                .map(|_| ())
                .map_err(|e| format!("{}: {}", path.display(), e))
        }
        Err(e) => Err(format!("{}: {}", path.display(), e)),
    }
}
