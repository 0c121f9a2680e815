//! Runtime prerequisite: a Node.js new enough to host the target
//!
//! An existing runtime at or above the minimum major is reused untouched.
//! Anything older (or no runtime at all) goes through nvm: the pinned major
//! is installed, made the default and put at the front of the run's PATH.

pub mod nvm;
pub mod registry;

use crate::host::Host;
use crate::models::{InstallerConfig, RuntimeConfig};
use crate::orchestrator::CommandRunner;
use crate::patch::PatchOutcome;
use anyhow::{Context, Result};
use colored::Colorize;
use semver::Version;
use serde::Serialize;

/// Parse `node --version` output ("v18.19.0")
pub fn parse_node_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    Version::parse(trimmed).ok()
}

/// Version of the runtime currently first on the run's PATH
pub async fn detect(runner: &dyn CommandRunner, host: &Host, config: &RuntimeConfig) -> Option<Version> {
    host.resolve(&config.command)?;

    let spec = host.command(&config.command).arg("--version");
    match runner.run(&spec).await {
        Ok(output) if output.success() => parse_node_version(&output.stdout),
        Ok(output) => {
            tracing::debug!(code = ?output.code, "runtime --version failed");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "runtime --version could not run");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeDecision {
    Reuse(Version),
    Install { found: Option<Version> },
}

pub fn decide(found: Option<Version>, min_major: u64) -> RuntimeDecision {
    match found {
        Some(version) if version.major >= min_major => RuntimeDecision::Reuse(version),
        found => RuntimeDecision::Install { found },
    }
}

/// What the runtime stage ended up with
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeOutcome {
    pub version: String,
    pub reused: bool,
    /// nvm archive was fetched during this run
    pub nvm_downloaded: bool,
    /// A profile block was appended during this run
    pub profile_patched: bool,
    pub registry: String,
}

/// Make sure a suitable runtime is the first one on PATH
pub async fn ensure(
    runner: &dyn CommandRunner,
    host: &mut Host,
    config: &InstallerConfig,
) -> Result<RuntimeOutcome> {
    let rt = &config.runtime;

    match decide(detect(runner, host, rt).await, rt.min_major) {
        RuntimeDecision::Reuse(version) => {
            println!(
                "   ✓ Node.js {} satisfies >= {}, reusing it",
                version.to_string().green(),
                rt.min_major
            );
            let registry = registry::normalize(runner, host, &config.registry, &rt.package_manager).await?;

            Ok(RuntimeOutcome {
                version: version.to_string(),
                reused: true,
                nvm_downloaded: false,
                profile_patched: false,
                registry,
            })
        }
        RuntimeDecision::Install { found } => {
            match &found {
                Some(v) => println!(
                    "   Node.js {} is older than {}, installing {} with nvm",
                    v.to_string().yellow(),
                    rt.min_major,
                    rt.pinned_major
                ),
                None => println!("   Node.js not found, installing {} with nvm", rt.pinned_major),
            }

            let vm = &config.version_manager;
            let nvm_dir = host.expand(&vm.install_dir);

            let nvm_downloaded = nvm::install_manager(runner, host, vm).await?;
            if nvm_downloaded {
                println!("   ✓ nvm {} installed in {}", vm.version, nvm_dir.display());
            } else {
                println!("   ✓ nvm already present in {}", nvm_dir.display());
            }

            let profile = host.shell.profile_path(&host.home);
            let profile_patched = nvm::wire_profile(host, &nvm_dir)? == PatchOutcome::Applied;
            if profile_patched {
                println!("   ✓ nvm wiring added to {}", profile.display());
            }

            // nvm refuses to run with a prefix set in npmrc
            registry::strip_conflicts(host, &config.registry)?;

            let bin_dir = nvm::install_runtime(runner, host, &nvm_dir, rt.pinned_major).await?;
            host.prepend_path(&bin_dir);

            let active = detect(runner, host, rt)
                .await
                .context("Node.js is not runnable after the nvm install")?;
            if active.major != rt.pinned_major {
                anyhow::bail!(
                    "Default Node.js reports {} after installing {}",
                    active,
                    rt.pinned_major
                );
            }
            println!("   ✓ Node.js {} is the default", active.to_string().green());

            let registry = registry::normalize(runner, host, &config.registry, &rt.package_manager).await?;

            Ok(RuntimeOutcome {
                version: active.to_string(),
                reused: false,
                nvm_downloaded,
                profile_patched,
                registry,
            })
        }
    }
}
