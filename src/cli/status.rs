use crate::channels::{self, SweepContext};
use crate::host::Host;
use crate::models::{InstallerConfig, NVM_PROFILE_MARKER};
use crate::orchestrator::{CommandRunner, ScriptRunner};
use crate::prompt::FixedPrompter;
use crate::runtime::{self, nvm, registry};
use crate::{patch, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub channel: String,
    pub found: Vec<String>,
}

/// Read-only snapshot of everything the installer would touch
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub checked_at: String,
    pub os: String,
    pub shell: String,
    pub binary: String,
    pub resolved: Option<PathBuf>,
    pub channels: Vec<ChannelStatus>,
    pub node: Option<String>,
    pub node_satisfies_minimum: bool,
    pub nvm_dir: PathBuf,
    pub nvm_installed: bool,
    pub profile: PathBuf,
    pub profile_wired: bool,
    pub registry: Option<String>,
}

pub async fn collect(runner: &dyn CommandRunner, config: &InstallerConfig, host: &Host) -> StatusReport {
    let prompter = FixedPrompter(false);
    let ctx = SweepContext {
        runner,
        host,
        target: &config.target,
        runtime: &config.runtime,
        prompter: &prompter,
    };

    let found = channels::discover(&channels::default_channels(), &ctx).await;
    let node = runtime::detect(runner, host, &config.runtime).await;
    let nvm_dir = host.expand(&config.version_manager.install_dir);
    let profile = host.shell.profile_path(&host.home);

    let registry = if host.resolve(&config.runtime.package_manager).is_some() {
        registry::current(runner, host, &config.runtime.package_manager).await
    } else {
        None
    };

    StatusReport {
        checked_at: chrono::Local::now().to_rfc3339(),
        os: host.os.name().to_string(),
        shell: host.shell.name().to_string(),
        binary: config.target.binary.clone(),
        resolved: host.resolve(&config.target.binary),
        channels: found
            .into_iter()
            .map(|(channel, found)| ChannelStatus {
                channel: channel.to_string(),
                found,
            })
            .collect(),
        node_satisfies_minimum: node
            .as_ref()
            .map(|v| v.major >= config.runtime.min_major)
            .unwrap_or(false),
        node: node.map(|v| v.to_string()),
        nvm_installed: nvm::is_installed(&nvm_dir),
        nvm_dir,
        profile_wired: patch::contains_marker(&profile, NVM_PROFILE_MARKER),
        profile,
        registry,
    }
}

pub async fn run(config_path: Option<&Path>, json: bool) -> Result<()> {
    let (config, host) = super::load(config_path)?;
    let runner = ScriptRunner::new();
    let report = collect(&runner, &config, &host).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", format!("Status for: {}", report.binary).cyan().bold());
    println!();
    println!("   System:   {} / {}", report.os, report.shell);
    match &report.resolved {
        Some(path) => println!("   On PATH:  {}", path.display().to_string().green()),
        None => println!("   On PATH:  {}", "not found".yellow()),
    }

    println!();
    println!("{}", "📦 Installations:".cyan());
    for channel in &report.channels {
        if channel.found.is_empty() {
            println!("   {:<12} {}", channel.channel, "-".dimmed());
        } else {
            println!("   {:<12} {}", channel.channel, channel.found.join(", "));
        }
    }

    println!();
    println!("{}", "⚙️  Runtime:".cyan());
    let node = match (&report.node, report.node_satisfies_minimum) {
        (Some(v), true) => v.green(),
        (Some(v), false) => format!("{} (< {})", v, config.runtime.min_major).yellow(),
        (None, _) => "not found".yellow(),
    };
    println!("   Node.js:  {}", node);
    println!(
        "   nvm:      {} ({})",
        if report.nvm_installed { "installed".green() } else { "absent".dimmed() },
        report.nvm_dir.display()
    );
    println!(
        "   Profile:  {} ({})",
        if report.profile_wired { "wired".green() } else { "not wired".dimmed() },
        report.profile.display()
    );
    println!(
        "   Registry: {}",
        report.registry.as_deref().unwrap_or("unknown")
    );

    Ok(())
}
