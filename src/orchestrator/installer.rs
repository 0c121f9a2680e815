//! The convergence pipeline
//!
//! preflight → removal sweep → optional tools → runtime → target install →
//! verify → summary. Removal, optional tools and verification only warn;
//! preflight, runtime and target install return [`InstallError`] and stop
//! the run.

use super::script_runner::CommandRunner;
use crate::channels::{self, RemovalChannel, SweepContext, SweepReport};
use crate::host::Host;
use crate::models::{InstallError, InstallerConfig, OptionalTool, Stage};
use crate::prompt::Prompter;
use crate::runtime::{self, RuntimeOutcome};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub skip_optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum OptionalStatus {
    Installed,
    AlreadyPresent,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionalToolOutcome {
    pub name: String,
    pub status: OptionalStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub path: PathBuf,
    pub version: Option<String>,
}

/// Final state of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub sweep: SweepReport,
    pub optional: Vec<OptionalToolOutcome>,
    pub runtime: RuntimeOutcome,
    pub verification: Option<Verification>,
    pub reload_hint: String,
}

pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    /// Answers the per-directory deletion questions of the sweep
    config_prompter: &'a dyn Prompter,
    config: &'a InstallerConfig,
    host: Host,
    channels: Vec<Box<dyn RemovalChannel>>,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        config: &'a InstallerConfig,
        host: Host,
    ) -> Self {
        Self {
            runner,
            prompter,
            config_prompter: prompter,
            config,
            host,
            channels: channels::default_channels(),
            options: InstallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Ask config-directory questions through a different prompter than the rest
    pub fn with_config_prompter(mut self, prompter: &'a dyn Prompter) -> Self {
        self.config_prompter = prompter;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    fn sweep_context(&self) -> SweepContext<'_> {
        SweepContext {
            runner: self.runner,
            host: &self.host,
            target: &self.config.target,
            runtime: &self.config.runtime,
            prompter: self.config_prompter,
        }
    }

    /// Run the whole pipeline
    pub async fn run(mut self) -> Result<InstallSummary, InstallError> {
        self.preflight()?;

        stage_header(Stage::Removal);
        let sweep = self.remove_all().await;

        stage_header(Stage::OptionalTools);
        let optional = if self.options.skip_optional {
            println!("   skipped (--skip-optional)");
            Vec::new()
        } else {
            self.install_optional_tools().await
        };

        stage_header(Stage::Runtime);
        let runtime = runtime::ensure(self.runner, &mut self.host, self.config)
            .await
            .map_err(|e| InstallError::stage(Stage::Runtime, format!("{:#}", e)))?;

        stage_header(Stage::TargetInstall);
        self.install_target().await?;

        stage_header(Stage::Verify);
        let verification = self.verify().await;

        let summary = InstallSummary {
            sweep,
            optional,
            runtime,
            verification,
            reload_hint: self.host.shell.reload_hint(&self.host.home),
        };
        print_summary(&summary, &self.config.target.binary);
        Ok(summary)
    }

    /// Preflight and removal only
    pub async fn uninstall(&self) -> Result<SweepReport, InstallError> {
        self.preflight()?;
        stage_header(Stage::Removal);
        Ok(self.remove_all().await)
    }

    /// Stop on an unsupported OS unless the operator wants to go on
    pub fn preflight(&self) -> Result<(), InstallError> {
        stage_header(Stage::Preflight);
        let os = &self.host.os;
        if os.is_supported() {
            println!("   ✓ {} / {}", os.name(), self.host.shell.name());
            return Ok(());
        }

        println!(
            "{}",
            format!("   ⚠️  Unsupported operating system: {}", os.name()).yellow()
        );
        let proceed = self
            .prompter
            .confirm("Continue on an unsupported operating system?", false)
            .map_err(|e| InstallError::stage(Stage::Preflight, e.to_string()))?;

        if proceed {
            Ok(())
        } else {
            Err(InstallError::Cancelled(format!(
                "unsupported operating system: {}",
                os.name()
            )))
        }
    }

    /// Best-effort removal through every channel
    pub async fn remove_all(&self) -> SweepReport {
        let ctx = self.sweep_context();
        let report = channels::sweep(&self.channels, &ctx).await;

        let failed = report.failed_channels();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|o| o.channel.as_str()).collect();
            println!(
                "{}",
                format!("   ⚠️  Some removals failed ({}), continuing", names.join(", ")).yellow()
            );
        }

        match &report.still_resolvable {
            Some(path) => {
                tracing::warn!(path = %path.display(), "target still resolvable after removal");
                println!(
                    "{}",
                    format!(
                        "   ⚠️  {} still resolves to {}; reinstalling over it",
                        self.config.target.binary,
                        path.display()
                    )
                    .yellow()
                );
            }
            None => println!(
                "   ✓ {} no longer on PATH ({} item(s) removed)",
                self.config.target.binary,
                report.removed_count()
            ),
        }

        report
    }

    /// Install auxiliary tools; failures are reported, never returned
    pub async fn install_optional_tools(&self) -> Vec<OptionalToolOutcome> {
        let mut outcomes = Vec::new();
        for tool in &self.config.optional_tools {
            let status = self.install_optional(tool).await;
            match &status {
                OptionalStatus::Installed => println!("   ✓ {} installed", tool.name),
                OptionalStatus::AlreadyPresent => println!("   ✓ {} already present", tool.name),
                OptionalStatus::Skipped(reason) => println!("   · {} skipped: {}", tool.name, reason),
                OptionalStatus::Failed(reason) => {
                    tracing::warn!(tool = %tool.name, error = %reason, "optional tool install failed");
                    println!(
                        "{}",
                        format!("   ⚠️  {} not installed: {}", tool.name, reason).yellow()
                    );
                }
            }
            outcomes.push(OptionalToolOutcome {
                name: tool.name.clone(),
                status,
            });
        }
        outcomes
    }

    async fn install_optional(&self, tool: &OptionalTool) -> OptionalStatus {
        if self.host.resolve(&tool.binary).is_some() {
            return OptionalStatus::AlreadyPresent;
        }
        if let Some(required) = &tool.requires {
            if self.host.resolve(required).is_none() {
                return OptionalStatus::Skipped(format!("{} not available", required));
            }
        }

        let spec = match tool.install.as_slice() {
            [] => return OptionalStatus::Skipped("no install command".to_string()),
            [sudo, program, rest @ ..] if sudo == "sudo" => {
                self.host.privileged(program).args(rest.iter().cloned())
            }
            [program, rest @ ..] => self.host.command(program).args(rest.iter().cloned()),
        };

        match self.runner.run_checked(&spec).await {
            Ok(_) => OptionalStatus::Installed,
            Err(e) => OptionalStatus::Failed(e.to_string()),
        }
    }

    async fn install_target(&self) -> Result<(), InstallError> {
        let target = &self.config.target;
        let spec = self
            .host
            .command(&self.config.runtime.package_manager)
            .args(["install", "-g"])
            .arg(format!("{}@latest", target.package))
            .label(format!("Installing {}@latest...", target.package));

        self.runner
            .run_checked(&spec)
            .await
            .map_err(|e| InstallError::stage(Stage::TargetInstall, e.to_string()))?;

        println!("   ✓ {}@latest installed", target.package);
        Ok(())
    }

    /// Resolve the target and ask for its version; problems are advisory
    pub async fn verify(&self) -> Option<Verification> {
        let binary = &self.config.target.binary;
        let Some(path) = self.host.resolve(binary) else {
            println!(
                "{}",
                format!("   ⚠️  {} was installed but is not on PATH", binary).yellow()
            );
            if let Some(prefix) = self.global_prefix().await {
                println!("   Add {}/bin to your PATH", prefix);
            }
            return None;
        };

        let spec = self.host.command(binary).arg("--version");
        let version = match self.runner.run(&spec).await {
            Ok(output) if output.success() => output
                .stdout
                .lines()
                .next()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            Ok(output) => {
                tracing::warn!(code = ?output.code, "target --version failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "target --version could not run");
                None
            }
        };

        match &version {
            Some(v) => println!("   ✓ {} → {}", path.display(), v),
            None => println!(
                "{}",
                format!("   ⚠️  {} found at {} but did not report a version", binary, path.display())
                    .yellow()
            ),
        }

        Some(Verification { path, version })
    }

    async fn global_prefix(&self) -> Option<String> {
        let spec = self
            .host
            .command(&self.config.runtime.package_manager)
            .args(["prefix", "-g"]);
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }
}

fn stage_header(stage: Stage) {
    println!();
    println!("{}", format!("{} {}", stage.emoji(), stage.name()).cyan().bold());
}

pub fn print_summary(summary: &InstallSummary, binary: &str) {
    stage_header(Stage::Summary);
    for line in summary_lines(summary, binary) {
        println!("{}", line);
    }
}

/// Summary body: where the target resolves, runtime, registry, reload instruction
pub fn summary_lines(summary: &InstallSummary, binary: &str) -> Vec<String> {
    let mut lines = Vec::new();
    match &summary.verification {
        Some(v) => {
            lines.push(format!("   Path:     {}", v.path.display().to_string().green()));
            if let Some(version) = &v.version {
                lines.push(format!("   Version:  {}", version.green()));
            }
        }
        None => lines.push(format!(
            "   Path:     {}",
            format!("{} not resolvable", binary).yellow()
        )),
    }
    lines.push(format!("   Node.js:  {}", summary.runtime.version));
    lines.push(format!("   Registry: {}", summary.runtime.registry));

    lines.push(String::new());
    lines.push(format!("{}", "⏭️  Reload your shell:".yellow().bold()));
    lines.push(format!("   {}", summary.reload_hint.cyan()));
    lines
}
