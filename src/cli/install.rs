use crate::orchestrator::{InstallOptions, Installer, ScriptRunner};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Run the full convergence pipeline
pub async fn run(
    config_path: Option<&Path>,
    yes: bool,
    purge_config: bool,
    skip_optional: bool,
    verbose: bool,
) -> Result<()> {
    let (config, host) = super::load(config_path)?;
    let runner = ScriptRunner::verbose(verbose);
    let prompter = super::prompter(yes);
    let config_prompter = super::config_prompter(yes, purge_config);

    println!(
        "{}",
        format!("🔄 Reinstalling {}...", config.target.package).cyan().bold()
    );

    let summary = Installer::new(&runner, prompter.as_ref(), &config, host)
        .with_config_prompter(config_prompter.as_ref())
        .with_options(InstallOptions { skip_optional })
        .run()
        .await?;

    tracing::debug!(
        removed = summary.sweep.removed_count(),
        runtime = %summary.runtime.version,
        "convergence finished"
    );

    println!();
    println!("{}", "✅ Reinstall complete!".green().bold());
    Ok(())
}
