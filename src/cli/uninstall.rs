use crate::orchestrator::{Installer, ScriptRunner};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Remove every known copy without reinstalling
pub async fn run(config_path: Option<&Path>, yes: bool, purge_config: bool, verbose: bool) -> Result<()> {
    let (config, host) = super::load(config_path)?;
    let runner = ScriptRunner::verbose(verbose);
    let prompter = super::prompter(yes);
    let config_prompter = super::config_prompter(yes, purge_config);

    println!(
        "{}",
        format!("🧹 Removing {}...", config.target.package).cyan().bold()
    );

    let report = Installer::new(&runner, prompter.as_ref(), &config, host)
        .with_config_prompter(config_prompter.as_ref())
        .uninstall()
        .await?;

    println!();
    if report.still_resolvable.is_none() && report.failed_channels().is_empty() {
        println!("{}", "✅ Uninstall complete!".green().bold());
    } else {
        println!(
            "{}",
            "⚠️  Uninstall finished with warnings (see above)".yellow().bold()
        );
    }

    let preserved: Vec<&String> = report.outcomes.iter().flat_map(|o| &o.preserved).collect();
    if !preserved.is_empty() {
        println!();
        println!("{}", "💡 Configuration kept:".yellow());
        for dir in preserved {
            println!("   {}", dir);
        }
    }

    Ok(())
}
