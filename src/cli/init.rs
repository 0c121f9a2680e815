use crate::host::Host;
use crate::models::InstallerConfig;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Write the default configuration file
pub fn run(config_path: Option<&Path>, force: bool) -> Result<()> {
    let host = Host::detect()?;
    let path = super::config_file(config_path, &host);

    if path.exists() && !force {
        println!(
            "{}",
            format!("⚠️  Config already exists: {}", path.display()).yellow()
        );
        println!("   Run with --force to overwrite");
        return Ok(());
    }

    InstallerConfig::default().save(&path)?;

    println!("{}", "✅ Config written".green().bold());
    println!("   {}", path.display());
    println!();
    println!("{}", "⏭️  Next Steps:".yellow().bold());
    println!("   1. Adjust target, candidate paths and registry if needed");
    println!("   2. Run: {}", "reinstaller install".cyan());

    Ok(())
}
