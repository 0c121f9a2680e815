use crate::host::Host;
use crate::models::RegistryConfig;
use crate::orchestrator::CommandRunner;
use crate::patch;
use anyhow::{Context, Result};

/// Drop npmrc lines that conflict with nvm or pin another registry
pub fn strip_conflicts(host: &Host, config: &RegistryConfig) -> Result<usize> {
    let npmrc = host.expand(&config.npmrc);
    let patterns = patch::compile_patterns(&config.strip_patterns)?;
    let removed = patch::strip_lines(&npmrc, &patterns)?;
    if removed > 0 {
        println!(
            "   ✓ removed {} conflicting line(s) from {}",
            removed,
            npmrc.display()
        );
    }
    Ok(removed)
}

/// Strip conflicts, set the canonical registry, and return the one npm reports
pub async fn normalize(
    runner: &dyn CommandRunner,
    host: &Host,
    config: &RegistryConfig,
    npm: &str,
) -> Result<String> {
    strip_conflicts(host, config)?;

    let set = host
        .command(npm)
        .args(["config", "set", "registry", config.url.as_str()]);
    runner
        .run_checked(&set)
        .await
        .context("Failed to set npm registry")?;

    let effective = current(runner, host, npm)
        .await
        .unwrap_or_else(|| config.url.clone());
    println!("   ✓ npm registry: {}", effective);
    Ok(effective)
}

/// Registry npm currently uses, if npm can tell
pub async fn current(runner: &dyn CommandRunner, host: &Host, npm: &str) -> Option<String> {
    let get = host.command(npm).args(["config", "get", "registry"]);
    match runner.run(&get).await {
        Ok(output) if output.success() => {
            let value = output.stdout.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        _ => None,
    }
}
