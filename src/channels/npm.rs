use super::{ChannelError, Removal, RemovalChannel, SweepContext};
use async_trait::async_trait;

/// Global npm installs under every known package alias
pub struct NpmGlobalChannel;

#[async_trait]
impl RemovalChannel for NpmGlobalChannel {
    fn name(&self) -> &'static str {
        "npm global"
    }

    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String> {
        let npm = &ctx.runtime.package_manager;
        if ctx.host.resolve(npm).is_none() {
            tracing::debug!(npm = %npm, "package manager not on PATH, skipping probe");
            return Vec::new();
        }

        let mut found = Vec::new();
        for alias in &ctx.target.package_aliases {
            let spec = ctx
                .host
                .command(npm)
                .args(["list", "-g", "--depth=0", alias.as_str()]);

            match ctx.runner.run(&spec).await {
                Ok(output) if output.success() && output.stdout.contains(alias.as_str()) => {
                    found.push(alias.clone());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(alias = %alias, error = %e, "npm list failed"),
            }
        }
        found
    }

    async fn remove(&self, ctx: &SweepContext<'_>, found: &[String]) -> Result<Removal, ChannelError> {
        let npm = &ctx.runtime.package_manager;
        let mut removed = Vec::new();
        let mut failures = Vec::new();

        for alias in found {
            let plain = ctx
                .host
                .command(npm)
                .args(["uninstall", "-g", alias.as_str()])
                .label(format!("Uninstalling {}...", alias));

            let first = match ctx.runner.run_checked(&plain).await {
                Ok(_) => {
                    removed.push(alias.clone());
                    continue;
                }
                Err(e) => e,
            };
            tracing::debug!(alias = %alias, error = %first, "npm uninstall failed, retrying privileged");

            let privileged = ctx
                .host
                .privileged(npm)
                .args(["uninstall", "-g", alias.as_str()]);

            match ctx.runner.run_checked(&privileged).await {
                Ok(_) => removed.push(alias.clone()),
                Err(e) => failures.push(format!("npm uninstall -g {}: {}", alias, e)),
            }
        }

        if failures.is_empty() {
            Ok(Removal {
                removed,
                preserved: Vec::new(),
            })
        } else {
            Err(ChannelError {
                channel: self.name().to_string(),
                failures,
                removed,
            })
        }
    }
}
