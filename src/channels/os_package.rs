use super::{ChannelError, Removal, RemovalChannel, SweepContext};
use async_trait::async_trait;

/// dpkg/apt package entries (Debian family only)
pub struct OsPackageChannel;

#[async_trait]
impl RemovalChannel for OsPackageChannel {
    fn name(&self) -> &'static str {
        "os package"
    }

    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String> {
        if ctx.host.resolve("dpkg").is_none() {
            tracing::debug!("dpkg not on PATH, skipping os package probe");
            return Vec::new();
        }

        let mut found = Vec::new();
        for package in &ctx.target.os_packages {
            let spec = ctx.host.command("dpkg").args(["-s", package.as_str()]);
            match ctx.runner.run(&spec).await {
                Ok(output) if output.success() && is_installed(&output.stdout) => {
                    found.push(package.clone());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(package = %package, error = %e, "dpkg query failed"),
            }
        }
        found
    }

    async fn remove(&self, ctx: &SweepContext<'_>, found: &[String]) -> Result<Removal, ChannelError> {
        let mut removed = Vec::new();
        let mut failures = Vec::new();

        let use_apt = ctx.host.resolve("apt-get").is_some();
        for package in found {
            let spec = if use_apt {
                ctx.host
                    .privileged("apt-get")
                    .args(["remove", "-y", package.as_str()])
            } else {
                ctx.host.privileged("dpkg").args(["-r", package.as_str()])
            };

            match ctx.runner.run_checked(&spec).await {
                Ok(_) => removed.push(package.clone()),
                Err(e) => failures.push(format!("{}: {}", package, e)),
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

/// `dpkg -s` also succeeds for removed-but-not-purged packages
fn is_installed(status_output: &str) -> bool {
    status_output
        .lines()
        .any(|line| line.starts_with("Status:") && line.contains("install ok installed"))
}
