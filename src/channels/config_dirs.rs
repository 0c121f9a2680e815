use super::{ChannelError, Removal, RemovalChannel, SweepContext};
use async_trait::async_trait;

/// Configuration/cache directories; each one is kept unless the operator confirms
pub struct ConfigDirChannel;

#[async_trait]
impl RemovalChannel for ConfigDirChannel {
    fn name(&self) -> &'static str {
        "config dirs"
    }

    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String> {
        ctx.target
            .config_dirs
            .iter()
            .map(|d| ctx.host.expand(d))
            .filter(|p| p.is_dir())
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    }

    async fn remove(&self, ctx: &SweepContext<'_>, found: &[String]) -> Result<Removal, ChannelError> {
        let mut removal = Removal::default();
        let mut failures = Vec::new();

        for dir in found {
            let question = format!("Delete configuration directory {}?", dir);
            match ctx.prompter.confirm(&question, false) {
                Ok(true) => match std::fs::remove_dir_all(dir) {
                    Ok(()) => removal.removed.push(dir.clone()),
                    Err(e) => failures.push(format!("{}: {}", dir, e)),
                },
                Ok(false) => removal.preserved.push(dir.clone()),
                Err(e) => {
                    tracing::warn!(dir = %dir, error = %e, "confirmation failed, keeping directory");
                    removal.preserved.push(dir.clone());
                }
            }
        }

        if failures.is_empty() {
            Ok(removal)
        } else {
            Err(ChannelError {
                channel: self.name().to_string(),
                failures,
                removed: removal.removed,
            })
        }
    }
}
