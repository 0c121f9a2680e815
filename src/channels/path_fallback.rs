use super::{remove_path, ChannelError, Removal, RemovalChannel, SweepContext};
use async_trait::async_trait;
use std::path::PathBuf;

/// Upper bound on shadowed copies removed in one sweep
pub const MAX_RESOLUTIONS: usize = 8;

/// Whatever PATH still resolves after the other channels ran
pub struct PathFallbackChannel;

#[async_trait]
impl RemovalChannel for PathFallbackChannel {
    fn name(&self) -> &'static str {
        "PATH"
    }

    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String> {
        ctx.host
            .resolve(&ctx.target.binary)
            .map(|p| vec![p.to_string_lossy().to_string()])
            .unwrap_or_default()
    }

    async fn remove(&self, ctx: &SweepContext<'_>, _found: &[String]) -> Result<Removal, ChannelError> {
        let mut removed = Vec::new();
        let mut failures = Vec::new();
        let mut attempted: Vec<PathBuf> = Vec::new();

        // Removing one copy can uncover the next one further down PATH
        while attempted.len() < MAX_RESOLUTIONS {
            let Some(path) = ctx.host.resolve(&ctx.target.binary) else {
                break;
            };
            if attempted.contains(&path) {
                failures.push(format!("{} still resolves after removal", path.display()));
                break;
            }
            attempted.push(path.clone());

            match remove_path(ctx, &path).await {
                Ok(()) => removed.push(path.to_string_lossy().to_string()),
                Err(e) => {
                    failures.push(e);
                    break;
                }
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
