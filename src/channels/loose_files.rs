use super::{remove_path, ChannelError, Removal, RemovalChannel, SweepContext};
use async_trait::async_trait;
use std::path::Path;

/// Copies at fixed candidate paths (binaries, symlinks, package directories)
pub struct LooseFileChannel;

#[async_trait]
impl RemovalChannel for LooseFileChannel {
    fn name(&self) -> &'static str {
        "loose files"
    }

    async fn probe(&self, ctx: &SweepContext<'_>) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for candidate in &ctx.target.candidate_paths {
            for path in ctx.host.expand_existing(candidate) {
                let path = path.to_string_lossy().to_string();
                if !found.contains(&path) {
                    found.push(path);
                }
            }
        }
        found
    }

    async fn remove(&self, ctx: &SweepContext<'_>, found: &[String]) -> Result<Removal, ChannelError> {
        let mut removed = Vec::new();
        let mut failures = Vec::new();

        for path in found {
            match remove_path(ctx, Path::new(path)).await {
                Ok(()) => removed.push(path.clone()),
                Err(e) => failures.push(e),
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
