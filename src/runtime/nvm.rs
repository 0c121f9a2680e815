use crate::host::Host;
use crate::models::{VersionManagerConfig, NVM_PROFILE_MARKER};
use crate::orchestrator::CommandRunner;
use crate::patch::{self, PatchOutcome, PatchResult};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slack on top of curl's own --max-time before the process is killed
const DOWNLOAD_GRACE: Duration = Duration::from_secs(15);

pub fn is_installed(nvm_dir: &Path) -> bool {
    nvm_dir.join("nvm.sh").is_file()
}

/// Fetch the pinned nvm release into its install directory
///
/// Returns `false` without touching the network when nvm is already there.
/// The archive is unpacked in a scratch directory next to the install
/// directory and moved into place with a rename, so a failed download never
/// leaves a half-populated NVM_DIR behind.
pub async fn install_manager(
    runner: &dyn CommandRunner,
    host: &Host,
    config: &VersionManagerConfig,
) -> Result<bool> {
    let nvm_dir = host.expand(&config.install_dir);
    if is_installed(&nvm_dir) {
        return Ok(false);
    }

    let parent = nvm_dir
        .parent()
        .with_context(|| format!("Invalid nvm directory: {}", nvm_dir.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let scratch = tempfile::Builder::new()
        .prefix(".nvm-download-")
        .tempdir_in(parent)
        .context("Failed to create download directory")?;
    let archive = scratch.path().join("nvm.tar.gz");
    let extract_dir = scratch.path().join("src");
    fs::create_dir_all(&extract_dir)?;

    let url = config.resolved_archive_url();
    let download = host
        .command("curl")
        .arg("-fsSL")
        .arg("--connect-timeout")
        .arg(config.connect_timeout_secs.to_string())
        .arg("--max-time")
        .arg(config.max_time_secs.to_string())
        .arg("-o")
        .arg(archive.to_string_lossy())
        .arg(url.clone())
        .timeout(Duration::from_secs(config.max_time_secs) + DOWNLOAD_GRACE)
        .label(format!("Downloading nvm {}...", config.version));
    runner
        .run_checked(&download)
        .await
        .with_context(|| format!("Failed to download nvm from {}", url))?;

    let extract = host
        .command("tar")
        .arg("-xzf")
        .arg(archive.to_string_lossy())
        .arg("-C")
        .arg(extract_dir.to_string_lossy());
    runner
        .run_checked(&extract)
        .await
        .context("Failed to extract nvm archive")?;

    let unpacked = find_unpacked_root(&extract_dir)?;

    // Leftover from an interrupted install (no nvm.sh)
    if nvm_dir.exists() {
        fs::remove_dir_all(&nvm_dir)
            .with_context(|| format!("Failed to clear incomplete {}", nvm_dir.display()))?;
    }
    fs::rename(&unpacked, &nvm_dir).with_context(|| {
        format!("Failed to move nvm into {}", nvm_dir.display())
    })?;

    tracing::debug!(dir = %nvm_dir.display(), version = %config.version, "nvm installed");
    Ok(true)
}

/// The archive holds a single `nvm-<version>/` directory
fn find_unpacked_root(extract_dir: &Path) -> Result<PathBuf> {
    if is_installed(extract_dir) {
        return Ok(extract_dir.to_path_buf());
    }

    for entry in fs::read_dir(extract_dir)? {
        let path = entry?.path();
        if path.is_dir() && is_installed(&path) {
            return Ok(path);
        }
    }

    anyhow::bail!("nvm archive does not contain nvm.sh")
}

/// Append the shell-specific nvm loader to the login shell's profile
pub fn wire_profile(host: &Host, nvm_dir: &Path) -> PatchResult<PatchOutcome> {
    let profile = host.shell.profile_path(&host.home);
    let block = host.shell.nvm_block(nvm_dir);
    patch::ensure_block(&profile, NVM_PROFILE_MARKER, &block)
}

/// Install `major` through nvm, make it the default, and return its bin directory
pub async fn install_runtime(
    runner: &dyn CommandRunner,
    host: &Host,
    nvm_dir: &Path,
    major: u64,
) -> Result<PathBuf> {
    let script = format!(
        ". \"$NVM_DIR/nvm.sh\" && nvm install {major} && nvm alias default {major} \
         && nvm use default >/dev/null && nvm which default"
    );

    let spec = host
        .command("bash")
        .arg("-c")
        .arg(script)
        .env("NVM_DIR", nvm_dir.to_string_lossy())
        .label(format!("Installing Node.js {} with nvm...", major));

    let output = runner
        .run_checked(&spec)
        .await
        .with_context(|| format!("nvm failed to install Node.js {}", major))?;

    let node = output
        .stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .context("nvm did not report the default Node.js path")?;

    let bin_dir = Path::new(node)
        .parent()
        .with_context(|| format!("Unexpected Node.js path from nvm: {}", node))?
        .to_path_buf();
    Ok(bin_dir)
}
