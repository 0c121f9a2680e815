pub mod init;
pub mod install;
pub mod status;
pub mod uninstall;

use crate::host::Host;
use crate::models::InstallerConfig;
use crate::prompt::{FixedPrompter, Prompter, TerminalPrompter};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load config (explicit path or the default location) and detect the host
pub fn load(config_path: Option<&Path>) -> Result<(InstallerConfig, Host)> {
    let host = Host::detect()?;
    let path = config_file(config_path, &host);
    let config = InstallerConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((config, host))
}

pub fn config_file(config_path: Option<&Path>, host: &Host) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| InstallerConfig::default_path(&host.home))
}

/// `--yes` answers the run's confirmations; otherwise ask on the terminal
pub fn prompter(assume_yes: bool) -> Box<dyn Prompter> {
    if assume_yes {
        Box::new(FixedPrompter(true))
    } else {
        Box::new(TerminalPrompter)
    }
}

/// Config directories are only deleted with `--purge-config` or an explicit
/// answer; `--yes` alone keeps them without asking
pub fn config_prompter(assume_yes: bool, purge_config: bool) -> Box<dyn Prompter> {
    match (purge_config, assume_yes) {
        (true, _) => Box::new(FixedPrompter(true)),
        (false, true) => Box::new(FixedPrompter(false)),
        (false, false) => Box::new(TerminalPrompter),
    }
}
