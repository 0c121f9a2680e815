//! Host environment as seen by a single run
//!
//! The run owns its own copy of PATH: when the version manager installs a
//! runtime, its bin directory is prepended here and every later command and
//! PATH lookup sees it.

use crate::models::ShellKind;
use crate::orchestrator::CommandSpec;
use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Operating system family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    MacOs,
    Other(String),
}

impl OsFamily {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => OsFamily::Linux,
            "macos" => OsFamily::MacOs,
            other => OsFamily::Other(other.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, OsFamily::Linux | OsFamily::MacOs)
    }

    pub fn name(&self) -> &str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
            OsFamily::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Host {
    pub home: PathBuf,
    pub shell: ShellKind,
    pub os: OsFamily,
    path: OsString,
}

impl Host {
    pub fn new(home: impl Into<PathBuf>, path: impl Into<OsString>, shell: ShellKind, os: OsFamily) -> Self {
        Self {
            home: home.into(),
            shell,
            os,
            path: path.into(),
        }
    }

    /// Build from the current process environment
    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        let path = std::env::var_os("PATH").unwrap_or_default();
        let shell = std::env::var("SHELL")
            .map(|s| ShellKind::from_shell_path(&s))
            .unwrap_or_default();

        Ok(Self::new(home, path, shell, OsFamily::current()))
    }

    /// Put `dir` at the front of PATH (no-op if it is already first)
    pub fn prepend_path(&mut self, dir: &Path) {
        let mut entries: Vec<PathBuf> = std::env::split_paths(&self.path).collect();
        if entries.first().map(|p| p == dir).unwrap_or(false) {
            return;
        }
        entries.retain(|p| p != dir);
        entries.insert(0, dir.to_path_buf());

        match std::env::join_paths(entries) {
            Ok(joined) => self.path = joined,
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "cannot add directory to PATH"),
        }
        tracing::debug!(dir = %dir.display(), "prepended to PATH");
    }

    /// First match for `binary` on the run's PATH
    pub fn resolve(&self, binary: &str) -> Option<PathBuf> {
        which::which_in(binary, Some(&self.path), &self.home).ok()
    }

    /// Expand a leading `~` against the run's home
    pub fn expand(&self, raw: &str) -> PathBuf {
        if raw == "~" {
            self.home.clone()
        } else if let Some(rest) = raw.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            PathBuf::from(raw)
        }
    }

    /// Expand `~` and glob wildcards, returning only paths that exist
    pub fn expand_existing(&self, raw: &str) -> Vec<PathBuf> {
        let expanded = self.expand(raw);
        let pattern = expanded.to_string_lossy();

        if !pattern.contains(['*', '?', '[']) {
            return if expanded.symlink_metadata().is_ok() {
                vec![expanded]
            } else {
                Vec::new()
            };
        }

        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "invalid candidate path pattern");
                Vec::new()
            }
        }
    }

    /// Command for `program`, resolved on the run's PATH, with PATH and HOME exported
    pub fn command(&self, program: &str) -> CommandSpec {
        let resolved = self
            .resolve(program)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string());

        CommandSpec::new(resolved)
            .env("PATH", self.path.to_string_lossy())
            .env("HOME", self.home.to_string_lossy())
    }

    /// Like [`Host::command`], wrapped in sudo when sudo exists
    ///
    /// sudo resets PATH, so the run's PATH is passed through `env` for
    /// programs that re-resolve interpreters (npm's `#!/usr/bin/env node`).
    pub fn privileged(&self, program: &str) -> CommandSpec {
        match self.resolve("sudo") {
            Some(_) => {
                let inner = self.command(program);
                self.command("sudo")
                    .arg("env")
                    .arg(format!("PATH={}", self.path.to_string_lossy()))
                    .arg(inner.program)
            }
            None => self.command(program),
        }
    }
}
