use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel that guards the nvm block in shell profiles
pub const NVM_PROFILE_MARKER: &str = "# >>> reinstaller: nvm >>>";
const NVM_PROFILE_END: &str = "# <<< reinstaller: nvm <<<";

/// Login shell dialect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    Bash,
    Zsh,
    /// Not POSIX; nvm is reached through a bash wrapper function
    Fish,
}

impl Default for ShellKind {
    fn default() -> Self {
        ShellKind::Bash
    }
}

impl ShellKind {
    /// Detect from a $SHELL value; unknown shells get bash wiring
    pub fn from_shell_path(shell: &str) -> Self {
        let name = Path::new(shell)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(shell);

        match name {
            "zsh" => ShellKind::Zsh,
            "fish" => ShellKind::Fish,
            _ => ShellKind::Bash,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
        }
    }

    /// Startup file that receives the nvm wiring
    pub fn profile_path(&self, home: &Path) -> PathBuf {
        match self {
            ShellKind::Bash => home.join(".bashrc"),
            ShellKind::Zsh => home.join(".zshrc"),
            ShellKind::Fish => home.join(".config/fish/config.fish"),
        }
    }

    /// Marker-delimited block that loads nvm from `nvm_dir`
    pub fn nvm_block(&self, nvm_dir: &Path) -> String {
        let dir = nvm_dir.display();
        let body = match self {
            ShellKind::Bash => format!(
                "export NVM_DIR=\"{dir}\"\n\
                 [ -s \"$NVM_DIR/nvm.sh\" ] && \\. \"$NVM_DIR/nvm.sh\"\n\
                 [ -s \"$NVM_DIR/bash_completion\" ] && \\. \"$NVM_DIR/bash_completion\""
            ),
            ShellKind::Zsh => format!(
                "export NVM_DIR=\"{dir}\"\n\
                 [ -s \"$NVM_DIR/nvm.sh\" ] && \\. \"$NVM_DIR/nvm.sh\""
            ),
            ShellKind::Fish => format!(
                "set -gx NVM_DIR \"{dir}\"\n\
                 function nvm\n    \
                     bash -c \"source \\\"\\$NVM_DIR/nvm.sh\\\"; nvm $argv\"\n\
                 end\n\
                 set -l __nvm_default_node (bash -c 'source \"$NVM_DIR/nvm.sh\"; nvm which default' 2>/dev/null)\n\
                 if test -n \"$__nvm_default_node\"\n    \
                     fish_add_path -g (dirname $__nvm_default_node)\n\
                 end"
            ),
        };

        format!("{NVM_PROFILE_MARKER}\n{body}\n{NVM_PROFILE_END}\n")
    }

    /// Command the operator runs to pick up profile changes
    pub fn reload_hint(&self, home: &Path) -> String {
        match self {
            ShellKind::Bash | ShellKind::Zsh => {
                format!("source {}", self.profile_path(home).display())
            }
            // fish reads config.fish per interactive session
            ShellKind::Fish => "exec fish".to_string(),
        }
    }
}
