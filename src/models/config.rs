use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the config file, relative to the home directory
pub const DEFAULT_CONFIG_PATH: &str = ".config/reinstaller/config.toml";

/// Top-level installer configuration (config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// The CLI tool being reinstalled
    #[serde(default)]
    pub target: TargetConfig,

    /// JavaScript runtime requirements
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Version manager used when the runtime is missing or too old
    #[serde(default)]
    pub version_manager: VersionManagerConfig,

    /// Package registry normalization
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Auxiliary tools installed on a best-effort basis
    #[serde(default = "default_optional_tools")]
    pub optional_tools: Vec<OptionalTool>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            runtime: RuntimeConfig::default(),
            version_manager: VersionManagerConfig::default(),
            registry: RegistryConfig::default(),
            optional_tools: default_optional_tools(),
        }
    }
}

impl InstallerConfig {
    /// Load config from an explicit path, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: InstallerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config as pretty TOML
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the config path: explicit flag, else ~/.config/reinstaller/config.toml
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(DEFAULT_CONFIG_PATH)
    }
}

// =============================================================================
// Target
// =============================================================================

/// Where the target tool can live on a host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Executable name resolved on PATH
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Package installed with `npm install -g <package>@latest`
    #[serde(default = "default_package")]
    pub package: String,

    /// Every npm package name the tool has been published under
    #[serde(default = "default_package_aliases")]
    pub package_aliases: Vec<String>,

    /// Loose copies; `~` and glob wildcards are expanded
    #[serde(default = "default_candidate_paths")]
    pub candidate_paths: Vec<String>,

    /// dpkg/apt package names
    #[serde(default = "default_os_packages")]
    pub os_packages: Vec<String>,

    /// Configuration directories, removed only after confirmation
    #[serde(default = "default_config_dirs")]
    pub config_dirs: Vec<String>,
}

fn default_binary() -> String {
    "claude".to_string()
}

fn default_package() -> String {
    "@anthropic-ai/claude-code".to_string()
}

fn default_package_aliases() -> Vec<String> {
    vec![
        "@anthropic-ai/claude-code".to_string(),
        "@anthropic/claude-code".to_string(),
        "claude-code".to_string(),
    ]
}

fn default_candidate_paths() -> Vec<String> {
    vec![
        "/usr/local/bin/claude".to_string(),
        "/usr/bin/claude".to_string(),
        "/opt/homebrew/bin/claude".to_string(),
        "~/.local/bin/claude".to_string(),
        "~/.npm-global/bin/claude".to_string(),
        "~/.nvm/versions/node/*/bin/claude".to_string(),
        "/usr/local/lib/node_modules/@anthropic-ai/claude-code".to_string(),
        "~/.npm-global/lib/node_modules/@anthropic-ai/claude-code".to_string(),
        "~/.nvm/versions/node/*/lib/node_modules/@anthropic-ai/claude-code".to_string(),
    ]
}

fn default_os_packages() -> Vec<String> {
    vec!["claude-code".to_string(), "claude".to_string()]
}

fn default_config_dirs() -> Vec<String> {
    vec!["~/.claude".to_string(), "~/.config/claude".to_string()]
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            package: default_package(),
            package_aliases: default_package_aliases(),
            candidate_paths: default_candidate_paths(),
            os_packages: default_os_packages(),
            config_dirs: default_config_dirs(),
        }
    }
}

// =============================================================================
// Runtime & version manager
// =============================================================================

/// JavaScript runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime executable (default: "node")
    #[serde(default = "default_runtime_command")]
    pub command: String,

    /// Package manager executable (default: "npm")
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    /// Lowest major version reused as-is
    #[serde(default = "default_min_major")]
    pub min_major: u64,

    /// Major version installed through the version manager
    #[serde(default = "default_pinned_major")]
    pub pinned_major: u64,
}

fn default_runtime_command() -> String {
    "node".to_string()
}

fn default_package_manager() -> String {
    "npm".to_string()
}

fn default_min_major() -> u64 {
    20
}

fn default_pinned_major() -> u64 {
    22
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: default_runtime_command(),
            package_manager: default_package_manager(),
            min_major: default_min_major(),
            pinned_major: default_pinned_major(),
        }
    }
}

/// nvm release and placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManagerConfig {
    /// Release tag (e.g., "v0.40.1")
    #[serde(default = "default_nvm_version")]
    pub version: String,

    /// Archive URL; `{version}` is substituted
    #[serde(default = "default_nvm_archive_url")]
    pub archive_url: String,

    /// Install directory (NVM_DIR)
    #[serde(default = "default_nvm_dir")]
    pub install_dir: String,

    /// curl --connect-timeout, seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// curl --max-time, seconds
    #[serde(default = "default_max_time")]
    pub max_time_secs: u64,
}

fn default_nvm_version() -> String {
    "v0.40.1".to_string()
}

fn default_nvm_archive_url() -> String {
    "https://github.com/nvm-sh/nvm/archive/refs/tags/{version}.tar.gz".to_string()
}

fn default_nvm_dir() -> String {
    "~/.nvm".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_time() -> u64 {
    120
}

impl Default for VersionManagerConfig {
    fn default() -> Self {
        Self {
            version: default_nvm_version(),
            archive_url: default_nvm_archive_url(),
            install_dir: default_nvm_dir(),
            connect_timeout_secs: default_connect_timeout(),
            max_time_secs: default_max_time(),
        }
    }
}

impl VersionManagerConfig {
    /// Archive URL with the release tag filled in
    pub fn resolved_archive_url(&self) -> String {
        self.archive_url.replace("{version}", &self.version)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// npm registry normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Canonical registry URL
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// User npmrc file
    #[serde(default = "default_npmrc")]
    pub npmrc: String,

    /// Lines matching any of these patterns are removed from the npmrc
    #[serde(default = "default_strip_patterns")]
    pub strip_patterns: Vec<String>,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org/".to_string()
}

fn default_npmrc() -> String {
    "~/.npmrc".to_string()
}

fn default_strip_patterns() -> Vec<String> {
    // nvm refuses to run with prefix/globalconfig set
    vec![
        r"^\s*prefix\s*=".to_string(),
        r"^\s*globalconfig\s*=".to_string(),
        r"^\s*registry\s*=".to_string(),
    ]
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            npmrc: default_npmrc(),
            strip_patterns: default_strip_patterns(),
        }
    }
}

// =============================================================================
// Optional tools
// =============================================================================

/// Auxiliary tool installed best-effort before the runtime stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionalTool {
    /// Display name
    pub name: String,

    /// Executable that marks the tool as already present
    pub binary: String,

    /// Install command, program first
    pub install: Vec<String>,

    /// Command that must be on PATH for the install to be attempted
    #[serde(default)]
    pub requires: Option<String>,
}

fn default_optional_tools() -> Vec<OptionalTool> {
    vec![OptionalTool {
        name: "ripgrep".to_string(),
        binary: "rg".to_string(),
        install: vec![
            "sudo".to_string(),
            "apt-get".to_string(),
            "install".to_string(),
            "-y".to_string(),
            "ripgrep".to_string(),
        ],
        requires: Some("apt-get".to_string()),
    }]
}
