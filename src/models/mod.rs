pub mod config;
pub mod shell;
pub mod stage;

pub use config::{
    InstallerConfig, OptionalTool, RegistryConfig, RuntimeConfig, TargetConfig,
    VersionManagerConfig,
};
pub use shell::{ShellKind, NVM_PROFILE_MARKER};
pub use stage::{InstallError, Stage};
