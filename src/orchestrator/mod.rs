pub mod installer;
pub mod mock;
pub mod script_runner;

pub use installer::{
    print_summary, summary_lines, InstallOptions, InstallSummary, Installer, OptionalStatus, OptionalToolOutcome,
    Verification,
};
pub use mock::MockRunner;
pub use script_runner::{CommandOutput, CommandRunner, CommandSpec, RunError, ScriptRunner};
