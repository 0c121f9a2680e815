use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use reinstaller::Result;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reinstaller")]
#[command(author = "Chris Cheng <chris.cheng@shopee.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Remove every copy of a CLI tool and reinstall it on a known-good runtime", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.config/reinstaller/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and live command output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove all known installations, ensure the runtime, install the latest version
    Install {
        /// Answer yes to confirmations; config directories are kept
        #[arg(short, long)]
        yes: bool,

        /// Delete configuration directories without asking
        #[arg(long)]
        purge_config: bool,

        /// Skip auxiliary tools
        #[arg(long)]
        skip_optional: bool,
    },

    /// Remove all known installations without reinstalling
    Uninstall {
        /// Answer yes to confirmations; config directories are kept
        #[arg(short, long)]
        yes: bool,

        /// Delete configuration directories without asking
        #[arg(long)]
        purge_config: bool,
    },

    /// Show where the tool is installed and the runtime state
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Write the default config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "reinstaller=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: failed to start runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    // Every unhandled failure ends up here
    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Install {
            yes,
            purge_config,
            skip_optional,
        } => {
            reinstaller::cli::install::run(config, yes, purge_config, skip_optional, cli.verbose).await?;
        }

        Commands::Uninstall { yes, purge_config } => {
            reinstaller::cli::uninstall::run(config, yes, purge_config, cli.verbose).await?;
        }

        Commands::Status { json } => {
            reinstaller::cli::status::run(config, json).await?;
        }

        Commands::Init { force } => {
            reinstaller::cli::init::run(config, force)?;
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "reinstaller", &mut io::stdout());
        }
    }

    Ok(())
}
