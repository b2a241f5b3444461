use anyhow::Result;
use boxctl::cli::{self, ContainerCommand, RmArgs, Session, StartArgs, StopArgs};
use boxctl::infra::config::default_config_dir;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status for failures of boxctl itself, as opposed to the exit code of
/// an attached container process.
const EXIT_FAILURE: u8 = 125;

#[derive(Parser)]
#[command(
    name = "boxctl",
    version,
    about = "Start, stop, remove and prune containers in bulk"
)]
struct Cli {
    /// Configuration directory (default: ~/.config/boxctl)
    #[arg(long, global = true, env = "BOXCTL_CONFIG_DIR", default_value_os_t = default_config_dir())]
    config_dir: std::path::PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "BOXCTL_LOG", default_value = "warn")]
    log_level: String,

    /// Maximum number of containers processed in parallel
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start one or more containers
    Start(StartArgs),
    /// Stop one or more containers
    Stop(StopArgs),
    /// Remove one or more containers
    Rm(RmArgs),
    /// Manage containers
    Container {
        #[command(subcommand)]
        command: ContainerCommand,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let session = Session::new(&cli.config_dir, cli.max_workers)?;

    let report = match cli.command {
        Commands::Start(args) => session.start(args)?,
        Commands::Stop(args) => session.stop(args)?,
        Commands::Rm(args) => session.remove(args)?,
        Commands::Container { command } => match command {
            ContainerCommand::Prune => session.prune()?,
        },
    };

    cli::finish(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(EXIT_FAILURE)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
