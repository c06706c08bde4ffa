use clap::{Parser, Subcommand};
use habitchain_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitchain", version, about = "Staked habit commitments")]
struct Cli {
    /// Address acting as the caller
    #[arg(long = "as", global = true, value_name = "ADDRESS")]
    caller: Option<String>,

    /// Evaluate the command at this instant (RFC 3339) instead of now
    #[arg(long, global = true, value_name = "RFC3339")]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Habit(commands::habit::HabitAction),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("HABITCHAIN_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::new(cli.caller.as_deref(), cli.at.as_deref())?;
    match cli.command {
        Commands::Habit(action) => commands::habit::run(action, &ctx, config),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    init_tracing(&config);

    if let Err(e) = run(cli, &config) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
