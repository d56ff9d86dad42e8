pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use luminova_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "luminova",
    about = "LumiNova sales lead qualifier",
    long_about = "Qualify sales leads with a language model, keep a per-user history of processed leads, and inspect runtime readiness.",
    after_help = "Examples:\n  luminova qualify --company \"CyberSecure Solutions\" --description \"AI threat detection for enterprises\"\n  luminova batch leads.csv --output results.csv\n  luminova profile --user-id rep-1\n  luminova doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a luminova.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Profile to record interactions under")]
    user_id: Option<String>,
    #[arg(long, global = true, help = "Keep the profile in memory for this run")]
    no_persist: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Qualify a single lead and record it on the profile")]
    Qualify {
        #[arg(long, help = "Company name")]
        company: String,
        #[arg(long, default_value = "", help = "Free-text company description")]
        description: String,
        #[arg(long, default_value = "lead_0", help = "Caller-supplied lead identifier")]
        lead_id: String,
    },
    #[command(about = "Qualify every row of a CSV lead sheet and write a results sheet")]
    Batch {
        #[arg(help = "CSV with `Company Name` and `Description` columns")]
        input: PathBuf,
        #[arg(long, help = "Results CSV path (default: timestamped file in the working directory)")]
        output: Option<PathBuf>,
    },
    #[command(about = "Show stored interaction history for a user")]
    Profile {
        #[arg(long, default_value_t = 5, help = "Number of recent interactions to list")]
        recent: usize,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model credential readiness, and profile store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending profile store migrations and return structured status output")]
    Migrate,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                user_id: self.user_id.clone(),
                persist_profile: self.no_persist.then_some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }
}

/// Logs go to stderr so stdout carries only command output.
pub fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    // A subscriber may already be installed when embedded in tests.
    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Qualify { company, description, lead_id } => {
            commands::qualify::run(options, &company, &description, &lead_id)
        }
        Command::Batch { input, output } => {
            commands::batch::run(options, &input, output.as_deref())
        }
        Command::Profile { recent } => commands::profile::run(options, recent),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Migrate => commands::migrate::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
