//! `ToolChat` command-line interface

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use toolchat::{
    CodeExecutionRequest, CodeRunner, DailyVariable, ForecastClient, ForecastRequest,
    ForecastResult, ToolChatConfig, ToolChatError, ToolRegistry, logging, weather, web,
};

#[derive(Parser)]
#[command(name = "toolchat", version)]
#[command(about = "Weather forecast and Python execution tools for a chat assistant", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory with static UI files
        #[arg(long)]
        static_dir: Option<String>,
    },
    /// Look up a daily forecast for a coordinate
    Forecast {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        /// Number of days
        #[arg(short, long, default_value_t = ForecastRequest::DEFAULT_FORECAST_DAYS)]
        days: u8,
        /// Comma-separated daily variables
        #[arg(long, value_delimiter = ',')]
        daily: Vec<String>,
        /// Print the raw tool result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run Python code from a file, or stdin when no file is given
    Run {
        /// Source file
        file: Option<PathBuf>,
    },
    /// Print the tool definitions offered to the model
    Tools,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(err @ ToolChatError::Config { .. }) = e.downcast_ref::<ToolChatError>() {
                eprintln!("{}", err.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = ToolChatConfig::load_from_path(cli.config)?;
    logging::init(&config.logging, cli.verbose)?;
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if static_dir.is_some() {
                config.server.static_dir = static_dir;
            }

            let registry = Arc::new(ToolRegistry::with_defaults(&config)?);
            web::run(&config.server, registry).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Forecast {
            latitude,
            longitude,
            days,
            daily,
            json,
        } => {
            let variables = daily
                .iter()
                .map(|name| name.trim().parse::<DailyVariable>())
                .collect::<toolchat::Result<Vec<_>>>()?;
            let request = ForecastRequest::new(latitude, longitude, days, variables)?;

            let client = ForecastClient::from_config(&config.forecast)?;
            let result = client.fetch(&request).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            }
            match result {
                ForecastResult::Success(forecast) => {
                    if !json {
                        print!("{}", weather::render_table(&forecast));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                ForecastResult::Error(error) => {
                    if !json {
                        eprintln!("Forecast failed: {}", error.error);
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Run { file } => {
            let source = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut source = String::new();
                    std::io::stdin()
                        .read_to_string(&mut source)
                        .context("Failed to read code from stdin")?;
                    source
                }
            };

            let request = CodeExecutionRequest::new(source)?;
            let result = CodeRunner::from_config(&config.code_runner)
                .run(&request)
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1)))
        }
        Commands::Tools => {
            let registry = ToolRegistry::with_defaults(&config)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&registry.definitions())?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
