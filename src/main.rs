use clap::Parser;
use kcache::cli::{Cli, Commands};
use kcache::types::config::Config;
use kcache::{KcacheError, KcacheResult};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> KcacheResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet); an invalid file is fatal
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default()?
    };

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let directive = format!("kcache={}", log_level)
        .parse::<Directive>()
        .or_else(|_| "kcache=info".parse::<Directive>())
        .map_err(|e| KcacheError::config(format!("invalid log directive: {}", e)))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let json_layer = (config.general.log_format == "json")
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (config.general.log_format != "json")
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .init();

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            kcache::cli::commands::init(path).await?;
        }
        Commands::Config => {
            kcache::cli::commands::config_cmd(&cli.config).await?;
        }
        Commands::Status => {
            kcache::cli::commands::status(&config).await?;
        }
        Commands::Replay {
            trace,
            threads,
            json,
        } => {
            kcache::cli::commands::replay(&trace, threads, json, &config).await?;
        }
        Commands::Version => {
            kcache::cli::commands::version();
        }
    }

    Ok(())
}
