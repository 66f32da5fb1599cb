mod api;
mod cli;
mod config;
mod database;
mod error;
mod groups;
mod on_demand;
mod rotation;
mod schedules;
mod schema;
mod server;

use cli::Cli;
use config::{Config, CONFIG};
use directories::ProjectDirs;
use flexi_logger::{detailed_format, Logger, LoggerHandle};
use log::{debug, error};

fn setup_logging(config: &Config) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    // RUST_LOG, when set, replaces the configured level entirely
    let spec = format!("warn, carpool={}", config.logging.carpool);
    Logger::try_with_env_or_str(spec)?
        .log_to_stderr()
        .format(detailed_format)
        .start()
}

fn main() {
    let Some(project_dirs) = ProjectDirs::from("", "", "carpool") else {
        eprintln!("Could not determine a home directory for configuration and data");
        std::process::exit(1);
    };

    let config = Config::load_config(&project_dirs);

    let _logger = match setup_logging(&config) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Failed to initialize logging: {}", err);
            std::process::exit(1);
        }
    };

    if CONFIG.set(config).is_err() {
        error!("Configuration was already initialized");
    }

    debug!("Command-line args: {:?}", std::env::args_os().collect::<Vec<_>>());

    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
