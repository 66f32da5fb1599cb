use std::fs;
use std::path::Path;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::CarpoolError;

pub static CONFIG: OnceCell<Config> = OnceCell::new();

const CONFIG_FILE: &str = "config.toml";
const DB_FILENAME: &str = "carpool.db";
const ENV_PREFIX: &str = "CARPOOL_";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub carpool: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const CARPOOL_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            carpool: Self::CARPOOL_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.carpool.clone();
        self.carpool = self.carpool.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.carpool.as_str()) {
            eprintln!(
                "Config error: carpool log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::CARPOOL_LEVEL
            );
            self.carpool = Self::CARPOOL_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    const DEFAULT_HOST: &str = "127.0.0.1";
    const DEFAULT_PORT: u16 = 8080;

    fn default() -> Self {
        ServerConfig {
            host: Self::DEFAULT_HOST.to_owned(),
            port: Self::DEFAULT_PORT,
        }
    }

    fn ensure_valid(&mut self) {
        self.host = self.host.trim().to_owned();
        if self.host.is_empty() {
            eprintln!(
                "Config error: server host is empty - using default of '{}'",
                Self::DEFAULT_HOST
            );
            self.host = Self::DEFAULT_HOST.to_owned();
        }

        if self.port == 0 {
            eprintln!(
                "Config error: server port 0 is invalid - using default of {}",
                Self::DEFAULT_PORT
            );
            self.port = Self::DEFAULT_PORT;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Defaults for an installation whose data lives in `data_dir`
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Config {
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: data_dir.join(DB_FILENAME).to_string_lossy().into_owned(),
            },
        }
    }

    /// Loads the configuration from the app's data directory.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        Self::load_from_dir(project_dirs.data_local_dir())
    }

    /// Loads `config.toml` from `data_dir`, layered over the defaults and
    /// under `CARPOOL_*` environment variables (`__` separates sections, e.g.
    /// `CARPOOL_SERVER__PORT`). If the file is missing the defaults are
    /// written there first. If loading fails, defaults are used.
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        let default_config = Self::with_data_dir(data_dir);

        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(data_dir) {
                eprintln!(
                    "Failed to create configuration directory {}: {}",
                    data_dir.display(),
                    e
                );
            }
            match toml::to_string_pretty(&default_config) {
                Ok(toml_string) => {
                    if let Err(e) = fs::write(&config_path, toml_string) {
                        eprintln!(
                            "Failed to write default config to {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
                Err(e) => eprintln!("Failed to serialize default config: {}", e),
            }
        }

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config.clone()
        });

        config.ensure_valid(&default_config);

        config
    }

    /// The process-wide configuration. `main` sets it before anything runs.
    pub fn get() -> Result<&'static Config, CarpoolError> {
        CONFIG
            .get()
            .ok_or_else(|| CarpoolError::Error("Configuration has not been loaded".to_string()))
    }

    fn ensure_valid(&mut self, defaults: &Config) {
        self.logging.ensure_valid();
        self.server.ensure_valid();
        if self.database.path.trim().is_empty() {
            eprintln!(
                "Config error: database path is empty - using default of '{}'",
                defaults.database.path
            );
            self.database.path = defaults.database.path.clone();
        }
    }
}
