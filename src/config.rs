use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use wallets_core::NewWallet;

#[derive(Parser, Debug)]
#[command(name = "wallets", about = "Wallets API - contract-validated wallet records")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "wallets.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// OpenAPI document to validate against (overrides config file)
    #[arg(long)]
    pub contract: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default = "default_store")]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContractConfig {
    /// When unset, the document compiled into the binary is used.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Wallets present at startup, numbered from 1 in order.
    #[serde(default)]
    pub seed: Vec<NewWallet>,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_store() -> StoreConfig {
    StoreConfig {
        seed: vec![NewWallet::new("Personal Wallet", "HouseholdExpenses", "Blue")],
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            logging: default_logging(),
            contract: ContractConfig::default(),
            store: default_store(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref contract) = cli.contract {
            config.contract.path = Some(contract.clone());
        }

        config
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
