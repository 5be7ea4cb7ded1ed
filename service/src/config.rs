use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// TCP port of the duplex-channel (WebSocket) listener. Fixed by the
/// wire contract, not configurable.
pub const DUPLEX_CHANNEL_PORT: u16 = 9000;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The host TCP port to listen for incoming API requests
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Listen address of the HTTP API listener.
    pub fn api_listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Listen address of the duplex-channel listener (fixed port).
    pub fn duplex_listen_addr(&self) -> String {
        format!("{}:{}", self.host, DUPLEX_CHANNEL_PORT)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> Config {
        // Parse with no CLI arguments so only the declared defaults apply
        Config::parse_from(["fanout_relay"])
    }

    #[test]
    fn test_default_listen_addresses() {
        let config = default_config();
        assert_eq!(config.api_listen_addr(), "127.0.0.1:8000");
        assert_eq!(config.duplex_listen_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_duplex_port_is_fixed() {
        // Overriding the API port must not move the duplex listener
        let config = Config::parse_from(["fanout_relay", "--port", "8080"]);
        assert_eq!(config.api_listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.duplex_listen_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_rust_env_parses_case_insensitively() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("prod".parse::<RustEnv>(), Err(RustEnvParseError));
    }

    #[test]
    fn test_default_runtime_env_is_development() {
        let config = default_config();
        assert!(!config.is_production());
        assert_eq!(config.runtime_env(), RustEnv::Development);
    }
}
