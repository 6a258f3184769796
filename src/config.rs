// src/config.rs
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: &str = "5140";
const DEFAULT_DATA_DIR: &str = "data";

/// Server configuration, read once at startup from `.env` when present
/// and the process environment otherwise.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind; empty means all interfaces.
    pub host: String,
    pub port: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Config {
        if dotenvy::dotenv().is_ok() {
            log::debug!("loaded environment from .env");
        }

        Config {
            host: env::var("DB_HOST").unwrap_or_default(),
            port: env::var("DB_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string()),
            data_dir: env::var("DB_DATA_DIR")
                .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
                .into(),
        }
    }

    pub fn listen_addr(&self) -> String {
        if self.host.is_empty() {
            format!("0.0.0.0:{}", self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr_defaults_to_all_interfaces() {
        let config = Config {
            host: String::new(),
            port: "5140".to_string(),
            data_dir: "data".into(),
        };
        assert_eq!(config.listen_addr(), "0.0.0.0:5140");
    }

    #[test]
    fn test_listen_addr_with_host() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: "9000".to_string(),
            data_dir: "data".into(),
        };
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
    }
}
