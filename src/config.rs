use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// JSON fixture of `path -> document` loaded into the store at startup
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Zero disables the read-through document cache
    pub capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = parse_var("SERVER_PORT", env::var("SERVER_PORT").ok(), 3000)?;
        let cache_capacity = parse_var("CACHE_CAPACITY", env::var("CACHE_CAPACITY").ok(), 1000)?;

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
                seed_path: env::var("SEED_PATH").ok().filter(|p| !p.is_empty()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
            },
            cache: CacheConfig {
                capacity: cache_capacity,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse an optional variable, falling back to `default` only when it is unset
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {} {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                seed_path: None,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            cache: CacheConfig { capacity: 1000 },
        }
    }
}
