use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings, read from the environment (and `.env`, if present).
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("LOBBY_DB_PATH").unwrap_or_else(|_| "lobby.db".into());
        let host = std::env::var("LOBBY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("LOBBY_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("LOBBY_PORT must be a port number")?;

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
