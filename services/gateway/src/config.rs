//! Environment configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `8080` | HTTP listen port |
//! | `DATABASE_URL` | `./data` | Store directory; a `file:` prefix is accepted |
//! | `API_KEY` | unset | Write-path API key; empty disables auth |
//! | `SNAPSHOT_INTERVAL_SEC` | `60` | Depth snapshot period; `0` disables |

use anyhow::Context;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub snapshot_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a port number")?,
            Err(_) => 8080,
        };

        let data_dir = env::var("DATABASE_URL")
            .map(|url| parse_database_url(&url))
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let api_key = env::var("API_KEY").ok().filter(|key| !key.is_empty());

        let snapshot_interval_secs = match env::var("SNAPSHOT_INTERVAL_SEC") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("SNAPSHOT_INTERVAL_SEC must be a non-negative integer")?,
            Err(_) => 60,
        };

        Ok(Self {
            port,
            data_dir,
            api_key,
            snapshot_interval_secs,
        })
    }
}

fn parse_database_url(url: &str) -> PathBuf {
    let trimmed = url
        .strip_prefix("file://")
        .or_else(|| url.strip_prefix("file:"))
        .unwrap_or(url);
    PathBuf::from(trimmed)
}
