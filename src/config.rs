use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::util::is_local_endpoint_url;

const DEFAULT_API_URL: &str = "http://localhost:8000/api/stream";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url =
            std::env::var("STAGEFEED_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("STAGEFEED_API_KEY").ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(v)
            }
        });
        let connect_timeout_secs = std::env::var("STAGEFEED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            api_url,
            api_key,
            connect_timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid STAGEFEED_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "STAGEFEED_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        if self.connect_timeout_secs == 0 {
            bail!("STAGEFEED_TIMEOUT_SECS must be at least 1 second");
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
