use crate::api::logging::debug_payload_enabled;
use crate::util::is_http_url;
use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const WEBHOOK_URL_ENV: &str = "N8N_CHAT_WEBHOOK_URL";
pub const BIND_ADDR_ENV: &str = "COACH_BIND_ADDR";
pub const RELAY_URL_ENV: &str = "COACH_RELAY_URL";
pub const TURN_TIMEOUT_ENV: &str = "COACH_TURN_TIMEOUT_SECS";
pub const GAME_STATE_PATH_ENV: &str = "COACH_GAME_STATE_PATH";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 90;
const DEFAULT_GAME_STATE_PATH: &str = ".coach/game.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Workflow webhook the relay forwards to. Missing is not fatal at
    /// startup; each chat request then fails with a configuration error.
    pub webhook_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub relay_url: String,
    pub turn_timeout: Duration,
    pub game_state_path: PathBuf,
    pub debug_payload: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let webhook_url = non_empty_env(WEBHOOK_URL_ENV);
        let bind_addr = non_empty_env(BIND_ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("{BIND_ADDR_ENV} must be a socket address like 127.0.0.1:3000"))?;
        let relay_url =
            non_empty_env(RELAY_URL_ENV).unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());
        let turn_timeout_secs = match non_empty_env(TURN_TIMEOUT_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("{TURN_TIMEOUT_ENV} must be a whole number of seconds"))?,
            None => DEFAULT_TURN_TIMEOUT_SECS,
        };
        let game_state_path = non_empty_env(GAME_STATE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GAME_STATE_PATH));

        Ok(Self {
            webhook_url,
            bind_addr,
            relay_url,
            turn_timeout: Duration::from_secs(turn_timeout_secs),
            game_state_path,
            debug_payload: debug_payload_enabled(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(webhook_url) = &self.webhook_url {
            if !is_http_url(webhook_url) {
                bail!(
                    "Invalid {WEBHOOK_URL_ENV} '{}': expected http:// or https:// URL",
                    webhook_url
                );
            }
        }

        if !is_http_url(&self.relay_url) {
            bail!(
                "Invalid {RELAY_URL_ENV} '{}': expected http:// or https:// URL",
                self.relay_url
            );
        }

        if self.turn_timeout.is_zero() {
            bail!("{TURN_TIMEOUT_ENV} must be greater than zero");
        }

        Ok(())
    }

    /// Endpoint the chat client posts to.
    pub fn relay_chat_url(&self) -> String {
        format!("{}/api/chat", self.relay_url.trim().trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            game_state_path: PathBuf::from(DEFAULT_GAME_STATE_PATH),
            debug_payload: false,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
