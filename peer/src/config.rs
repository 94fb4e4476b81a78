use std::env;

use url::Url;

/// Headless peer configuration
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Relay WebSocket endpoint
    pub server_url: String,
    /// Room to join; the relay falls back to its default room
    pub room: Option<String>,
    /// Display name; the relay picks one when absent
    pub nick: Option<String>,
    /// Seed for serve angles and the bot
    pub seed: u64,
    /// Mark ready on join, and start the match when hosting and the lobby allows it
    pub auto_start: bool,
    /// Simulation rate (Hz)
    pub tick_hz: u32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:9002/ws".to_string(),
            room: None,
            nick: None,
            seed: rand::random(),
            auto_start: true,
            tick_hz: 60,
        }
    }
}

impl PeerConfig {
    /// Defaults overridden by `PONG_SERVER_URL`, `PONG_ROOM`, `PONG_NICK`,
    /// `PONG_SEED`, `PONG_AUTO_START` and `PONG_TICK_HZ`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(url) = env::var("PONG_SERVER_URL") {
            config.server_url = url;
        }
        if let Ok(room) = env::var("PONG_ROOM") {
            config.room = Some(room);
        }
        if let Ok(nick) = env::var("PONG_NICK") {
            config.nick = Some(nick);
        }
        if let Ok(seed) = env::var("PONG_SEED") {
            config.seed = seed
                .parse()
                .map_err(|_| ConfigError::Invalid("PONG_SEED", seed))?;
        }
        if let Ok(flag) = env::var("PONG_AUTO_START") {
            config.auto_start = parse_flag(&flag).ok_or(ConfigError::Invalid("PONG_AUTO_START", flag))?;
        }
        if let Ok(hz) = env::var("PONG_TICK_HZ") {
            config.tick_hz = hz
                .parse()
                .map_err(|_| ConfigError::Invalid("PONG_TICK_HZ", hz))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=240).contains(&self.tick_hz) {
            return Err(ConfigError::Invalid("tick_hz", self.tick_hz.to_string()));
        }
        self.join_url().map(|_| ())
    }

    /// Relay URL with the room and nick query parameters.
    pub fn join_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.server_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Invalid("server_url", self.server_url.clone()));
        }
        {
            let mut query = url.query_pairs_mut();
            if let Some(room) = &self.room {
                query.append_pair("room", room);
            }
            if let Some(nick) = &self.nick {
                query.append_pair("nick", nick);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}
