use std::env;

use pong_shared::config::MatchConfig;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Room capacity
    pub max_players_per_room: usize,
    /// Frames larger than this disconnect the client (bytes)
    pub max_message_bytes: usize,
    /// Unparseable frames tolerated before disconnecting
    pub max_parse_errors: u32,
    /// Tuning handed to every peer in its welcome
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9002".to_string(),
            max_players_per_room: 4,
            max_message_bytes: 1024,
            max_parse_errors: 5,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PONG_LISTEN_ADDR`, `PONG_MAX_PLAYERS` and
    /// `PONG_WINNING_SCORE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(addr) = env::var("PONG_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(max) = env::var("PONG_MAX_PLAYERS") {
            config.max_players_per_room = max
                .parse()
                .map_err(|_| ConfigError::Invalid("PONG_MAX_PLAYERS", max))?;
        }
        if let Ok(score) = env::var("PONG_WINNING_SCORE") {
            config.match_config.winning_score = score
                .parse()
                .map_err(|_| ConfigError::Invalid("PONG_WINNING_SCORE", score))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players_per_room < 2 {
            return Err(ConfigError::Invalid(
                "max_players_per_room",
                self.max_players_per_room.to_string(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::Invalid("max_message_bytes", "0".to_string()));
        }
        self.match_config.validate().map_err(ConfigError::Tuning)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("invalid match tuning: {0}")]
    Tuning(String),
}
