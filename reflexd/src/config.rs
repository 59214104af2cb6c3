//! Daemon configuration, `config.json` in the OS data dir.
//!
//! Every field has a default so a missing or partial file still starts the
//! daemon; a malformed file is logged and replaced by defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_addr() -> String {
    "127.0.0.1:9697".to_string()
}

fn default_reaction_rounds() -> u32 {
    5
}

fn default_run_duration_s() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Stable owner identifier from the identity provider, if the player is
    /// signed in. Threaded through to the record pool, never inspected.
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default = "default_reaction_rounds")]
    pub reaction_rounds: u32,

    #[serde(default = "default_run_duration_s")]
    pub run_duration_s: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            owner: None,
            reaction_rounds: default_reaction_rounds(),
            run_duration_s: default_run_duration_s(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    warn!("config parse failed, using defaults: {e}");
                    Self::default()
                }
            },
            // Missing file is the common first-run case; stay quiet.
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: DaemonConfig = serde_json::from_str(r#"{"owner":"user-9"}"#).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9697");
        assert_eq!(config.owner.as_deref(), Some("user-9"));
        assert_eq!(config.reaction_rounds, 5);
        assert_eq!(config.run_duration_s, 30);
    }
}
