use serde::{Deserialize, Serialize};

use super::{env_or, env_string_or};

fn d_port() -> u16 {
    3210
}

fn d_host() -> String {
    "0.0.0.0".to_string()
}

/// Connection gateway bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string_or("TUTOR_HOST", &d_host()),
            port: env_or("TUTOR_PORT", d_port()),
        }
    }
}
