// Application configuration
// Logging can only be switched off entirely in development builds

use crate::error::{Result, SignalingError};
use crate::utils::add_ice_url_scheme;
use serde::{Deserialize, Serialize};

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true; // debug builds log everything by default

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false; // release builds only log warnings

#[cfg(debug_assertions)]
pub mod dev {
    // Flip to false to silence logging in a debug build.
    // Only honoured in debug builds.
    pub const ENABLE_LOGGING: bool = true;
}

#[cfg(not(debug_assertions))]
pub mod dev {
    pub const ENABLE_LOGGING: bool = false;
}

pub const ICE_SERVERS_VAR: &str = "PASTE_RTC_ICE_SERVERS";
pub const TURN_USERNAME_VAR: &str = "PASTE_RTC_TURN_USERNAME";
pub const TURN_CREDENTIAL_VAR: &str = "PASTE_RTC_TURN_CREDENTIAL";

/// ICE server entry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Which media kinds to capture or to receive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn is_empty(&self) -> bool {
        !self.audio && !self.video
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RtcSettings {
    /// Empty means host candidates only.
    pub ice_servers: Vec<ServerConfig>,
    /// Local capture: camera only by default.
    pub capture: MediaConstraints,
    /// What to ask the remote side for.
    pub receive: MediaConstraints,
}

impl Default for RtcSettings {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            capture: MediaConstraints {
                audio: false,
                video: true,
            },
            receive: MediaConstraints {
                audio: true,
                video: true,
            },
        }
    }
}

impl RtcSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds settings from `PASTE_RTC_*` variables looked up through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        let Some(list) = var(ICE_SERVERS_VAR) else {
            return Ok(settings);
        };

        for (i, url) in list
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .enumerate()
        {
            let turn = url.starts_with("turn:") || url.starts_with("turns:");
            settings.ice_servers.push(ServerConfig {
                id: format!("env-{i}"),
                r#type: if turn { "turn" } else { "stun" }.into(),
                url: url.to_string(),
                username: if turn { var(TURN_USERNAME_VAR) } else { None },
                credential: if turn { var(TURN_CREDENTIAL_VAR) } else { None },
            });
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(SignalingError::InvalidConfig(format!(
                    "ICE server `{}` has an empty URL",
                    server.id
                )));
            }
            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none())
            {
                return Err(SignalingError::InvalidConfig(format!(
                    "TURN server `{}` requires username and credential",
                    server.id
                )));
            }
        }
        Ok(())
    }

    /// Server URLs with their scheme filled in.
    pub fn ice_urls(&self) -> Vec<String> {
        self.ice_servers.iter().map(add_ice_url_scheme).collect()
    }
}
