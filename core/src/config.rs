//! Transport configuration and backend selection.
//!
//! # Design
//! The configuration is a plain value handed to the factory; nothing here is
//! global or mutable after a transport is built. `Default` points at the
//! Reader API server the client was written for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub const DEFAULT_HOST: &str = "www.google.com";
pub const DEFAULT_PORT: u16 = 80;
pub const CLIENT_NAME: &str = "UNL_Services_Google_Reader";
pub const CLIENT_VERSION: &str = "0.1.0";

/// Connection parameters shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user_agent: format!("{CLIENT_NAME}/{CLIENT_VERSION}"),
        }
    }
}

impl TransportConfig {
    pub fn new(host: &str, port: u16, user_agent: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            user_agent: user_agent.to_string(),
        }
    }

    /// Parse a JSON object; absent fields take their default value.
    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| {
            TransportError::configuration(format!("invalid transport configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce a malformed request line or header.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.host.is_empty() {
            return Err(TransportError::configuration("host must not be empty"));
        }
        if self.host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(TransportError::configuration(format!(
                "host {:?} contains characters not allowed in a host name",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(TransportError::configuration("port must be between 1 and 65535"));
        }
        if self.user_agent.contains(|c: char| c == '\r' || c == '\n') {
            return Err(TransportError::configuration("user agent must not contain line breaks"));
        }
        Ok(())
    }

    pub fn is_default_port(&self) -> bool {
        self.port == DEFAULT_PORT
    }
}

/// The selectable transport implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sockets,
    Streams,
    Curl,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Sockets, Backend::Streams, Backend::Curl];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Sockets => "sockets",
            Backend::Streams => "streams",
            Backend::Curl => "curl",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sockets" => Ok(Backend::Sockets),
            "streams" => Ok(Backend::Streams),
            "curl" => Ok(Backend::Curl),
            other => Err(TransportError::configuration(format!(
                "transport implementation \"{other}\" does not exist"
            ))),
        }
    }
}
