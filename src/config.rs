//! Session and discovery configuration.
//!
//! Only runtime knobs live here. Marker bytes, escape mask and flag bits are
//! fixed protocol constants in [`crate::protocol`] and are not configurable.
//!
//! # Example
//!
//! ```
//! use sphero_link::config::LinkConfig;
//!
//! let config = LinkConfig::from_json(r#"{ "session": { "event_capacity": 16 } }"#).unwrap();
//! assert_eq!(config.session.event_capacity, 16);
//! assert_eq!(config.discovery.name_filter, "BP-");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Default capacity of the transport -> session chunk channel.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// Default capacity of the session -> caller event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Default initial frame buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = crate::protocol::DEFAULT_CAPACITY;

/// Default advertised-name prefix for Bolt+ robots.
pub const DEFAULT_NAME_FILTER: &str = "BP-";

/// Default discovery timeout.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Raw chunks the transport may queue before its notify path waits.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Decoded events queued for the caller before the read loop waits.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Initial capacity of the reassembly buffer.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_inbound_capacity() -> usize {
    DEFAULT_INBOUND_CAPACITY
}
fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}
fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: default_inbound_capacity(),
            event_capacity: default_event_capacity(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl SessionConfig {
    /// Check values that would otherwise panic at channel creation.
    pub fn validate(&self) -> Result<()> {
        if self.inbound_capacity == 0 {
            return Err(LinkError::Config(
                "inbound_capacity must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(LinkError::Config(
                "event_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for locating a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Substring the advertised name must contain.
    #[serde(default = "default_name_filter")]
    pub name_filter: String,

    /// How long to scan, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_name_filter() -> String {
    DEFAULT_NAME_FILTER.to_string()
}
fn default_timeout_secs() -> f64 {
    DEFAULT_DISCOVERY_TIMEOUT.as_secs_f64()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            name_filter: default_name_filter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DiscoveryConfig {
    /// Scan timeout as a `Duration`.
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs)
            .map_err(|e| LinkError::Config(format!("invalid timeout_secs: {}", e)))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl LinkConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.session.validate()?;
        config.discovery.timeout()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
