/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Configuration for the Slotwire runtime.
///
/// Values are loaded from `slotwire/config.toml` in the XDG configuration
/// directories. Every section falls back to its defaults when absent, so a
/// file only needs to name the values it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotwireConfig {
    /// Request, connect and discovery timeouts
    pub timeouts: TimeoutConfig,
    /// Heartbeat emission and instance tracking
    pub heartbeat: HeartbeatConfig,
    /// Capacities
    pub limits: LimitsConfig,
    /// Message priorities and lifetimes
    pub defaults: DefaultsConfig,
    /// Behavioral switches
    pub behavior: BehaviorConfig,
}

/// Timeout-related configuration values, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default wait for a reply when the caller gives none
    pub request_ms: u64,
    /// Wait for a peer to acknowledge a forwarded connect or disconnect
    pub connect_ms: u64,
    /// How long `start` listens for another instance answering to the same id
    pub instance_ping_ms: u64,
    /// Collection window of `get_available_instances` without tracking
    pub discovery_ms: u64,
    /// Wait for `get_available_signals` / `get_available_slots`
    pub introspection_ms: u64,
    /// Upper bound for background tasks to wind down on `stop`
    pub shutdown_ms: u64,
}

/// Heartbeat and tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval between two heartbeats of this instance
    pub interval_ms: u64,
    /// Heartbeats a peer may miss before it is declared gone
    pub missed_beats_tolerance: u32,
    /// How often tracked peers are checked for expiry
    pub tracking_tick_ms: u64,
    /// Maintain a topology table of peers
    pub track_instances: bool,
}

/// Limits and capacity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Capacity of the dispatch inbox fed by the broker
    pub inbox_capacity: usize,
}

/// Default values configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Prefix of generated instance ids
    pub instance_prefix: String,
    /// Type announced in the instance info
    pub instance_type: String,
    /// Priority of user signals
    pub signal_priority: u8,
    /// Time-to-live of user signals, 0 meaning unlimited
    pub signal_ttl_ms: u64,
    /// Priority of calls, requests, replies and heartbeats
    pub system_priority: u8,
    /// Time-to-live of calls, requests, replies and heartbeats
    pub system_ttl_ms: u64,
}

/// Behavioral configuration switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Refuse to start when another instance answers to the same id
    pub check_instance_id_unique: bool,
    /// Broadcast `slotInstanceNew` / `slotInstanceGone` on start and stop
    pub announce_instance: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 5_000,
            connect_ms: 1_000,
            instance_ping_ms: 1_000,
            discovery_ms: 300,
            introspection_ms: 1_000,
            shutdown_ms: 5_000,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            missed_beats_tolerance: 3,
            tracking_tick_ms: 1_000,
            track_instances: false,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 1_024,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            instance_prefix: "instance".to_string(),
            instance_type: "signalslotable".to_string(),
            signal_priority: 4,
            signal_ttl_ms: 0,
            system_priority: 4,
            system_ttl_ms: 0,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            check_instance_id_unique: true,
            announce_instance: true,
        }
    }
}

impl SlotwireConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_ms)
    }

    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat.interval_ms)
    }

    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_ms)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `slotwire/config.toml` below `$XDG_CONFIG_HOME` and then the
    /// XDG config directories. A missing file yields the defaults; a file that
    /// cannot be read or parsed is logged and also yields the defaults.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("slotwire") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(text) => match Self::from_toml(&text) {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: SlotwireConfig = SlotwireConfig::load();
}
