//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "server/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "server/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub world: WorldStoreConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        let conf = serde_yaml::from_reader(
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?,
        )
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub addr: EnvField<ListenerBinding>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            addr: Default::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenerBinding(SocketAddr);

impl ListenerBinding {
    pub fn to_addr(&self) -> SocketAddr {
        self.0
    }
    pub fn to_ip(&self) -> IpAddr {
        self.0.ip()
    }
    pub fn to_port(&self) -> u16 {
        self.0.port()
    }
}

impl FromStr for ListenerBinding {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        tracing::debug!("Parsing listener binding from string: {}", s);
        Ok(Self(SocketAddr::from_str(s)?))
    }
}

impl Default for ListenerBinding {
    fn default() -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            5000,
        )))
    }
}

impl std::fmt::Display for ListenerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the world document lives on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorldStoreConfig {
    pub state_path: EnvField<String>,
}

impl Default for WorldStoreConfig {
    fn default() -> Self {
        Self {
            state_path: EnvField::from("world_state.json".to_string()),
        }
    }
}

fn default_tick_seconds() -> u64 {
    60
}
fn default_ap_max() -> i32 {
    3
}
fn default_need_drop() -> f64 {
    1.0
}
fn default_social_drop() -> f64 {
    0.5
}
fn default_social_refill() -> f64 {
    10.0
}
fn default_social_sim_tick() -> f64 {
    5.0
}
fn default_sleep_drop() -> f64 {
    0.75
}
fn default_sleep_refill() -> f64 {
    10.0
}
fn default_sleep_ticks() -> i32 {
    3
}
fn default_need_threshold() -> f64 {
    50.0
}
fn default_save_debounce_ms() -> u64 {
    5000
}
fn default_max_message_len() -> usize {
    1000
}

/// World heartbeat and needs tuning. Field names match the documented
/// option names lowercased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// World heartbeat interval in seconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Master enable for the world tick.
    #[serde(default)]
    pub tick_enable: bool,
    /// Action point cap per NPC.
    #[serde(default = "default_ap_max")]
    pub ap_max: i32,
    /// Hunger/thirst drain per tick.
    #[serde(default = "default_need_drop")]
    pub need_drop: f64,
    /// Socialization drain per tick.
    #[serde(default = "default_social_drop")]
    pub social_drop: f64,
    /// Socialization gain on chat/emote.
    #[serde(default = "default_social_refill")]
    pub social_refill: f64,
    /// Socialization gain per tick when alone.
    #[serde(default = "default_social_sim_tick")]
    pub social_sim_tick: f64,
    /// Sleep drain per tick.
    #[serde(default = "default_sleep_drop")]
    pub sleep_drop: f64,
    /// Sleep gain per tick while sleeping.
    #[serde(default = "default_sleep_refill")]
    pub sleep_refill: f64,
    /// Duration of a sleep action, in ticks.
    #[serde(default = "default_sleep_ticks")]
    pub sleep_ticks: i32,
    /// Planning triggers when a need falls below this.
    #[serde(default = "default_need_threshold")]
    pub need_threshold: f64,
    /// Persistence coalescing window in milliseconds.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Client messages longer than this are rejected.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Master enable for rate limiting.
    #[serde(default)]
    pub rate_enable: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty game config deserializes")
    }
}

fn default_ai_timeout() -> u64 {
    30
}
fn default_ai_max_response() -> usize {
    10_000
}

/// External AI endpoint settings. With no endpoint configured, the
/// deterministic fallback generator serves all requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<EnvField<String>>,
    #[serde(default)]
    pub model: Option<String>,
    /// Hard timeout for adapter calls, in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,
    /// Responses are truncated past this many characters.
    #[serde(default = "default_ai_max_response")]
    pub max_response_length: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: None,
            timeout_seconds: default_ai_timeout(),
            max_response_length: default_ai_max_response(),
        }
    }
}
