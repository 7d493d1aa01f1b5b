use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use relay_engine::RelaySettings;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "mqtt-relay", version, about = "Relay MQTT gateway records into the JSON data channel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Запустить relay
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Путь к TOML конфиг файлу
    #[arg(long, default_value = "relay.toml", env = "CONFIG_PATH")]
    pub config: String,

    /// Адрес mesh-узла (host:port), перекрывает [mesh].address
    #[arg(long, env = "RELAY_MESH_ADDRESS")]
    pub mesh: Option<String>,

    /// Префикс MQTT topic'а, перекрывает [relay].topic
    #[arg(long, env = "RELAY_TOPIC")]
    pub topic: Option<String>,
}

// ---- TOML Config ----

#[derive(Debug, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default)]
    pub relay: RelaySettings,
}

#[derive(Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub address: String,
    /// Максимальный размер фрейма в байтах (0 = без ограничения).
    #[serde(default = "default_max_frame")]
    pub max_frame: usize,
    /// Таймаут TCP connect, мс.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            max_frame: default_max_frame(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_max_frame() -> usize {
    4 * 1024 * 1024
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl MeshConfig {
    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.connect_timeout_ms)
    }
}

impl RelayConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Файл + CLI. Файла может не быть, если адрес mesh'а задан в CLI.
    pub fn resolve(args: &ServeArgs) -> Result<Self, ServerError> {
        let mut config = if std::path::Path::new(&args.config).exists() || args.mesh.is_none() {
            Self::load(&args.config)?
        } else {
            Self::default()
        };
        config.apply(args);
        if config.mesh.address.is_empty() {
            return Err(ServerError::NoMeshAddress);
        }
        Ok(config)
    }

    fn apply(&mut self, args: &ServeArgs) {
        if let Some(mesh) = &args.mesh {
            self.mesh.address = mesh.clone();
        }
        if let Some(topic) = &args.topic {
            self.relay.topic = topic.clone();
        }
    }
}
