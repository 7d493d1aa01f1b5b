use std::time::Duration;

use serde::Deserialize;

use crate::RelayError;

/// Параметры relay-ядра (секция `[relay]`).
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Префикс MQTT topic'а. Пустой = фильтр выключен, только логирование.
    #[serde(default)]
    pub topic: String,
    /// Пауза перед повторным соединением.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Сколько подряд неудачных reconnect-циклов допустимо.
    /// None = пытаться бесконечно.
    #[serde(default)]
    pub max_reconnect_failures: Option<u32>,
    /// Имя supply для пересылаемых сообщений.
    #[serde(default = "default_supply_name")]
    pub supply_name: String,
}

fn default_backoff_ms() -> u64 {
    5000
}
fn default_supply_name() -> String {
    "stdin".to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            topic: String::new(),
            backoff_ms: default_backoff_ms(),
            max_reconnect_failures: None,
            supply_name: default_supply_name(),
        }
    }
}

impl RelaySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Аргумент, с которым регистрируются оба service client'а.
    pub fn client_arg(&self) -> String {
        format!("{{Clt:MQTT-to-JSON:{}}}", self.topic)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_reconnect_failures == Some(0) {
            return Err(RelayError::Config(
                "max_reconnect_failures must be at least 1 (omit it to retry forever)".into(),
            ));
        }
        if self.supply_name.is_empty() {
            return Err(RelayError::Config("supply_name must not be empty".into()));
        }
        Ok(())
    }
}
