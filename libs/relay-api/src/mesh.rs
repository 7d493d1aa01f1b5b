use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::MeshError;

// ════════════════════════════════════════════════════════════════
//  Channels & messages
// ════════════════════════════════════════════════════════════════

/// Канал mesh'а, к которому привязан service client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Входящие записи от MQTT gateway (protobuf envelope).
    MqttGateway,
    /// Исходящий канал JSON-данных.
    JsonData,
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::MqttGateway => f.write_str("mqtt_gateway"),
            ChannelType::JsonData => f.write_str("json_data"),
        }
    }
}

/// Service client: канал + аргумент клиента, с которым он регистрируется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClient {
    pub channel: ChannelType,
    pub arg: String,
}

impl ServiceClient {
    pub fn new(channel: ChannelType, arg: impl Into<String>) -> Self {
        Self { channel, arg: arg.into() }
    }
}

/// Supply: сообщение, публикуемое в канал.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyMessage {
    pub name: String,
    pub json: String,
}

// ════════════════════════════════════════════════════════════════
//  Mesh access traits
// ════════════════════════════════════════════════════════════════

/// Обработчик входящих envelope'ов. Mesh может вызывать его
/// конкурентно для разных сообщений.
pub trait EnvelopeHandler: Send + Sync {
    fn handle<'a>(&'a self, envelope: &'a [u8]) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Живое соединение с mesh'ем.
pub trait MeshConnection: Send + Sync {
    /// Идентификатор соединения (для логов и диагностики).
    fn id(&self) -> u64;

    /// Подписаться на канал клиента. Блокирует (async) пока подписка жива,
    /// вызывая `handler` на каждое сообщение. После возврата вызовов больше нет.
    ///
    /// `Ok(())`: штатное закрытие удалённой стороной, `Err`: ошибка транспорта.
    fn subscribe<'a>(
        &'a self,
        client: &'a ServiceClient,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>>;

    /// Best-effort публикация supply в канал клиента.
    fn publish<'a>(
        &'a self,
        client: &'a ServiceClient,
        supply: &'a SupplyMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>>;
}

/// Opaque handle на соединение. Клонируется дёшево.
pub type ConnectionHandle = Arc<dyn MeshConnection>;

/// Точка входа в mesh: установка соединений.
pub trait MeshAccess: Send + Sync {
    /// Попытка соединения. Ошибка не фатальна: вызывающий трактует её
    /// как отсутствие соединения.
    fn connect<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConnectionHandle, MeshError>> + Send + 'a>>;
}
