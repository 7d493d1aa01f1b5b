use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;

use relay_api::{
    ConnectionHandle, EnvelopeHandler, InboundRecord, MeshAccess, MeshError, ServiceClient,
    SupplyMessage,
};

use crate::filter::{FilterDecision, SubscriptionFilter};

// ═══════════════════════════════════════════════════════════════
//  Downstream client
// ═══════════════════════════════════════════════════════════════

/// Клиент JSON-канала. Один экземпляр на весь процесс.
///
/// Своё соединение он держит отдельно от subscription loop'а: reconnect
/// подписки его не трогает. Если соединения нет, оно устанавливается при
/// первой пересылке; если publish упал, соединение пересоздаётся и
/// отправка повторяется один раз.
pub struct DownstreamClient {
    mesh: Arc<dyn MeshAccess>,
    address: String,
    connection: Mutex<Option<ConnectionHandle>>,
    client: ServiceClient,
    supply_name: String,
}

impl DownstreamClient {
    pub fn new(
        mesh: Arc<dyn MeshAccess>,
        address: impl Into<String>,
        client: ServiceClient,
        supply_name: impl Into<String>,
    ) -> Self {
        Self {
            mesh,
            address: address.into(),
            connection: Mutex::new(None),
            client,
            supply_name: supply_name.into(),
        }
    }

    /// Начать с уже установленного соединения.
    pub fn with_connection(mut self, connection: Option<ConnectionHandle>) -> Self {
        self.connection = Mutex::new(connection);
        self
    }

    async fn ensure_connected(&self) -> Result<ConnectionHandle, MeshError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }
        let connection = self.mesh.connect(&self.address).await?;
        tracing::info!(address = %self.address, connection = connection.id(), "downstream connected");
        *slot = Some(connection.clone());
        Ok(connection)
    }

    /// Сбросить соединение, если его ещё не заменил параллельный вызов.
    async fn drop_connection(&self, id: u64) {
        let mut slot = self.connection.lock().await;
        if slot.as_ref().is_some_and(|c| c.id() == id) {
            *slot = None;
        }
    }

    /// Опубликовать payload как отдельное JSON-сообщение.
    pub async fn forward(&self, json: &str) -> Result<(), MeshError> {
        let supply = SupplyMessage {
            name: self.supply_name.clone(),
            json: json.to_string(),
        };

        let connection = self.ensure_connected().await?;
        let Err(e) = connection.publish(&self.client, &supply).await else {
            return Ok(());
        };

        tracing::warn!(connection = connection.id(), error = ?e, "publish error, reconnecting downstream");
        self.drop_connection(connection.id()).await;
        let connection = self.ensure_connected().await?;
        connection.publish(&self.client, &supply).await
    }
}

// ═══════════════════════════════════════════════════════════════
//  Relay callback — decode → filter → log → forward
// ═══════════════════════════════════════════════════════════════

/// Результат обработки одного envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Envelope не декодировался, сообщение отброшено.
    Undecodable,
    /// Topic не прошёл фильтр.
    Discarded,
    /// Фильтр выключен: строка `topic,payload` залогирована.
    Observed { line: String },
    /// Строка `topic:payload` залогирована, запись переслана.
    Forwarded { line: String },
    /// Строка залогирована, пересылка не удалась.
    ForwardFailed { line: String },
}

/// Обработчик входящих сообщений. Состояния между вызовами не хранит:
/// только read-only фильтр и общий downstream client.
pub struct Relay {
    filter: SubscriptionFilter,
    downstream: Arc<DownstreamClient>,
}

impl Relay {
    pub fn new(filter: SubscriptionFilter, downstream: Arc<DownstreamClient>) -> Self {
        Self { filter, downstream }
    }

    pub async fn relay(&self, envelope: &[u8]) -> RelayOutcome {
        let record = match InboundRecord::decode(envelope) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = ?e, "undecodable envelope, dropping");
                return RelayOutcome::Undecodable;
            }
        };

        match self.filter.decide(&record.topic) {
            FilterDecision::Discard => RelayOutcome::Discarded,
            FilterDecision::Observe => {
                let line = format!("{},{}", record.topic, record.payload_text());
                tracing::info!("{line}");
                RelayOutcome::Observed { line }
            }
            FilterDecision::Forward => {
                let payload = record.payload_text();
                let line = format!("{}:{}", record.topic, payload);
                tracing::info!("{line}");
                match self.downstream.forward(&payload).await {
                    Ok(()) => RelayOutcome::Forwarded { line },
                    Err(e) => {
                        tracing::warn!(topic = %record.topic, error = ?e, "forward failed");
                        RelayOutcome::ForwardFailed { line }
                    }
                }
            }
        }
    }
}

impl EnvelopeHandler for Relay {
    fn handle<'a>(&'a self, envelope: &'a [u8]) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.relay(envelope).await;
        })
    }
}
