use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use relay_api::{ChannelType, MeshAccess, ServiceClient};

use crate::config::RelaySettings;
use crate::connection::ConnectionContext;
use crate::filter::SubscriptionFilter;
use crate::relay::{DownstreamClient, Relay};
use crate::subscription::{LoopState, LoopStats, SubscriptionLoop};
use crate::RelayError;

// ═══════════════════════════════════════════════════════════════
//  Relay task — connect → downstream client → subscription loop
// ═══════════════════════════════════════════════════════════════

/// Запущенный relay: общий контекст соединения + фоновая задача loop'а.
pub struct RelayHandle {
    pub ctx: Arc<ConnectionContext>,
    pub state: watch::Receiver<LoopState>,
    pub stats: Arc<LoopStats>,
    task: JoinHandle<Result<(), RelayError>>,
}

impl RelayHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Loop сам отмену не наблюдает: останавливаем задачу снаружи.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Дождаться завершения loop'а, не отдавая handle.
    pub async fn wait(&mut self) -> Result<(), RelayError> {
        (&mut self.task).await?
    }

    pub async fn join(self) -> Result<(), RelayError> {
        self.task.await?
    }
}

/// Запустить relay.
///
/// Неудачное начальное соединение не фатально: loop уходит в reconnect,
/// а downstream client соединится сам при первой пересылке.
pub async fn spawn_relay(
    mesh: Arc<dyn MeshAccess>,
    address: &str,
    settings: &RelaySettings,
) -> Result<RelayHandle, RelayError> {
    settings.validate()?;

    let ctx = Arc::new(ConnectionContext::new(address, mesh.clone()));
    let initial = ctx.establish_if_empty().await;
    if initial.is_live() {
        tracing::info!(%address, "connected to mesh");
    } else {
        tracing::warn!(%address, outcome = ?initial, "initial mesh connection failed");
    }

    let arg = settings.client_arg();
    let downstream = DownstreamClient::new(
        mesh,
        address,
        ServiceClient::new(ChannelType::JsonData, arg.clone()),
        settings.supply_name.clone(),
    )
    .with_connection(ctx.current().await);
    let relay = Arc::new(Relay::new(
        SubscriptionFilter::new(settings.topic.clone()),
        Arc::new(downstream),
    ));

    let subscription = SubscriptionLoop::new(
        ctx.clone(),
        ServiceClient::new(ChannelType::MqttGateway, arg),
        relay,
        settings.backoff(),
    )
    .with_max_reconnect_failures(settings.max_reconnect_failures);

    let state = subscription.state();
    let stats = subscription.stats();
    tracing::info!(
        topic = %settings.topic,
        backoff_ms = settings.backoff_ms,
        max_reconnect_failures = ?settings.max_reconnect_failures,
        "subscribe topic"
    );
    let task = tokio::spawn(subscription.run());

    Ok(RelayHandle { ctx, state, stats, task })
}
