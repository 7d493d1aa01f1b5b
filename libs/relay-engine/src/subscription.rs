use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use relay_api::{EnvelopeHandler, ErrorKind, MeshError, ServiceClient};

use crate::connection::ConnectionContext;
use crate::reconnect::Reconnector;
use crate::RelayError;

/// Состояние subscription loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Подписка активна (или как раз устанавливается).
    Subscribed,
    /// Внутри reconnect-цикла.
    Recovering,
}

/// Счётчики loop'а.
#[derive(Debug, Default)]
pub struct LoopStats {
    subscribes: AtomicU64,
    terminations: AtomicU64,
    corrupt_streams: AtomicU64,
    reconnects: AtomicU64,
}

impl LoopStats {
    /// Сколько раз loop входил в subscribe.
    pub fn subscribes(&self) -> u64 {
        self.subscribes.load(Ordering::Relaxed)
    }

    /// Сколько раз subscribe вернулся.
    pub fn terminations(&self) -> u64 {
        self.terminations.load(Ordering::Relaxed)
    }

    /// Сколько подписок оборвалось из-за нечитаемого потока (`ErrorKind::Format`).
    pub fn corrupt_streams(&self) -> u64 {
        self.corrupt_streams.load(Ordering::Relaxed)
    }

    /// Сколько reconnect-циклов завершилось.
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}

/// Долгоживущий цикл: subscribe → (блок до обрыва) → reconnect → снова.
///
/// Терминального состояния нет, если не задан `max_reconnect_failures`.
pub struct SubscriptionLoop {
    ctx: Arc<ConnectionContext>,
    reconnector: Reconnector,
    client: ServiceClient,
    handler: Arc<dyn EnvelopeHandler>,
    max_reconnect_failures: Option<u32>,
    state: watch::Sender<LoopState>,
    stats: Arc<LoopStats>,
}

impl SubscriptionLoop {
    pub fn new(
        ctx: Arc<ConnectionContext>,
        client: ServiceClient,
        handler: Arc<dyn EnvelopeHandler>,
        backoff: Duration,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Subscribed);
        Self {
            reconnector: Reconnector::new(ctx.clone(), backoff),
            ctx,
            client,
            handler,
            max_reconnect_failures: None,
            state,
            stats: Arc::new(LoopStats::default()),
        }
    }

    /// Ограничить число подряд неудачных reconnect-циклов. None = без ограничения.
    pub fn with_max_reconnect_failures(mut self, limit: Option<u32>) -> Self {
        self.max_reconnect_failures = limit;
        self
    }

    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<LoopStats> {
        self.stats.clone()
    }

    /// Запустить цикл. Возвращается только с ошибкой, когда исчерпан
    /// `max_reconnect_failures`.
    pub async fn run(self) -> Result<(), RelayError> {
        let mut consecutive_failures = 0u32;

        loop {
            self.state.send_replace(LoopState::Subscribed);
            self.stats.subscribes.fetch_add(1, Ordering::Relaxed);

            // Handle берётся под guard'ом, subscribe идёт уже без него.
            let result = match self.ctx.current().await {
                Some(connection) => {
                    tracing::debug!(connection = connection.id(), channel = %self.client.channel, "subscribing");
                    connection.subscribe(&self.client, self.handler.clone()).await
                }
                None => Err(MeshError::not_connected()),
            };
            self.stats.terminations.fetch_add(1, Ordering::Relaxed);

            match result {
                Ok(()) => tracing::warn!(channel = %self.client.channel, "subscription closed by mesh"),
                Err(e) if e.kind() == ErrorKind::Format => {
                    self.stats.corrupt_streams.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(channel = %self.client.channel, error = ?e, "subscription stream corrupted");
                }
                Err(e) => tracing::warn!(channel = %self.client.channel, error = ?e, "error on subscribe"),
            }

            self.state.send_replace(LoopState::Recovering);
            let outcome = self.reconnector.reconnect().await;
            self.stats.reconnects.fetch_add(1, Ordering::Relaxed);

            if outcome.is_live() {
                consecutive_failures = 0;
                continue;
            }

            consecutive_failures += 1;
            if let Some(limit) = self.max_reconnect_failures {
                if consecutive_failures >= limit {
                    tracing::error!(failures = consecutive_failures, "reconnect limit reached, stopping");
                    return Err(RelayError::ReconnectLimit { failures: consecutive_failures });
                }
            }
        }
    }
}
