use std::sync::Arc;
use std::time::Duration;

use relay_api::MeshError;

use crate::connection::ConnectionContext;

/// Чем закончился reconnect-цикл.
#[derive(Debug, Clone)]
pub enum ReconnectOutcome {
    /// Новое соединение установлено этим циклом.
    Reconnected { id: u64 },
    /// Пока спали, соединение восстановил кто-то другой.
    AlreadyConnected { id: u64 },
    /// Соединиться не удалось, handle остался пустым.
    Failed(MeshError),
}

impl ReconnectOutcome {
    /// Есть ли после цикла живой handle.
    pub fn is_live(&self) -> bool {
        !matches!(self, ReconnectOutcome::Failed(_))
    }
}

/// Reconnect: сброс handle → фиксированная пауза → новая попытка.
pub struct Reconnector {
    ctx: Arc<ConnectionContext>,
    backoff: Duration,
}

impl Reconnector {
    pub fn new(ctx: Arc<ConnectionContext>, backoff: Duration) -> Self {
        Self { ctx, backoff }
    }

    pub async fn reconnect(&self) -> ReconnectOutcome {
        if let Some(id) = self.ctx.invalidate().await {
            tracing::info!(connection = id, "client reset");
        }

        // Пауза безусловная, даже если сбрасывать было нечего.
        tokio::time::sleep(self.backoff).await;

        let outcome = self.ctx.establish_if_empty().await;
        let address = self.ctx.address();
        match &outcome {
            ReconnectOutcome::Reconnected { id } => {
                tracing::info!(%address, connection = id, "reconnected to mesh");
            }
            ReconnectOutcome::AlreadyConnected { id } => {
                tracing::info!(%address, connection = id, "using connection restored elsewhere");
            }
            ReconnectOutcome::Failed(e) => {
                tracing::warn!(%address, error = ?e, "reconnect failed, will retry");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use relay_api::{
        ConnectionHandle, EnvelopeHandler, MeshAccess, MeshConnection, ServiceClient,
        SupplyMessage,
    };

    use super::*;

    struct Conn(u64);

    impl MeshConnection for Conn {
        fn id(&self) -> u64 {
            self.0
        }

        fn subscribe<'a>(
            &'a self,
            _client: &'a ServiceClient,
            _handler: Arc<dyn EnvelopeHandler>,
        ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }

        fn publish<'a>(
            &'a self,
            _client: &'a ServiceClient,
            _supply: &'a SupplyMessage,
        ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    /// Mesh, который выдаёт соединения с возрастающими id.
    /// `fail_first` первых попыток заканчиваются ошибкой.
    struct CountingMesh {
        next_id: AtomicU64,
        attempts: AtomicUsize,
        fail_first: usize,
    }

    impl CountingMesh {
        fn new(fail_first: usize) -> Self {
            Self {
                next_id: AtomicU64::new(1),
                attempts: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    impl MeshAccess for CountingMesh {
        fn connect<'a>(
            &'a self,
            _address: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<ConnectionHandle, MeshError>> + Send + 'a>> {
            Box::pin(async move {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < self.fail_first {
                    return Err(MeshError::io("connection refused"));
                }
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Conn(id)) as ConnectionHandle)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn replaces_broken_handle_after_backoff() {
        let mesh = Arc::new(CountingMesh::new(0));
        let ctx = Arc::new(ConnectionContext::new("mesh:1", mesh.clone()));
        assert!(ctx.establish_if_empty().await.is_live());
        let reconnector = Reconnector::new(ctx.clone(), Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let outcome = reconnector.reconnect().await;

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(matches!(outcome, ReconnectOutcome::Reconnected { id: 2 }));
        assert_eq!(ctx.current().await.map(|h| h.id()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_even_when_nothing_to_reset() {
        let mesh = Arc::new(CountingMesh::new(0));
        let ctx = Arc::new(ConnectionContext::new("mesh:1", mesh));
        let reconnector = Reconnector::new(ctx, Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        reconnector.reconnect().await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_leaves_handle_empty() {
        let mesh = Arc::new(CountingMesh::new(1));
        let ctx = Arc::new(ConnectionContext::new("mesh:1", mesh));
        let reconnector = Reconnector::new(ctx.clone(), Duration::from_millis(10));

        let outcome = reconnector.reconnect().await;
        assert!(!outcome.is_live());
        assert!(ctx.current().await.is_none());

        // следующий цикл добирается до соединения
        assert!(reconnector.reconnect().await.is_live());
        assert!(ctx.current().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_attempts_install_one_handle() {
        let mesh = Arc::new(CountingMesh::new(0));
        let ctx = Arc::new(ConnectionContext::new("mesh:1", mesh.clone()));
        assert!(ctx.establish_if_empty().await.is_live());

        let a = Reconnector::new(ctx.clone(), Duration::from_secs(5));
        let b = Reconnector::new(ctx.clone(), Duration::from_secs(5));
        let (ra, rb) = tokio::join!(a.reconnect(), b.reconnect());

        // одна попытка при старте + ровно одна из двух параллельных
        assert_eq!(mesh.attempts.load(Ordering::SeqCst), 2);
        let installed: Vec<_> = [&ra, &rb]
            .into_iter()
            .filter(|o| matches!(o, ReconnectOutcome::Reconnected { .. }))
            .collect();
        assert_eq!(installed.len(), 1);
        assert!([&ra, &rb]
            .into_iter()
            .any(|o| matches!(o, ReconnectOutcome::AlreadyConnected { id: 2 })));
        assert_eq!(ctx.current().await.map(|h| h.id()), Some(2));
    }
}
