use std::sync::Arc;

use tokio::sync::Mutex;

use relay_api::{ConnectionHandle, MeshAccess};

use crate::reconnect::ReconnectOutcome;

/// Общий контекст соединения: адрес mesh'а + текущий handle под guard'ом.
///
/// Handle читается и меняется только под `handle` mutex'ом. Guard не
/// держится через backoff sleep, но держится через `connect()`: так
/// параллельные попытки reconnect сериализуются и не затирают друг друга.
pub struct ConnectionContext {
    address: String,
    mesh: Arc<dyn MeshAccess>,
    handle: Mutex<Option<ConnectionHandle>>,
}

impl ConnectionContext {
    /// Контекст без соединения. Первое соединение ставит `establish_if_empty`.
    pub fn new(address: impl Into<String>, mesh: Arc<dyn MeshAccess>) -> Self {
        Self {
            address: address.into(),
            mesh,
            handle: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Снимок текущего handle.
    pub async fn current(&self) -> Option<ConnectionHandle> {
        self.handle.lock().await.clone()
    }

    /// Пометить соединение сломанным. Возвращает id сброшенного handle,
    /// если он был.
    pub async fn invalidate(&self) -> Option<u64> {
        self.handle.lock().await.take().map(|h| h.id())
    }

    /// Если handle пуст: соединиться и сохранить новый handle.
    /// Если кто-то успел поставить свой: ничего не делать.
    pub async fn establish_if_empty(&self) -> ReconnectOutcome {
        let mut guard = self.handle.lock().await;
        if let Some(existing) = guard.as_ref() {
            return ReconnectOutcome::AlreadyConnected { id: existing.id() };
        }
        match self.mesh.connect(&self.address).await {
            Ok(handle) => {
                let id = handle.id();
                *guard = Some(handle);
                ReconnectOutcome::Reconnected { id }
            }
            Err(e) => ReconnectOutcome::Failed(e),
        }
    }
}
