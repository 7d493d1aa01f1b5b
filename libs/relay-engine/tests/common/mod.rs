#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_api::{
    ConnectionHandle, EnvelopeHandler, InboundRecord, MeshAccess, MeshConnection, MeshError,
    ServiceClient, SupplyMessage,
};
use tokio::time::Instant;

/// Что делает очередной вызов subscribe.
pub enum SubscribeStep {
    /// Сразу вернуть ошибку транспорта.
    Fail,
    /// Сразу вернуть штатное закрытие.
    Close,
    /// Поток от mesh'а нечитаем (битый фрейм).
    Corrupt,
    /// Отдать envelope'ы обработчику и висеть до отмены.
    DeliverThenHang(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
pub struct Published {
    pub connection: u64,
    pub client: ServiceClient,
    pub supply: SupplyMessage,
}

/// Общее состояние in-memory mesh'а.
#[derive(Default)]
pub struct MeshState {
    /// Сценарий для subscribe; пустой = висеть вечно.
    pub script: Mutex<VecDeque<SubscribeStep>>,
    /// Сколько первых connect() должны упасть.
    pub fail_connects: AtomicUsize,
    pub connect_attempts: AtomicUsize,
    pub next_id: AtomicU64,
    pub subscribe_calls: Mutex<Vec<(u64, Instant)>>,
    pub published: Mutex<Vec<Published>>,
}

pub struct MockMesh {
    pub state: Arc<MeshState>,
}

impl MockMesh {
    pub fn new(script: Vec<SubscribeStep>) -> Self {
        let state = MeshState {
            script: Mutex::new(script.into()),
            next_id: AtomicU64::new(1),
            ..Default::default()
        };
        Self { state: Arc::new(state) }
    }

    pub fn failing_connects(self, n: usize) -> Self {
        self.state.fail_connects.store(n, Ordering::SeqCst);
        self
    }
}

impl MeshAccess for MockMesh {
    fn connect<'a>(
        &'a self,
        _address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConnectionHandle, MeshError>> + Send + 'a>> {
        Box::pin(async move {
            let attempt = self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.state.fail_connects.load(Ordering::SeqCst) {
                return Err(MeshError::io("connection refused"));
            }
            let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockConnection { id, state: self.state.clone() }) as ConnectionHandle)
        })
    }
}

pub struct MockConnection {
    id: u64,
    state: Arc<MeshState>,
}

impl MeshConnection for MockConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn subscribe<'a>(
        &'a self,
        _client: &'a ServiceClient,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
        Box::pin(async move {
            self.state.subscribe_calls.lock().unwrap().push((self.id, Instant::now()));
            let step = self.state.script.lock().unwrap().pop_front();
            match step {
                Some(SubscribeStep::Fail) => Err(MeshError::io("stream reset")),
                Some(SubscribeStep::Close) => Ok(()),
                Some(SubscribeStep::Corrupt) => Err(MeshError::format_err("payload too large")),
                Some(SubscribeStep::DeliverThenHang(envelopes)) => {
                    for envelope in &envelopes {
                        handler.handle(envelope).await;
                    }
                    std::future::pending().await
                }
                None => std::future::pending().await,
            }
        })
    }

    fn publish<'a>(
        &'a self,
        client: &'a ServiceClient,
        supply: &'a SupplyMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
        Box::pin(async move {
            self.state.published.lock().unwrap().push(Published {
                connection: self.id,
                client: client.clone(),
                supply: supply.clone(),
            });
            Ok(())
        })
    }
}

pub fn envelope(topic: &str, payload: &str) -> Vec<u8> {
    InboundRecord::new(topic, payload).encode()
}

/// Ждать условия, сдаваясь через `limit`.
pub async fn wait_until(limit: Duration, cond: impl Fn() -> bool) {
    tokio::time::timeout(limit, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
