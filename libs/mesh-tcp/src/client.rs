use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use relay_api::{
    ConnectionHandle, EnvelopeHandler, MeshAccess, MeshConnection, MeshError, ServiceClient,
    SupplyMessage,
};

use crate::framing::LengthPrefixed;
use crate::protocol::Request;

// ═══════════════════════════════════════════════════════════════
//  TcpMesh — MeshAccess поверх TCP
// ═══════════════════════════════════════════════════════════════

/// Таймаут TCP connect по умолчанию.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Mesh access через TCP: одно управляющее соединение на handle
/// (для publish) + отдельный поток на каждую подписку.
pub struct TcpMesh {
    framing: LengthPrefixed,
    connect_timeout: Duration,
    next_id: AtomicU64,
}

impl TcpMesh {
    pub fn new(max_frame: usize) -> Self {
        Self {
            framing: LengthPrefixed::new(max_frame),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl MeshAccess for TcpMesh {
    fn connect<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConnectionHandle, MeshError>> + Send + 'a>> {
        Box::pin(async move {
            let control = open_stream(address, self.connect_timeout).await?;
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            tracing::info!(%address, connection = id, "tcp mesh connected");
            Ok(Arc::new(TcpConnection {
                id,
                address: address.to_string(),
                framing: self.framing,
                connect_timeout: self.connect_timeout,
                control: Mutex::new(control),
            }) as ConnectionHandle)
        })
    }
}

async fn open_stream(address: &str, limit: Duration) -> Result<TcpStream, MeshError> {
    let stream = tokio::time::timeout(limit, TcpStream::connect(address))
        .await
        .map_err(|_| MeshError::io(format!("TCP connect to {address}: timed out after {limit:?}")))?
        .map_err(|e| MeshError::io(format!("TCP connect to {address}: {e}")))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

// ═══════════════════════════════════════════════════════════════
//  TcpConnection
// ═══════════════════════════════════════════════════════════════

pub struct TcpConnection {
    id: u64,
    address: String,
    framing: LengthPrefixed,
    connect_timeout: Duration,
    control: Mutex<TcpStream>,
}

impl TcpConnection {
    fn request_frame(&self, request: &Request) -> Result<Vec<u8>, MeshError> {
        let body = serde_json::to_vec(request)?;
        let mut buf = Vec::with_capacity(body.len() + 4);
        self.framing.encode(&body, &mut buf)?;
        Ok(buf)
    }

    /// Чтение фреймов из потока подписки до EOF / ошибки.
    async fn pump(
        &self,
        mut stream: TcpStream,
        handler: &dyn EnvelopeHandler,
    ) -> Result<(), MeshError> {
        let mut buf = Vec::with_capacity(8192);
        let mut tmp = [0u8; 4096];

        loop {
            while let Some((frame, consumed)) = self.framing.decode(&buf)? {
                buf.drain(..consumed);
                handler.handle(&frame).await;
            }

            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                if !buf.is_empty() {
                    tracing::debug!(connection = self.id, pending = buf.len(), "stream closed mid-frame");
                }
                return Ok(());
            }
            buf.extend_from_slice(&tmp[..n]);
        }
    }
}

impl MeshConnection for TcpConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn subscribe<'a>(
        &'a self,
        client: &'a ServiceClient,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
        Box::pin(async move {
            let mut stream = open_stream(&self.address, self.connect_timeout).await?;
            let frame = self.request_frame(&Request::Subscribe { client: client.clone() })?;
            stream.write_all(&frame).await?;
            tracing::info!(connection = self.id, channel = %client.channel, "tcp mesh subscribed");

            self.pump(stream, &*handler)
                .await
                .map_err(|e| e.with_context(format!("subscription {}", client.channel)))
        })
    }

    fn publish<'a>(
        &'a self,
        client: &'a ServiceClient,
        supply: &'a SupplyMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), MeshError>> + Send + 'a>> {
        Box::pin(async move {
            let frame = self.request_frame(&Request::Publish {
                client: client.clone(),
                supply: supply.clone(),
            })?;
            let mut control = self.control.lock().await;
            if let Err(e) = control.write_all(&frame).await {
                // Управляющий поток умер (mesh перезапустился): один redial и повтор.
                tracing::warn!(connection = self.id, error = %e, "control stream write failed, reopening");
                *control = open_stream(&self.address, self.connect_timeout).await?;
                control.write_all(&frame).await?;
            }
            Ok(())
        })
    }
}
