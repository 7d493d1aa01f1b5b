use std::sync::Arc;

use mesh_tcp::TcpMesh;
use relay_api::MeshAccess;
use relay_engine::spawn_relay;

use crate::config::{RelayConfig, ServeArgs};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mqtt-relay starting");

    // --- Load config ---
    let config = RelayConfig::resolve(&args)?;
    tracing::info!(
        config = %args.config,
        mesh = %config.mesh.address,
        topic = %config.relay.topic,
        "loaded config"
    );

    // --- Mesh + relay loop ---
    let mesh: Arc<dyn MeshAccess> = Arc::new(
        TcpMesh::new(config.mesh.max_frame).with_connect_timeout(config.mesh.connect_timeout()),
    );
    let mut relay = spawn_relay(mesh, &config.mesh.address, &config.relay).await?;
    tracing::info!("relay ready");

    // --- Ожидание Ctrl+C (или остановки loop'а по лимиту reconnect'ов) ---
    let interrupted = tokio::select! {
        result = relay.wait() => {
            result?;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            true
        }
    };

    if interrupted {
        tracing::info!("shutting down...");
        relay.abort();
    }

    tracing::info!("shutdown complete");
    Ok(())
}
