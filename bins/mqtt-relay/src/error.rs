#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("no mesh address configured (set [mesh].address or --mesh)")]
    NoMeshAddress,

    #[error("{0}")]
    Relay(#[from] relay_engine::RelayError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
