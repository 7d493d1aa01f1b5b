#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("config: {0}")]
    Config(String),

    #[error("gave up after {failures} consecutive reconnect failures")]
    ReconnectLimit { failures: u32 },

    #[error("relay task: {0}")]
    Task(#[from] tokio::task::JoinError),
}
