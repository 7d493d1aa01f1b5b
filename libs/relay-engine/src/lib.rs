pub mod config;
pub mod error;
mod connection;
mod filter;
mod reconnect;
mod relay;
mod service;
mod subscription;

pub use error::RelayError;
pub use config::RelaySettings;
pub use connection::ConnectionContext;
pub use filter::{FilterDecision, SubscriptionFilter};
pub use reconnect::{ReconnectOutcome, Reconnector};
pub use relay::{DownstreamClient, Relay, RelayOutcome};
pub use service::{RelayHandle, spawn_relay};
pub use subscription::{LoopState, LoopStats, SubscriptionLoop};
