mod client;
mod framing;
mod protocol;

pub use client::{DEFAULT_CONNECT_TIMEOUT, TcpConnection, TcpMesh};
pub use framing::LengthPrefixed;
pub use protocol::Request;
