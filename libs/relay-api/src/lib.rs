pub mod error;
pub mod mesh;
pub mod record;

pub use error::{ErrorKind, MeshError};
pub use mesh::{
    ChannelType, ConnectionHandle, EnvelopeHandler, MeshAccess, MeshConnection,
    ServiceClient, SupplyMessage,
};
pub use record::{InboundRecord, MqttRecord, Timestamp};
