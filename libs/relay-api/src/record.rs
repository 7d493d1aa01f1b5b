use std::borrow::Cow;

use prost::Message;

use crate::MeshError;

// ════════════════════════════════════════════════════════════════
//  Wire envelope (protobuf)
// ════════════════════════════════════════════════════════════════

/// `google.protobuf.Timestamp`-совместимая метка времени.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// Содержимое envelope из MQTT gateway канала.
///
/// `MQTTRecord { Timestamp time = 1; string topic = 2; bytes record = 3; }`
#[derive(Clone, PartialEq, Message)]
pub struct MqttRecord {
    #[prost(message, optional, tag = "1")]
    pub time: Option<Timestamp>,
    #[prost(string, tag = "2")]
    pub topic: String,
    #[prost(bytes = "vec", tag = "3")]
    pub record: Vec<u8>,
}

/// Timestamp → миллисекунды. Значения вне диапазона i64 дают `None`.
fn unix_millis(t: Timestamp) -> Option<i64> {
    t.seconds
        .checked_mul(1000)?
        .checked_add(i64::from(t.nanos) / 1_000_000)
}

// ════════════════════════════════════════════════════════════════
//  InboundRecord
// ════════════════════════════════════════════════════════════════

/// Декодированная входящая запись. Живёт в пределах одного вызова
/// обработчика, никуда не сохраняется.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundRecord {
    /// MQTT topic, с которого пришла запись (e.g., "home/temp").
    pub topic: String,
    /// Сырой payload устройства.
    pub payload: Vec<u8>,
    /// Время записи в миллисекундах (Unix epoch), если gateway его проставил.
    pub timestamp_ms: Option<i64>,
}

impl InboundRecord {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp_ms: None,
        }
    }

    /// Decode: envelope bytes → InboundRecord.
    ///
    /// Ошибка имеет kind `Format`; вызывающая сторона решает, что с ней делать.
    pub fn decode(envelope: &[u8]) -> Result<Self, MeshError> {
        let msg = MqttRecord::decode(envelope)
            .map_err(|e| MeshError::from(e).with_context("envelope decode"))?;
        Ok(Self {
            topic: msg.topic,
            payload: msg.record,
            timestamp_ms: msg.time.and_then(unix_millis),
        })
    }

    /// Encode: InboundRecord → envelope bytes (зеркало `decode`).
    pub fn encode(&self) -> Vec<u8> {
        MqttRecord {
            time: self.timestamp_ms.map(|ms| Timestamp {
                seconds: ms.div_euclid(1000),
                nanos: (ms.rem_euclid(1000) * 1_000_000) as i32,
            }),
            topic: self.topic.clone(),
            record: self.payload.clone(),
        }
        .encode_to_vec()
    }

    /// Payload как текст. Невалидный UTF-8 заменяется U+FFFD.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
