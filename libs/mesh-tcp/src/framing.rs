use relay_api::MeshError;

/// Длина заголовка фрейма: u32 big-endian.
const HEADER_LEN: usize = 4;

/// Length-prefixed framing: `[u32 BE длина][payload]`.
#[derive(Debug, Clone, Copy)]
pub struct LengthPrefixed {
    max_payload: usize,
}

impl LengthPrefixed {
    /// `max_payload = 0`: без ограничения.
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Вырезать один фрейм из начала `buf`.
    ///
    /// `Ok(None)`: данных пока не хватает; `Ok(Some((payload, consumed)))`:
    /// фрейм готов, `consumed` байт можно отбросить.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, MeshError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if self.max_payload > 0 && len > self.max_payload {
            return Err(MeshError::format_err(format!(
                "payload too large: {len} bytes (max {})",
                self.max_payload
            )));
        }

        let total = HEADER_LEN + len;
        if buf.len() < total {
            return Ok(None);
        }

        Ok(Some((buf[HEADER_LEN..total].to_vec(), total)))
    }

    /// Дописать фрейм с `data` в конец `buf`.
    pub fn encode(&self, data: &[u8], buf: &mut Vec<u8>) -> Result<(), MeshError> {
        let len = data.len();
        if len > u32::MAX as usize || (self.max_payload > 0 && len > self.max_payload) {
            return Err(MeshError::format_err(format!("payload too large: {len} bytes")));
        }
        buf.extend_from_slice(&(len as u32).to_be_bytes());
        buf.extend_from_slice(data);
        Ok(())
    }
}
