use std::fmt;

/// Откуда пришла ошибка mesh'а.
///
/// Subscription loop смотрит на kind, когда подписка обрывается:
/// `Io` это обычная потеря связи, `Format` значит, что поток
/// от mesh'а испорчен (битый фрейм, несовместимый протокол).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Сеть: connect, чтение, запись, нет соединения.
    Io,
    /// Байты пришли, но разобрать их нельзя.
    Format,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
        })
    }
}

/// Ошибка mesh access слоя: kind + текст с накопленным контекстом.
#[derive(Clone)]
pub struct MeshError {
    kind: ErrorKind,
    message: String,
}

impl MeshError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    /// Операция над соединением, которого нет.
    pub fn not_connected() -> Self {
        Self::io("not connected")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// `"{ctx}: {message}"`, kind не меняется.
    pub fn with_context(mut self, ctx: impl fmt::Display) -> Self {
        self.message = format!("{ctx}: {}", self.message);
        self
    }
}

impl fmt::Debug for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MeshError {}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(e: serde_json::Error) -> Self {
        Self::format_err(e.to_string())
    }
}

impl From<prost::DecodeError> for MeshError {
    fn from(e: prost::DecodeError) -> Self {
        Self::format_err(e.to_string())
    }
}
