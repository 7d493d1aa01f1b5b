use serde::{Deserialize, Serialize};

use relay_api::{ServiceClient, SupplyMessage};

/// Управляющий запрос клиента к mesh-узлу (JSON внутри фрейма).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Открыть поток сообщений канала. Дальше сервер шлёт envelope'ы
    /// по одному во фрейме.
    Subscribe {
        #[serde(flatten)]
        client: ServiceClient,
    },
    /// Опубликовать supply в канал.
    Publish {
        #[serde(flatten)]
        client: ServiceClient,
        supply: SupplyMessage,
    },
}
