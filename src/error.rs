use crate::events::AppIdentity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwitcherError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("Соединение с X-сервером потеряно: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Ошибка ответа X-сервера: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("Не удалось захватить клавишу: {0}")]
    Grab(String),

    #[error("Запрос к оконной системе не удался: {0}")]
    Query(String),

    #[error("Группа окон не найдена: {0}")]
    UnknownGroup(AppIdentity),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl SwitcherError {
    pub fn query_failed<T>(msg: impl Into<String>) -> Result<T> {
        Err(SwitcherError::Query(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, SwitcherError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! switcher_error {
    (grab, $($arg:tt)*) => {
        $crate::error::SwitcherError::Grab(format!($($arg)*))
    };
    (query, $($arg:tt)*) => {
        $crate::error::SwitcherError::Query(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::SwitcherError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::SwitcherError::Internal(format!($($arg)*))
    };
}
