use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExitIntentError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Некорректная конфигурация: {0}")]
    InvalidConfig(String),

    #[error("Async runtime недоступен: {0}")]
    RuntimeUnavailable(String),

    #[error("Ошибка сценария: {0}")]
    Scenario(String),
}

impl ExitIntentError {
    pub fn invalid_config<T>(msg: impl Into<String>) -> Result<T> {
        Err(ExitIntentError::InvalidConfig(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, ExitIntentError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! exit_intent_error {
    (runtime_unavailable, $($arg:tt)*) => {
        $crate::error::ExitIntentError::RuntimeUnavailable(format!($($arg)*))
    };
    (scenario, $($arg:tt)*) => {
        $crate::error::ExitIntentError::Scenario(format!($($arg)*))
    };
}
