//! Ошибки генерации кода.

use thiserror::Error;

/// Ошибка генерации кода.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// Для узла нет правила понижения (неизвестный вид или неверная форма).
    #[error("Unsupported construct '{kind}': {reason}")]
    UnsupportedConstruct { kind: String, reason: String },

    /// Выражению не хватило регистров.
    #[error("Expression needs more than {limit} registers")]
    RegisterExhausted { limit: usize },
}

impl CodegenError {
    pub fn unsupported(kind: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}
