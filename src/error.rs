//! Ошибки конвейера компиляции.
//!
//! Каждая ошибка относится к одному запросу на компиляцию и не затрагивает
//! остальные. Лексер ошибок не порождает.

use crate::codegen::CodegenError;
use crate::parser::ParseError;
use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type CompileResult<T> = Result<T, CompileError>;

/// Перечисление всех возможных ошибок.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Входные данные стадии не удалось декодировать в ожидаемую структуру.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Синтаксический анализатор не смог построить дерево.
    #[error("Parse error: {0}")]
    NoMatchingProduction(#[from] ParseError),

    /// Генератор кода встретил конструкцию, которую не умеет понижать.
    #[error("Code generation error: {0}")]
    UnsupportedConstruct(#[from] CodegenError),

    /// Результат стадии не удалось закодировать.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::MalformedInput(err.to_string())
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::IoError(err.to_string())
    }
}

impl CompileError {
    /// Сообщение с привязкой к строке и колонке исходника, если она известна.
    pub fn render(&self, source: &str) -> String {
        match self {
            CompileError::NoMatchingProduction(err) => match err.span() {
                Some(span) => {
                    let (line, col) = span.line_col(source);
                    format!("{}:{}: {}", line, col, self)
                }
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    #[test]
    fn test_render_with_position() {
        let source = "int x = 1;\nint = 2;";
        let err: CompileError = parse(&tokenize(source)).unwrap_err().into();
        assert!(err.render(source).starts_with("2:5: Parse error: No matching production"));
    }

    #[test]
    fn test_json_error_is_malformed_input() {
        let err: CompileError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(matches!(err, CompileError::MalformedInput(_)));
    }
}
