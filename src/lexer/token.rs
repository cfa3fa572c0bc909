//! Токены и позиции в исходном коде.

use serde::{Deserialize, Serialize};

/// Позиция в исходном коде.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Диапазон байтов `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Строка и колонка начала (обе с единицы).
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let prefix = source.get(..offset).unwrap_or(source);
        let line = prefix.matches('\n').count() + 1;
        let col = match prefix.rfind('\n') {
            Some(idx) => prefix[idx + 1..].chars().count() + 1,
            None => prefix.chars().count() + 1,
        };
        (line, col)
    }
}

/// Класс токена. Закрытое перечисление.
///
/// При декодировании принимаются и старые имена в верхнем регистре
/// (`KEYWORD`, `NUMBER`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(alias = "KEYWORD")]
    Keyword,
    #[serde(alias = "IDENTIFIER")]
    Identifier,
    #[serde(alias = "NUMBER")]
    Number,
    #[serde(alias = "OPERATOR")]
    Operator,
    #[serde(alias = "DELIMITER")]
    Delimiter,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "Keyword",
            TokenKind::Identifier => "Identifier",
            TokenKind::Number => "Number",
            TokenKind::Operator => "Operator",
            TokenKind::Delimiter => "Delimiter",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Классифицированная лексема.
///
/// Сериализуется как `{kind, text}`. Span не входит в структурный контракт:
/// токены, пришедшие извне, его не имеют, и при сравнении он не учитывается.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    #[serde(alias = "type")]
    pub kind: TokenKind,
    #[serde(alias = "value")]
    pub text: String,
    #[serde(skip)]
    pub span: Option<Span>,
}

impl Token {
    /// Создать токен без позиции.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            span: None,
        }
    }

    /// Создать токен с позицией в исходнике.
    pub fn with_span(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span: Some(span),
        }
    }

    /// Проверить класс и текст одновременно.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.is(TokenKind::Operator, text)
    }

    pub fn is_delimiter(&self, text: &str) -> bool {
        self.is(TokenKind::Delimiter, text)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token {}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_line_col() {
        let source = "int x;\n  y = 1;";
        assert_eq!(Span::new(0, 3).line_col(source), (1, 1));
        assert_eq!(Span::new(9, 10).line_col(source), (2, 3));
    }

    #[test]
    fn test_token_equality_ignores_span() {
        let a = Token::with_span(TokenKind::Number, "10", Span::new(8, 10));
        let b = Token::new(TokenKind::Number, "10");
        assert_eq!(a, b);
    }

    #[test]
    fn test_token_json_shape() {
        let token = Token::new(TokenKind::Keyword, "int");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"kind":"Keyword","text":"int"}"#);
    }

    #[test]
    fn test_token_accepts_legacy_fields() {
        let token: Token = serde_json::from_str(r#"{"type":"OPERATOR","value":"="}"#).unwrap();
        assert_eq!(token, Token::new(TokenKind::Operator, "="));
    }
}
