//! Лексический анализ: исходный текст → последовательность токенов.
//!
//! Один проход слева направо. Пробел, табуляция и перевод строки разделяют
//! токены и сами токенов не дают. Символы операторов и разделителей
//! выделяются сразу, всё остальное копится в слово, которое затем
//! классифицируется (см. [`tables::classify_word`]).
//!
//! Лексер тотален: любая строка даёт последовательность токенов, ошибок нет.
//!
//! # Пример
//!
//! ```rust
//! use stagecc::lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("int x = 10;");
//! assert_eq!(tokens.len(), 5);
//! assert_eq!(tokens[0].kind, TokenKind::Keyword);
//! ```

pub mod tables;
pub mod token;

pub use tables::{classify_token, classify_word};
pub use token::{Span, Token, TokenKind};

use log::trace;
use logos::Logos;
use serde::{Deserialize, Serialize};

/// Внутренние лексемы для logos.
///
/// Многосимвольные операторы объявлены явно, logos выбирает самое длинное
/// совпадение.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n]+")]
enum RawToken {
    #[token("<<=")]
    #[token(">>=")]
    #[token("++")]
    #[token("--")]
    #[token("==")]
    #[token("!=")]
    #[token(">=")]
    #[token("<=")]
    #[token("&&")]
    #[token("||")]
    #[token("<<")]
    #[token(">>")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("=>")]
    #[token("->")]
    #[regex(r"[=+\-*/%<>!&|^~]")]
    Operator,

    #[regex(r"[;(){}\[\],.:]")]
    Delimiter,

    // Всё, что не пробел, не оператор и не разделитель.
    #[regex(r"[^ \t\n=+\-*/%<>!&|^~;(){}\[\],.:]+")]
    Word,
}

/// Настройки лексера.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LexerConfig {
    /// Склеивать многосимвольные операторы (`==`, `<=`, `->`) в один токен.
    /// При `false` каждый символ оператора - отдельный токен.
    pub merge_operators: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            merge_operators: true,
        }
    }
}

/// Лексер над исходным текстом.
pub struct Lexer<'a> {
    source: &'a str,
    config: LexerConfig,
}

impl<'a> Lexer<'a> {
    /// Создать лексер с настройками по умолчанию.
    pub fn new(source: &'a str) -> Self {
        Self::with_config(source, LexerConfig::default())
    }

    pub fn with_config(source: &'a str, config: LexerConfig) -> Self {
        Self { source, config }
    }

    /// Разбить весь исходник на токены.
    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut raw = RawToken::lexer(self.source);

        while let Some(result) = raw.next() {
            let range = raw.span();
            let span = Span::new(range.start, range.end);
            let text = raw.slice();

            match result {
                Ok(RawToken::Operator) => self.push_operator(&mut tokens, text, span),
                Ok(RawToken::Delimiter) => {
                    tokens.push(Token::with_span(TokenKind::Delimiter, text, span));
                }
                Ok(RawToken::Word) => tokens.push(classify_token(text, span)),
                // Правила выше покрывают любой символ; на всякий случай
                // нераспознанный фрагмент классифицируется как слово.
                Err(()) => tokens.push(classify_token(text, span)),
            }
        }

        trace!("tokenized {} bytes into {} tokens", self.source.len(), tokens.len());
        tokens
    }

    fn push_operator(&self, tokens: &mut Vec<Token>, text: &str, span: Span) {
        if self.config.merge_operators || text.len() == 1 {
            tokens.push(Token::with_span(TokenKind::Operator, text, span));
            return;
        }

        // Символы операторов - ASCII, смещение в байтах совпадает с индексом.
        for (offset, ch) in text.char_indices() {
            let start = span.start + offset;
            let end = start + ch.len_utf8();
            tokens.push(Token::with_span(
                TokenKind::Operator,
                ch.to_string(),
                Span::new(start, end),
            ));
        }
    }
}

/// Разбить исходный текст на токены с настройками по умолчанию.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Разбить исходный текст на токены с заданными настройками.
pub fn tokenize_with(source: &str, config: &LexerConfig) -> Vec<Token> {
    Lexer::with_config(source, config.clone()).tokenize()
}
