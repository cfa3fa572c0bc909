//! Ошибки синтаксического анализа.

use crate::lexer::{Span, Token};
use thiserror::Error;

/// Ошибка парсинга. Парсер останавливается на первой же ошибке
/// и никогда не достраивает дерево сам.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Ни одно правило грамматики не подходит к текущему токену.
    #[error("No matching production at {}: expected {expected}, found {found}", location(*index, span))]
    NoMatchingProduction {
        index: usize,
        span: Option<Span>,
        expected: String,
        found: String,
    },

    /// Токены закончились посреди правила.
    #[error("Unexpected end of input at token {index}: expected {expected}")]
    UnexpectedEof { index: usize, expected: String },

    /// Левая часть присваивания - не переменная.
    #[error("Invalid assignment target at {}: {found}", location(*index, span))]
    InvalidAssignmentTarget {
        index: usize,
        span: Option<Span>,
        found: String,
    },
}

fn location(index: usize, span: &Option<Span>) -> String {
    match span {
        Some(span) => format!("token {} (position {})", index, span.start),
        None => format!("token {}", index),
    }
}

impl ParseError {
    /// Создать ошибку "нет подходящего правила".
    pub fn no_match(index: usize, token: &Token, expected: impl Into<String>) -> Self {
        Self::NoMatchingProduction {
            index,
            span: token.span,
            expected: expected.into(),
            found: format!("'{}'", token.text),
        }
    }

    /// Создать ошибку "неожиданный конец".
    pub fn unexpected_eof(index: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            index,
            expected: expected.into(),
        }
    }

    /// Индекс токена, на котором произошла ошибка.
    pub fn index(&self) -> usize {
        match self {
            Self::NoMatchingProduction { index, .. } => *index,
            Self::UnexpectedEof { index, .. } => *index,
            Self::InvalidAssignmentTarget { index, .. } => *index,
        }
    }

    /// Позиция ошибки в исходнике, если токены её несли.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::NoMatchingProduction { span, .. } => *span,
            Self::UnexpectedEof { .. } => None,
            Self::InvalidAssignmentTarget { span, .. } => *span,
        }
    }
}
