//! Таблицы классификации: ключевые слова, операторы, разделители.
//!
//! Все таблицы - неизменяемые статические данные, общие для всех потоков.

use super::token::{Span, Token, TokenKind};

/// Ключевые слова языка (набор C++).
pub const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "co_await", "co_return",
    "co_yield", "compl", "concept", "const", "const_cast", "consteval", "constexpr", "constinit",
    "continue", "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum",
    "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
    "operator", "or", "or_eq", "private", "protected", "public", "register", "reinterpret_cast",
    "requires", "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast",
    "struct", "switch", "template", "this", "thread_local", "throw", "true", "try", "typedef",
    "typeid", "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t",
    "while", "xor", "xor_eq",
];

/// Распознаваемые операторы (одно- и многосимвольные).
pub const OPERATORS: &[&str] = &[
    "=", "+", "-", "*", "/", "%", "++", "--", "==", "!=", ">", "<", ">=", "<=", "&&", "||", "!",
    "&", "|", "^", "~", "<<", ">>", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
    "=>", "->",
];

/// Односимвольные разделители.
pub const DELIMITERS: &[&str] = &[";", "(", ")", "{", "}", "[", "]", ",", ".", ":"];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

pub fn is_operator(word: &str) -> bool {
    OPERATORS.contains(&word)
}

pub fn is_delimiter(word: &str) -> bool {
    DELIMITERS.contains(&word)
}

/// Является ли строка целым десятичным числом (в пределах i64).
pub fn is_number(word: &str) -> bool {
    word.parse::<i64>().is_ok()
}

/// Классифицировать накопленное слово.
///
/// Приоритет строго фиксирован: ключевое слово > число > оператор > идентификатор.
pub fn classify_word(word: &str) -> TokenKind {
    if is_keyword(word) {
        TokenKind::Keyword
    } else if is_number(word) {
        TokenKind::Number
    } else if is_operator(word) {
        TokenKind::Operator
    } else {
        TokenKind::Identifier
    }
}

/// Классифицировать слово и построить токен.
pub fn classify_token(word: &str, span: Span) -> Token {
    Token::with_span(classify_word(word), word, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority() {
        assert_eq!(classify_word("int"), TokenKind::Keyword);
        assert_eq!(classify_word("while"), TokenKind::Keyword);
        assert_eq!(classify_word("42"), TokenKind::Number);
        assert_eq!(classify_word("007"), TokenKind::Number);
        assert_eq!(classify_word("<<="), TokenKind::Operator);
        assert_eq!(classify_word("x1"), TokenKind::Identifier);
    }

    #[test]
    fn test_number_out_of_range_is_identifier() {
        assert_eq!(classify_word("99999999999999999999"), TokenKind::Identifier);
        assert_eq!(classify_word("12abc"), TokenKind::Identifier);
    }

    #[test]
    fn test_keyword_wins_over_operator() {
        // Словесные операторы C++ остаются ключевыми словами.
        for word in ["and", "or", "not", "xor", "bitand"] {
            assert_eq!(classify_word(word), TokenKind::Keyword);
        }
    }

    #[test]
    fn test_tables_are_disjoint() {
        for kw in KEYWORDS {
            assert!(!is_operator(kw));
            assert!(!is_delimiter(kw));
        }
        for op in OPERATORS {
            assert!(!is_delimiter(op));
        }
    }
}
