//! Синтаксический анализ: токены → AST.
//!
//! # Грамматика
//!
//! ```text
//! program     := item*
//! item        := function | statement
//! function    := type IDENT '(' params? ')' block
//! statement   := declaration | block | if | while | for | return
//!              | 'break' ';' | 'continue' ';' | ';' | expr ';'
//! declaration := type IDENT ('=' expr)? (',' IDENT ('=' expr)?)* ';'
//! expr        := assignment | binary | unary | primary
//! ```
//!
//! Пустая последовательность токенов даёт `Program` без детей.
//!
//! # Пример
//!
//! ```rust
//! use stagecc::lexer::tokenize;
//! use stagecc::parser::{parse, NodeKind};
//!
//! let ast = parse(&tokenize("int x = 10;")).unwrap();
//! assert_eq!(ast.kind, NodeKind::Program);
//! assert_eq!(ast.children[0].kind, NodeKind::Declaration);
//! ```

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{AstNode, NodeKind};
pub use error::ParseError;
pub use parser::{Parser, Production};

use crate::lexer::Token;
use log::debug;

/// Построить AST из последовательности токенов.
///
/// Разбор останавливается на первой ошибке: дерево либо строится целиком,
/// либо возвращается [`ParseError`].
pub fn parse(tokens: &[Token]) -> Result<AstNode, ParseError> {
    let ast = Parser::new(tokens).parse_program()?;
    debug!(
        "parsed {} tokens into {} nodes ({} top-level items)",
        tokens.len(),
        ast.node_count(),
        ast.children.len()
    );
    Ok(ast)
}

/// Построить AST, продолжая разбор после ошибок.
///
/// Возвращает дерево из успешно разобранных элементов и список всех ошибок.
/// Используется для диагностики; дерево при наличии ошибок неполное.
pub fn parse_recovering(tokens: &[Token]) -> (AstNode, Vec<ParseError>) {
    let (ast, errors) = Parser::new(tokens).parse_program_recovering();
    debug!(
        "parsed {} tokens with recovery: {} items, {} errors",
        tokens.len(),
        ast.children.len(),
        errors.len()
    );
    (ast, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{tokenize, TokenKind};

    #[test]
    fn test_parse_empty() {
        let ast = parse(&[]).unwrap();
        assert_eq!(ast, AstNode::program(Vec::new()));
    }

    #[test]
    fn test_parse_foreign_tokens_without_spans() {
        let tokens = vec![
            Token::new(TokenKind::Keyword, "int"),
            Token::new(TokenKind::Identifier, "x"),
            Token::new(TokenKind::Operator, "="),
            Token::new(TokenKind::Number, "10"),
            Token::new(TokenKind::Delimiter, ";"),
        ];
        assert_eq!(parse(&tokens).unwrap(), parse(&tokenize("int x = 10;")).unwrap());
    }

    #[test]
    fn test_parse_error_without_span() {
        let tokens = vec![Token::new(TokenKind::Delimiter, "}")];
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err.index(), 0);
        assert_eq!(err.span(), None);
        assert_eq!(
            err.to_string(),
            "No matching production at token 0: expected statement, found '}'"
        );
    }

    #[test]
    fn test_parse_recovering_without_errors_matches_parse() {
        let tokens = tokenize("int a = 1; a = a + 1;");
        let (ast, errors) = parse_recovering(&tokens);
        assert!(errors.is_empty());
        assert_eq!(ast, parse(&tokens).unwrap());
    }
}
