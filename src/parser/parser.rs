//! Парсер рекурсивного спуска с явным курсором по токенам.
//!
//! Правила грамматики - варианты [`Production`]. Правило выбирается по
//! текущему токену, затем применяется, сдвигая курсор. Поглощённые токены
//! повторно не просматриваются.

use super::ast::{AstNode, NodeKind};
use super::error::ParseError;
use crate::lexer::{Token, TokenKind};

/// Ключевые слова, начинающие объявление.
pub const TYPE_KEYWORDS: &[&str] = &[
    "int", "long", "short", "char", "bool", "unsigned", "signed", "auto", "void",
];

/// Операторы присваивания.
pub const ASSIGN_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

/// Бинарные операторы по уровням приоритета, от слабого к сильному.
const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", "<=", ">", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

const PREFIX_OPERATORS: &[&str] = &["-", "+", "!", "~"];

const INCREMENT_OPERATORS: &[&str] = &["++", "--"];

/// Правила грамматики уровня операторов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    Function,
    Declaration,
    Block,
    If,
    While,
    For,
    Return,
    Break,
    Continue,
    Empty,
    Expression,
}

/// Привести альтернативные написания C++ (`and`, `bitor`, ...) к символам.
fn alternative_operator(word: &str) -> Option<&'static str> {
    match word {
        "and" => Some("&&"),
        "or" => Some("||"),
        "not" => Some("!"),
        "xor" => Some("^"),
        "bitand" => Some("&"),
        "bitor" => Some("|"),
        "compl" => Some("~"),
        "not_eq" => Some("!="),
        "and_eq" => Some("&="),
        "or_eq" => Some("|="),
        "xor_eq" => Some("^="),
        _ => None,
    }
}

/// Похоже ли слово на идентификатор C.
fn is_valid_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Парсер над срезом токенов.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    /// Создать парсер.
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Распарсить всю программу; первая же ошибка прерывает разбор.
    pub fn parse_program(&mut self) -> Result<AstNode, ParseError> {
        let mut items = Vec::new();
        while !self.at_end() {
            items.push(self.parse_item()?);
        }
        Ok(AstNode::program(items))
    }

    /// Распарсить программу, собирая все ошибки.
    ///
    /// После ошибки токены пропускаются до `;` или `}` включительно,
    /// и разбор продолжается со следующего элемента.
    pub fn parse_program_recovering(&mut self) -> (AstNode, Vec<ParseError>) {
        let mut items = Vec::new();
        let mut errors = Vec::new();

        while !self.at_end() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        (AstNode::program(items), errors)
    }

    fn synchronize(&mut self) {
        while let Some(token) = self.advance() {
            if token.is_delimiter(";") || token.is_delimiter("}") {
                break;
            }
        }
    }

    // === Выбор и применение правил ===

    fn parse_item(&mut self) -> Result<AstNode, ParseError> {
        let production = self.select_production(true)?;
        self.apply(production)
    }

    fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        // Глубоко вложенные блоки не должны переполнять стек.
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let production = self.select_production(false)?;
            self.apply(production)
        })
    }

    /// Выбрать правило по текущему токену.
    fn select_production(&self, top_level: bool) -> Result<Production, ParseError> {
        let token = self.peek_or_eof("statement")?;

        let production = match token.kind {
            TokenKind::Keyword => match token.text.as_str() {
                t if TYPE_KEYWORDS.contains(&t) => {
                    if top_level && self.is_function_header() {
                        Some(Production::Function)
                    } else {
                        Some(Production::Declaration)
                    }
                }
                "if" => Some(Production::If),
                "while" => Some(Production::While),
                "for" => Some(Production::For),
                "return" => Some(Production::Return),
                "break" => Some(Production::Break),
                "continue" => Some(Production::Continue),
                "true" | "false" | "not" | "compl" => Some(Production::Expression),
                _ => None,
            },
            TokenKind::Delimiter => match token.text.as_str() {
                "{" => Some(Production::Block),
                ";" => Some(Production::Empty),
                "(" => Some(Production::Expression),
                _ => None,
            },
            TokenKind::Identifier | TokenKind::Number => Some(Production::Expression),
            TokenKind::Operator => {
                let text = token.text.as_str();
                if PREFIX_OPERATORS.contains(&text) || INCREMENT_OPERATORS.contains(&text) {
                    Some(Production::Expression)
                } else {
                    None
                }
            }
        };

        production.ok_or_else(|| ParseError::no_match(self.pos, token, "statement"))
    }

    fn apply(&mut self, production: Production) -> Result<AstNode, ParseError> {
        match production {
            Production::Function => self.parse_function(),
            Production::Declaration => self.parse_declaration(),
            Production::Block => self.parse_block(),
            Production::If => self.parse_if(),
            Production::While => self.parse_while(),
            Production::For => self.parse_for(),
            Production::Return => self.parse_return(),
            Production::Break => self.parse_jump(NodeKind::Break),
            Production::Continue => self.parse_jump(NodeKind::Continue),
            Production::Empty => {
                self.expect_delimiter(";")?;
                Ok(AstNode::new(NodeKind::Empty, Vec::new()))
            }
            Production::Expression => {
                let expr = self.parse_expression()?;
                self.expect_delimiter(";")?;
                Ok(AstNode::new(NodeKind::ExprStmt, vec![expr]))
            }
        }
    }

    /// `type IDENT (` - начало определения функции.
    fn is_function_header(&self) -> bool {
        let name = self.tokens.get(self.pos + 1);
        let paren = self.tokens.get(self.pos + 2);
        matches!(name, Some(t) if t.kind == TokenKind::Identifier)
            && matches!(paren, Some(t) if t.is_delimiter("("))
    }

    // === Операторы ===

    fn parse_function(&mut self) -> Result<AstNode, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        self.expect_delimiter("(")?;
        let params = self.parse_params()?;
        self.expect_delimiter(")")?;
        let body = self.parse_block()?;
        Ok(AstNode::with_value(NodeKind::Function, name, vec![ty, params, body]))
    }

    fn parse_params(&mut self) -> Result<AstNode, ParseError> {
        let mut params = Vec::new();

        if self.check_delimiter(")") {
            return Ok(AstNode::new(NodeKind::Params, params));
        }
        if self.check_keyword("void") && self.peek_at(1).is_some_and(|t| t.is_delimiter(")")) {
            self.advance();
            return Ok(AstNode::new(NodeKind::Params, params));
        }

        loop {
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            params.push(AstNode::with_value(NodeKind::Param, name, vec![ty]));
            if !self.eat_delimiter(",") {
                break;
            }
        }

        Ok(AstNode::new(NodeKind::Params, params))
    }

    fn parse_type(&mut self) -> Result<AstNode, ParseError> {
        let token = self.peek_or_eof("type")?;
        if token.kind == TokenKind::Keyword && TYPE_KEYWORDS.contains(&token.text.as_str()) {
            self.advance();
            Ok(AstNode::leaf(NodeKind::Type, token.text.clone()))
        } else {
            Err(ParseError::no_match(self.pos, token, "type"))
        }
    }

    /// `type declarator (, declarator)* ;`
    fn parse_declaration(&mut self) -> Result<AstNode, ParseError> {
        let ty = self.parse_type()?;
        let ty_name = ty.value().unwrap_or_default().to_string();

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let mut init = Vec::new();
            if self.check_operator("=") {
                self.advance();
                init.push(self.parse_expression()?);
            }
            declarators.push(AstNode::with_value(NodeKind::Declarator, name, init));
            if !self.eat_delimiter(",") {
                break;
            }
        }
        self.expect_delimiter(";")?;

        Ok(AstNode::with_value(NodeKind::Declaration, ty_name, declarators))
    }

    fn parse_block(&mut self) -> Result<AstNode, ParseError> {
        self.expect_delimiter("{")?;
        let mut statements = Vec::new();
        loop {
            if self.at_end() {
                return Err(ParseError::unexpected_eof(self.pos, "'}'"));
            }
            if self.eat_delimiter("}") {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(AstNode::new(NodeKind::Block, statements))
    }

    fn parse_if(&mut self) -> Result<AstNode, ParseError> {
        self.expect_keyword("if")?;
        let cond = self.parse_condition()?;
        let then_branch = self.parse_statement()?;
        let mut children = vec![cond, then_branch];
        if self.check_keyword("else") {
            self.advance();
            children.push(self.parse_statement()?);
        }
        Ok(AstNode::new(NodeKind::If, children))
    }

    fn parse_while(&mut self) -> Result<AstNode, ParseError> {
        self.expect_keyword("while")?;
        let cond = self.parse_condition()?;
        let body = self.parse_statement()?;
        Ok(AstNode::new(NodeKind::While, vec![cond, body]))
    }

    /// `for (init; cond; step) body`, пропущенные части - узлы Empty.
    fn parse_for(&mut self) -> Result<AstNode, ParseError> {
        self.expect_keyword("for")?;
        self.expect_delimiter("(")?;

        let init = if self.check_type_keyword() {
            self.parse_declaration()?
        } else if self.eat_delimiter(";") {
            AstNode::new(NodeKind::Empty, Vec::new())
        } else {
            let expr = self.parse_expression()?;
            self.expect_delimiter(";")?;
            AstNode::new(NodeKind::ExprStmt, vec![expr])
        };

        let cond = if self.check_delimiter(";") {
            AstNode::new(NodeKind::Empty, Vec::new())
        } else {
            self.parse_expression()?
        };
        self.expect_delimiter(";")?;

        let step = if self.check_delimiter(")") {
            AstNode::new(NodeKind::Empty, Vec::new())
        } else {
            self.parse_expression()?
        };
        self.expect_delimiter(")")?;

        let body = self.parse_statement()?;
        Ok(AstNode::new(NodeKind::For, vec![init, cond, step, body]))
    }

    fn parse_return(&mut self) -> Result<AstNode, ParseError> {
        self.expect_keyword("return")?;
        let mut children = Vec::new();
        if !self.check_delimiter(";") {
            children.push(self.parse_expression()?);
        }
        self.expect_delimiter(";")?;
        Ok(AstNode::new(NodeKind::Return, children))
    }

    fn parse_jump(&mut self, kind: NodeKind) -> Result<AstNode, ParseError> {
        self.advance();
        self.expect_delimiter(";")?;
        Ok(AstNode::new(kind, Vec::new()))
    }

    fn parse_condition(&mut self) -> Result<AstNode, ParseError> {
        self.expect_delimiter("(")?;
        let cond = self.parse_expression()?;
        self.expect_delimiter(")")?;
        Ok(cond)
    }

    // === Выражения ===

    /// Распарсить выражение.
    pub fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let start = self.pos;
        let target = self.parse_binary(0)?;

        let op = match self.current_operator() {
            Some(op) if ASSIGN_OPERATORS.contains(&op) => op,
            _ => return Ok(target),
        };

        if target.kind != NodeKind::Identifier {
            return Err(ParseError::InvalidAssignmentTarget {
                index: start,
                span: self.tokens.get(start).and_then(|t| t.span),
                found: target.kind.to_string(),
            });
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(AstNode::with_value(NodeKind::Assign, op, vec![target, value]))
    }

    fn parse_binary(&mut self, level: usize) -> Result<AstNode, ParseError> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.parse_unary();
        };

        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(op) = self.current_operator() {
            if !operators.contains(&op) {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(level + 1)?;
            lhs = AstNode::with_value(NodeKind::BinaryExpr, op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let start = self.pos;
            match self.current_operator() {
                Some(op) if PREFIX_OPERATORS.contains(&op) => {
                    self.advance();
                    let operand = self.parse_unary()?;
                    Ok(AstNode::with_value(NodeKind::UnaryExpr, op, vec![operand]))
                }
                Some(op) if INCREMENT_OPERATORS.contains(&op) => {
                    self.advance();
                    let operand = self.parse_unary()?;
                    if operand.kind != NodeKind::Identifier {
                        return Err(ParseError::InvalidAssignmentTarget {
                            index: start,
                            span: self.tokens.get(start).and_then(|t| t.span),
                            found: operand.kind.to_string(),
                        });
                    }
                    Ok(AstNode::with_value(NodeKind::UnaryExpr, op, vec![operand]))
                }
                _ => self.parse_postfix(),
            }
        })
    }

    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let primary = self.parse_primary()?;
        if primary.kind == NodeKind::Identifier {
            if let Some(op) = self.current_operator() {
                if INCREMENT_OPERATORS.contains(&op) {
                    self.advance();
                    return Ok(AstNode::with_value(NodeKind::PostfixExpr, op, vec![primary]));
                }
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let token = self.peek_or_eof("expression")?;

        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(AstNode::leaf(NodeKind::Number, token.text.clone()))
            }
            TokenKind::Keyword if token.text == "true" || token.text == "false" => {
                self.advance();
                Ok(AstNode::leaf(NodeKind::Bool, token.text.clone()))
            }
            TokenKind::Identifier if is_valid_identifier(&token.text) => {
                self.advance();
                if self.eat_delimiter("(") {
                    let args = self.parse_arguments()?;
                    return Ok(AstNode::with_value(NodeKind::Call, token.text.clone(), args));
                }
                Ok(AstNode::leaf(NodeKind::Identifier, token.text.clone()))
            }
            TokenKind::Delimiter if token.text == "(" => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_delimiter(")")?;
                Ok(expr)
            }
            _ => Err(ParseError::no_match(self.pos, token, "expression")),
        }
    }

    /// Аргументы вызова после `(`, включая закрывающую скобку.
    fn parse_arguments(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();
        if self.eat_delimiter(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat_delimiter(",") {
                break;
            }
        }
        self.expect_delimiter(")")?;
        Ok(args)
    }

    // === Работа с курсором ===

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_or_eof(&self, expected: &str) -> Result<&'t Token, ParseError> {
        self.peek()
            .ok_or_else(|| ParseError::unexpected_eof(self.pos, expected))
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Текущий токен как оператор, с учётом словесных форм (`and`, `not`, ...).
    fn current_operator(&self) -> Option<&'static str> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Operator => crate::lexer::tables::OPERATORS
                .iter()
                .copied()
                .find(|op| *op == token.text),
            TokenKind::Keyword => alternative_operator(&token.text),
            _ => None,
        }
    }

    fn check_delimiter(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_delimiter(text))
    }

    fn check_keyword(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(text))
    }

    fn check_operator(&self, text: &str) -> bool {
        self.current_operator() == Some(text)
    }

    fn check_type_keyword(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Keyword && TYPE_KEYWORDS.contains(&t.text.as_str()))
    }

    fn eat_delimiter(&mut self, text: &str) -> bool {
        if self.check_delimiter(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_delimiter(&mut self, text: &str) -> Result<&'t Token, ParseError> {
        let expected = format!("'{}'", text);
        let token = self.peek_or_eof(&expected)?;
        if token.is_delimiter(text) {
            self.pos += 1;
            Ok(token)
        } else {
            Err(ParseError::no_match(self.pos, token, expected))
        }
    }

    fn expect_keyword(&mut self, text: &str) -> Result<&'t Token, ParseError> {
        let expected = format!("'{}'", text);
        let token = self.peek_or_eof(&expected)?;
        if token.is_keyword(text) {
            self.pos += 1;
            Ok(token)
        } else {
            Err(ParseError::no_match(self.pos, token, expected))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.peek_or_eof("identifier")?;
        if token.kind == TokenKind::Identifier && is_valid_identifier(&token.text) {
            self.pos += 1;
            Ok(token.text.clone())
        } else {
            Err(ParseError::no_match(self.pos, token, "identifier"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(source: &str) -> Result<AstNode, ParseError> {
        let tokens = tokenize(source);
        Parser::new(&tokens).parse_program()
    }

    #[test]
    fn test_parse_declaration() {
        let ast = parse_source("int x = 10;").unwrap();
        assert_eq!(ast.kind, NodeKind::Program);
        assert_eq!(ast.children.len(), 1);

        let decl = &ast.children[0];
        assert_eq!(decl.kind, NodeKind::Declaration);
        assert_eq!(decl.value(), Some("int"));
        assert_eq!(decl.children[0].kind, NodeKind::Declarator);
        assert_eq!(decl.children[0].value(), Some("x"));
        assert_eq!(decl.children[0].children[0], AstNode::leaf(NodeKind::Number, "10"));
    }

    #[test]
    fn test_parse_multiple_declarators() {
        let ast = parse_source("int a = 1, b, c = a;").unwrap();
        let decl = &ast.children[0];
        assert_eq!(decl.children.len(), 3);
        assert!(decl.children[1].children.is_empty());
    }

    #[test]
    fn test_precedence() {
        let ast = parse_source("x = 1 + 2 * 3;").unwrap();
        let assign = &ast.children[0].children[0];
        assert_eq!(assign.kind, NodeKind::Assign);
        let sum = &assign.children[1];
        assert_eq!(sum.value(), Some("+"));
        assert_eq!(sum.children[1].value(), Some("*"));
    }

    #[test]
    fn test_left_associativity() {
        let ast = parse_source("x = 10 - 3 - 2;").unwrap();
        let outer = &ast.children[0].children[0].children[1];
        assert_eq!(outer.value(), Some("-"));
        assert_eq!(outer.children[0].value(), Some("-"));
        assert_eq!(outer.children[1], AstNode::leaf(NodeKind::Number, "2"));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let ast = parse_source("a = b = 3;").unwrap();
        let outer = &ast.children[0].children[0];
        assert_eq!(outer.children[1].kind, NodeKind::Assign);
    }

    #[test]
    fn test_alternative_operator_spelling() {
        let ast = parse_source("x = a and not b;").unwrap();
        let and = &ast.children[0].children[0].children[1];
        assert_eq!(and.value(), Some("&&"));
        assert_eq!(and.children[1].value(), Some("!"));
    }

    #[test]
    fn test_parse_function_and_control_flow() {
        let source = r#"
            int max(int a, int b) {
                if (a > b) return a; else return b;
            }
            int main(void) {
                int i = 0;
                for (int j = 0; j < 10; j++) {
                    while (i < j) { i += 1; }
                    if (i == 5) break;
                }
                return max(i, 3);
            }
        "#;
        let ast = parse_source(source).unwrap();
        assert_eq!(ast.children.len(), 2);

        let max = &ast.children[0];
        assert_eq!(max.kind, NodeKind::Function);
        assert_eq!(max.value(), Some("max"));
        assert_eq!(max.children[1].children.len(), 2);

        let main = &ast.children[1];
        assert!(main.children[1].children.is_empty());
        let body = &main.children[2];
        assert_eq!(body.children[1].kind, NodeKind::For);
        assert_eq!(body.children[2].children[0].kind, NodeKind::Call);
    }

    #[test]
    fn test_for_with_empty_parts() {
        let ast = parse_source("for (;;) ;").unwrap();
        let for_node = &ast.children[0];
        assert_eq!(for_node.children.len(), 4);
        assert!(for_node.children[..3]
            .iter()
            .all(|c| c.kind == NodeKind::Empty));
    }

    #[test]
    fn test_no_matching_production() {
        let err = parse_source("int x = 10; ) y;").unwrap_err();
        match err {
            ParseError::NoMatchingProduction {
                index, found, span, ..
            } => {
                assert_eq!(index, 5);
                assert_eq!(found, "')'");
                assert_eq!(span.map(|s| s.start), Some(12));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_semicolon_is_eof() {
        let err = parse_source("int x = 10").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { index: 4, .. }));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_source("1 = x;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { index: 0, .. }));
    }

    #[test]
    fn test_rejects_malformed_identifier() {
        let err = parse_source("int @ = 1;").unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingProduction { index: 1, .. }));
    }

    #[test]
    fn test_recovering_collects_all_errors() {
        let tokens = tokenize("int x = ; int y = 2; ) ; x = 3;");
        let (ast, errors) = Parser::new(&tokens).parse_program_recovering();
        assert_eq!(errors.len(), 2);
        assert_eq!(ast.children.len(), 2);
        assert_eq!(ast.children[0].children[0].value(), Some("y"));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 2000;
        let source = format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        let ast = parse_source(&source).unwrap();
        assert_eq!(ast.children[0].children[0].children[1], AstNode::leaf(NodeKind::Number, "1"));
    }
}
