//! Абстрактное синтаксическое дерево.
//!
//! Узел сериализуется как `{type, value?, children[]}`. Вид узла - закрытый
//! набор известных видов плюс [`NodeKind::Unknown`] для деревьев, пришедших
//! извне: такой узел доходит до генератора кода и там отвергается.

use serde::{Deserialize, Serialize};

/// Вид узла AST.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    // === Структура программы ===
    Program,
    /// Определение функции (value: имя; дети: Type, Params, Block)
    Function,
    Params,
    /// Параметр функции (value: имя; дети: Type)
    Param,
    /// Имя типа (value: ключевое слово типа)
    Type,

    // === Операторы ===
    /// Объявление (value: тип; дети: Declarator+)
    Declaration,
    /// Объявляемая переменная (value: имя; дети: инициализатор?)
    Declarator,
    Block,
    If,
    While,
    /// Цикл for (дети: init, cond, step, body; пропуски - Empty)
    For,
    Return,
    Break,
    Continue,
    Empty,
    ExprStmt,

    // === Выражения ===
    /// Присваивание (value: оператор `=`, `+=`, ...; дети: Identifier, выражение)
    Assign,
    BinaryExpr,
    UnaryExpr,
    /// Постфиксный `++` / `--`
    PostfixExpr,
    /// Вызов функции (value: имя; дети: аргументы)
    Call,

    // === Листья ===
    Number,
    Bool,
    Identifier,

    /// Вид, неизвестный этой реализации.
    Unknown(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Program => "Program",
            NodeKind::Function => "Function",
            NodeKind::Params => "Params",
            NodeKind::Param => "Param",
            NodeKind::Type => "Type",
            NodeKind::Declaration => "Declaration",
            NodeKind::Declarator => "Declarator",
            NodeKind::Block => "Block",
            NodeKind::If => "If",
            NodeKind::While => "While",
            NodeKind::For => "For",
            NodeKind::Return => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Empty => "Empty",
            NodeKind::ExprStmt => "ExprStmt",
            NodeKind::Assign => "Assign",
            NodeKind::BinaryExpr => "BinaryExpr",
            NodeKind::UnaryExpr => "UnaryExpr",
            NodeKind::PostfixExpr => "PostfixExpr",
            NodeKind::Call => "Call",
            NodeKind::Number => "Number",
            NodeKind::Bool => "Bool",
            NodeKind::Identifier => "Identifier",
            NodeKind::Unknown(name) => name,
        }
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Program" => NodeKind::Program,
            "Function" => NodeKind::Function,
            "Params" => NodeKind::Params,
            "Param" => NodeKind::Param,
            "Type" => NodeKind::Type,
            "Declaration" => NodeKind::Declaration,
            "Declarator" => NodeKind::Declarator,
            "Block" => NodeKind::Block,
            "If" => NodeKind::If,
            "While" => NodeKind::While,
            "For" => NodeKind::For,
            "Return" => NodeKind::Return,
            "Break" => NodeKind::Break,
            "Continue" => NodeKind::Continue,
            "Empty" => NodeKind::Empty,
            "ExprStmt" => NodeKind::ExprStmt,
            "Assign" => NodeKind::Assign,
            "BinaryExpr" => NodeKind::BinaryExpr,
            "UnaryExpr" => NodeKind::UnaryExpr,
            "PostfixExpr" => NodeKind::PostfixExpr,
            "Call" => NodeKind::Call,
            "Number" => NodeKind::Number,
            "Bool" => NodeKind::Bool,
            "Identifier" => NodeKind::Identifier,
            _ => NodeKind::Unknown(name),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Узел AST. Родитель владеет детьми, обратных ссылок нет.
///
/// Обходы дерева (`Drop`, сравнение, подсчёт, печать) итеративны:
/// глубина дерева ограничена только памятью.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub children: Vec<AstNode>,
}

impl AstNode {
    /// Структурный узел без значения.
    pub fn new(kind: NodeKind, children: Vec<AstNode>) -> Self {
        Self {
            kind,
            value: None,
            children,
        }
    }

    /// Лист со значением.
    pub fn leaf(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Узел со значением и детьми.
    pub fn with_value(kind: NodeKind, value: impl Into<String>, children: Vec<AstNode>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
            children,
        }
    }

    /// Пустая программа.
    pub fn program(children: Vec<AstNode>) -> Self {
        Self::new(NodeKind::Program, children)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Число узлов в поддереве (включая сам узел).
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }

    /// Максимальная глубина поддерева.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        max
    }

    /// Отформатировать дерево с отступами (для CLI).
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self, 0)];
        while let Some((node, indent)) = stack.pop() {
            out.push_str(&"  ".repeat(indent));
            out.push_str(node.kind.as_str());
            if let Some(value) = &node.value {
                out.push_str(&format!(" {:?}", value));
            }
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|child| (child, indent + 1)));
        }
        out
    }
}

impl PartialEq for AstNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.kind != b.kind || a.value != b.value || a.children.len() != b.children.len() {
                return false;
            }
            stack.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl Eq for AstNode {}

impl Drop for AstNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}
