//! Генерация кода: AST → последовательность машинных инструкций.
//!
//! Для каждого вида узла есть своё правило понижения (см. [`lower`]).
//! Узел без правила - ошибка [`CodegenError::UnsupportedConstruct`],
//! а не пропуск: генератор никогда не отдаёт усечённую последовательность.
//!
//! Генерация детерминирована: повторный вызов на том же дереве даёт
//! ту же последовательность.
//!
//! # Пример
//!
//! ```rust
//! use stagecc::{codegen::generate, lexer::tokenize, parser::parse};
//!
//! let ast = parse(&tokenize("int x = 10;")).unwrap();
//! let code: Vec<String> = generate(&ast).unwrap().into_iter().map(|i| i.text).collect();
//! assert_eq!(code, vec!["LOAD 10, R1", "STORE R1, x"]);
//! ```

pub mod error;
pub mod instruction;
pub mod lower;

pub use error::CodegenError;
pub use instruction::{BinaryOp, Instruction, Label, Op, Register, UnaryOp};
pub use lower::Generator;

use crate::parser::AstNode;
use log::debug;
use serde::{Deserialize, Serialize};

/// Настройки генератора.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodegenConfig {
    /// Число доступных регистров (`R1..=Rn`).
    pub max_registers: usize,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self { max_registers: 16 }
    }
}

/// Сгенерировать инструкции с настройками по умолчанию.
pub fn generate(ast: &AstNode) -> Result<Vec<Instruction>, CodegenError> {
    generate_with(ast, &CodegenConfig::default())
}

/// Сгенерировать инструкции с заданными настройками.
pub fn generate_with(
    ast: &AstNode,
    config: &CodegenConfig,
) -> Result<Vec<Instruction>, CodegenError> {
    let code = Generator::new(config).generate(ast)?;
    debug!(
        "lowered {} nodes into {} instructions",
        ast.node_count(),
        code.len()
    );
    Ok(code)
}
