//! # stagecc
//!
//! Конвейер компиляции из трёх независимых стадий:
//!
//! - [`lexer`] - исходный текст → токены (`Keyword`, `Identifier`, `Number`, `Operator`, `Delimiter`)
//! - [`parser`] - токены → AST с корнем `Program`
//! - [`codegen`] - AST → последовательность текстовых машинных инструкций
//!
//! Стадии связаны только данными: выход одной - вход следующей.
//! Сериализованные контракты стадий описаны в [`wire`].
//!
//! ## Пример
//!
//! ```rust
//! use stagecc::compile;
//!
//! let code = compile("int x = 10;").unwrap();
//! let text: Vec<&str> = code.iter().map(|i| i.text.as_str()).collect();
//! assert_eq!(text, ["LOAD 10, R1", "STORE R1, x"]);
//! ```

// === Стадии ===
pub mod codegen;
pub mod lexer;
pub mod parser;

// === Инфраструктура ===
pub mod config;
pub mod error;
pub mod pipeline;
pub mod wire;

// === Re-exports для удобства ===
pub use codegen::{generate, CodegenError, Instruction};
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, AstNode, NodeKind, ParseError};
pub use pipeline::{compile, Compilation, Pipeline};
