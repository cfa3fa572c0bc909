//! Конвейер: `generate(parse(tokenize(source)))`.
//!
//! Стадии - чистые функции от входа, состояния между запросами нет.
//! Поэтому один [`Pipeline`] можно безопасно использовать из нескольких
//! потоков: общие у них только конфигурация и статические таблицы лексера.

use std::thread;

use log::{debug, info};

use crate::codegen::{self, Instruction};
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::lexer::{self, Token};
use crate::parser::{self, AstNode, ParseError};

/// Результат компиляции со всеми промежуточными артефактами.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub ast: AstNode,
    pub instructions: Vec<Instruction>,
}

/// Три стадии под одной конфигурацией.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: CompilerConfig,
}

impl Pipeline {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Стадия 1: лексический анализ. Ошибок не бывает.
    pub fn tokenize(&self, source: &str) -> Vec<Token> {
        lexer::tokenize_with(source, &self.config.lexer)
    }

    /// Стадия 2: синтаксический анализ.
    pub fn parse(&self, tokens: &[Token]) -> CompileResult<AstNode> {
        Ok(parser::parse(tokens)?)
    }

    /// Синтаксический анализ с восстановлением после ошибок.
    pub fn diagnose(&self, source: &str) -> Vec<ParseError> {
        let tokens = self.tokenize(source);
        parser::parse_recovering(&tokens).1
    }

    /// Стадия 3: генерация кода.
    pub fn generate(&self, ast: &AstNode) -> CompileResult<Vec<Instruction>> {
        Ok(codegen::generate_with(ast, &self.config.codegen)?)
    }

    /// Полная компиляция исходника.
    pub fn compile(&self, source: &str) -> CompileResult<Vec<Instruction>> {
        Ok(self.compile_detailed(source)?.instructions)
    }

    /// Полная компиляция с сохранением токенов и дерева.
    pub fn compile_detailed(&self, source: &str) -> CompileResult<Compilation> {
        let tokens = self.tokenize(source);
        let ast = self.parse(&tokens)?;
        let instructions = self.generate(&ast)?;
        debug!(
            "compiled {} bytes: {} tokens, {} nodes, {} instructions",
            source.len(),
            tokens.len(),
            ast.node_count(),
            instructions.len()
        );
        Ok(Compilation {
            tokens,
            ast,
            instructions,
        })
    }

    /// Скомпилировать несколько исходников параллельно, по потоку на запрос.
    ///
    /// Ошибка одного запроса не влияет на остальные; порядок результатов
    /// совпадает с порядком входов.
    pub fn compile_batch<S>(&self, sources: &[S]) -> Vec<CompileResult<Vec<Instruction>>>
    where
        S: AsRef<str> + Sync,
    {
        info!("compiling batch of {} sources", sources.len());
        thread::scope(|scope| {
            let handles: Vec<_> = sources
                .iter()
                .map(|source| scope.spawn(move || self.compile(source.as_ref())))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(CompileError::IoError("compilation thread panicked".to_string()))
                    })
                })
                .collect()
        })
    }
}

/// Скомпилировать исходник с настройками по умолчанию.
pub fn compile(source: &str) -> CompileResult<Vec<Instruction>> {
    Pipeline::default().compile(source)
}
