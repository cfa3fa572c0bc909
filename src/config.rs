//! Конфигурация конвейера (`stagecc.toml`).
//!
//! ```toml
//! [lexer]
//! merge_operators = true
//!
//! [codegen]
//! max_registers = 16
//! ```
//!
//! Все ключи необязательны. Поиск файла: явный путь, затем `./stagecc.toml`,
//! затем `<config_dir>/stagecc/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::codegen::CodegenConfig;
use crate::error::{CompileError, CompileResult};
use crate::lexer::LexerConfig;

/// Имя файла конфигурации в текущей директории.
pub const CONFIG_FILE: &str = "stagecc.toml";

/// Настройки всех стадий.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerConfig {
    pub lexer: LexerConfig,
    pub codegen: CodegenConfig,
}

impl CompilerConfig {
    /// Разобрать конфигурацию из TOML.
    pub fn from_toml_str(content: &str) -> CompileResult<Self> {
        let config: CompilerConfig =
            toml::from_str(content).map_err(|e| CompileError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфигурацию из файла.
    pub fn load(path: &Path) -> CompileResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CompileError::ConfigError(format!("{}: {}", path.display(), e)))?;
        debug!("loading config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Найти и загрузить конфигурацию; без файла - значения по умолчанию.
    ///
    /// Явно указанный путь обязан существовать.
    pub fn discover(explicit: Option<&Path>) -> CompileResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs_next::config_dir() {
            paths.push(dir.join("stagecc").join("config.toml"));
        }
        paths
    }

    /// Сериализовать в TOML.
    pub fn to_toml_string(&self) -> CompileResult<String> {
        toml::to_string_pretty(self).map_err(|e| CompileError::ConfigError(e.to_string()))
    }

    fn validate(&self) -> CompileResult<()> {
        if self.codegen.max_registers == 0 {
            return Err(CompileError::ConfigError(
                "codegen.max_registers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = CompilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.lexer.merge_operators);
        assert_eq!(config.codegen.max_registers, 16);
    }

    #[test]
    fn test_partial_config() {
        let config = CompilerConfig::from_toml_str("[lexer]\nmerge_operators = false\n").unwrap();
        assert!(!config.lexer.merge_operators);
        assert_eq!(config.codegen.max_registers, 16);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            CompilerConfig::from_toml_str("[codegen]\nmax_registers = 0\n"),
            Err(CompileError::ConfigError(_))
        ));
        assert!(matches!(
            CompilerConfig::from_toml_str("[codegen]\nmax_registers = \"many\"\n"),
            Err(CompileError::ConfigError(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CompilerConfig {
            lexer: LexerConfig {
                merge_operators: false,
            },
            codegen: CodegenConfig { max_registers: 4 },
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(CompilerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_path() {
        let result = CompilerConfig::discover(Some(Path::new("/nonexistent/stagecc.toml")));
        assert!(matches!(result, Err(CompileError::ConfigError(_))));
    }
}
