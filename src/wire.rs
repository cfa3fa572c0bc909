//! Сериализованные контракты между стадиями.
//!
//! | Стадия | Вход | Выход |
//! |---|---|---|
//! | Лексер | исходный текст | `[{kind, text}]` |
//! | Парсер | `[{kind, text}]` | `{type, value?, children[]}` |
//! | Генератор | `{type, value?, children[]}` | `[{instruction}]` |
//!
//! Обработчики ниже принимают тело запроса и возвращают тело ответа,
//! поэтому любую стадию можно вынести за любой транспорт. Ошибка
//! декодирования - [`CompileError::MalformedInput`], ошибка кодирования -
//! [`CompileError::SerializationError`]. Глубина вложенности не ограничена.

use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codegen::Instruction;
use crate::error::{CompileError, CompileResult};
use crate::lexer::Token;
use crate::parser::AstNode;
use crate::pipeline::Pipeline;

/// Закодировать значение в JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CompileResult<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::new(&mut out);
    serialize_deep(value, &mut ser)?;
    into_utf8(out)
}

/// Закодировать значение в JSON с отступами.
pub fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> CompileResult<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::pretty(&mut out);
    serialize_deep(value, &mut ser)?;
    into_utf8(out)
}

/// Глубина дерева не ограничена: стек растёт по мере вложенности.
fn serialize_deep<T, S>(value: &T, ser: S) -> CompileResult<()>
where
    T: Serialize + ?Sized,
    S: serde::Serializer<Ok = ()>,
{
    value
        .serialize(serde_stacker::Serializer::new(ser))
        .map_err(|e| CompileError::SerializationError(e.to_string()))
}

fn into_utf8(bytes: Vec<u8>) -> CompileResult<String> {
    String::from_utf8(bytes).map_err(|e| CompileError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(payload: &str, what: &str) -> CompileResult<T> {
    let malformed =
        |e: serde_json::Error| CompileError::MalformedInput(format!("invalid {}: {}", what, e));

    // Лимит вложенности serde_json отключён, стек растёт через stacker.
    let mut de = serde_json::Deserializer::from_str(payload);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(malformed)?;
    de.end().map_err(malformed)?;
    Ok(value)
}

/// Декодировать последовательность токенов.
pub fn decode_tokens(payload: &str) -> CompileResult<Vec<Token>> {
    decode(payload, "tokens")
}

/// Декодировать AST.
pub fn decode_ast(payload: &str) -> CompileResult<AstNode> {
    decode(payload, "AST")
}

/// Декодировать последовательность инструкций.
pub fn decode_instructions(payload: &str) -> CompileResult<Vec<Instruction>> {
    decode(payload, "instructions")
}

/// Стадия лексера: исходный текст → JSON токенов.
pub fn tokenize_handler(source: &str, pipeline: &Pipeline) -> CompileResult<String> {
    let tokens = pipeline.tokenize(source);
    trace!("tokenize handler: {} tokens", tokens.len());
    encode(&tokens)
}

/// Стадия парсера: JSON токенов → JSON AST.
pub fn parse_handler(payload: &str, pipeline: &Pipeline) -> CompileResult<String> {
    let tokens = decode_tokens(payload)?;
    debug!("parse handler: received {} tokens", tokens.len());
    let ast = pipeline.parse(&tokens)?;
    encode(&ast)
}

/// Стадия генератора: JSON AST → JSON инструкций.
pub fn generate_handler(payload: &str, pipeline: &Pipeline) -> CompileResult<String> {
    let ast = decode_ast(payload)?;
    debug!("generate handler: received AST with {} nodes", ast.node_count());
    let instructions = pipeline.generate(&ast)?;
    encode(&instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_chain() {
        let pipeline = Pipeline::default();
        let tokens = tokenize_handler("int x = 10;", &pipeline).unwrap();
        assert_eq!(
            tokens,
            r#"[{"kind":"Keyword","text":"int"},{"kind":"Identifier","text":"x"},{"kind":"Operator","text":"="},{"kind":"Number","text":"10"},{"kind":"Delimiter","text":";"}]"#
        );

        let ast = parse_handler(&tokens, &pipeline).unwrap();
        let code = generate_handler(&ast, &pipeline).unwrap();
        assert_eq!(
            code,
            r#"[{"instruction":"LOAD 10, R1"},{"instruction":"STORE R1, x"}]"#
        );
    }

    #[test]
    fn test_parse_handler_accepts_legacy_tokens() {
        let payload = r#"[{"type":"KEYWORD","value":"int"},{"type":"IDENTIFIER","value":"x"},{"type":"OPERATOR","value":"="},{"type":"NUMBER","value":"10"},{"type":"DELIMITER","value":";"}]"#;
        let pipeline = Pipeline::default();
        let ast = decode_ast(&parse_handler(payload, &pipeline).unwrap()).unwrap();
        assert_eq!(ast.children.len(), 1);
    }

    #[test]
    fn test_malformed_payloads() {
        let pipeline = Pipeline::default();
        assert!(matches!(
            parse_handler("not json", &pipeline),
            Err(CompileError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_handler(r#"[{"kind":"Symbol","text":"x"}]"#, &pipeline),
            Err(CompileError::MalformedInput(_))
        ));
        assert!(matches!(
            generate_handler(r#"{"value":"x"}"#, &pipeline),
            Err(CompileError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_generate_handler_reports_unknown_kind() {
        let pipeline = Pipeline::default();
        let payload = r#"{"type":"Program","children":[{"type":"Lambda"}]}"#;
        assert!(matches!(
            generate_handler(payload, &pipeline),
            Err(CompileError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_parse_handler_reports_no_match() {
        let pipeline = Pipeline::default();
        let payload = r#"[{"kind":"Delimiter","text":")"}]"#;
        assert!(matches!(
            parse_handler(payload, &pipeline),
            Err(CompileError::NoMatchingProduction(_))
        ));
    }

    #[test]
    fn test_handlers_chain_on_deep_expression() {
        let pipeline = Pipeline::default();
        let terms: Vec<String> = (0..2000).map(|i| i.to_string()).collect();
        let source = format!("int x = {};", terms.join(" + "));

        let tokens = tokenize_handler(&source, &pipeline).unwrap();
        let ast = parse_handler(&tokens, &pipeline).unwrap();
        let code = generate_handler(&ast, &pipeline).unwrap();
        assert_eq!(
            decode_instructions(&code).unwrap(),
            pipeline.compile(&source).unwrap()
        );
    }

    #[test]
    fn test_handlers_chain_on_nested_blocks() {
        let pipeline = Pipeline::default();
        let depth = 1000;
        let source = format!(
            "{}x = 1;{}",
            "if (y) {".repeat(depth),
            "}".repeat(depth)
        );

        let ast_json = parse_handler(&tokenize_handler(&source, &pipeline).unwrap(), &pipeline).unwrap();
        let ast = decode_ast(&ast_json).unwrap();
        assert_eq!(ast.depth(), 2 * depth + 4);
        assert_eq!(encode(&ast).unwrap(), ast_json);
        assert!(encode_pretty(&ast).unwrap().len() > ast_json.len());

        let code = decode_instructions(&generate_handler(&ast_json, &pipeline).unwrap()).unwrap();
        assert_eq!(code.len(), 3 * depth + 2);
    }

    #[test]
    fn test_trailing_payload_is_malformed() {
        assert!(matches!(
            decode_tokens(r#"[] []"#),
            Err(CompileError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_encode_failure_is_serialization_error() {
        let map = std::collections::BTreeMap::from([(vec![1u8], 1u8)]);
        assert!(matches!(
            encode(&map),
            Err(CompileError::SerializationError(_))
        ));
    }

    #[test]
    fn test_instructions_roundtrip() {
        let code = vec![Instruction::new("LOAD 1, R1"), Instruction::new("RET R1")];
        assert_eq!(decode_instructions(&encode(&code).unwrap()).unwrap(), code);
    }
}
