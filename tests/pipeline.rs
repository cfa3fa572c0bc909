//! Сквозные тесты конвейера через публичный API и JSON-контракты.

use std::io::Write;

use stagecc::wire::{decode_ast, decode_tokens, encode, generate_handler, parse_handler, tokenize_handler};
use stagecc::{
    compile, generate, parse, tokenize, CompileError, CompilerConfig, NodeKind, Pipeline, Token,
    TokenKind,
};

fn texts(code: &[stagecc::Instruction]) -> Vec<&str> {
    code.iter().map(|i| i.text.as_str()).collect()
}

#[test]
fn test_reference_tokens() {
    assert_eq!(
        tokenize("int x = 10;"),
        vec![
            Token::new(TokenKind::Keyword, "int"),
            Token::new(TokenKind::Identifier, "x"),
            Token::new(TokenKind::Operator, "="),
            Token::new(TokenKind::Number, "10"),
            Token::new(TokenKind::Delimiter, ";"),
        ]
    );
}

#[test]
fn test_tokens_concatenate_to_source_without_whitespace() {
    let source = "int main() {\n\tint a = 3;\n\twhile (a >= 1) a -= 1;\n\treturn a;\n}";
    let joined: String = tokenize(source).iter().map(|t| t.text.as_str()).collect();
    let stripped: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(joined, stripped);
}

#[test]
fn test_empty_token_sequence() {
    let ast = parse(&[]).unwrap();
    assert_eq!(ast.kind, NodeKind::Program);
    assert!(ast.children.is_empty());
    assert!(generate(&ast).unwrap().is_empty());
}

#[test]
fn test_stages_over_json_match_direct_calls() {
    let source = "int f(int n) { return n * 2; } int y = f(21);";
    let pipeline = Pipeline::default();

    let tokens_json = tokenize_handler(source, &pipeline).unwrap();
    let ast_json = parse_handler(&tokens_json, &pipeline).unwrap();
    let code_json = generate_handler(&ast_json, &pipeline).unwrap();

    let tokens = decode_tokens(&tokens_json).unwrap();
    assert_eq!(tokens, tokenize(source));
    let ast = decode_ast(&ast_json).unwrap();
    assert_eq!(ast, parse(&tokens).unwrap());
    assert_eq!(code_json, encode(&compile(source).unwrap()).unwrap());
}

#[test]
fn test_generation_is_idempotent() {
    let ast = parse(&tokenize("int i = 0; while (i < 3) { if (i == 1) i += 2; else i++; }")).unwrap();
    let first = generate(&ast).unwrap();
    let second = generate(&ast).unwrap();
    assert_eq!(first, second);
    assert_eq!(texts(&first).first(), Some(&"LOAD 0, R1"));
}

#[test]
fn test_function_program() {
    let code = compile("int add(int a, int b) { return a + b; }").unwrap();
    assert_eq!(
        texts(&code),
        [
            "FUNC add",
            "ARG a",
            "ARG b",
            "LOAD a, R1",
            "LOAD b, R2",
            "ADD R1, R1, R2",
            "RET R1",
            "END add",
        ]
    );
}

#[test]
fn test_unsupported_kind_from_json() {
    let ast = decode_ast(r#"{"type":"Program","children":[{"type":"Goto","value":"L"}]}"#).unwrap();
    assert_eq!(ast.children[0].kind, NodeKind::Unknown("Goto".to_string()));
    let err = Pipeline::default().generate(&ast).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstruct(_)));
}

#[test]
fn test_parse_failure_is_no_matching_production() {
    let err = compile("int x = ;").unwrap_err();
    assert!(matches!(err, CompileError::NoMatchingProduction(_)));
    assert!(err.render("int x = ;").starts_with("1:9: "));
}

#[test]
fn test_config_file_controls_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[codegen]\nmax_registers = 1").unwrap();

    let config = CompilerConfig::load(file.path()).unwrap();
    assert_eq!(config.codegen.max_registers, 1);
    assert!(config.lexer.merge_operators);

    let pipeline = Pipeline::new(config);
    assert!(pipeline.compile("int x = 10;").is_ok());
    assert!(matches!(
        pipeline.compile("int x = 1 + 2;"),
        Err(CompileError::UnsupportedConstruct(_))
    ));
}

#[test]
fn test_discover_with_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stagecc.toml");
    std::fs::write(&path, "[lexer]\nmerge_operators = false\n").unwrap();

    let config = CompilerConfig::discover(Some(&path)).unwrap();
    assert!(!config.lexer.merge_operators);

    let tokens = Pipeline::new(config).tokenize("a<=b");
    let ops: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Operator)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(ops, ["<", "="]);
}

#[test]
fn test_batch_compilation() {
    let sources = vec![
        "int a = 1;".to_string(),
        "int b = ;".to_string(),
        "int c = 2 * 3;".to_string(),
    ];
    let results = Pipeline::default().compile_batch(&sources);
    assert_eq!(texts(results[0].as_ref().unwrap()), ["LOAD 1, R1", "STORE R1, a"]);
    assert!(results[1].is_err());
    assert_eq!(
        texts(results[2].as_ref().unwrap()),
        ["LOAD 2, R1", "LOAD 3, R2", "MUL R1, R1, R2", "STORE R1, c"]
    );
}

#[test]
fn test_deep_unary_chain_compiles_and_drops() {
    let depth = 100_000;
    let source = format!("x = {}y;", "!".repeat(depth));

    let code = compile(&source).unwrap();
    assert_eq!(code.len(), depth + 2);
    assert_eq!(code.last().map(|i| i.text.as_str()), Some("STORE R1, x"));

    let result = Pipeline::default().compile_detailed(&source).unwrap();
    assert_eq!(result.ast.depth(), depth + 4);
    assert_eq!(result.ast.node_count(), depth + 4);
    drop(result);
}

#[test]
fn test_deep_program_through_json_stages() {
    let pipeline = Pipeline::default();
    let terms: Vec<String> = (0..500).map(|i| format!("v{i}")).collect();
    let source = format!(
        "int main() {{ {}int x = {}; {}return x; }}",
        "while (go) {".repeat(200),
        terms.join(" - "),
        "}".repeat(200)
    );

    let tokens = tokenize_handler(&source, &pipeline).unwrap();
    let ast = parse_handler(&tokens, &pipeline).unwrap();
    let code = generate_handler(&ast, &pipeline).unwrap();
    assert_eq!(code, encode(&compile(&source).unwrap()).unwrap());
}
