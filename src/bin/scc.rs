//! scc - командная строка конвейера stagecc.
//!
//! Каждая стадия вызывается отдельно и читает вход из файла, `-e` или stdin,
//! поэтому стадии соединяются через pipe:
//!
//! ```bash
//! scc tokenize -e "int x = 10;" | scc parse | scc generate
//! scc compile program.c
//! scc check program.c
//! scc repl
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use stagecc::wire::{self, decode_ast, decode_tokens, encode_pretty};
use stagecc::{CompileError, CompileResult, CompilerConfig, Pipeline};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Staged compiler: tokenizer, syntax builder and code generator
#[derive(Parser)]
#[command(name = "scc")]
#[command(version)]
#[command(about = "Staged compiler pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a stagecc.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Keep multi-character operators split into single characters
    #[arg(long, global = true)]
    split_operators: bool,

    /// Number of registers available to the code generator
    #[arg(long, global = true)]
    max_registers: Option<usize>,
}

#[derive(Args)]
struct Input {
    /// Input file ('-' or omitted reads stdin)
    file: Option<PathBuf>,

    /// Inline input instead of a file
    #[arg(short = 'e', long = "eval", conflicts_with = "file")]
    inline: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Source text -> JSON tokens
    Tokenize {
        #[command(flatten)]
        input: Input,

        /// Print one token per line instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// JSON tokens -> JSON AST
    Parse {
        #[command(flatten)]
        input: Input,

        /// Treat the input as source text instead of JSON tokens
        #[arg(long)]
        source: bool,

        /// Print an indented tree instead of JSON
        #[arg(long)]
        tree: bool,
    },

    /// JSON AST -> instructions
    Generate {
        #[command(flatten)]
        input: Input,

        /// Treat the input as source text instead of a JSON AST
        #[arg(long)]
        source: bool,

        /// Print JSON instead of one instruction per line
        #[arg(long)]
        json: bool,
    },

    /// Source text -> instructions (all three stages)
    Compile {
        #[command(flatten)]
        input: Input,

        /// Print JSON instead of one instruction per line
        #[arg(long)]
        json: bool,
    },

    /// Report every syntax error in the source
    Check {
        #[command(flatten)]
        input: Input,
    },

    /// Interactive session
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let pipeline = Pipeline::new(config);

    match run(cli.command, &pipeline) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> CompileResult<CompilerConfig> {
    let mut config = CompilerConfig::discover(cli.config.as_deref())?;
    if cli.split_operators {
        config.lexer.merge_operators = false;
    }
    if let Some(max) = cli.max_registers {
        if max == 0 {
            return Err(CompileError::ConfigError(
                "--max-registers must be at least 1".to_string(),
            ));
        }
        config.codegen.max_registers = max;
    }
    debug!("effective config: {:?}", config);
    Ok(config)
}

fn run(command: Commands, pipeline: &Pipeline) -> CompileResult<ExitCode> {
    match command {
        Commands::Tokenize { input, text } => {
            let source = read_input(&input)?;
            let tokens = pipeline.tokenize(&source);
            if text {
                for token in &tokens {
                    println!("{}", token);
                }
            } else {
                println!("{}", wire::encode(&tokens)?);
            }
        }
        Commands::Parse {
            input,
            source,
            tree,
        } => {
            let payload = read_input(&input)?;
            let tokens = if source {
                pipeline.tokenize(&payload)
            } else {
                decode_tokens(&payload)?
            };
            let ast = match pipeline.parse(&tokens) {
                Ok(ast) => ast,
                Err(e) => return Ok(report(&e, source.then_some(payload.as_str()))),
            };
            if tree {
                print!("{}", ast.pretty());
            } else {
                println!("{}", wire::encode(&ast)?);
            }
        }
        Commands::Generate {
            input,
            source,
            json,
        } => {
            let payload = read_input(&input)?;
            let ast = if source {
                let tokens = pipeline.tokenize(&payload);
                match pipeline.parse(&tokens) {
                    Ok(ast) => ast,
                    Err(e) => return Ok(report(&e, Some(payload.as_str()))),
                }
            } else {
                decode_ast(&payload)?
            };
            let instructions = pipeline.generate(&ast)?;
            print_instructions(&instructions, json)?;
        }
        Commands::Compile { input, json } => {
            let source = read_input(&input)?;
            let instructions = match pipeline.compile(&source) {
                Ok(instructions) => instructions,
                Err(e) => return Ok(report(&e, Some(source.as_str()))),
            };
            print_instructions(&instructions, json)?;
        }
        Commands::Check { input } => {
            let source = read_input(&input)?;
            let errors = pipeline.diagnose(&source);
            if errors.is_empty() {
                println!("ok");
                return Ok(ExitCode::SUCCESS);
            }
            for err in &errors {
                eprintln!("{}", CompileError::from(err.clone()).render(&source));
            }
            eprintln!("{} error(s)", errors.len());
            return Ok(ExitCode::FAILURE);
        }
        Commands::Repl => run_repl(pipeline),
    }
    Ok(ExitCode::SUCCESS)
}

/// Напечатать ошибку; для исходного текста - со строкой и колонкой.
fn report(err: &CompileError, source: Option<&str>) -> ExitCode {
    match source {
        Some(source) => eprintln!("error: {}", err.render(source)),
        None => eprintln!("error: {}", err),
    }
    ExitCode::FAILURE
}

fn read_input(input: &Input) -> CompileResult<String> {
    if let Some(inline) = &input.inline {
        return Ok(inline.clone());
    }
    match &input.file {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path).map_err(|e| {
            CompileError::IoError(format!("cannot read '{}': {}", path.display(), e))
        }),
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn print_instructions(instructions: &[stagecc::Instruction], json: bool) -> CompileResult<()> {
    if json {
        println!("{}", wire::encode(instructions)?);
    } else {
        for instruction in instructions {
            println!("{}", instruction);
        }
    }
    Ok(())
}

// === REPL ===

const REPL_HELP: &str = r#"
Enter source code to compile it, or a command:
    :tokens <src>     Show tokens
    :ast <src>        Show syntax tree
    :json <src>       Show AST as JSON
    :config           Show effective configuration
    :help, :h         Show this help
    :quit, :q         Exit
"#;

/// Запустить REPL.
fn run_repl(pipeline: &Pipeline) {
    println!("stagecc {} - staged compiler", VERSION);
    println!("Type :help for commands, :quit to exit.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to initialize readline: {}", e);
            return;
        }
    };

    let history_path = dirs_next::data_dir()
        .map(|p| p.join("stagecc").join("history.txt"))
        .unwrap_or_else(|| PathBuf::from(".stagecc_history"));
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("scc> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line.starts_with(':') {
                    if !handle_command(line, pipeline) {
                        break;
                    }
                    continue;
                }

                match pipeline.compile(line) {
                    Ok(instructions) => {
                        for instruction in instructions {
                            println!("  {}", instruction);
                        }
                    }
                    Err(e) => eprintln!("{}", e.render(line)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
}

/// Выполнить команду REPL. `false` - выход.
fn handle_command(line: &str, pipeline: &Pipeline) -> bool {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();

    match command {
        ":quit" | ":q" | ":exit" => return false,
        ":help" | ":h" => println!("{}", REPL_HELP),
        ":tokens" => {
            for token in pipeline.tokenize(arg) {
                println!("  {}", token);
            }
        }
        ":ast" | ":json" => {
            let tokens = pipeline.tokenize(arg);
            match pipeline.parse(&tokens) {
                Ok(ast) if command == ":ast" => print!("{}", ast.pretty()),
                Ok(ast) => match encode_pretty(&ast) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("{}", e),
                },
                Err(e) => eprintln!("{}", e.render(arg)),
            }
        }
        ":config" => match pipeline.config().to_toml_string() {
            Ok(text) => print!("{}", text),
            Err(e) => eprintln!("{}", e),
        },
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Type :help for available commands.");
        }
    }
    true
}
