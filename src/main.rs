use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use log::info;

use lark::interpreter::Interpreter;
use lark::parser::Parser;
use lark::resolver::Resolver;
use lark::scanner::Scanner;
use lark::stmt::Stmt;
use lark::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the script to run.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    let Some(path) = args.script else {
        eprintln!("script file was not provided");
        process::exit(1);
    };

    let source: Vec<u8> = fs::read(&path)?;

    info!("Running {} ({} bytes)", path.display(), source.len());

    // Scan.  Lexical errors are reported and scanning continues, so later
    // diagnostics still surface.
    let mut had_syntax_error = false;
    let mut tokens: Vec<Token> = Vec::new();

    for item in Scanner::new(&source) {
        match item {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_syntax_error = true;
                eprintln!("{}", e);
            }
        }
    }

    // Parse with panic-mode recovery; collect every diagnostic.
    let mut parser: Parser = Parser::new(tokens);
    let statements: Vec<Stmt> = parser.parse();

    for e in parser.errors() {
        eprintln!("{}", e);
    }

    if had_syntax_error || parser.had_error() {
        process::exit(65);
    }

    // Resolve; static analysis halts on the first error.
    let mut interpreter: Interpreter = Interpreter::new();

    if let Err(e) = Resolver::new(&mut interpreter).resolve(&statements) {
        eprintln!("{}", e);
        process::exit(65);
    }

    // Evaluate best-effort: a runtime error aborts its statement, is
    // reported, and execution continues with the next top-level statement.
    let mut had_runtime_error = false;

    for stmt in &statements {
        if let Err(e) = interpreter.run(stmt) {
            had_runtime_error = true;
            eprintln!("{}", e);
        }
    }

    if had_runtime_error {
        process::exit(70);
    }

    Ok(())
}
