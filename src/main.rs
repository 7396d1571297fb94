mod ast;
mod builtins;
mod config;
mod driver;
mod env;
mod error;
mod eval;
mod expand;
mod lexer;
mod parser;
mod token;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use driver::{is_printable, run, run_file, RunOutcome};
use env::Environment;

const HISTORY_FILE: &str = ".bracket_history";

/// A tree-walking Scheme-family interpreter.
#[derive(Parser, Debug)]
#[command(name = "bracket")]
#[command(version = config::VERSION)]
#[command(about = "A tree-walking s-expression interpreter")]
struct CliArgs {
    /// Script file to execute. Starts the REPL when omitted.
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Some(path) = args.script {
        let env = Environment::root(path.display().to_string());
        return match run_file(&path, &env) {
            Ok(0) => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("bracket: cannot read {}: {e}", path.display());
                ExitCode::FAILURE
            }
        };
    }

    repl()
}

/// Reads lines from the terminal, accumulating them into one buffer
/// whenever the pipeline reports `Incomplete`, and prints `=> value`
/// for every non-ignorable top-level result — the REPL contract.
fn repl() -> ExitCode {
    let env = Environment::root("repl");
    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("bracket: failed to initialize the line editor: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "bracket> " } else { "      -> " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && matches!(line.trim(), "(quit)" | "(exit)") {
                    break;
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                let _ = rl.add_history_entry(line.as_str());

                if buffer.trim().is_empty() {
                    buffer.clear();
                    continue;
                }

                match run(&buffer, &env, |value| {
                    if is_printable(value) {
                        println!("=> {value}");
                    }
                }) {
                    RunOutcome::Incomplete => continue,
                    RunOutcome::Value(_) => buffer.clear(),
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("bracket: {e}");
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    ExitCode::SUCCESS
}
