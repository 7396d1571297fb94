//! Program driver (component I): the only part of the core that names
//! every other component. `run` takes a source string through
//! lex → parse → expand → eval and surfaces the final value;
//! `run_file` is the batch entry point the CLI wraps (§6's "batch
//! driver" collaborator).

use std::path::Path;
use std::rc::Rc;

use crate::ast::Program;
use crate::env::Environment;
use crate::eval::eval;
use crate::expand::expand;
use crate::lexer::ExitCode;
use crate::parser;
use crate::token::{Pos, Token, TokenTag};

/// Whether a value is worth showing a human — `Void`, `Eof` and `Meta`
/// tokens are plumbing, not results (§4.I step 3).
pub fn is_printable(tok: &Token) -> bool {
    !matches!(tok.tag, TokenTag::Void | TokenTag::Eof | TokenTag::Meta)
}

/// The outcome of feeding one chunk of source through the pipeline.
/// `Incomplete` is the signal a REPL uses to prompt for a continuation
/// line instead of reporting failure.
pub enum RunOutcome {
    Value(Token),
    Incomplete,
}

/// Lexes, parses, expands and evaluates every top-level form in
/// `source` against `env`, in order. `on_value` is called with each
/// non-ignorable intermediate result as it is produced — the REPL
/// passes a printer, a batch run passes a no-op and reads only the
/// final value this function returns.
pub fn run(source: &str, env: &Rc<Environment>, mut on_value: impl FnMut(&Token)) -> RunOutcome {
    let (program, code) = parser::parse_program(source, env.ctx.clone(), "input");
    if code == ExitCode::Incomplete {
        return RunOutcome::Incomplete;
    }
    RunOutcome::Value(run_program(&program, env, &mut on_value))
}

fn run_program(program: &Program, env: &Rc<Environment>, on_value: &mut impl FnMut(&Token)) -> Token {
    let mut last = Token::void(Pos::NONE);
    for form in &program.forms {
        let expanded = expand(form, env);
        let value = eval(&expanded, env);
        if is_printable(&value) {
            on_value(&value);
        }
        last = value;
    }
    last
}

/// Reads `path` as UTF-8, evaluates it top to bottom, and prints only
/// the last non-ignorable value — matching §4.I step 3's "batch prints
/// only the last" rule. Returns the process exit code the §6 batch
/// driver contract calls for: 0 on success, 1 if the final value was
/// an `Error`.
pub fn run_file(path: &Path, env: &Rc<Environment>) -> std::io::Result<i32> {
    let source = std::fs::read_to_string(path)?;
    let value = match run(&source, env, |_| {}) {
        RunOutcome::Value(v) => v,
        RunOutcome::Incomplete => Token::error("unexpected end of input", Pos::NONE),
    };
    if value.tag == TokenTag::Error {
        eprintln!("{value}");
        return Ok(1);
    }
    if is_printable(&value) {
        println!("{value}");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_arithmetic_to_completion() {
        let env = Environment::root("test");
        match run("(+ 1 2 3)", &env, |_| {}) {
            RunOutcome::Value(v) => assert_eq!(v.to_string(), "6"),
            RunOutcome::Incomplete => panic!("expected a value"),
        }
    }

    #[test]
    fn recursive_define_then_call() {
        let env = Environment::root("test");
        let src = "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1))))) (fact 5)";
        match run(src, &env, |_| {}) {
            RunOutcome::Value(v) => assert_eq!(v.to_string(), "120"),
            RunOutcome::Incomplete => panic!("expected a value"),
        }
    }

    #[test]
    fn unterminated_list_is_incomplete() {
        let env = Environment::root("test");
        assert!(matches!(run("(+ 1 2", &env, |_| {}), RunOutcome::Incomplete));
    }

    #[test]
    fn driver_continues_after_a_mid_program_error() {
        let env = Environment::root("test");
        match run("(set! nope 1) (+ 1 1)", &env, |_| {}) {
            RunOutcome::Value(v) => assert_eq!(v.to_string(), "2"),
            RunOutcome::Incomplete => panic!("expected a value"),
        }
    }

    #[test]
    fn map_over_a_quoted_list() {
        let env = Environment::root("test");
        match run("(map (lambda (x) (* x x)) (list 1 2 3))", &env, |_| {}) {
            RunOutcome::Value(v) => assert_eq!(v.to_string(), "'(1 4 9)"),
            RunOutcome::Incomplete => panic!("expected a value"),
        }
    }
}
