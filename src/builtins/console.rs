//! Console output: `display`, `newline`, `print` — all write through
//! the environment's shared output sink rather than directly to
//! `stdout`, so batch runs, REPL sessions and embedders that capture
//! output into a buffer all see the same writes.

use crate::error::EvalError;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn display(args: &[Arg], env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let tok = args[0].token().expect("display receives a raw token");
    let rendered = match tok.tag {
        crate::token::TokenTag::Str => tok.literal.clone(),
        _ => tok.to_display_string(true),
    };
    env.stdout.write_str(&rendered);
    Ok(Arg::Void)
}

fn newline(_args: &[Arg], env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    env.stdout.write_str("\n");
    Ok(Arg::Void)
}

fn print(args: &[Arg], env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            env.stdout.write_str(" ");
        }
        let tok = a.token().expect("print receives raw tokens");
        let rendered = match tok.tag {
            crate::token::TokenTag::Str => tok.literal.clone(),
            _ => tok.to_display_string(true),
        };
        env.stdout.write_str(&rendered);
    }
    env.stdout.write_str("\n");
    Ok(Arg::Void)
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.console",
        vec![
            ("display", Builtin::Function(FunctionSpec::new(vec![ValueType::Any], ValueType::Void, 1, display).raw_token(0).doc("(display v)"))),
            ("newline", Builtin::Function(FunctionSpec::new(vec![], ValueType::Void, 0, newline).doc("(newline)"))),
            ("print", Builtin::Function(FunctionSpec::new(vec![ValueType::Any], ValueType::Void, 0, print).variadic().raw_token(0).doc("(print v...)"))),
        ],
    )
    .expect("stdlib module names are trusted");
}
