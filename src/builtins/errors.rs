//! User-raised errors: `(error parts…)` concatenates the displayed
//! form of each argument with single spaces and reifies the result as
//! an `Error` token at the call site. There is no catchable `error?`
//! predicate — an `Error` token short-circuits the enclosing call
//! before any predicate could see it, so one isn't provided.

use crate::error::EvalError;
use crate::token::{Pos, Token};

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn error(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let parts: Vec<String> = args
        .iter()
        .filter_map(Arg::token)
        .map(|t| match t.tag {
            crate::token::TokenTag::Str => t.literal.clone(),
            _ => t.to_display_string(true),
        })
        .collect();
    Ok(Arg::Token(Token::error(parts.join(" "), Pos::NONE)))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.errors",
        vec![(
            "error",
            Builtin::Function(
                FunctionSpec::new(vec![ValueType::Any], ValueType::Any, 0, error).variadic().raw_token(0).doc("(error parts...)"),
            ),
        )],
    )
    .expect("stdlib module names are trusted");
}
