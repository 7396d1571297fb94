//! Symbol construction: `gensym` produces a fresh, never-interned
//! symbol — the uninterned-id half of the intern table design.

use crate::error::EvalError;
use crate::token::symbols;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn gensym(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let prefix = args.first().map(Arg::str).unwrap_or("g");
    Ok(Arg::Sym(symbols().gensym(prefix)))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.symbols",
        vec![(
            "gensym",
            Builtin::Function(
                FunctionSpec::new(vec![ValueType::Str], ValueType::Sym, 0, gensym).doc("(gensym [prefix])"),
            ),
        )],
    )
    .expect("stdlib module names are trusted");
}
