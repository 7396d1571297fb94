//! Logic operations.
//!
//! `and`/`or` are builtin macros (see `expander`), expanding into
//! nested `if` so they short-circuit without evaluating unused
//! arguments. `not` is the one logic operator that is actually a
//! function — its argument is evaluated regardless.

use crate::error::EvalError;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn not(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let truthy = args[0].token().map(|t| t.is_truthy()).unwrap_or(false);
    Ok(Arg::Bool(!truthy))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.logic",
        vec![(
            "not",
            Builtin::Function(
                FunctionSpec::new(vec![ValueType::Any], ValueType::Bool, 1, not).raw_token(0).doc("(not x)"),
            ),
        )],
    )
    .expect("stdlib module names are trusted");
}
