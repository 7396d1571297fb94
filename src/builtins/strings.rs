//! String operations: the minimal set needed to exercise the core —
//! concatenation and conversions to/from the other scalar types. Full
//! string-library coverage (splitting, trimming, case conversion) is
//! standard-library surface beyond what the core needs to exercise.

use crate::error::EvalError;
use crate::token::format_num;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn string_append(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Str(args.iter().map(Arg::str).collect()))
}

fn string_length(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Num(args[0].str().chars().count() as f64))
}

fn number_to_string(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Str(format_num(args[0].num())))
}

fn string_to_number(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    args[0]
        .str()
        .trim()
        .parse::<f64>()
        .map(Arg::Num)
        .map_err(|_| EvalError::type_mismatch("number", "string", args[0].str()))
}

fn symbol_to_string(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Str(args[0].token().and_then(|t| t.as_symbol()).map(|s| s.name.clone()).unwrap_or_default()))
}

fn string_to_symbol(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Sym(crate::token::symbols().intern(args[0].str())))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.strings",
        vec![
            ("string-append", Builtin::Function(FunctionSpec::new(vec![ValueType::Str], ValueType::Str, 0, string_append).variadic().doc("(string-append s...)"))),
            ("string-length", Builtin::Function(FunctionSpec::new(vec![ValueType::Str], ValueType::Num, 1, string_length).doc("(string-length s)"))),
            ("number->string", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Str, 1, number_to_string).doc("(number->string n)"))),
            ("string->number", Builtin::Function(FunctionSpec::new(vec![ValueType::Str], ValueType::Num, 1, string_to_number).doc("(string->number s)"))),
            ("symbol->string", Builtin::Function(FunctionSpec::new(vec![ValueType::Sym], ValueType::Str, 1, symbol_to_string).raw_token(0).doc("(symbol->string s)"))),
            ("string->symbol", Builtin::Function(FunctionSpec::new(vec![ValueType::Str], ValueType::Sym, 1, string_to_symbol).doc("(string->symbol s)"))),
        ],
    )
    .expect("stdlib module names are trusted");
}
