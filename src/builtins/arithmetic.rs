//! Arithmetic operations: +, -, *, /, %
//!
//! - `+`: sum of all arguments (identity 0)
//! - `-`: subtract subsequent args from the first, or negate a lone arg
//! - `*`: product of all arguments (identity 1)
//! - `/`: divide the first by subsequent args, or reciprocal of a lone arg
//! - `%`: remainder, exactly two arguments

use crate::error::EvalError;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn add(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Num(args.iter().map(Arg::num).sum()))
}

fn sub(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    match args {
        [] => Err(EvalError::arity("at least 1", 0)),
        [only] => Ok(Arg::Num(-only.num())),
        [first, rest @ ..] => Ok(Arg::Num(rest.iter().fold(first.num(), |acc, a| acc - a.num()))),
    }
}

fn mul(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Num(args.iter().map(Arg::num).product()))
}

fn div(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    match args {
        [] => Err(EvalError::arity("at least 1", 0)),
        [only] => {
            if only.num() == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Arg::Num(1.0 / only.num()))
        }
        [first, rest @ ..] => {
            let mut acc = first.num();
            for a in rest {
                if a.num() == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                acc /= a.num();
            }
            Ok(Arg::Num(acc))
        }
    }
}

fn rem(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    if args[1].num() == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Arg::Num(args[0].num() % args[1].num()))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.arithmetic",
        vec![
            ("+", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Num, 0, add).variadic().doc("(+ n...) sum"))),
            ("-", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Num, 1, sub).variadic().doc("(- n...) subtract/negate"))),
            ("*", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Num, 0, mul).variadic().doc("(* n...) product"))),
            ("/", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Num, 1, div).variadic().doc("(/ n...) divide/reciprocal"))),
            ("%", Builtin::Function(FunctionSpec::new(vec![ValueType::Num, ValueType::Num], ValueType::Num, 2, rem).doc("(% a b) remainder"))),
        ],
    )
    .expect("stdlib module names are trusted");
}
