//! Comparison operations: =, <, >, <=, >=
//!
//! `=` compares by value across numbers, strings, symbols and booleans;
//! the ordering operators require numeric arguments and test that each
//! argument is strictly (or non-strictly) ordered against the next.

use crate::error::EvalError;
use crate::token::TokenTag;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn eq(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let first = args[0].token().expect("= receives raw tokens");
    Ok(Arg::Bool(args[1..].iter().all(|a| tokens_equal(first, a.token().expect("= receives raw tokens")))))
}

fn tokens_equal(a: &crate::token::Token, b: &crate::token::Token) -> bool {
    match (a.tag, b.tag) {
        (TokenTag::Num, TokenTag::Num) => a.as_number() == b.as_number(),
        (TokenTag::Bool, TokenTag::Bool) => a.literal == b.literal,
        (TokenTag::Str, TokenTag::Str) => a.literal == b.literal,
        (TokenTag::Sym, TokenTag::Sym) => a.as_symbol().map(|s| s.id) == b.as_symbol().map(|s| s.id),
        (TokenTag::Void, TokenTag::Void) => true,
        _ => false,
    }
}

fn eq_identity(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let a = args[0].token().expect("eq? receives raw tokens");
    let b = args[1].token().expect("eq? receives raw tokens");
    let result = match (a.as_symbol(), b.as_symbol()) {
        (Some(sa), Some(sb)) => sa.id == sb.id,
        _ => tokens_equal(a, b),
    };
    Ok(Arg::Bool(result))
}

fn equal_deep(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    let a = args[0].token().expect("equal? receives raw tokens");
    let b = args[1].token().expect("equal? receives raw tokens");
    Ok(Arg::Bool(deep_equal(a, b)))
}

fn deep_equal(a: &crate::token::Token, b: &crate::token::Token) -> bool {
    match (a.as_list(), b.as_list()) {
        (Some(la), Some(lb)) => la.len() == lb.len() && la.iter().zip(lb.iter()).all(|(x, y)| deep_equal(x, y)),
        _ => tokens_equal(a, b),
    }
}

fn ordering(args: &[Arg], cmp: impl Fn(f64, f64) -> bool) -> Result<Arg, EvalError> {
    let nums: Vec<f64> = args.iter().map(Arg::num).collect();
    Ok(Arg::Bool(nums.windows(2).all(|w| cmp(w[0], w[1]))))
}

fn lt(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    ordering(args, |a, b| a < b)
}
fn gt(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    ordering(args, |a, b| a > b)
}
fn le(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    ordering(args, |a, b| a <= b)
}
fn ge(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    ordering(args, |a, b| a >= b)
}

pub fn register(reg: &mut BuiltinRegistry) {
    let eq_spec = FunctionSpec::new(vec![ValueType::Any], ValueType::Bool, 2, eq)
        .variadic()
        .raw_token(0)
        .doc("(= a b...) structural equality");
    reg.register_module(
        "bracket.comparison",
        vec![
            ("=", Builtin::Function(eq_spec)),
            ("eq?", Builtin::Function(FunctionSpec::new(vec![ValueType::Any], ValueType::Bool, 2, eq_identity).raw_token(0).doc("(eq? a b) identity equality"))),
            ("equal?", Builtin::Function(FunctionSpec::new(vec![ValueType::Any], ValueType::Bool, 2, equal_deep).raw_token(0).doc("(equal? a b) structural equality"))),
            ("<", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Bool, 2, lt).variadic().doc("(< a b...) strictly increasing"))),
            (">", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Bool, 2, gt).variadic().doc("(> a b...) strictly decreasing"))),
            ("<=", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Bool, 2, le).variadic().doc("(<= a b...) non-decreasing"))),
            (">=", Builtin::Function(FunctionSpec::new(vec![ValueType::Num], ValueType::Bool, 2, ge).variadic().doc("(>= a b...) non-increasing"))),
        ],
    )
    .expect("stdlib module names are trusted");
}

#[cfg(test)]
mod tests {
    use crate::driver::{run, RunOutcome};
    use crate::env::Environment;

    fn eval_str(src: &str) -> String {
        let env = Environment::root("test");
        match run(src, &env, |_| {}) {
            RunOutcome::Value(v) => v.to_string(),
            RunOutcome::Incomplete => panic!("incomplete input: {src}"),
        }
    }

    #[test]
    fn numeric_equality_across_many_args() {
        assert_eq!(eval_str("(= 1 1 1)"), "#t");
        assert_eq!(eval_str("(= 1 1 2)"), "#f");
    }

    #[test]
    fn eq_is_identity_for_symbols_but_equal_is_structural() {
        assert_eq!(eval_str("(eq? 'a 'a)"), "#t");
        assert_eq!(eval_str("(equal? (list 1 2) (list 1 2))"), "#t");
        assert_eq!(eval_str("(eq? (list 1 2) (list 1 2))"), "#f");
    }

    #[test]
    fn ordering_checks_strict_and_non_strict_chains() {
        assert_eq!(eval_str("(< 1 2 3)"), "#t");
        assert_eq!(eval_str("(< 1 3 2)"), "#f");
        assert_eq!(eval_str("(<= 1 1 2)"), "#t");
        assert_eq!(eval_str("(> 3 2 1)"), "#t");
        assert_eq!(eval_str("(>= 3 3 2)"), "#t");
    }
}
