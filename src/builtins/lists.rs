//! List operations: cons, car, cdr, list, length, empty?, append,
//! reverse, map.
//!
//! Lists are represented directly as `List`-tagged tokens carrying a
//! vector of child tokens — there is no separate cons-cell chain.

use std::rc::Rc;

use crate::env::Environment;
use crate::error::EvalError;
use crate::eval::apply_callable;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn cons(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let head = args[0].token().expect("cons receives raw tokens").clone();
    let mut items = args[1].list().to_vec();
    items.insert(0, head);
    Ok(Arg::List(items))
}

fn car(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    args[0].list().first().cloned().map(Arg::Token).ok_or(EvalError::IndexOutOfRange { index: 0 })
}

fn cdr(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let items = args[0].list();
    if items.is_empty() {
        return Err(EvalError::IndexOutOfRange { index: 0 });
    }
    Ok(Arg::List(items[1..].to_vec()))
}

fn list(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::List(args.iter().filter_map(Arg::token).cloned().collect()))
}

fn length(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Num(args[0].list().len() as f64))
}

fn empty_p(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Bool(args[0].list().is_empty()))
}

fn append(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let mut out = Vec::new();
    for a in args {
        out.extend(a.list().iter().cloned());
    }
    Ok(Arg::List(out))
}

fn reverse(args: &[Arg], _env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let mut items = args[0].list().to_vec();
    items.reverse();
    Ok(Arg::List(items))
}

fn map(args: &[Arg], env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let callable = args[0].token().expect("map receives a raw procedure token").clone();
    let items = args[1].list();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let result = apply_callable(&callable, std::slice::from_ref(item), env);
        if result.tag == crate::token::TokenTag::Error {
            return Ok(Arg::Token(result));
        }
        out.push(result);
    }
    Ok(Arg::List(out))
}

fn filter(args: &[Arg], env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let callable = args[0].token().expect("filter receives a raw procedure token").clone();
    let items = args[1].list();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let result = apply_callable(&callable, std::slice::from_ref(item), env);
        if result.tag == crate::token::TokenTag::Error {
            return Ok(Arg::Token(result));
        }
        if result.is_truthy() {
            out.push(item.clone());
        }
    }
    Ok(Arg::List(out))
}

fn apply(args: &[Arg], env: &Rc<Environment>) -> Result<Arg, EvalError> {
    let callable = args[0].token().expect("apply receives a raw procedure token").clone();
    let call_args = args[1].list().to_vec();
    Ok(Arg::Token(apply_callable(&callable, &call_args, env)))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.lists",
        vec![
            ("cons", Builtin::Function(FunctionSpec::new(vec![ValueType::Any, ValueType::List], ValueType::List, 2, cons).raw_token(0).doc("(cons x lst)"))),
            ("car", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::Any, 1, car).doc("(car lst)"))),
            ("cdr", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::List, 1, cdr).doc("(cdr lst)"))),
            ("list", Builtin::Function(FunctionSpec::new(vec![ValueType::Any], ValueType::List, 0, list).variadic().raw_token(0).doc("(list x...)"))),
            ("length", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::Num, 1, length).doc("(length lst)"))),
            ("empty?", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::Bool, 1, empty_p).doc("(empty? lst)"))),
            ("append", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::List, 0, append).variadic().doc("(append lst...)"))),
            ("reverse", Builtin::Function(FunctionSpec::new(vec![ValueType::List], ValueType::List, 1, reverse).doc("(reverse lst)"))),
            ("map", Builtin::Function(FunctionSpec::new(vec![ValueType::Procedure, ValueType::List], ValueType::List, 2, map).doc("(map f lst)"))),
            ("filter", Builtin::Function(FunctionSpec::new(vec![ValueType::Procedure, ValueType::List], ValueType::List, 2, filter).doc("(filter f lst)"))),
            ("apply", Builtin::Function(FunctionSpec::new(vec![ValueType::Procedure, ValueType::List], ValueType::Any, 2, apply).doc("(apply f lst)"))),
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
    fn cons_car_cdr_roundtrip() {
        assert_eq!(eval_str("(cons 1 (list 2 3))"), "'(1 2 3)");
        assert_eq!(eval_str("(car (list 1 2 3))"), "1");
        assert_eq!(eval_str("(cdr (list 1 2 3))"), "'(2 3)");
    }

    #[test]
    fn car_of_empty_list_is_an_error() {
        let env = Environment::root("test");
        match run("(car (list))", &env, |_| {}) {
            RunOutcome::Value(v) => assert_eq!(v.tag, crate::token::TokenTag::Error),
            RunOutcome::Incomplete => panic!("expected a value"),
        }
    }

    #[test]
    fn length_and_empty_predicate() {
        assert_eq!(eval_str("(length (list 1 2 3))"), "3");
        assert_eq!(eval_str("(empty? (list))"), "#t");
        assert_eq!(eval_str("(empty? (list 1))"), "#f");
    }

    #[test]
    fn append_concatenates_in_order() {
        assert_eq!(eval_str("(append (list 1 2) (list 3 4))"), "'(1 2 3 4)");
    }

    #[test]
    fn reverse_reverses_elements() {
        assert_eq!(eval_str("(reverse (list 1 2 3))"), "'(3 2 1)");
    }

    #[test]
    fn map_applies_a_lambda_to_each_element() {
        assert_eq!(eval_str("(map (lambda (x) (* x x)) (list 1 2 3))"), "'(1 4 9)");
    }

    #[test]
    fn filter_keeps_only_truthy_results() {
        assert_eq!(eval_str("(filter (lambda (x) (> x 1)) (list 1 2 3))"), "'(2 3)");
    }

    #[test]
    fn apply_spreads_a_list_as_arguments() {
        assert_eq!(eval_str("(apply + (list 1 2 3))"), "6");
    }
}

