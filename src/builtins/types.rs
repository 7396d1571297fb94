//! Type predicates: number?, string?, list?, symbol?, bool?, procedure?,
//! char?, void?
//!
//! All take exactly one argument, raw (undecided type), and return a
//! boolean.

use crate::error::EvalError;
use crate::token::TokenTag;

use super::{Arg, Builtin, BuiltinRegistry, FunctionSpec, ValueType};

fn predicate(tag: TokenTag) -> impl Fn(&[Arg], &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    move |args, _env| Ok(Arg::Bool(args[0].token().map(|t| t.tag == tag).unwrap_or(false)))
}

macro_rules! type_predicate {
    ($fname:ident, $tag:expr) => {
        fn $fname(args: &[Arg], env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
            predicate($tag)(args, env)
        }
    };
}

type_predicate!(number_p, TokenTag::Num);
type_predicate!(string_p, TokenTag::Str);
type_predicate!(list_p, TokenTag::List);
type_predicate!(symbol_p, TokenTag::Sym);
type_predicate!(bool_p, TokenTag::Bool);
type_predicate!(char_p, TokenTag::Char);
type_predicate!(void_p, TokenTag::Void);

/// Unlike the other predicates above, a bare builtin-function or
/// -macro name evaluates to its own `Ident`-tagged token rather than a
/// `Procedure` one (see `eval::eval_literal`), so an exact tag check
/// would report `(procedure? +)` as `#f`. Match `ValueType::Procedure`'s
/// own definition of "callable" instead — `Procedure` or `Ident` — the
/// same rule `map`/`filter`/`apply` already rely on.
fn procedure_p(args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Bool(args[0].token().map(|t| ValueType::Procedure.matches_tag(t.tag)).unwrap_or(false)))
}

fn spec(f: super::NativeFn, doc: &'static str) -> super::FunctionSpec {
    FunctionSpec::new(vec![ValueType::Any], ValueType::Bool, 1, f).raw_token(0).doc(doc)
}

/// The unit value `#v`/`(void)` and every side-effecting special form
/// produce. Registered as a zero-arity function rather than a
/// constant so `(void)` applies like any other call — `#v`'s reader
/// macro injects exactly that application.
fn void_proc(_args: &[Arg], _env: &std::rc::Rc<crate::env::Environment>) -> Result<Arg, EvalError> {
    Ok(Arg::Void)
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.types",
        vec![
            ("number?", Builtin::Function(spec(number_p, "(number? v)"))),
            ("string?", Builtin::Function(spec(string_p, "(string? v)"))),
            ("list?", Builtin::Function(spec(list_p, "(list? v)"))),
            ("symbol?", Builtin::Function(spec(symbol_p, "(symbol? v)"))),
            ("bool?", Builtin::Function(spec(bool_p, "(bool? v)"))),
            ("procedure?", Builtin::Function(spec(procedure_p, "(procedure? v)"))),
            ("char?", Builtin::Function(spec(char_p, "(char? v)"))),
            ("void?", Builtin::Function(spec(void_p, "(void? v)"))),
            ("void", Builtin::Function(FunctionSpec::new(vec![], ValueType::Void, 0, void_proc).doc("(void)"))),
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
    fn procedure_predicate_accepts_a_user_defined_lambda() {
        assert_eq!(eval_str("(procedure? (lambda (x) x))"), "#t");
    }

    #[test]
    fn procedure_predicate_accepts_a_bare_builtin_function_name() {
        assert_eq!(eval_str("(procedure? +)"), "#t");
    }

    #[test]
    fn procedure_predicate_rejects_non_callables() {
        assert_eq!(eval_str("(number? 5)"), "#t");
        assert_eq!(eval_str("(procedure? 5)"), "#f");
        assert_eq!(eval_str("(procedure? \"hi\")"), "#f");
    }
}
