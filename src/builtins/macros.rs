//! The builtin macros that make up the expander's rewrite rules
//! (component G). Each function here is a `MacroFn`: it receives its
//! arguments *unexpanded* and returns the core-language AST they
//! rewrite to; `expand::expand` re-expands the result to a fixpoint
//! and tags it with the macro's name.
//!
//! There is no user-definable `defmacro` — only this fixed, builtin
//! set exists, so none of them need to worry about hygiene.

use std::rc::Rc;

use crate::ast::Ast;
use crate::env::Environment;
use crate::error::EvalError;
use crate::token::{symbols, Pos, Token};

use super::{Builtin, BuiltinRegistry};

fn ident(name: &str, pos: Pos) -> Ast {
    Ast::Literal(Token::ident(symbols().intern(name), pos))
}

fn bool_ast(b: bool, pos: Pos) -> Ast {
    Ast::Literal(Token::bool_tok(b, pos))
}

fn str_ast(s: &str, pos: Pos) -> Ast {
    Ast::Literal(Token::str_tok(s, pos))
}

fn void_call(pos: Pos) -> Ast {
    Ast::sexpr(vec![ident("void", pos)], pos)
}

fn pos_of(items: &[Ast]) -> Pos {
    items.first().map(|a| a.pos()).unwrap_or(Pos::NONE)
}

/// `begin`'s n-ary rule: a lone form passes through, several are
/// wrapped in a nullary lambda so they get their own scope and run in
/// order. Also used to build `when`/`unless` bodies.
fn begin_wrap(body: &[Ast], pos: Pos) -> Ast {
    match body {
        [] => void_call(pos),
        [one] => one.clone(),
        many => {
            let mut lambda_items = vec![ident("lambda", pos), Ast::sexpr(vec![], pos)];
            lambda_items.extend(many.iter().cloned());
            Ast::sexpr(vec![Ast::sexpr(lambda_items, pos)], pos)
        }
    }
}

fn expand_and(args: &[Ast], env: &Rc<Environment>) -> Result<Ast, EvalError> {
    let pos = pos_of(args);
    Ok(match args {
        [] => bool_ast(true, pos),
        [one] => one.clone(),
        [first, rest @ ..] => {
            Ast::sexpr(vec![ident("if", pos), first.clone(), expand_and(rest, env)?, bool_ast(false, pos)], pos)
        }
    })
}

fn expand_or(args: &[Ast], env: &Rc<Environment>) -> Result<Ast, EvalError> {
    let pos = pos_of(args);
    Ok(match args {
        [] => bool_ast(false, pos),
        [one] => one.clone(),
        [first, rest @ ..] => {
            Ast::sexpr(vec![ident("if", pos), first.clone(), bool_ast(true, pos), expand_or(rest, env)?], pos)
        }
    })
}

fn expand_when(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("at least 1", 0));
    }
    let pos = pos_of(args);
    let body = begin_wrap(&args[1..], pos);
    Ok(Ast::sexpr(vec![ident("if", pos), args[0].clone(), body, void_call(pos)], pos))
}

fn expand_unless(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("at least 1", 0));
    }
    let pos = pos_of(args);
    let negated = Ast::sexpr(vec![ident("not", pos), args[0].clone()], pos);
    let body = begin_wrap(&args[1..], pos);
    Ok(Ast::sexpr(vec![ident("if", pos), negated, body, void_call(pos)], pos))
}

/// Right-nested `if` chain; an `else` head unconditionally wins. Per
/// the deviation noted in the design notes, a clause's body forms
/// before the last are *not* threaded through for side effects — only
/// the last form's value survives the rewrite, matching the source
/// material's own (R7RS-incorrect) behaviour.
fn expand_cond(args: &[Ast], env: &Rc<Environment>) -> Result<Ast, EvalError> {
    let pos = pos_of(args);
    build_cond(args, pos, env)
}

fn build_cond(clauses: &[Ast], pos: Pos, env: &Rc<Environment>) -> Result<Ast, EvalError> {
    let (clause, rest) = match clauses.split_first() {
        Some(pair) => pair,
        None => return Ok(void_call(pos)),
    };
    let items =
        clause.as_sexpr().ok_or_else(|| EvalError::Custom("cond: expected a (test value...) clause".to_string()))?;
    if items.is_empty() {
        return Err(EvalError::Custom("cond: empty clause".to_string()));
    }
    let is_else = items[0].as_ident().map(|s| s.name == "else").unwrap_or(false);
    let value = items[1..].last().cloned().unwrap_or_else(|| void_call(pos));
    if is_else {
        return Ok(value);
    }
    let else_branch = build_cond(rest, pos, env)?;
    Ok(Ast::sexpr(vec![ident("if", pos), items[0].clone(), value, else_branch], pos))
}

fn expand_begin(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    Ok(begin_wrap(args, pos_of(args)))
}

/// `(let ((id value)...) body...)` -> `((lambda (id...) body...) value...)`.
fn expand_let(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.is_empty() {
        return Err(EvalError::Custom("let: expected a binding list".to_string()));
    }
    let pos = pos_of(args);
    let bindings =
        args[0].as_sexpr().ok_or_else(|| EvalError::Custom("let: expected a binding list".to_string()))?;
    let mut ids = Vec::with_capacity(bindings.len());
    let mut vals = Vec::with_capacity(bindings.len());
    for b in bindings {
        let pair = b.as_sexpr().ok_or_else(|| EvalError::Custom("let: binding must be (id value)".to_string()))?;
        if pair.len() != 2 {
            return Err(EvalError::Custom("let: binding must be (id value)".to_string()));
        }
        ids.push(pair[0].clone());
        vals.push(pair[1].clone());
    }
    let body = &args[1..];
    if body.is_empty() {
        return Err(EvalError::Custom("let: body must have at least one form".to_string()));
    }
    let mut lambda_items = vec![ident("lambda", pos), Ast::sexpr(ids, pos)];
    lambda_items.extend(body.iter().cloned());
    let mut call = vec![Ast::sexpr(lambda_items, pos)];
    call.extend(vals);
    Ok(Ast::sexpr(call, pos))
}

/// `(swap! a b)` -> `(let ((t a)) (set! a b) (set! b t))`, `t` a fresh
/// uninterned symbol so it can never shadow a binding in scope.
fn expand_swap(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("2", args.len()));
    }
    let pos = pos_of(args);
    let (a, b) = (args[0].clone(), args[1].clone());
    let tmp_ast = Ast::Literal(Token::ident(symbols().gensym("t"), pos));
    let binding = Ast::sexpr(vec![Ast::sexpr(vec![tmp_ast.clone(), a.clone()], pos)], pos);
    let set_a = Ast::sexpr(vec![ident("set!", pos), a, b.clone()], pos);
    let set_b = Ast::sexpr(vec![ident("set!", pos), b, tmp_ast], pos);
    Ok(Ast::sexpr(vec![ident("let", pos), binding, set_a, set_b], pos))
}

/// `(local (def...) body...)` -> `(begin def... body...)`, after
/// checking every definition head is literally `define`.
fn expand_local(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.is_empty() {
        return Err(EvalError::Custom("local: expected a definition list".to_string()));
    }
    let pos = pos_of(args);
    let defs =
        args[0].as_sexpr().ok_or_else(|| EvalError::Custom("local: expected a definition list".to_string()))?;
    for d in defs {
        let head_is_define = d.first().and_then(|a| a.as_ident()).map(|s| s.name == "define").unwrap_or(false);
        if !head_is_define {
            return Err(EvalError::Custom("local: every definition must begin with define".to_string()));
        }
    }
    let mut items = vec![ident("begin", pos)];
    items.extend(defs.iter().cloned());
    items.extend(args[1..].iter().cloned());
    Ok(Ast::sexpr(items, pos))
}

/// `(check-expect actual expected)` -> `(if (equal? actual expected)
/// (void) (error "check-expect failed:" actual expected))`.
fn expand_check_expect(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("2", args.len()));
    }
    let pos = pos_of(args);
    let (actual, expected) = (args[0].clone(), args[1].clone());
    let test = Ast::sexpr(vec![ident("equal?", pos), actual.clone(), expected.clone()], pos);
    let failure =
        Ast::sexpr(vec![ident("error", pos), str_ast("check-expect failed:", pos), actual, expected], pos);
    Ok(Ast::sexpr(vec![ident("if", pos), test, void_call(pos), failure], pos))
}

/// `(check-satisfied actual pred)` -> `(if (pred actual) (void) (error
/// "check-satisfied failed:" actual))`.
fn expand_check_satisfied(args: &[Ast], _env: &Rc<Environment>) -> Result<Ast, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("2", args.len()));
    }
    let pos = pos_of(args);
    let (actual, pred) = (args[0].clone(), args[1].clone());
    let test = Ast::sexpr(vec![pred, actual.clone()], pos);
    let failure = Ast::sexpr(vec![ident("error", pos), str_ast("check-satisfied failed:", pos), actual], pos);
    Ok(Ast::sexpr(vec![ident("if", pos), test, void_call(pos), failure], pos))
}

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.macros",
        vec![
            ("and", Builtin::Macro { expander: expand_and, doc: Some("(and e...) n-ary short-circuit and") }),
            ("or", Builtin::Macro { expander: expand_or, doc: Some("(or e...) n-ary short-circuit or") }),
            ("when", Builtin::Macro { expander: expand_when, doc: Some("(when test body...)") }),
            ("unless", Builtin::Macro { expander: expand_unless, doc: Some("(unless test body...)") }),
            (
                "cond",
                Builtin::Macro {
                    expander: expand_cond,
                    doc: Some("(cond (test value...)... [(else value...)])"),
                },
            ),
            ("begin", Builtin::Macro { expander: expand_begin, doc: Some("(begin e...)") }),
            ("let", Builtin::Macro { expander: expand_let, doc: Some("(let ((id value)...) body...)") }),
            ("swap!", Builtin::Macro { expander: expand_swap, doc: Some("(swap! a b)") }),
            ("local", Builtin::Macro { expander: expand_local, doc: Some("(local (define...) body...)") }),
            (
                "check-expect",
                Builtin::Macro { expander: expand_check_expect, doc: Some("(check-expect actual expected)") },
            ),
            (
                "check-satisfied",
                Builtin::Macro { expander: expand_check_satisfied, doc: Some("(check-satisfied actual pred?)") },
            ),
        ],
    )
    .expect("stdlib module names are trusted");
}
