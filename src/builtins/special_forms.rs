//! The special forms that make up the core language: `if`, `define`,
//! `lambda`, `set!`. Each receives its argument nodes unevaluated and
//! decides its own evaluation strategy — `if`'s tail position is
//! actually special-cased inline in `eval::eval` for constant-stack
//! tail recursion, but it is still registered here so it behaves
//! consistently when looked up as a bare value or re-registered by an
//! embedder.

use std::rc::Rc;

use crate::ast::{Ast, ProcedureNode};
use crate::env::Environment;
use crate::error::EvalError;
use crate::eval::eval;
use crate::token::{Pos, Token, TokenMeta, TokenTag};

use super::{Builtin, BuiltinRegistry};

pub fn register(reg: &mut BuiltinRegistry) {
    reg.register_module(
        "bracket.special",
        vec![
            ("if", Builtin::Special { func: special_if, doc: Some("(if test then else)") }),
            ("define", Builtin::Special { func: special_define, doc: Some("(define id expr) | (define (f p...) body...)") }),
            ("lambda", Builtin::Special { func: special_lambda, doc: Some("(lambda (p...) body...)") }),
            ("set!", Builtin::Special { func: special_set, doc: Some("(set! id expr)") }),
        ],
    )
    .expect("stdlib module names are trusted");
}

fn special_if(args: &[Ast], env: &Rc<Environment>, _meta: &TokenMeta) -> Result<Token, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity("3", args.len()));
    }
    let test = eval(&args[0], env);
    if test.tag == TokenTag::Error {
        return Ok(test);
    }
    Ok(if test.is_truthy() { eval(&args[1], env) } else { eval(&args[2], env) })
}

fn special_define(args: &[Ast], env: &Rc<Environment>, _meta: &TokenMeta) -> Result<Token, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("at least 1", args.len()));
    }

    match &args[0] {
        // (define id expr)
        Ast::Literal(tok) if tok.tag == TokenTag::Ident => {
            if args.len() != 2 {
                return Err(EvalError::arity("2", args.len()));
            }
            let sym = tok.as_symbol().unwrap().clone();
            let value = eval(&args[1], env);
            if value.tag == TokenTag::Error {
                return Ok(value);
            }
            env.define(&sym, Ast::Literal(value));
            Ok(Token::void(Pos::NONE))
        }
        // (define (f p...) body...)
        Ast::SExpr(head_items, pos, _) => {
            let name_tok = head_items.first().and_then(|a| a.as_literal()).filter(|t| t.tag == TokenTag::Ident);
            let name_sym = match name_tok.and_then(|t| t.as_symbol()) {
                Some(s) => s.clone(),
                None => return Err(EvalError::Custom("define: expected a procedure name".to_string())),
            };
            let mut params = Vec::with_capacity(head_items.len().saturating_sub(1));
            for p in &head_items[1..] {
                match p.as_ident() {
                    Some(s) => params.push(s.clone()),
                    None => return Err(EvalError::Custom("define: parameter must be an identifier".to_string())),
                }
            }
            let body = args[1..].to_vec();
            if body.is_empty() {
                return Err(EvalError::Custom("define: procedure body must have at least one form".to_string()));
            }

            let closure = Environment::child(env, name_sym.name.clone());
            closure.define(&name_sym, Ast::Literal(Token::void(*pos)));
            let node = Rc::new(ProcedureNode { name: Some(name_sym.name.clone()), params, body, closure: closure.clone() });
            closure.define(&name_sym, Ast::Procedure(node.clone()));
            env.define(&name_sym, Ast::Procedure(node));
            Ok(Token::void(*pos))
        }
        _ => Err(EvalError::Custom("define: expected an identifier or a procedure header".to_string())),
    }
}

fn special_lambda(args: &[Ast], env: &Rc<Environment>, meta: &TokenMeta) -> Result<Token, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity("at least 2", args.len()));
    }
    let param_items = args[0].as_sexpr().ok_or_else(|| EvalError::Custom("lambda: expected a parameter list".to_string()))?;
    let mut params = Vec::with_capacity(param_items.len());
    for p in param_items {
        match p.as_ident() {
            Some(s) => params.push(s.clone()),
            None => return Err(EvalError::Custom("lambda: parameter must be an identifier".to_string())),
        }
    }
    let body = args[1..].to_vec();
    let node = Rc::new(ProcedureNode { name: None, params, body, closure: env.clone() });
    Ok(Token::procedure(node, meta.pos))
}

fn special_set(args: &[Ast], env: &Rc<Environment>, _meta: &TokenMeta) -> Result<Token, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("2", args.len()));
    }
    let sym = args[0].as_ident().ok_or_else(|| EvalError::Custom("set!: expected an identifier".to_string()))?.clone();
    let value = eval(&args[1], env);
    if value.tag == TokenTag::Error {
        return Ok(value);
    }
    if !env.set(&sym, Ast::Literal(value)) {
        return Err(EvalError::SetBeforeDefine);
    }
    Ok(Token::void(Pos::NONE))
}
