//! Core-language evaluator. `eval` drives a `loop` over a mutable
//! `(ast, env)` pair rather than recursing on every application, so a
//! chain of tail calls — the common shape of a self-recursive
//! procedure — runs in constant native-stack depth. Only the
//! tail position of `if` and of a procedure's last body form get this
//! treatment; everything else (argument evaluation, non-tail body
//! forms, builtin dispatch) recurses normally.

use std::rc::Rc;

use crate::ast::{Ast, ProcedureNode};
use crate::builtins::Builtin;
use crate::env::Environment;
use crate::token::{Pos, Token, TokenTag, TokenValue};

pub fn eval(ast: &Ast, env: &Rc<Environment>) -> Token {
    let mut cur_ast = ast.clone();
    let mut cur_env = env.clone();

    loop {
        match &cur_ast {
            Ast::Literal(tok) => return eval_literal(tok, &cur_env),
            Ast::Procedure(node) => return Token::procedure(node.clone(), Pos::NONE),
            Ast::SExpr(items, pos, _) => {
                if items.is_empty() {
                    return Token::error("illegal empty application", *pos);
                }
                let head = &items[0];
                let rest = &items[1..];
                let pos = *pos;

                if let Some(sym) = head.as_ident() {
                    if !cur_env.has(sym) {
                        if sym.name == "if" {
                            match eval_if_branch(rest, &cur_env, pos) {
                                Ok(branch) => {
                                    cur_ast = branch;
                                    continue;
                                }
                                Err(tok) => return tok,
                            }
                        }

                        let builtin = cur_env.builtins.borrow().get(&sym.name).cloned();
                        match builtin {
                            Some(Builtin::Constant { .. }) => {
                                return Token::error("attempted application of a non-procedure", pos)
                            }
                            Some(Builtin::Special { func, .. }) => {
                                let meta = head.meta().cloned().unwrap_or_default();
                                return func(rest, &cur_env, &meta)
                                    .unwrap_or_else(|e| Token::error(e.to_string(), pos));
                            }
                            Some(Builtin::Macro { .. }) => {
                                return Token::error(
                                    format!("macro appeared at runtime: {}", sym.name),
                                    pos,
                                )
                            }
                            Some(Builtin::Function(spec)) => {
                                let args = match eval_args(rest, &cur_env) {
                                    Ok(a) => a,
                                    Err(tok) => return tok,
                                };
                                return spec
                                    .call(&sym.name, &args, &cur_env)
                                    .unwrap_or_else(|e| Token::error(e.to_string(), pos));
                            }
                            None => return Token::error(format!("{}: undefined", sym.name), pos),
                        }
                    }
                }

                let head_tok = eval(head, &cur_env);
                if head_tok.tag == TokenTag::Error {
                    return head_tok;
                }
                let args = match eval_args(rest, &cur_env) {
                    Ok(a) => a,
                    Err(tok) => return tok,
                };

                match apply_tail(&head_tok, &args, &cur_env, pos) {
                    TailResult::Value(tok) => return tok,
                    TailResult::Continue(body_ast, call_env) => {
                        cur_ast = body_ast;
                        cur_env = call_env;
                        continue;
                    }
                }
            }
        }
    }
}

fn eval_literal(tok: &Token, env: &Rc<Environment>) -> Token {
    if tok.tag != TokenTag::Ident {
        return tok.clone();
    }
    let sym = match tok.as_symbol() {
        Some(s) => s.clone(),
        None => return tok.clone(),
    };
    if let Some(bound) = env.get(&sym) {
        return match bound {
            Ast::Literal(t) => t.with_pos(tok.meta.pos),
            Ast::Procedure(node) => Token::procedure(node, tok.meta.pos),
            other => eval(&other, env),
        };
    }
    let builtin = env.builtins.borrow().get(&sym.name).cloned();
    match builtin {
        Some(Builtin::Constant { value, .. }) => value.with_pos(tok.meta.pos),
        Some(Builtin::Special { func, .. }) => {
            func(&[], env, &tok.meta).unwrap_or_else(|e| Token::error(e.to_string(), tok.meta.pos))
        }
        Some(Builtin::Macro { .. }) | Some(Builtin::Function(_)) => tok.clone(),
        None => Token::error(format!("{}: undefined", sym.name), tok.meta.pos),
    }
}

/// Evaluates `if`'s test and returns the chosen branch AST, unevaluated
/// — the caller loops on it instead of recursing, giving `if`-based
/// tail recursion (the most common accumulator-loop idiom) constant
/// stack depth.
fn eval_if_branch(rest: &[Ast], env: &Rc<Environment>, pos: Pos) -> Result<Ast, Token> {
    if rest.len() != 3 {
        return Err(Token::error(format!("expected 3 arguments, got {}", rest.len()), pos));
    }
    let test = eval(&rest[0], env);
    if test.tag == TokenTag::Error {
        return Err(test);
    }
    Ok(if test.is_truthy() { rest[1].clone() } else { rest[2].clone() })
}

pub fn eval_args(rest: &[Ast], env: &Rc<Environment>) -> Result<Vec<Token>, Token> {
    let mut out = Vec::with_capacity(rest.len());
    for a in rest {
        let v = eval(a, env);
        if v.tag == TokenTag::Error {
            return Err(v);
        }
        out.push(v);
    }
    Ok(out)
}

enum TailResult {
    Value(Token),
    Continue(Ast, Rc<Environment>),
}

fn apply_tail(head_tok: &Token, args: &[Token], env: &Rc<Environment>, pos: Pos) -> TailResult {
    match &head_tok.value {
        TokenValue::Procedure(node) => match enter_call(node, args, pos) {
            Ok((call_env, body_forms)) => run_body_tail(&call_env, body_forms),
            Err(tok) => TailResult::Value(tok),
        },
        _ if head_tok.tag == TokenTag::Ident => {
            let name = &head_tok.literal;
            let builtin = env.builtins.borrow().get(name).cloned();
            match builtin {
                Some(Builtin::Function(spec)) => TailResult::Value(
                    spec.call(name, args, env).unwrap_or_else(|e| Token::error(e.to_string(), pos)),
                ),
                _ => TailResult::Value(Token::error("attempted application of a non-procedure", pos)),
            }
        }
        _ => TailResult::Value(Token::error("attempted application of a non-procedure", pos)),
    }
}

fn enter_call(
    node: &Rc<ProcedureNode>,
    args: &[Token],
    pos: Pos,
) -> Result<(Rc<Environment>, Vec<Ast>), Token> {
    if args.len() != node.params.len() {
        return Err(Token::error(
            format!("expected {} arguments, got {}", node.params.len(), args.len()),
            pos,
        ));
    }
    let label = node.name.clone().unwrap_or_else(|| "lambda".to_string());
    let call_env = Environment::child(&node.closure, label);
    for (param, arg) in node.params.iter().zip(args.iter()) {
        call_env.define(param, Ast::Literal(arg.clone()));
    }
    Ok((call_env, node.body.clone()))
}

fn run_body_tail(call_env: &Rc<Environment>, body: Vec<Ast>) -> TailResult {
    if body.is_empty() {
        return TailResult::Value(Token::void(Pos::NONE));
    }
    for form in &body[..body.len() - 1] {
        let v = eval(form, call_env);
        if v.tag == TokenTag::Error {
            return TailResult::Value(v);
        }
    }
    TailResult::Continue(body.last().unwrap().clone(), call_env.clone())
}

/// Applies a callable token (a `Procedure`, or an `Ident` naming a
/// function builtin forwarded as a value) to already-evaluated
/// arguments. Used by higher-order builtins such as `map`/`apply`,
/// which call back into the evaluator from native Rust code rather
/// than from the main tail loop.
pub fn apply_callable(callable: &Token, args: &[Token], env: &Rc<Environment>) -> Token {
    match apply_tail(callable, args, env, callable.meta.pos) {
        TailResult::Value(tok) => tok,
        TailResult::Continue(body_ast, call_env) => eval(&body_ast, &call_env),
    }
}
