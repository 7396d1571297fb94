//! Macro expander (component G): a fixed-point AST rewrite that turns
//! the user-visible sugar (`and`, `or`, `cond`, `when`, `let`, …) into
//! the core language — `if`, `lambda`, `define`, `set!`, application,
//! literal — before the evaluator ever sees it.
//!
//! Every node a macro synthesizes is tagged with `meta.__macro` naming
//! the macro that produced it (see `Ast::with_macro_tag`), so a
//! decompiler could walk an expansion back to a recognizable surface
//! form. This crate doesn't ship that decompiler — it's out of scope —
//! but the tag is cheap to carry and is exactly what one would consult.

use std::rc::Rc;

use crate::ast::{Ast, Program};
use crate::builtins::Builtin;
use crate::env::Environment;
use crate::token::Token;

/// Expands `ast` to a fixpoint. Literals and already-constructed
/// procedure nodes pass through unchanged; an empty application is
/// left alone (it is an error only once evaluated, per the AST
/// invariant); everything else recurses per the rewrite rules below.
pub fn expand(ast: &Ast, env: &Rc<Environment>) -> Ast {
    match ast {
        Ast::Literal(_) | Ast::Procedure(_) => ast.clone(),
        Ast::SExpr(items, pos, meta) => {
            if items.is_empty() {
                return ast.clone();
            }
            let head = expand(&items[0], env);
            if let Some(sym) = head.as_ident() {
                let builtin = env.builtins.borrow().get(&sym.name).cloned();
                if let Some(Builtin::Macro { expander, .. }) = builtin {
                    // The macro gets its own, *unexpanded* arguments —
                    // it decides what to evaluate and in what order.
                    let rest = &items[1..];
                    return match expander(rest, env) {
                        Ok(rewritten) => expand(&rewritten.with_macro_tag(&sym.name), env),
                        Err(e) => Ast::Literal(Token::error(e.to_string(), *pos)),
                    };
                }
            }
            let mut rebuilt = Vec::with_capacity(items.len());
            rebuilt.push(head);
            rebuilt.extend(items[1..].iter().map(|a| expand(a, env)));
            Ast::SExpr(rebuilt, *pos, meta.clone())
        }
    }
}

/// Expands every top-level form of a parsed program.
pub fn expand_program(program: &Program, env: &Rc<Environment>) -> Program {
    Program { forms: program.forms.iter().map(|f| expand(f, env)).collect(), name: program.name.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval;
    use crate::parser::parse_program;
    use crate::token::TokenTag;

    fn run(src: &str) -> Token {
        let env = Environment::root("test");
        let (program, _) = parse_program(src, env.ctx.clone(), "test");
        let mut last = Token::void(crate::token::Pos::NONE);
        for form in &program.forms {
            last = eval(&expand(form, &env), &env);
        }
        last
    }

    #[test]
    fn and_short_circuits_to_false() {
        assert_eq!(run("(and 1 2 #f 4)").to_string(), "#f");
    }

    #[test]
    fn and_of_truthy_values_returns_last() {
        assert_eq!(run("(and 1 2 3)").to_string(), "3");
    }

    #[test]
    fn or_returns_first_truthy() {
        assert_eq!(run("(or #f #f 7)").to_string(), "7");
    }

    #[test]
    fn cond_picks_matching_clause() {
        assert_eq!(run("(cond ((= 1 2) 'a) ((= 2 2) 'b) (else 'c))").to_string(), "'b");
    }

    #[test]
    fn cond_with_no_match_and_no_else_is_void() {
        let v = run("(cond ((= 1 2) 'a))");
        assert_eq!(v.tag, TokenTag::Void);
    }

    #[test]
    fn let_binds_locals() {
        assert_eq!(run("(let ((x 1) (y 2)) (+ x y))").to_string(), "3");
    }

    #[test]
    fn when_runs_body_only_if_true() {
        assert_eq!(run("(when #t 42)").to_string(), "42");
        assert_eq!(run("(when #f 42)").tag, TokenTag::Void);
    }

    #[test]
    fn unless_runs_body_only_if_false() {
        assert_eq!(run("(unless #f 42)").to_string(), "42");
        assert_eq!(run("(unless #t 42)").tag, TokenTag::Void);
    }

    #[test]
    fn swap_exchanges_two_bindings() {
        assert_eq!(run("(define a 1) (define b 2) (swap! a b) (list a b)").to_string(), "'(2 1)");
    }

    #[test]
    fn begin_evaluates_in_order_and_returns_last() {
        assert_eq!(run("(define x 0) (begin (set! x 1) (set! x 2) x)").to_string(), "2");
    }

    #[test]
    fn local_exposes_internal_defines_to_body() {
        assert_eq!(run("(local ((define x 10) (define y 20)) (+ x y))").to_string(), "30");
    }

    #[test]
    fn expansion_reaches_a_fixpoint() {
        let env = Environment::root("fix");
        let (program, _) = parse_program("(and 1 (and 2 3))", env.ctx.clone(), "test");
        let once = expand(&program.forms[0], &env);
        let twice = expand(&once, &env);
        assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn check_expect_passes_silently() {
        let v = run("(check-expect (+ 1 2) 3)");
        assert_eq!(v.tag, TokenTag::Void);
    }

    #[test]
    fn check_expect_reports_mismatch_as_error() {
        let v = run("(check-expect (+ 1 2) 4)");
        assert_eq!(v.tag, TokenTag::Error);
    }
}
