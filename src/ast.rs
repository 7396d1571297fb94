//! Three-variant AST produced by the parser and rewritten by the macro
//! expander before evaluation.

use std::rc::Rc;

use crate::env::Environment;
use crate::token::{Pos, RuntimeSymbol, Token, TokenMeta, TokenTag};

#[derive(Debug, Clone)]
pub enum Ast {
    /// A single token: literal, identifier, quoted symbol, etc.
    Literal(Token),
    /// An ordered application/list form. Never constructed with a
    /// `Procedure`-tagged literal as a child — procedure nodes only
    /// appear once evaluation has produced them.
    SExpr(Vec<Ast>, Pos, TokenMeta),
    /// A closed-over lambda. Only ever produced by the evaluator, never
    /// by the parser or the macro expander.
    Procedure(Rc<ProcedureNode>),
}

/// `closure` predefines the procedure's own name to `Void` at
/// construction time when built via `define`, and that same binding
/// cell is mutated to point back at the procedure once it exists — see
/// `eval::eval_define`. Plain `lambda` forms reuse the defining
/// environment directly and skip the self-reference dance entirely.
#[derive(Debug)]
pub struct ProcedureNode {
    pub name: Option<String>,
    pub params: Vec<Rc<RuntimeSymbol>>,
    pub body: Vec<Ast>,
    pub closure: Rc<Environment>,
}

impl Ast {
    pub fn sexpr(items: Vec<Ast>, pos: Pos) -> Ast {
        Ast::SExpr(items, pos, TokenMeta::at(pos))
    }

    pub fn pos(&self) -> Pos {
        match self {
            Ast::Literal(t) => t.meta.pos,
            Ast::SExpr(items, pos, _) => items.first().map(|a| a.pos()).unwrap_or(*pos),
            Ast::Procedure(_) => Pos::NONE,
        }
    }

    pub fn meta(&self) -> Option<&TokenMeta> {
        match self {
            Ast::Literal(t) => Some(&t.meta),
            Ast::SExpr(_, _, meta) => Some(meta),
            Ast::Procedure(_) => None,
        }
    }

    pub fn is_empty_sexpr(&self) -> bool {
        matches!(self, Ast::SExpr(items, _, _) if items.is_empty())
    }

    pub fn as_literal(&self) -> Option<&Token> {
        match self {
            Ast::Literal(t) => Some(t),
            _ => None,
        }
    }

    /// Bare, unresolved identifier lexemes only (not first-class `Sym`
    /// values) — what a `define`/`lambda` head or an application head
    /// is made of before evaluation resolves it.
    pub fn as_ident(&self) -> Option<&Rc<RuntimeSymbol>> {
        match self {
            Ast::Literal(t) if t.tag == TokenTag::Ident => t.as_symbol(),
            _ => None,
        }
    }

    pub fn as_sexpr(&self) -> Option<&[Ast]> {
        match self {
            Ast::SExpr(items, _, _) => Some(items),
            _ => None,
        }
    }

    pub fn first(&self) -> Option<&Ast> {
        self.as_sexpr().and_then(|items| items.first())
    }

    pub fn rest(&self) -> &[Ast] {
        self.as_sexpr().map(|items| &items[1.min(items.len())..]).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&Ast> {
        self.as_sexpr().and_then(|items| items.last())
    }

    pub fn with_macro_tag(self, name: &str) -> Ast {
        match self {
            Ast::Literal(mut t) => {
                t.meta = t.meta.with_macro_tag(name);
                Ast::Literal(t)
            }
            Ast::SExpr(items, pos, meta) => Ast::SExpr(items, pos, meta.with_macro_tag(name)),
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub forms: Vec<Ast>,
    pub name: String,
}

impl std::fmt::Display for Ast {
    /// A debugging rendering, not the canonical `Token::to_display_string`
    /// form — used by the macro expander's fixpoint check and by
    /// diagnostics, not shown to end users.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ast::Literal(t) => write!(f, "{t}"),
            Ast::SExpr(items, _, _) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Ast::Procedure(_) => write!(f, "#<procedure>"),
        }
    }
}
