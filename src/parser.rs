//! Parser (component C): folds the flat token stream produced by the
//! lexer into a `Program` of top-level s-expression trees.
//!
//! Closing-paren *kind* is tolerated rather than enforced: any
//! `RParen` closes the innermost open list regardless of whether its
//! bracket kind matches the one that opened it. This is the stricter
//! reading of the two contradictory passages in the source material
//! (see `DESIGN.md`) — it still reports a real error for an
//! extraneous close or a missing one, just not for a mismatched kind.

use std::collections::HashMap;

use crate::ast::{Ast, Program};
use crate::lexer::ExitCode;
use crate::token::{MetaInjector, ParenKind, Pos, Token, TokenTag, TokenValue};

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    pending_meta: Vec<MetaInjector>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, idx: 0, pending_meta: Vec::new() }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.idx.min(self.tokens.len() - 1)].clone();
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
        t
    }

    fn apply_pending_meta(&mut self, tok: &mut Token) {
        let extra = self.drain_pending_meta(tok);
        tok.meta.extra.extend(extra);
    }

    /// Merges every still-pending `#meta`/`#doc` injector whose
    /// predicate accepts `probe` into one map, consuming the pending
    /// queue. Shared by every production that can be "the next token"
    /// an injector attaches to — a literal, a parenthesized form, or a
    /// quoted datum — so metadata never leaks past the form it precedes.
    fn drain_pending_meta(&mut self, probe: &Token) -> HashMap<String, String> {
        if self.pending_meta.is_empty() {
            return HashMap::new();
        }
        let pending = std::mem::take(&mut self.pending_meta);
        let mut merged = HashMap::new();
        for injector in pending {
            let applies = injector.pred.as_ref().map(|p| p(probe)).unwrap_or(true);
            if applies {
                merged.extend(injector.meta);
            }
        }
        merged
    }

    /// Attaches any pending metadata to a parenthesized form's own
    /// `TokenMeta` rather than letting it leak onto whatever token
    /// follows the closing paren.
    fn apply_pending_meta_to_ast(&mut self, ast: Ast) -> Ast {
        if self.pending_meta.is_empty() {
            return ast;
        }
        match ast {
            Ast::SExpr(items, pos, mut meta) => {
                let probe = Token::lparen(ParenKind::Round, pos);
                meta.extra.extend(self.drain_pending_meta(&probe));
                Ast::SExpr(items, pos, meta)
            }
            other => other,
        }
    }

    /// Parses the whole token stream into a `Program`. A Parse-kind
    /// `Error` (an extraneous closing paren, or a lexer-produced `Error`
    /// token reached mid-stream) terminates only the form it occurred
    /// in — scanning resumes for subsequent top-level forms, matching
    /// the driver's own continue-past-an-error behavior for eval-time
    /// errors (see DESIGN.md's Open Question resolution on this). An
    /// `Incomplete` signal still stops the whole parse immediately:
    /// there is nothing left to scan until more input arrives.
    pub fn parse_program(mut self, name: &str) -> (Program, ExitCode) {
        let mut forms = Vec::new();
        let mut saw_error = false;
        loop {
            while self.peek().tag == TokenTag::Meta {
                let tok = self.bump();
                if let TokenValue::Meta(injector) = tok.value {
                    self.pending_meta.push(injector);
                }
            }
            if self.peek().tag == TokenTag::Eof {
                break;
            }
            let (ast, code) = self.parse_expr();
            forms.push(ast);
            match code {
                ExitCode::Success => {}
                ExitCode::Error => saw_error = true,
                ExitCode::Incomplete => return (Program { forms, name: name.to_string() }, ExitCode::Incomplete),
            }
        }
        let code = if saw_error { ExitCode::Error } else { ExitCode::Success };
        (Program { forms, name: name.to_string() }, code)
    }

    /// Reads exactly one top-level form — the `readForm` operation the
    /// REPL uses to know when to prompt for continuation input.
    pub fn read_form(&mut self) -> (Ast, ExitCode) {
        while self.peek().tag == TokenTag::Meta {
            let tok = self.bump();
            if let TokenValue::Meta(injector) = tok.value {
                self.pending_meta.push(injector);
            }
        }
        self.parse_expr()
    }

    fn parse_expr(&mut self) -> (Ast, ExitCode) {
        match self.peek().tag {
            TokenTag::Error => {
                let tok = self.bump();
                (Ast::Literal(tok), ExitCode::Error)
            }
            TokenTag::Eof => (Ast::Literal(self.peek().clone()), ExitCode::Incomplete),
            TokenTag::RParen => {
                let tok = self.bump();
                (Ast::Literal(Token::error("extraneous closing paren", tok.meta.pos)), ExitCode::Error)
            }
            TokenTag::LParen => {
                let (ast, code) = self.parse_list();
                (self.apply_pending_meta_to_ast(ast), code)
            }
            TokenTag::Quote => {
                let tok = self.bump();
                let (datum, code) = self.read_datum();
                let mut datum = datum.with_pos(tok.meta.pos);
                self.apply_pending_meta(&mut datum);
                (Ast::Literal(datum), code)
            }
            _ => {
                let mut tok = self.bump();
                self.apply_pending_meta(&mut tok);
                (Ast::Literal(tok), ExitCode::Success)
            }
        }
    }

    fn parse_list(&mut self) -> (Ast, ExitCode) {
        let open = self.bump();
        let pos = open.meta.pos;
        let mut items = Vec::new();
        loop {
            match self.peek().tag {
                TokenTag::RParen => {
                    self.bump();
                    return (Ast::sexpr(items, pos), ExitCode::Success);
                }
                TokenTag::Eof => return (Ast::sexpr(items, pos), ExitCode::Incomplete),
                _ => {
                    let (ast, code) = self.parse_expr();
                    items.push(ast);
                    if code != ExitCode::Success {
                        return (Ast::sexpr(items, pos), code);
                    }
                }
            }
        }
    }

    /// Reads one datum entirely as literal data: identifiers become
    /// first-class `Sym` values, lists become `List` tokens (never
    /// `SExpr` application nodes), and everything else passes through
    /// unchanged. This is what `'` puts in front of.
    fn read_datum(&mut self) -> (Token, ExitCode) {
        match self.peek().tag {
            TokenTag::Ident => {
                let tok = self.bump();
                let sym = tok.as_symbol().cloned().unwrap_or_else(|| crate::token::symbols().intern(&tok.literal));
                (Token::symbol(sym, tok.meta.pos), ExitCode::Success)
            }
            TokenTag::Quote => {
                let tok = self.bump();
                let (inner, code) = self.read_datum();
                (inner.with_pos(tok.meta.pos), code)
            }
            TokenTag::LParen => {
                let open = self.bump();
                let pos = open.meta.pos;
                let mut items = Vec::new();
                loop {
                    match self.peek().tag {
                        TokenTag::RParen => {
                            self.bump();
                            return (Token::list(items, pos), ExitCode::Success);
                        }
                        TokenTag::Eof => return (Token::list(items, pos), ExitCode::Incomplete),
                        _ => {
                            let (tok, code) = self.read_datum();
                            items.push(tok);
                            if code != ExitCode::Success {
                                return (Token::list(items, pos), code);
                            }
                        }
                    }
                }
            }
            TokenTag::RParen => {
                let tok = self.bump();
                (Token::error("extraneous closing paren", tok.meta.pos), ExitCode::Error)
            }
            TokenTag::Eof => (self.peek().clone(), ExitCode::Incomplete),
            TokenTag::Error => {
                let tok = self.bump();
                (tok, ExitCode::Error)
            }
            _ => (self.bump(), ExitCode::Success),
        }
    }
}

/// Convenience entry point: lexes then parses `source` in one shot.
pub fn parse_program(
    source: &str,
    ctx: std::rc::Rc<std::cell::RefCell<crate::env::InterpreterContext>>,
    name: &str,
) -> (Program, ExitCode) {
    let (tokens, lex_code) = crate::lexer::Lexer::new(source, ctx).tokenize();
    if lex_code != ExitCode::Success {
        let pos = tokens.last().map(|t| t.meta.pos).unwrap_or(Pos::NONE);
        let msg = match lex_code {
            ExitCode::Error => tokens
                .iter()
                .find(|t| t.tag == TokenTag::Error)
                .map(|t| t.literal.clone())
                .unwrap_or_else(|| "lexical error".to_string()),
            _ => "unexpected end of input".to_string(),
        };
        return (
            Program { forms: vec![Ast::Literal(Token::error(msg, pos))], name: name.to_string() },
            lex_code,
        );
    }
    Parser::new(&tokens).parse_program(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InterpreterContext;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn parse(src: &str) -> (Program, ExitCode) {
        parse_program(src, Rc::new(RefCell::new(InterpreterContext::with_baseline_features())), "test")
    }

    #[test]
    fn parses_simple_application() {
        let (prog, code) = parse("(+ 1 2 3)");
        assert_eq!(code, ExitCode::Success);
        assert_eq!(prog.forms.len(), 1);
        assert_eq!(prog.forms[0].as_sexpr().unwrap().len(), 4);
    }

    #[test]
    fn parses_multiple_top_level_forms() {
        let (prog, code) = parse("(define x 1) (+ x 1)");
        assert_eq!(code, ExitCode::Success);
        assert_eq!(prog.forms.len(), 2);
    }

    #[test]
    fn quoted_symbol_becomes_literal_sym_not_ident() {
        let (prog, _) = parse("'foo");
        let tok = prog.forms[0].as_literal().unwrap();
        assert_eq!(tok.tag, TokenTag::Sym);
    }

    #[test]
    fn quoted_list_is_data_not_application() {
        let (prog, _) = parse("'(1 2 3)");
        let tok = prog.forms[0].as_literal().unwrap();
        assert_eq!(tok.tag, TokenTag::List);
        assert_eq!(tok.as_list().unwrap().len(), 3);
    }

    #[test]
    fn missing_close_paren_is_incomplete() {
        let (_, code) = parse("(1 2");
        assert_eq!(code, ExitCode::Incomplete);
    }

    #[test]
    fn extraneous_close_paren_is_error() {
        let (_, code) = parse(")");
        assert_eq!(code, ExitCode::Error);
    }

    #[test]
    fn mismatched_bracket_kind_is_tolerated() {
        let (_, code) = parse("(foo]");
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn datum_comment_discards_one_form() {
        let (prog, code) = parse("(+ 1 #;(ignored me) 2)");
        assert_eq!(code, ExitCode::Success);
        assert_eq!(prog.forms[0].as_sexpr().unwrap().len(), 3);
    }

    #[test]
    fn meta_preceding_a_list_attaches_to_the_list_not_the_form_after_it() {
        let (prog, code) = parse("#doc \"d\" (foo 1 2) bar");
        assert_eq!(code, ExitCode::Success);
        assert_eq!(prog.forms.len(), 2);
        assert_eq!(prog.forms[0].meta().and_then(|m| m.doc()), Some("d"));
        let bar = prog.forms[1].as_literal().unwrap();
        assert_eq!(bar.meta.doc(), None);
    }

    #[test]
    fn meta_preceding_a_quoted_datum_attaches_to_the_datum_not_the_form_after_it() {
        let (prog, code) = parse("#doc \"d\" 'foo bar");
        assert_eq!(code, ExitCode::Success);
        assert_eq!(prog.forms.len(), 2);
        let quoted = prog.forms[0].as_literal().unwrap();
        assert_eq!(quoted.meta.doc(), Some("d"));
        let bar = prog.forms[1].as_literal().unwrap();
        assert_eq!(bar.meta.doc(), None);
    }

    #[test]
    fn parser_resynchronizes_after_an_extraneous_close_mid_program() {
        let (prog, code) = parse("(+ 1 1) ) (+ 2 2)");
        assert_eq!(code, ExitCode::Error);
        assert_eq!(prog.forms.len(), 3);
        assert_eq!(prog.forms[1].as_literal().unwrap().tag, TokenTag::Error);
        assert_eq!(prog.forms[2].as_sexpr().unwrap().len(), 3);
    }
}
