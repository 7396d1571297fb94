//! Lexer and reader-macro dispatch table (component B). Turns a
//! character stream into a token stream, threading an injection FIFO
//! through every token-producing primitive so reader macros can splice
//! tokens back into the stream ahead of whatever characters remain.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::env::InterpreterContext;
use crate::token::{is_illegal_ident_char, symbols, ParenKind, Pos, Token, TokenTag};
use std::cell::RefCell;

/// Mirrors the lex/parse exit-code contract: `Incomplete` lets a REPL
/// prompt for more input, `Error` is an unrecoverable lexical fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Error,
    Incomplete,
}

impl ExitCode {
    /// First non-`Success` wins; `Error` outranks `Incomplete`.
    fn worse(self, other: ExitCode) -> ExitCode {
        match (self, other) {
            (ExitCode::Error, _) | (_, ExitCode::Error) => ExitCode::Error,
            (ExitCode::Incomplete, _) | (_, ExitCode::Incomplete) => ExitCode::Incomplete,
            _ => ExitCode::Success,
        }
    }
}

/// Whether the lexer's cursor sits after the dispatch key (`prefix`,
/// the common case) or still at `#` (`manual`, reserved for macros
/// that need to decide how much of their own key to consume).
#[derive(Clone, Copy, PartialEq, Eq)]
enum CursorPolicy {
    Prefix,
    #[allow(dead_code)]
    Manual,
}

type ReaderMacroFn = fn(&mut Lexer, Pos) -> Token;

struct ReaderMacroEntry {
    dispatch: &'static str,
    cursor: CursorPolicy,
    func: ReaderMacroFn,
}

fn reader_macro_table() -> Vec<ReaderMacroEntry> {
    let mut table = vec![
        ReaderMacroEntry { dispatch: "feat-require", cursor: CursorPolicy::Prefix, func: rm_feat_require },
        ReaderMacroEntry { dispatch: "meta", cursor: CursorPolicy::Prefix, func: rm_meta },
        ReaderMacroEntry { dispatch: "lang", cursor: CursorPolicy::Prefix, func: rm_lang },
        ReaderMacroEntry { dispatch: "doc", cursor: CursorPolicy::Prefix, func: rm_doc },
        ReaderMacroEntry { dispatch: "t", cursor: CursorPolicy::Prefix, func: rm_true },
        ReaderMacroEntry { dispatch: "T", cursor: CursorPolicy::Prefix, func: rm_true },
        ReaderMacroEntry { dispatch: "f", cursor: CursorPolicy::Prefix, func: rm_false },
        ReaderMacroEntry { dispatch: "F", cursor: CursorPolicy::Prefix, func: rm_false },
        ReaderMacroEntry { dispatch: "v", cursor: CursorPolicy::Prefix, func: rm_void },
        ReaderMacroEntry { dispatch: "\\", cursor: CursorPolicy::Prefix, func: rm_char },
        ReaderMacroEntry { dispatch: ";", cursor: CursorPolicy::Prefix, func: rm_datum_comment },
        ReaderMacroEntry { dispatch: "!", cursor: CursorPolicy::Prefix, func: rm_shebang },
        ReaderMacroEntry { dispatch: "|", cursor: CursorPolicy::Prefix, func: rm_block_comment },
        ReaderMacroEntry { dispatch: "?", cursor: CursorPolicy::Prefix, func: rm_cond_feature },
        ReaderMacroEntry { dispatch: "+", cursor: CursorPolicy::Prefix, func: rm_feature_plus },
        ReaderMacroEntry { dispatch: "-", cursor: CursorPolicy::Prefix, func: rm_feature_minus },
        ReaderMacroEntry { dispatch: "r", cursor: CursorPolicy::Prefix, func: rm_radix_explicit },
        ReaderMacroEntry { dispatch: "b", cursor: CursorPolicy::Prefix, func: rm_radix_bin },
        ReaderMacroEntry { dispatch: "o", cursor: CursorPolicy::Prefix, func: rm_radix_oct },
        ReaderMacroEntry { dispatch: "x", cursor: CursorPolicy::Prefix, func: rm_radix_hex },
    ];
    table.sort_by(|a, b| b.dispatch.len().cmp(&a.dispatch.len()));
    table
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    row: i64,
    col: i64,
    injected: VecDeque<Token>,
    ctx: Rc<RefCell<InterpreterContext>>,
    exit: ExitCode,
    table: Vec<ReaderMacroEntry>,
}

impl Lexer {
    pub fn new(src: &str, ctx: Rc<RefCell<InterpreterContext>>) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            row: 0,
            col: 0,
            injected: VecDeque::new(),
            ctx,
            exit: ExitCode::Success,
            table: reader_macro_table(),
        }
    }

    fn here(&self) -> Pos {
        Pos::new(self.row, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.row += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn set_exit(&mut self, code: ExitCode) {
        self.exit = self.exit.worse(code);
    }

    fn inject_front(&mut self, tokens: Vec<Token>) {
        for t in tokens.into_iter().rev() {
            self.injected.push_front(t);
        }
    }

    /// Tokenizes the whole input, stopping at the first non-`Success`
    /// token (an open construct or a lexical fault) or at `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token>, ExitCode) {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.tag == TokenTag::Eof || tok.tag == TokenTag::Error || self.exit != ExitCode::Success;
            out.push(tok);
            if done {
                break;
            }
        }
        (out, self.exit)
    }

    /// Reads exactly one top-level token (honouring injection), for
    /// the REPL's incremental `readForm` use-case.
    pub fn next_token(&mut self) -> Token {
        if let Some(t) = self.injected.pop_front() {
            return t;
        }
        self.skip_whitespace_and_line_comments();
        let pos = self.here();
        match self.peek() {
            None => Token::eof(pos),
            Some('(') => {
                self.bump();
                Token::lparen(ParenKind::Round, pos)
            }
            Some('[') => {
                self.bump();
                Token::lparen(ParenKind::Square, pos)
            }
            Some('{') => {
                self.bump();
                Token::lparen(ParenKind::Curly, pos)
            }
            Some(')') => {
                self.bump();
                Token::rparen(ParenKind::Round, pos)
            }
            Some(']') => {
                self.bump();
                Token::rparen(ParenKind::Square, pos)
            }
            Some('}') => {
                self.bump();
                Token::rparen(ParenKind::Curly, pos)
            }
            Some('"') => self.read_string(pos),
            Some('\'') => {
                self.bump();
                Token::new_quote(pos)
            }
            Some('|') => self.read_barred_ident(pos),
            Some('#') => self.read_hash(pos),
            Some(_) => self.read_atom(pos),
        }
    }

    fn skip_whitespace_and_line_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_string(&mut self, pos: Pos) -> Token {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    self.set_exit(ExitCode::Incomplete);
                    return Token::str_tok(out, pos);
                }
                Some('"') => {
                    self.bump();
                    return Token::str_tok(out, pos);
                }
                Some('\\') => {
                    self.bump();
                    match self.read_string_escape() {
                        Some(c) => out.push(c),
                        None => {
                            self.set_exit(ExitCode::Error);
                            return Token::error("invalid escape in string literal", pos);
                        }
                    }
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
    }

    fn read_string_escape(&mut self) -> Option<char> {
        let c = self.bump()?;
        Some(match c {
            'a' => '\u{7}',
            'b' => '\u{8}',
            't' => '\t',
            'n' => '\n',
            'v' => '\u{b}',
            'f' => '\u{c}',
            'r' => '\r',
            'e' => '\u{1b}',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            '0'..='7' => {
                let mut digits = String::new();
                digits.push(c);
                for _ in 0..2 {
                    if matches!(self.peek(), Some('0'..='7')) {
                        digits.push(self.bump().unwrap());
                    } else {
                        break;
                    }
                }
                let n = u32::from_str_radix(&digits, 8).ok()?;
                char::from_u32(n)?
            }
            'x' => {
                let mut digits = String::new();
                while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    digits.push(self.bump().unwrap());
                }
                let n = u32::from_str_radix(&digits, 16).ok()?;
                char::from_u32(n)?
            }
            'u' => self.read_hex_escape(4)?,
            'U' => self.read_hex_escape(8)?,
            _ => return None,
        })
    }

    fn read_hex_escape(&mut self, max_digits: usize) -> Option<char> {
        let mut digits = String::new();
        while digits.len() < max_digits && matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            digits.push(self.bump().unwrap());
        }
        if digits.is_empty() {
            return None;
        }
        let hi = u32::from_str_radix(&digits, 16).ok()?;
        if (0xD800..=0xDBFF).contains(&hi) {
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                self.bump();
                self.bump();
                let mut lo_digits = String::new();
                while lo_digits.len() < 4 && matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    lo_digits.push(self.bump().unwrap());
                }
                let lo = u32::from_str_radix(&lo_digits, 16).ok()?;
                let combined = 0x10000 + (hi - 0xD800) * 0x400 + (lo - 0xDC00);
                return char::from_u32(combined);
            }
        }
        char::from_u32(hi)
    }

    fn read_barred_ident(&mut self, pos: Pos) -> Token {
        self.bump(); // opening |
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    self.set_exit(ExitCode::Incomplete);
                    break;
                }
                Some('|') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
        Token::ident(symbols().intern(&out), pos)
    }

    fn read_atom(&mut self, pos: Pos) -> Token {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "()[]{}\"'|;".contains(c) {
                break;
            }
            self.bump();
            out.push(c);
        }
        classify_atom(&out, pos)
    }

    fn read_hash(&mut self, pos: Pos) -> Token {
        self.bump(); // '#'
        let rest: String = self.chars[self.pos..].iter().collect();
        for entry in &self.table {
            if rest.starts_with(entry.dispatch) {
                let advance_chars_ok = rest
                    .as_bytes()
                    .get(entry.dispatch.len())
                    .map(|&b| {
                        let c = b as char;
                        c.is_whitespace() || "()[]{}\"'|;#".contains(c)
                    })
                    .unwrap_or(true)
                    || entry.dispatch.len() == 1;
                if !advance_chars_ok {
                    continue;
                }
                if entry.cursor == CursorPolicy::Prefix {
                    for _ in 0..entry.dispatch.chars().count() {
                        self.bump();
                    }
                }
                return (entry.func)(self, pos);
            }
        }
        self.set_exit(ExitCode::Error);
        Token::error(format!("unknown reader macro: #{}", rest.chars().next().unwrap_or(' ')), pos)
    }

    /// Reads exactly one form as a flat, re-injectable token sequence:
    /// a single atom, or a balanced parenthesized group including its
    /// delimiters. Used by reader macros that need to skip, inspect or
    /// reinject "the next form" without building an AST.
    fn read_raw_form(&mut self) -> Vec<Token> {
        let first = self.next_token();
        if first.tag != TokenTag::LParen {
            return vec![first];
        }
        let mut depth = 1;
        let mut buf = vec![first];
        loop {
            let t = self.next_token();
            let done_tag = t.tag == TokenTag::Eof;
            match t.tag {
                TokenTag::LParen => depth += 1,
                TokenTag::RParen => depth -= 1,
                _ => {}
            }
            buf.push(t);
            if done_tag {
                self.set_exit(ExitCode::Incomplete);
                break;
            }
            if depth == 0 {
                break;
            }
        }
        buf
    }

    /// Splits a captured list's *inner* tokens (outer parens already
    /// stripped) into its top-level child forms.
    fn split_top_level(tokens: &[Token]) -> Vec<Vec<Token>> {
        let mut out = Vec::new();
        let mut depth = 0usize;
        let mut cur = Vec::new();
        for t in tokens {
            match t.tag {
                TokenTag::LParen => depth += 1,
                TokenTag::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            cur.push(t.clone());
            if depth == 0 {
                out.push(std::mem::take(&mut cur));
            }
        }
        out
    }
}

fn classify_atom(s: &str, pos: Pos) -> Token {
    if looks_numeric(s) {
        Token::num(s, pos)
    } else {
        Token::ident(symbols().intern(s), pos)
    }
}

fn looks_numeric(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut chars = s.chars().enumerate();
    let mut dots = 0;
    let mut has_digit = false;
    let first = s.chars().next().unwrap();
    if !(first.is_ascii_digit() || first == '+' || first == '-' || first == '.') {
        return false;
    }
    for (i, c) in chars.by_ref() {
        match c {
            '0'..='9' => has_digit = true,
            '.' => dots += 1,
            '+' | '-' if i == 0 => {}
            _ => return false,
        }
    }
    has_digit && dots <= 1
}

fn rm_true(_lx: &mut Lexer, pos: Pos) -> Token {
    Token::bool_tok(true, pos)
}
fn rm_false(_lx: &mut Lexer, pos: Pos) -> Token {
    Token::bool_tok(false, pos)
}

fn rm_void(lx: &mut Lexer, pos: Pos) -> Token {
    let void_ident = Token::ident(symbols().intern("void"), pos);
    lx.inject_front(vec![
        Token::lparen(ParenKind::Round, pos),
        void_ident,
        Token::rparen(ParenKind::Round, pos),
    ]);
    Token::void(pos)
}

fn rm_char(lx: &mut Lexer, pos: Pos) -> Token {
    let mut name = String::new();
    while let Some(c) = lx.peek() {
        if c.is_whitespace() || "()[]{}\"'|;".contains(c) {
            break;
        }
        name.push(c);
        lx.bump();
    }
    if name.is_empty() {
        if let Some(c) = lx.peek() {
            lx.bump();
            return Token::char_tok(c, pos);
        }
        lx.set_exit(ExitCode::Incomplete);
        return Token::error("unterminated character literal", pos);
    }
    let named = match name.as_str() {
        "nul" => Some('\0'),
        "backspace" => Some('\u{8}'),
        "tab" => Some('\t'),
        "newline" | "linefeed" => Some('\n'),
        "vtab" => Some('\u{b}'),
        "page" => Some('\u{c}'),
        "return" => Some('\r'),
        "space" => Some(' '),
        "rubout" => Some('\u{7f}'),
        _ => None,
    };
    if let Some(c) = named {
        return Token::char_tok(c, pos);
    }
    if name.len() == 1 {
        return Token::char_tok(name.chars().next().unwrap(), pos);
    }
    if let Some(rest) = name.strip_prefix('u').or_else(|| name.strip_prefix('U')) {
        if let Ok(n) = u32::from_str_radix(rest, 16) {
            if let Some(c) = char::from_u32(n) {
                return Token::char_tok(c, pos);
            }
        }
    }
    if name.len() == 3 && name.chars().all(|c| ('0'..='7').contains(&c)) {
        if let Ok(n) = u32::from_str_radix(&name, 8) {
            if let Some(c) = char::from_u32(n) {
                return Token::char_tok(c, pos);
            }
        }
    }
    lx.set_exit(ExitCode::Error);
    Token::error(format!("invalid character literal: #\\{name}"), pos)
}

fn rm_datum_comment(lx: &mut Lexer, pos: Pos) -> Token {
    lx.read_raw_form();
    let _ = pos;
    lx.next_token()
}

fn rm_shebang(lx: &mut Lexer, pos: Pos) -> Token {
    let mut line = String::new();
    while let Some(c) = lx.peek() {
        if c == '\n' {
            break;
        }
        line.push(c);
        lx.bump();
    }
    lx.ctx.borrow_mut().file_directives.insert("exec_with".to_string(), line.trim().to_string());
    let _ = pos;
    lx.next_token()
}

fn rm_block_comment(lx: &mut Lexer, pos: Pos) -> Token {
    let mut depth = 1;
    loop {
        match lx.peek() {
            None => {
                lx.set_exit(ExitCode::Incomplete);
                return Token::error("unterminated block comment", pos);
            }
            Some('#') if lx.peek_at(1) == Some('|') => {
                lx.bump();
                lx.bump();
                depth += 1;
            }
            Some('|') if lx.peek_at(1) == Some('#') => {
                lx.bump();
                lx.bump();
                depth -= 1;
                if depth == 0 {
                    return lx.next_token();
                }
            }
            Some(_) => {
                lx.bump();
            }
        }
    }
}

fn rm_meta(lx: &mut Lexer, pos: Pos) -> Token {
    let key_tokens = lx.read_raw_form();
    let value_tokens = lx.read_raw_form();
    let key = flatten_literal(&key_tokens);
    let value = flatten_literal(&value_tokens);
    let mut meta = HashMap::new();
    meta.insert(key, value);
    Token::meta_injector(meta, None, pos)
}

fn rm_doc(lx: &mut Lexer, pos: Pos) -> Token {
    let value_tokens = lx.read_raw_form();
    let mut meta = HashMap::new();
    meta.insert("doc".to_string(), flatten_literal(&value_tokens));
    Token::meta_injector(meta, None, pos)
}

fn rm_lang(lx: &mut Lexer, pos: Pos) -> Token {
    let tokens = lx.read_raw_form();
    let name = flatten_literal(&tokens);
    lx.ctx.borrow_mut().file_directives.insert("language".to_string(), name);
    let _ = pos;
    lx.next_token()
}

fn rm_feat_require(lx: &mut Lexer, pos: Pos) -> Token {
    let form = lx.read_raw_form();
    let inner = strip_outer_parens(&form);
    let parts = Lexer::split_top_level(inner);
    let feature = parts.first().map(|p| flatten_literal(p)).unwrap_or_default();
    let err = parts.get(1).map(|p| flatten_literal(p));
    if lx.ctx.borrow().features.contains(&feature) {
        Token::void(pos)
    } else {
        lx.set_exit(ExitCode::Error);
        Token::error(err.unwrap_or_else(|| format!("feature missing: {feature}")), pos)
    }
}

fn rm_cond_feature(lx: &mut Lexer, pos: Pos) -> Token {
    let form = lx.read_raw_form();
    let inner = strip_outer_parens(&form);
    let parts = Lexer::split_top_level(inner);
    let feature = parts.first().map(|p| flatten_literal(p)).unwrap_or_default();
    let present = lx.ctx.borrow().features.contains(&feature);
    let chosen = if present { parts.get(1) } else { parts.get(2) };
    if let Some(tokens) = chosen {
        lx.inject_front(tokens.clone());
    }
    lx.next_token()
}

fn rm_feature_plus(lx: &mut Lexer, pos: Pos) -> Token {
    feature_conditional(lx, pos, true)
}
fn rm_feature_minus(lx: &mut Lexer, pos: Pos) -> Token {
    feature_conditional(lx, pos, false)
}

fn feature_conditional(lx: &mut Lexer, _pos: Pos, want_present: bool) -> Token {
    let feature_tokens = lx.read_raw_form();
    let feature = flatten_literal(&feature_tokens);
    let form = lx.read_raw_form();
    let present = lx.ctx.borrow().features.contains(&feature);
    if present == want_present {
        lx.inject_front(form);
    }
    lx.next_token()
}

fn rm_radix_explicit(lx: &mut Lexer, pos: Pos) -> Token {
    radix_literal(lx, pos, None)
}
fn rm_radix_bin(lx: &mut Lexer, pos: Pos) -> Token {
    radix_literal(lx, pos, Some(2))
}
fn rm_radix_oct(lx: &mut Lexer, pos: Pos) -> Token {
    radix_literal(lx, pos, Some(8))
}
fn rm_radix_hex(lx: &mut Lexer, pos: Pos) -> Token {
    radix_literal(lx, pos, Some(16))
}

fn radix_literal(lx: &mut Lexer, pos: Pos, fixed_radix: Option<u32>) -> Token {
    let radix = match fixed_radix {
        Some(r) => r,
        None => {
            let tok = lx.next_token();
            match tok.literal.trim().parse::<u32>() {
                Ok(r) => r,
                Err(_) => {
                    lx.set_exit(ExitCode::Error);
                    return Token::error("invalid radix", pos);
                }
            }
        }
    };
    let digits_tok = lx.next_token();
    match i64::from_str_radix(digits_tok.literal.trim(), radix) {
        Ok(n) => Token::num_value(n as f64, pos),
        Err(_) => {
            lx.set_exit(ExitCode::Error);
            Token::error(format!("invalid base-{radix} literal: {}", digits_tok.literal), pos)
        }
    }
}

fn strip_outer_parens(tokens: &[Token]) -> &[Token] {
    if tokens.len() >= 2 && tokens[0].tag == TokenTag::LParen {
        &tokens[1..tokens.len() - 1]
    } else {
        tokens
    }
}

fn flatten_literal(tokens: &[Token]) -> String {
    tokens.first().map(|t| t.literal.clone()).unwrap_or_default()
}
