//! Token and symbol model: the tagged lexeme union produced by the lexer
//! and consumed everywhere downstream, plus the process-wide symbol
//! intern table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source position, one-based when reported in error text but stored
/// zero-based-or-sentinel internally. `(-1, -1)` marks "not from source".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub row: i64,
    pub col: i64,
}

impl Pos {
    pub const NONE: Pos = Pos { row: -1, col: -1 };

    pub fn new(row: i64, col: i64) -> Self {
        Pos { row, col }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Pos::NONE
    }
}

/// A canonicalized symbol name. Two interned `RuntimeSymbol`s with the
/// same name always share the same `id`; `gensym` symbols are never
/// interned and carry an id no interned symbol can ever reuse.
#[derive(Debug, Clone)]
pub struct RuntimeSymbol {
    pub id: u64,
    pub interned: bool,
    pub name: String,
}

impl RuntimeSymbol {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for RuntimeSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for RuntimeSymbol {}

impl std::hash::Hash for RuntimeSymbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RuntimeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Process-wide interner. Interned ids are handed out starting at 0;
/// gensym ids are handed out from a disjoint counter that starts above
/// any interned id could plausibly reach, keeping the two spaces apart
/// without needing to consult one another on every allocation.
pub struct SymbolTable {
    by_name: RefCell<HashMap<String, Rc<RuntimeSymbol>>>,
    next_interned: AtomicU64,
    next_gensym: AtomicU64,
}

const GENSYM_ID_BASE: u64 = 1 << 63;

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            by_name: RefCell::new(HashMap::new()),
            next_interned: AtomicU64::new(0),
            next_gensym: AtomicU64::new(GENSYM_ID_BASE),
        }
    }

    /// Returns the canonical symbol for `name`, interning it if this is
    /// the first time it has been seen.
    pub fn intern(&self, name: &str) -> Rc<RuntimeSymbol> {
        if let Some(existing) = self.by_name.borrow().get(name) {
            return existing.clone();
        }
        let id = self.next_interned.fetch_add(1, Ordering::Relaxed);
        let sym = Rc::new(RuntimeSymbol {
            id,
            interned: true,
            name: name.to_string(),
        });
        self.by_name.borrow_mut().insert(name.to_string(), sym.clone());
        sym
    }

    /// Produces a fresh, never-interned symbol. Two calls with the same
    /// prefix never collide with each other or with any interned name.
    pub fn gensym(&self, prefix: &str) -> Rc<RuntimeSymbol> {
        let id = self.next_gensym.fetch_add(1, Ordering::Relaxed);
        Rc::new(RuntimeSymbol {
            id,
            interned: false,
            name: format!("{prefix}{id}"),
        })
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// `SymbolTable` holds `Rc`/`RefCell` internals and so is neither `Send`
// nor `Sync` — it cannot live in a plain `static`. Each thread gets its
// own table, leaked once and handed out as a `'static` reference
// thereafter; under the single-thread evaluation rule this is
// indistinguishable from one truly global table.
thread_local! {
    static SYMBOLS: &'static SymbolTable = Box::leak(Box::new(SymbolTable::new()));
}

/// The interner every `Lexer`/`Parser` instance and every `gensym` call
/// shares within the current thread, per the concurrency model's
/// requirement that it be treated as process-wide.
pub fn symbols() -> &'static SymbolTable {
    SYMBOLS.with(|s| *s)
}

/// The tag set described in the data model. `Ident` is a bare,
/// not-yet-resolved identifier lexeme; `Sym` is a first-class symbol
/// value (what `'foo` or `(quote foo)` evaluates to).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTag {
    Any,
    Error,
    Eof,
    Void,
    LParen,
    RParen,
    Num,
    Sym,
    Bool,
    Str,
    Ident,
    Char,
    Procedure,
    List,
    Quote,
    Form,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParenKind {
    Round,
    Square,
    Curly,
}

impl ParenKind {
    pub fn open(self) -> char {
        match self {
            ParenKind::Round => '(',
            ParenKind::Square => '[',
            ParenKind::Curly => '{',
        }
    }
    pub fn close(self) -> char {
        match self {
            ParenKind::Round => ')',
            ParenKind::Square => ']',
            ParenKind::Curly => '}',
        }
    }
}

/// A metadata injector produced by `#meta`/`#doc`: attaches `meta` to
/// the next token that passes `pred` (or unconditionally, if absent).
#[derive(Clone)]
pub struct MetaInjector {
    pub meta: HashMap<String, String>,
    pub pred: Option<Rc<dyn Fn(&Token) -> bool>>,
}

impl fmt::Debug for MetaInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaInjector").field("meta", &self.meta).finish()
    }
}

/// Tag-dependent payload. Most tags carry no payload beyond `literal`.
#[derive(Debug, Clone)]
pub enum TokenValue {
    None,
    Symbol(Rc<RuntimeSymbol>),
    List(Vec<Token>),
    Procedure(Rc<crate::ast::ProcedureNode>),
    Meta(MetaInjector),
}

/// Positional metadata plus the freeform, extensible key/value map that
/// reader macros (`#meta`, `#doc`) and the macro expander (`__macro`)
/// attach to tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenMeta {
    pub pos: Pos,
    pub extra: HashMap<String, String>,
}

impl TokenMeta {
    pub fn at(pos: Pos) -> Self {
        TokenMeta { pos, extra: HashMap::new() }
    }

    pub fn doc(&self) -> Option<&str> {
        self.extra.get("doc").map(|s| s.as_str())
    }

    pub fn macro_tag(&self) -> Option<&str> {
        self.extra.get("__macro").map(|s| s.as_str())
    }

    pub fn with_macro_tag(mut self, name: &str) -> Self {
        self.extra.insert("__macro".to_string(), name.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tag: TokenTag,
    pub literal: String,
    pub meta: TokenMeta,
    pub value: TokenValue,
    pub paren_kind: Option<ParenKind>,
}

const ILLEGAL_IDENT_CHARS: &[char] =
    &['(', ')', '[', ']', '{', '}', '"', ',', '\'', ';', '|', '.', '\\'];

/// The stricter of the two variants observed in the source material:
/// `.` and `'` are always illegal inside a bare identifier, never
/// permitted. See the open question in the design notes.
pub fn is_illegal_ident_char(c: char) -> bool {
    ILLEGAL_IDENT_CHARS.contains(&c) || c.is_whitespace()
}

impl Token {
    fn new(tag: TokenTag, literal: impl Into<String>, pos: Pos, value: TokenValue) -> Self {
        Token { tag, literal: literal.into(), meta: TokenMeta::at(pos), value, paren_kind: None }
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.meta.pos = pos;
        self
    }

    pub fn num(literal: impl Into<String>, pos: Pos) -> Self {
        Token::new(TokenTag::Num, literal, pos, TokenValue::None)
    }

    pub fn num_value(n: f64, pos: Pos) -> Self {
        Token::num(format_num(n), pos)
    }

    pub fn bool_tok(b: bool, pos: Pos) -> Self {
        Token::new(TokenTag::Bool, if b { "#t" } else { "#f" }, pos, TokenValue::None)
    }

    pub fn str_tok(s: impl Into<String>, pos: Pos) -> Self {
        let s = s.into();
        Token::new(TokenTag::Str, s, pos, TokenValue::None)
    }

    pub fn char_tok(c: char, pos: Pos) -> Self {
        Token::new(TokenTag::Char, c.to_string(), pos, TokenValue::None)
    }

    pub fn ident(sym: Rc<RuntimeSymbol>, pos: Pos) -> Self {
        let name = sym.name.clone();
        Token::new(TokenTag::Ident, name, pos, TokenValue::Symbol(sym))
    }

    pub fn symbol(sym: Rc<RuntimeSymbol>, pos: Pos) -> Self {
        let name = sym.name.clone();
        Token::new(TokenTag::Sym, name, pos, TokenValue::Symbol(sym))
    }

    pub fn void(pos: Pos) -> Self {
        Token::new(TokenTag::Void, "#<void>", pos, TokenValue::None)
    }

    pub fn eof(pos: Pos) -> Self {
        Token::new(TokenTag::Eof, "", pos, TokenValue::None)
    }

    pub fn lparen(kind: ParenKind, pos: Pos) -> Self {
        let mut t = Token::new(TokenTag::LParen, kind.open().to_string(), pos, TokenValue::None);
        t.paren_kind = Some(kind);
        t
    }

    pub fn rparen(kind: ParenKind, pos: Pos) -> Self {
        let mut t = Token::new(TokenTag::RParen, kind.close().to_string(), pos, TokenValue::None);
        t.paren_kind = Some(kind);
        t
    }

    pub fn error(msg: impl Into<String>, pos: Pos) -> Self {
        Token::new(TokenTag::Error, msg, pos, TokenValue::None)
    }

    /// A bare `'` lexeme. Never reaches the evaluator: the parser
    /// consumes it and reads the following datum as quoted data.
    pub fn new_quote(pos: Pos) -> Self {
        Token::new(TokenTag::Quote, "'", pos, TokenValue::None)
    }

    pub fn list(items: Vec<Token>, pos: Pos) -> Self {
        Token::new(TokenTag::List, "", pos, TokenValue::List(items))
    }

    pub fn procedure(node: Rc<crate::ast::ProcedureNode>, pos: Pos) -> Self {
        Token::new(TokenTag::Procedure, "#<procedure>", pos, TokenValue::Procedure(node))
    }

    pub fn meta_injector(meta: HashMap<String, String>, pred: Option<Rc<dyn Fn(&Token) -> bool>>, pos: Pos) -> Self {
        Token::new(TokenTag::Meta, "", pos, TokenValue::Meta(MetaInjector { meta, pred }))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self.tag, TokenTag::Bool if self.literal == "#f")
    }

    pub fn as_symbol(&self) -> Option<&Rc<RuntimeSymbol>> {
        match &self.value {
            TokenValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if self.tag == TokenTag::Num {
            self.literal.parse::<f64>().ok()
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&[Token]> {
        match &self.value {
            TokenValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Deterministic rendering per the §4.A rules. `nested` suppresses
    /// the leading quote on symbols/lists (used when rendering as a
    /// child of an enclosing list).
    pub fn to_display_string(&self, nested: bool) -> String {
        match self.tag {
            TokenTag::Num => self.literal.clone(),
            TokenTag::Sym => {
                let needs_bars =
                    self.literal.is_empty() || self.literal.chars().any(is_illegal_ident_char);
                let rendered = if needs_bars { format!("|{}|", self.literal) } else { self.literal.clone() };
                if nested { rendered } else { format!("'{rendered}") }
            }
            TokenTag::Ident => self.literal.clone(),
            TokenTag::Bool => self.literal.clone(),
            TokenTag::Str => format!("\"{}\"", escape_string(&self.literal)),
            TokenTag::Char => format_char(&self.literal),
            TokenTag::List => {
                let items = self.as_list().unwrap_or(&[]);
                let inner: Vec<String> = items.iter().map(|t| t.to_display_string(true)).collect();
                let body = format!("({})", inner.join(" "));
                if nested { body } else { format!("'{body}") }
            }
            TokenTag::Void => "#<void>".to_string(),
            TokenTag::Procedure => "#<procedure>".to_string(),
            TokenTag::Error => {
                format!("#<error:{} at {}:{}>", self.literal, self.meta.pos.row + 1, self.meta.pos.col + 1)
            }
            TokenTag::Any => "#<any>".to_string(),
            TokenTag::Eof => panic!("bracket: attempted to render EOF token"),
            _ => self.literal.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string(false))
    }
}

pub fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\u{1b}' => out.push_str("\\e"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

fn format_char(literal: &str) -> String {
    let c = match literal.chars().next() {
        Some(c) => c,
        None => return "#\\".to_string(),
    };
    let name = match c {
        '\0' => Some("nul"),
        '\u{8}' => Some("backspace"),
        '\t' => Some("tab"),
        '\n' => Some("newline"),
        '\u{b}' => Some("vtab"),
        '\u{c}' => Some("page"),
        '\r' => Some("return"),
        ' ' => Some("space"),
        '\u{7f}' => Some("rubout"),
        _ => None,
    };
    if let Some(name) = name {
        format!("#\\{name}")
    } else if c.is_control() || !c.is_ascii_graphic() && c != ' ' {
        format!("#\\u{{{:x}}}", c as u32)
    } else {
        format!("#\\{c}")
    }
}
