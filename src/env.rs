//! Lexically chained environment: symbol-id keyed bindings, a
//! shared-by-reference builtin registry and output sink, and the
//! interpreter context consulted by conditional reader macros.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

use crate::ast::Ast;
use crate::builtins::BuiltinRegistry;
use crate::token::RuntimeSymbol;

/// File directives (`#lang`, `#!shebang`) and the active feature set
/// consulted by `#feat-require`/`#?`/`#+`/`#-`.
#[derive(Debug, Default)]
pub struct InterpreterContext {
    pub file_directives: HashMap<String, String>,
    pub features: HashSet<String>,
}

impl InterpreterContext {
    pub fn with_baseline_features() -> Self {
        let mut features = HashSet::new();
        for f in [
            arch_feature(),
            os_feature(),
            endian_feature(),
            "impl:name:bracket",
            "impl:version:0.1.0",
            "shebang",
            "unicode",
            "vbars",
            "comments-semicolon",
            "comments-block",
            "comments-nested",
            "comments-datum",
        ] {
            features.insert(f.to_string());
        }
        InterpreterContext { file_directives: HashMap::new(), features }
    }
}

fn arch_feature() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "arch:x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "arch:aarch64"
    } else {
        "arch:unknown"
    }
}

fn os_feature() -> &'static str {
    if cfg!(target_os = "linux") {
        "os:linux"
    } else if cfg!(target_os = "macos") {
        "os:macos"
    } else if cfg!(target_os = "windows") {
        "os:windows"
    } else {
        "os:unknown"
    }
}

fn endian_feature() -> &'static str {
    if cfg!(target_endian = "little") {
        "endian:little"
    } else {
        "endian:big"
    }
}

/// A handle to an append-only output stream. Children share their
/// parent's handle directly (an `Rc` clone), so writes from a deeply
/// nested `let`/call body surface on the same stream the REPL reads
/// from, with no locking required under the single-thread rule.
#[derive(Clone)]
pub enum OutputSink {
    Stdout,
    Buffer(Rc<RefCell<String>>),
}

impl OutputSink {
    pub fn buffer() -> Self {
        OutputSink::Buffer(Rc::new(RefCell::new(String::new())))
    }

    pub fn write_str(&self, s: &str) {
        match self {
            OutputSink::Stdout => {
                print!("{s}");
                let _ = std::io::stdout().flush();
            }
            OutputSink::Buffer(buf) => buf.borrow_mut().push_str(s),
        }
    }

    pub fn take_buffer(&self) -> Option<String> {
        match self {
            OutputSink::Buffer(buf) => Some(buf.borrow().clone()),
            OutputSink::Stdout => None,
        }
    }
}

pub struct Environment {
    pub label: String,
    pub parent: Option<Rc<Environment>>,
    bindings: RefCell<HashMap<u64, Ast>>,
    pub builtins: Rc<RefCell<BuiltinRegistry>>,
    pub stdout: OutputSink,
    pub ctx: Rc<RefCell<InterpreterContext>>,
}

impl Environment {
    /// Creates a root environment, owning a fresh builtin registry
    /// snapshot. Call once per program or REPL session.
    pub fn root(label: impl Into<String>) -> Rc<Environment> {
        Rc::new(Environment {
            label: label.into(),
            parent: None,
            bindings: RefCell::new(HashMap::new()),
            builtins: Rc::new(RefCell::new(BuiltinRegistry::with_stdlib())),
            stdout: OutputSink::Stdout,
            ctx: Rc::new(RefCell::new(InterpreterContext::with_baseline_features())),
        })
    }

    /// Creates a child scope (procedure call frame, `let`-like block)
    /// sharing the parent's builtin registry, sink and context.
    pub fn child(parent: &Rc<Environment>, label: impl Into<String>) -> Rc<Environment> {
        Rc::new(Environment {
            label: label.into(),
            parent: Some(parent.clone()),
            bindings: RefCell::new(HashMap::new()),
            builtins: parent.builtins.clone(),
            stdout: parent.stdout.clone(),
            ctx: parent.ctx.clone(),
        })
    }

    /// Shallow clone: fresh bindings map, same parent pointer. Used by
    /// the macro expander when it needs an isolated scratch scope.
    pub fn copy(env: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            label: format!("{}'", env.label),
            parent: env.parent.clone(),
            bindings: RefCell::new(env.bindings.borrow().clone()),
            builtins: env.builtins.clone(),
            stdout: env.stdout.clone(),
            ctx: env.ctx.clone(),
        })
    }

    /// Binds `sym` in the current frame only, shadowing any parent
    /// binding of the same id without disturbing it.
    pub fn define(&self, sym: &Rc<RuntimeSymbol>, node: Ast) {
        self.bindings.borrow_mut().insert(sym.id, node);
    }

    pub fn get(&self, sym: &Rc<RuntimeSymbol>) -> Option<Ast> {
        if let Some(node) = self.bindings.borrow().get(&sym.id) {
            return Some(node.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(sym))
    }

    pub fn has(&self, sym: &Rc<RuntimeSymbol>) -> bool {
        self.bindings.borrow().contains_key(&sym.id)
            || self.parent.as_ref().map(|p| p.has(sym)).unwrap_or(false)
    }

    /// Mutates the nearest enclosing binding of `sym`. Returns `false`
    /// if `sym` is unbound anywhere in the chain.
    pub fn set(&self, sym: &Rc<RuntimeSymbol>, node: Ast) -> bool {
        if self.bindings.borrow().contains_key(&sym.id) {
            self.bindings.borrow_mut().insert(sym.id, node);
            return true;
        }
        match &self.parent {
            Some(p) => p.set(sym, node),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{symbols, Token};

    #[test]
    fn define_binds_in_current_frame_only() {
        let root = Environment::root("root");
        let child = Environment::child(&root, "child");
        let x = symbols().intern("env-test-x");
        child.define(&x, Ast::Literal(Token::num("1", crate::token::Pos::NONE)));
        assert!(child.has(&x));
        assert!(!root.has(&x));
    }

    #[test]
    fn get_walks_up_the_parent_chain() {
        let root = Environment::root("root");
        let child = Environment::child(&root, "child");
        let x = symbols().intern("env-test-y");
        root.define(&x, Ast::Literal(Token::num("42", crate::token::Pos::NONE)));
        let found = child.get(&x).unwrap();
        assert_eq!(found.as_literal().unwrap().literal, "42");
    }

    #[test]
    fn set_mutates_the_nearest_enclosing_binding() {
        let root = Environment::root("root");
        let child = Environment::child(&root, "child");
        let x = symbols().intern("env-test-z");
        root.define(&x, Ast::Literal(Token::num("1", crate::token::Pos::NONE)));
        assert!(child.set(&x, Ast::Literal(Token::num("2", crate::token::Pos::NONE))));
        assert_eq!(root.get(&x).unwrap().as_literal().unwrap().literal, "2");
    }

    #[test]
    fn set_on_unbound_symbol_fails() {
        let root = Environment::root("root");
        let x = symbols().intern("env-test-unbound");
        assert!(!root.set(&x, Ast::Literal(Token::num("1", crate::token::Pos::NONE))));
    }

    #[test]
    fn copy_shares_parent_but_not_bindings() {
        let root = Environment::root("root");
        let child = Environment::child(&root, "child");
        let x = symbols().intern("env-test-copy");
        child.define(&x, Ast::Literal(Token::num("1", crate::token::Pos::NONE)));
        let snapshot = Environment::copy(&child);
        snapshot.define(&x, Ast::Literal(Token::num("2", crate::token::Pos::NONE)));
        assert_eq!(child.get(&x).unwrap().as_literal().unwrap().literal, "1");
        assert_eq!(snapshot.get(&x).unwrap().as_literal().unwrap().literal, "2");
    }

    #[test]
    fn child_inherits_parents_output_sink_and_builtins() {
        let root = Environment::root("root");
        let child = Environment::child(&root, "child");
        assert!(Rc::ptr_eq(&root.builtins, &child.builtins));
    }
}
