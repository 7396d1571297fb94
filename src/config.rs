//! Version and REPL banner constants.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WELCOME_MESSAGE: &str = "Bracket";
pub const WELCOME_SUBTITLE: &str = "a tree-walking Scheme-family interpreter";
