//! Reader-macro behavior exercised end to end through the driver:
//! conditional compilation, feature gates, radix literals, and
//! block/datum comments — the lexical extensions spec.md §4.B and §6
//! describe as part of the source syntax.

use bracket::driver::{run, RunOutcome};
use bracket::env::Environment;
use bracket::token::TokenTag;

fn eval_with_features(src: &str, features: &[&str]) -> bracket::token::Token {
    let env = Environment::root("reader-macro-test");
    for f in features {
        env.ctx.borrow_mut().features.insert(f.to_string());
    }
    match run(src, &env, |_| {}) {
        RunOutcome::Value(v) => v,
        RunOutcome::Incomplete => panic!("unexpected incomplete input: {src}"),
    }
}

#[test]
fn feat_require_succeeds_when_present_and_errors_when_absent() {
    let ok = eval_with_features("#feat-require(net) (+ 1 1)", &["net"]);
    assert_eq!(ok.to_string(), "2");

    let missing = eval_with_features("#feat-require(net) (+ 1 1)", &[]);
    assert_eq!(missing.tag, TokenTag::Error);
}

#[test]
fn conditional_dispatch_picks_then_or_else_branch() {
    let present = eval_with_features("#?(net (+ 1 1) (+ 2 2))", &["net"]);
    assert_eq!(present.to_string(), "2");

    let absent = eval_with_features("#?(net (+ 1 1) (+ 2 2))", &[]);
    assert_eq!(absent.to_string(), "4");
}

#[test]
fn datum_comment_skips_exactly_one_form_leaving_the_rest_intact() {
    let v = eval_with_features("(+ 1 #;(this is discarded) 2 3)", &[]);
    assert_eq!(v.to_string(), "6");
}

#[test]
fn nested_block_comments_balance_to_one_comment() {
    let v = eval_with_features("#| a #| b |# c |# (+ 40 2)", &[]);
    assert_eq!(v.to_string(), "42");
}

#[test]
fn void_reader_macro_produces_the_void_value() {
    let v = eval_with_features("#v", &[]);
    assert_eq!(v.tag, TokenTag::Void);
}

#[test]
fn radix_reader_macros_parse_correctly() {
    assert_eq!(eval_with_features("#r 2 1010", &[]).to_string(), "10");
    assert_eq!(eval_with_features("#x ff", &[]).to_string(), "255");
    assert_eq!(eval_with_features("#b 101", &[]).to_string(), "5");
    assert_eq!(eval_with_features("#o 17", &[]).to_string(), "15");
}

#[test]
fn baseline_features_are_present_without_configuration() {
    let env = Environment::root("baseline");
    let ctx = env.ctx.borrow();
    assert!(ctx.features.contains("unicode"));
    assert!(ctx.features.contains("comments-nested"));
    assert!(ctx.features.iter().any(|f| f.starts_with("arch:")));
    assert!(ctx.features.iter().any(|f| f.starts_with("os:")));
}

#[test]
fn shebang_line_is_captured_as_a_file_directive_not_a_value() {
    let env = Environment::root("shebang-test");
    match run("#!/usr/bin/env bracket\n(+ 1 1)", &env, |_| {}) {
        RunOutcome::Value(v) => assert_eq!(v.to_string(), "2"),
        RunOutcome::Incomplete => panic!("expected a value"),
    }
    assert_eq!(env.ctx.borrow().file_directives.get("exec_with").unwrap(), "/usr/bin/env bracket");
}

#[test]
fn lang_directive_sets_the_language_file_directive() {
    let env = Environment::root("lang-test");
    run("#lang bracket (+ 1 1)", &env, |_| {});
    assert_eq!(env.ctx.borrow().file_directives.get("language").unwrap(), "bracket");
}
