//! Golden tests over the batch driver.

use cli::driver::Session;
use insta::assert_snapshot;
use simp::SimpOptions;

fn run(source: &str) -> String {
    let mut session = Session::new(SimpOptions::default());
    session.run_source(source).expect("driver failed")
}

#[test]
fn beta_reduction_through_the_driver() {
    let out = run(concat!(
        "(axiom g (arrow Nat Nat))\n",
        "(axiom a Nat)\n",
        "(simp ((lam x Nat (g x)) a))\n",
        "(infer (g a))\n",
    ));
    assert_snapshot!(out, @r###"
    g a
      by refl Nat (g a)
    Nat
    "###);
}

#[test]
fn permutative_rule_through_the_driver() {
    let out = run(concat!(
        "(axiom g2 (arrow Nat (arrow Nat Nat)))\n",
        "(axiom g2_comm (pi x Nat (pi y Nat (eq.{1} Nat (g2 x y) (g2 y x)))))\n",
        "(rule perm g2_comm)\n",
        "(simp (g2 2 1))\n",
    ));
    assert_snapshot!(out, @r###"
    g2 1 2
      by g2_comm 2 1
    "###);
}

#[test]
fn evaluation_through_the_driver() {
    let out = run("(simp (add 2 1))\n");
    assert_snapshot!(out, @r###"
    3
      by refl Nat 3
    "###);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let out = run("; just a comment\n\n(infer Nat)\n");
    assert_snapshot!(out, @"Type");
}

#[test]
fn unusable_rules_are_reported() {
    let mut session = Session::new(SimpOptions::default());
    let err = session
        .run_source("(rule s missing)\n")
        .expect_err("missing fact must fail");
    assert!(err.to_string().contains("no usable rule"));
}

#[test]
fn ill_typed_terms_are_rejected() {
    let mut session = Session::new(SimpOptions::default());
    let err = session
        .run_source("(simp (add Nat 1))\n")
        .expect_err("ill-typed input must fail");
    assert!(err.to_string().contains("ill-typed"));
}
