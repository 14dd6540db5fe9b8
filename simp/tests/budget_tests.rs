//! Step-budget and cancellation guards.

use kernel::ast::Term;
use kernel::checker::{Context, Definition, Env};
use kernel::prelude::std_env;
use simp::{simplify, SimpError, SimpOptions, Simplifier};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn nat() -> Rc<Term> {
    Term::constant("Nat")
}

fn chain_env() -> Env {
    let mut env = std_env();
    env.add_definition(Definition::axiom("g", Term::arrow(nat(), nat())))
        .unwrap();
    env.add_definition(Definition::axiom("a", nat())).unwrap();
    env
}

/// `g (g (... (g a)))`, `depth` applications deep.
fn nest(depth: usize) -> Rc<Term> {
    let mut t = Term::constant("a");
    for _ in 0..depth {
        t = Term::app(Term::constant("g"), t);
    }
    t
}

#[test]
fn deep_terms_simplify_within_a_generous_budget() {
    let env = chain_env();
    let opts = SimpOptions {
        max_steps: 100_000,
        ..SimpOptions::default()
    };
    let input = nest(64);
    let (out, _) = simplify(&input, &env, Context::new(), opts, &[]).expect("simplify failed");
    assert_eq!(out, input);
}

#[test]
fn tiny_budgets_are_enforced() {
    let env = chain_env();
    let opts = SimpOptions {
        max_steps: 8,
        ..SimpOptions::default()
    };
    let input = nest(64);
    match simplify(&input, &env, Context::new(), opts, &[]) {
        Err(SimpError::MaxStepsExceeded) => {}
        other => panic!("expected MaxStepsExceeded, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn zero_budget_fails_on_the_first_step() {
    let env = chain_env();
    let opts = SimpOptions {
        max_steps: 0,
        ..SimpOptions::default()
    };
    match simplify(&Term::constant("a"), &env, Context::new(), opts, &[]) {
        Err(SimpError::MaxStepsExceeded) => {}
        other => panic!("expected MaxStepsExceeded, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn a_single_constant_fits_in_one_step() {
    let env = chain_env();
    let opts = SimpOptions {
        max_steps: 1,
        ..SimpOptions::default()
    };
    let (out, _) = simplify(&Term::constant("a"), &env, Context::new(), opts, &[])
        .expect("one step should suffice for a constant");
    assert_eq!(out, Term::constant("a"));
}

#[test]
fn step_counter_resets_between_top_level_calls() {
    let env = chain_env();
    let opts = SimpOptions {
        max_steps: 40,
        ..SimpOptions::default()
    };
    let mut sim = Simplifier::new(&env, opts, vec![]);
    let input = nest(8);
    for _ in 0..10 {
        sim.run(&input, Context::new())
            .expect("each call owns a fresh budget");
    }
}

#[test]
fn interrupt_flag_cancels_the_run() {
    let env = chain_env();
    let flag = Arc::new(AtomicBool::new(false));
    let mut sim = Simplifier::new(&env, SimpOptions::default(), vec![]);
    sim.set_interrupt(flag.clone());
    sim.run(&nest(4), Context::new())
        .expect("unset flag must not interrupt");
    flag.store(true, Ordering::Relaxed);
    match sim.run(&nest(4), Context::new()) {
        Err(SimpError::Interrupted) => {}
        other => panic!("expected Interrupted, got {:?}", other.map(|_| ())),
    }
}
