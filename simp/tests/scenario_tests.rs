//! End-to-end simplification scenarios: beta, eta, permutative rules,
//! conditional rewriting, contextual congruence, and cast elimination.

use kernel::ast::{level_succ, Level, Term};
use kernel::checker::{infer_type, is_def_eq, whnf, Context, Definition, Env};
use kernel::prelude::{std_env, std_env_core};
use simp::{simplify, CongrSchema, RuleSet, SimpOptions};
use std::rc::Rc;

fn one() -> Level {
    level_succ(Level::Zero)
}

fn two() -> Level {
    level_succ(one())
}

fn nat() -> Rc<Term> {
    Term::constant("Nat")
}

fn eq1() -> Rc<Term> {
    Term::const_levels("eq", vec![one()])
}

fn eq_nat(l: Rc<Term>, r: Rc<Term>) -> Rc<Term> {
    Term::apps(&eq1(), &[nat(), l, r])
}

fn eq_prop(l: Rc<Term>, r: Rc<Term>) -> Rc<Term> {
    Term::apps(&eq1(), &[Term::prop(), l, r])
}

fn ite1() -> Rc<Term> {
    Term::const_levels("ite", vec![one()])
}

fn axiom(env: &mut Env, name: &str, ty: Rc<Term>) {
    env.add_definition(Definition::axiom(name, ty))
        .expect("duplicate axiom");
}

/// Check that `proof` typechecks as an (possibly heterogeneous) equality
/// between `input` and `out`.
fn assert_proof_of(env: &Env, proof: &Rc<Term>, input: &Rc<Term>, out: &Rc<Term>) {
    let ty = infer_type(env, &Context::new(), proof)
        .unwrap_or_else(|e| panic!("proof does not typecheck: {e}\nproof: {proof:?}"));
    let ty = whnf(env, &ty).expect("whnf failed");
    let cs = match &*ty {
        Term::App(cs) => cs.clone(),
        other => panic!("proof type is not an equality: {:?}", other),
    };
    let (lhs, rhs) = match cs[0].const_name() {
        Some("eq") if cs.len() == 4 => (&cs[2], &cs[3]),
        Some("heq") if cs.len() == 5 => (&cs[3], &cs[4]),
        _ => panic!("proof type is not an equality: {:?}", ty),
    };
    assert!(
        is_def_eq(env, lhs, input).unwrap(),
        "proof left endpoint {:?} is not the input {:?}",
        lhs,
        input
    );
    assert!(
        is_def_eq(env, rhs, out).unwrap(),
        "proof right endpoint {:?} is not the output {:?}",
        rhs,
        out
    );
}

#[test]
fn s1_beta_reduces_applied_lambda() {
    let mut env = std_env();
    axiom(&mut env, "g", Term::arrow(nat(), nat()));
    axiom(&mut env, "a", nat());
    let input = Term::app(
        Term::lam("x", nat(), Term::app(Term::constant("g"), Term::var(0))),
        Term::constant("a"),
    );
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[])
        .expect("simplify failed");
    let expected = Term::app(Term::constant("g"), Term::constant("a"));
    assert_eq!(out, expected);
    // beta is definitional: the proof is reflexivity
    assert_eq!(proof.head().const_name(), Some("refl"));
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn s2_eta_contracts_wrapped_function() {
    // eta runs in the configuration without heterogeneous equality
    let mut env = std_env_core();
    axiom(&mut env, "g", Term::arrow(nat(), nat()));
    let input = Term::lam("x", nat(), Term::app(Term::constant("g"), Term::var(0)));
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[])
        .expect("simplify failed");
    assert_eq!(out, Term::constant("g"));
    let expected_proof = Term::apps(
        &Term::const_levels("eta", vec![one(), one()]),
        &[nat(), Term::lam("x", nat(), nat()), Term::constant("g")],
    );
    assert_eq!(proof, expected_proof);
    assert_proof_of(&env, &proof, &input, &out);
}

fn permutative_env() -> (Env, RuleSet) {
    let mut env = std_env();
    axiom(
        &mut env,
        "g2",
        Term::arrow(nat(), Term::arrow(nat(), nat())),
    );
    // (x y : Nat) -> eq Nat (g2 x y) (g2 y x)
    axiom(
        &mut env,
        "g2_comm",
        Term::pi(
            "x",
            nat(),
            Term::pi(
                "y",
                nat(),
                eq_nat(
                    Term::apps(&Term::constant("g2"), &[Term::var(1), Term::var(0)]),
                    Term::apps(&Term::constant("g2"), &[Term::var(0), Term::var(1)]),
                ),
            ),
        ),
    );
    let mut rs = RuleSet::new("perm");
    assert!(rs.insert_const(&env, "g2_comm"));
    (env, rs)
}

#[test]
fn s3_permutative_rule_orients_by_term_order() {
    let (env, rs) = permutative_env();
    let input = Term::apps(&Term::constant("g2"), &[Term::nat(2), Term::nat(1)]);
    let (out, proof) = simplify(
        &input,
        &env,
        Context::new(),
        SimpOptions::default(),
        &[rs.clone()],
    )
    .expect("simplify failed");
    let expected = Term::apps(&Term::constant("g2"), &[Term::nat(1), Term::nat(2)]);
    assert_eq!(out, expected);
    let expected_proof = Term::apps(&Term::constant("g2_comm"), &[Term::nat(2), Term::nat(1)]);
    assert_eq!(proof, expected_proof);
    assert_proof_of(&env, &proof, &input, &out);

    // the already-minimal orientation is left alone
    let (out2, proof2) = simplify(
        &expected,
        &env,
        Context::new(),
        SimpOptions::default(),
        &[rs],
    )
    .expect("simplify failed");
    assert_eq!(out2, expected);
    assert_eq!(proof2.head().const_name(), Some("refl"));
}

#[test]
fn s4_conditional_rule_discharges_premise_by_evaluation() {
    let mut env = std_env();
    axiom(&mut env, "a", nat());
    axiom(&mut env, "b", nat());
    // (p : Prop) -> (x y : Nat) -> p -> eq Nat (ite Nat p x y) x
    axiom(
        &mut env,
        "if_pos",
        Term::pi(
            "p",
            Term::prop(),
            Term::pi(
                "x",
                nat(),
                Term::pi(
                    "y",
                    nat(),
                    Term::pi(
                        "H",
                        Term::var(2),
                        eq_nat(
                            Term::apps(
                                &ite1(),
                                &[nat(), Term::var(3), Term::var(2), Term::var(1)],
                            ),
                            Term::var(2),
                        ),
                    ),
                ),
            ),
        ),
    );
    let mut rs = RuleSet::new("cond");
    assert!(rs.insert_const(&env, "if_pos"));
    // ite Nat (0 = 0) a b
    let input = Term::apps(
        &ite1(),
        &[
            nat(),
            eq_nat(Term::nat(0), Term::nat(0)),
            Term::constant("a"),
            Term::constant("b"),
        ],
    );
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[rs])
        .expect("simplify failed");
    assert_eq!(out, Term::constant("a"));
    // the premise was discharged definitionally, with `trivial`
    let expected_proof = Term::apps(
        &Term::constant("if_pos"),
        &[
            Term::constant("true"),
            Term::constant("a"),
            Term::constant("b"),
            Term::constant("trivial"),
        ],
    );
    assert_eq!(proof, expected_proof);
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn s4_conditional_rule_rejected_when_premise_is_open() {
    let mut env = std_env();
    axiom(&mut env, "a", nat());
    axiom(&mut env, "b", nat());
    axiom(&mut env, "p0", Term::prop());
    axiom(
        &mut env,
        "if_pos",
        Term::pi(
            "p",
            Term::prop(),
            Term::pi(
                "x",
                nat(),
                Term::pi(
                    "y",
                    nat(),
                    Term::pi(
                        "H",
                        Term::var(2),
                        eq_nat(
                            Term::apps(
                                &ite1(),
                                &[nat(), Term::var(3), Term::var(2), Term::var(1)],
                            ),
                            Term::var(2),
                        ),
                    ),
                ),
            ),
        ),
    );
    let mut rs = RuleSet::new("cond");
    assert!(rs.insert_const(&env, "if_pos"));
    // the condition does not simplify to `true`: the rule must not fire
    let input = Term::apps(
        &ite1(),
        &[
            nat(),
            Term::constant("p0"),
            Term::constant("a"),
            Term::constant("b"),
        ],
    );
    let (out, _) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[rs])
        .expect("simplify failed");
    assert_eq!(out, input);
}

fn contextual_setup() -> (Env, RuleSet) {
    let mut env = std_env();
    axiom(&mut env, "c", Term::prop());
    axiom(&mut env, "q", Term::prop());
    // (p : Prop) -> eq Prop (and true p) p
    axiom(
        &mut env,
        "and_truel",
        Term::pi(
            "p",
            Term::prop(),
            eq_prop(
                Term::apps(
                    &Term::constant("and"),
                    &[Term::constant("true"), Term::var(0)],
                ),
                Term::var(0),
            ),
        ),
    );
    // eq Prop (not false) true
    axiom(
        &mut env,
        "not_false",
        eq_prop(
            Term::app(Term::constant("not"), Term::constant("false")),
            Term::constant("true"),
        ),
    );
    let mut rs = RuleSet::new("logic");
    assert!(rs.insert_const(&env, "and_truel"));
    assert!(rs.insert_const(&env, "not_false"));
    rs.add_congr(CongrSchema::for_ite());
    (env, rs)
}

#[test]
fn s5_contextual_congruence_rewrites_under_hypotheses() {
    let (env, rs) = contextual_setup();
    // ite Prop c (and c q) (not c)
    let input = Term::apps(
        &ite1(),
        &[
            Term::prop(),
            Term::constant("c"),
            Term::apps(
                &Term::constant("and"),
                &[Term::constant("c"), Term::constant("q")],
            ),
            Term::app(Term::constant("not"), Term::constant("c")),
        ],
    );
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[rs])
        .expect("simplify failed");
    let expected = Term::apps(
        &ite1(),
        &[
            Term::prop(),
            Term::constant("c"),
            Term::constant("q"),
            Term::constant("true"),
        ],
    );
    assert_eq!(out, expected);
    assert_eq!(proof.head().const_name(), Some("if_congr"));
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn s5_contextual_rewriting_is_disabled_by_option() {
    let (env, rs) = contextual_setup();
    let input = Term::apps(
        &ite1(),
        &[
            Term::prop(),
            Term::constant("c"),
            Term::apps(
                &Term::constant("and"),
                &[Term::constant("c"), Term::constant("q")],
            ),
            Term::app(Term::constant("not"), Term::constant("c")),
        ],
    );
    let opts = SimpOptions {
        contextual: false,
        ..SimpOptions::default()
    };
    let (out, _) = simplify(&input, &env, Context::new(), opts, &[rs])
        .expect("simplify failed");
    // without the schema there is no hypothesis to rewrite under
    assert_eq!(out, input);
}

fn cast_env() -> Env {
    let mut env = std_env();
    axiom(&mut env, "A", Term::sort(one()));
    axiom(&mut env, "B", Term::sort(one()));
    axiom(
        &mut env,
        "hab",
        Term::apps(
            &Term::const_levels("heq", vec![two()]),
            &[
                Term::sort(one()),
                Term::sort(one()),
                Term::constant("A"),
                Term::constant("B"),
            ],
        ),
    );
    axiom(&mut env, "a", Term::constant("A"));
    env
}

#[test]
fn s6_cast_elimination_produces_heterogeneous_proof() {
    let env = cast_env();
    let input = Term::apps(
        &Term::const_levels("cast", vec![one()]),
        &[
            Term::constant("A"),
            Term::constant("B"),
            Term::constant("hab"),
            Term::constant("a"),
        ],
    );
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[])
        .expect("simplify failed");
    assert_eq!(out, Term::constant("a"));
    let expected_proof = Term::apps(
        &Term::const_levels("cast_heq", vec![one()]),
        &[
            Term::constant("A"),
            Term::constant("B"),
            Term::constant("hab"),
            Term::constant("a"),
        ],
    );
    assert_eq!(proof, expected_proof);
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn s6_cast_elimination_composes_with_rewriting() {
    let mut env = cast_env();
    axiom(&mut env, "a2", Term::constant("A"));
    axiom(
        &mut env,
        "r",
        Term::apps(
            &eq1(),
            &[Term::constant("A"), Term::constant("a"), Term::constant("a2")],
        ),
    );
    let mut rs = RuleSet::new("s6");
    assert!(rs.insert_const(&env, "r"));
    let input = Term::apps(
        &Term::const_levels("cast", vec![one()]),
        &[
            Term::constant("A"),
            Term::constant("B"),
            Term::constant("hab"),
            Term::constant("a"),
        ],
    );
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[rs])
        .expect("simplify failed");
    assert_eq!(out, Term::constant("a2"));
    // htrans stitches cast_heq with the lifted rewrite proof
    assert_eq!(proof.head().const_name(), Some("htrans"));
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn constant_evaluation_replaces_builtin_values() {
    let env = std_env();
    // `zero` is a builtin constant standing for the value 0
    let input = Term::constant("zero");
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[])
        .expect("simplify failed");
    assert_eq!(out, Term::nat(0));
    assert_proof_of(&env, &proof, &input, &out);
}

#[test]
fn unfold_option_expands_definitions() {
    let mut env = std_env();
    axiom(&mut env, "a", nat());
    env.add_definition(Definition::definition(
        "double",
        Term::arrow(nat(), nat()),
        Term::lam(
            "x",
            nat(),
            Term::apps(&Term::constant("add"), &[Term::var(0), Term::var(0)]),
        ),
    ))
    .unwrap();
    let input = Term::app(Term::constant("double"), Term::nat(3));
    let opts = SimpOptions {
        unfold: true,
        ..SimpOptions::default()
    };
    let (out, _) = simplify(&input, &env, Context::new(), opts, &[]).expect("simplify failed");
    // unfold exposes the redex, beta fires, then evaluation computes
    assert_eq!(out, Term::nat(6));
}

#[test]
fn evaluation_computes_arithmetic_applications() {
    let env = std_env();
    let input = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::nat(1)]);
    let (out, proof) = simplify(&input, &env, Context::new(), SimpOptions::default(), &[])
        .expect("simplify failed");
    assert_eq!(out, Term::nat(3));
    assert_proof_of(&env, &proof, &input, &out);
}
