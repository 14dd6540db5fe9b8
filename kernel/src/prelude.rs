//! The standard environment: logical constants, natural-number builtins,
//! and the equality/congruence lemma family the proof builders assemble.
//!
//! The lemma constants are universe-polymorphic axioms. Their types are
//! spelled out in raw de Bruijn form; each carries its statement as a
//! comment.

use crate::ast::{level_imax, level_succ, Level, Term};
use crate::checker::{Definition, Env};
use std::rc::Rc;

fn u() -> Level {
    Level::Param("u".to_string())
}

fn v() -> Level {
    Level::Param("v".to_string())
}

fn one() -> Level {
    level_succ(Level::Zero)
}

fn sort_u() -> Rc<Term> {
    Term::sort(u())
}

fn sort_v() -> Rc<Term> {
    Term::sort(v())
}

fn prop() -> Rc<Term> {
    Term::prop()
}

fn eq_at(l: Level) -> Rc<Term> {
    Term::const_levels("eq", vec![l])
}

fn heq_at(l: Level) -> Rc<Term> {
    Term::const_levels("heq", vec![l])
}

fn tru() -> Rc<Term> {
    Term::constant("true")
}

fn fls() -> Rc<Term> {
    Term::constant("false")
}

fn v0() -> Rc<Term> {
    Term::var(0)
}
fn v1() -> Rc<Term> {
    Term::var(1)
}
fn v2() -> Rc<Term> {
    Term::var(2)
}
fn v3() -> Rc<Term> {
    Term::var(3)
}
fn v4() -> Rc<Term> {
    Term::var(4)
}
fn v5() -> Rc<Term> {
    Term::var(5)
}
fn v6() -> Rc<Term> {
    Term::var(6)
}
fn v7() -> Rc<Term> {
    Term::var(7)
}
fn v8() -> Rc<Term> {
    Term::var(8)
}
fn v9() -> Rc<Term> {
    Term::var(9)
}

fn add_axioms(env: &mut Env) {
    let nat = Term::constant("Nat");
    let nat2 = Term::arrow(nat.clone(), Term::arrow(nat.clone(), nat.clone()));
    let nat2p = Term::arrow(nat.clone(), Term::arrow(nat.clone(), prop()));

    let defs = vec![
        // Nat : Type
        Definition::axiom("Nat", Term::sort(one())),
        // true, false : Prop
        Definition::axiom("true", prop()),
        Definition::axiom("false", prop()),
        // trivial : true
        Definition::axiom("trivial", tru()),
        // not : Prop -> Prop := fun p => p -> false
        Definition::definition(
            "not",
            Term::arrow(prop(), prop()),
            Term::lam("p", prop(), Term::pi("_", v0(), fls())),
        ),
        // and, or : Prop -> Prop -> Prop
        Definition::axiom("and", Term::arrow(prop(), Term::arrow(prop(), prop()))),
        Definition::axiom("or", Term::arrow(prop(), Term::arrow(prop(), prop()))),
        // ite.{u} : (A : Sort u) -> Prop -> A -> A -> A
        Definition {
            univ_params: vec!["u".to_string()],
            ..Definition::axiom(
                "ite",
                Term::pi(
                    "A",
                    sort_u(),
                    Term::pi("c", prop(), Term::pi("t", v1(), Term::pi("e", v2(), v3()))),
                ),
            )
        },
        // arithmetic builtins
        Definition::builtin("add", nat2.clone()),
        Definition::builtin("sub", nat2.clone()),
        Definition::builtin("mul", nat2),
        Definition::builtin("le", nat2p.clone()),
        Definition::builtin("lt", nat2p),
        Definition::builtin_value("zero", nat, Term::nat(0)),
    ];
    for d in defs {
        env.add_definition(d).expect("prelude: duplicate definition");
    }
}

fn add_eq_axioms(env: &mut Env) {
    let iuv = level_imax(u(), v());
    let defs = vec![
        // eq.{u} : (A : Sort u) -> A -> A -> Prop
        Definition::axiom_poly(
            "eq",
            &["u"],
            Term::pi("A", sort_u(), Term::pi("a", v0(), Term::pi("b", v1(), prop()))),
        ),
        // neq.{u} : (A : Sort u) -> A -> A -> Prop
        Definition::axiom_poly(
            "neq",
            &["u"],
            Term::pi("A", sort_u(), Term::pi("a", v0(), Term::pi("b", v1(), prop()))),
        ),
        // refl.{u} : (A : Sort u) -> (a : A) -> eq A a a
        Definition::axiom_poly(
            "refl",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi("a", v0(), Term::apps(&eq_at(u()), &[v1(), v0(), v0()])),
            ),
        ),
        // trans.{u} : (A : Sort u) -> (a b c : A) ->
        //             eq A a b -> eq A b c -> eq A a c
        Definition::axiom_poly(
            "trans",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "a",
                    v0(),
                    Term::pi(
                        "b",
                        v1(),
                        Term::pi(
                            "c",
                            v2(),
                            Term::pi(
                                "H1",
                                Term::apps(&eq_at(u()), &[v3(), v2(), v1()]),
                                Term::pi(
                                    "H2",
                                    Term::apps(&eq_at(u()), &[v4(), v2(), v1()]),
                                    Term::apps(&eq_at(u()), &[v5(), v4(), v2()]),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // heq.{u} : (A B : Sort u) -> A -> B -> Prop
        Definition::axiom_poly(
            "heq",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi("B", sort_u(), Term::pi("a", v1(), Term::pi("b", v1(), prop()))),
            ),
        ),
        // hrefl.{u} : (A : Sort u) -> (a : A) -> heq A A a a
        Definition::axiom_poly(
            "hrefl",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi("a", v0(), Term::apps(&heq_at(u()), &[v1(), v1(), v0(), v0()])),
            ),
        ),
        // htrans.{u} : (A B C : Sort u) -> (a : A) -> (b : B) -> (c : C) ->
        //              heq A B a b -> heq B C b c -> heq A C a c
        Definition::axiom_poly(
            "htrans",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_u(),
                    Term::pi(
                        "C",
                        sort_u(),
                        Term::pi(
                            "a",
                            v2(),
                            Term::pi(
                                "b",
                                v2(),
                                Term::pi(
                                    "c",
                                    v2(),
                                    Term::pi(
                                        "H1",
                                        Term::apps(&heq_at(u()), &[v5(), v4(), v2(), v1()]),
                                        Term::pi(
                                            "H2",
                                            Term::apps(&heq_at(u()), &[v5(), v4(), v2(), v1()]),
                                            Term::apps(&heq_at(u()), &[v7(), v5(), v4(), v2()]),
                                        ),
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // to_eq.{u} : (A : Sort u) -> (a b : A) -> heq A A a b -> eq A a b
        Definition::axiom_poly(
            "to_eq",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "a",
                    v0(),
                    Term::pi(
                        "b",
                        v1(),
                        Term::pi(
                            "H",
                            Term::apps(&heq_at(u()), &[v2(), v2(), v1(), v0()]),
                            Term::apps(&eq_at(u()), &[v3(), v2(), v1()]),
                        ),
                    ),
                ),
            ),
        ),
        // to_heq.{u} : (A : Sort u) -> (a b : A) -> eq A a b -> heq A A a b
        Definition::axiom_poly(
            "to_heq",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "a",
                    v0(),
                    Term::pi(
                        "b",
                        v1(),
                        Term::pi(
                            "H",
                            Term::apps(&eq_at(u()), &[v2(), v1(), v0()]),
                            Term::apps(&heq_at(u()), &[v3(), v3(), v2(), v1()]),
                        ),
                    ),
                ),
            ),
        ),
        // congr1.{u,v} : (A : Sort u) -> (B : Sort v) -> (f g : A -> B) ->
        //                (a : A) -> eq (A -> B) f g -> eq B (f a) (g a)
        Definition::axiom_poly(
            "congr1",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_v(),
                    Term::pi(
                        "f",
                        Term::pi("_", v1(), v1()),
                        Term::pi(
                            "g",
                            Term::pi("_", v2(), v2()),
                            Term::pi(
                                "a",
                                v3(),
                                Term::pi(
                                    "H",
                                    Term::apps(
                                        &eq_at(iuv.clone()),
                                        &[Term::pi("_", v4(), v4()), v2(), v1()],
                                    ),
                                    Term::apps(
                                        &eq_at(v()),
                                        &[
                                            v4(),
                                            Term::app(v3(), v1()),
                                            Term::app(v2(), v1()),
                                        ],
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // congr2.{u,v} : (A : Sort u) -> (B : Sort v) -> (a b : A) ->
        //                (f : A -> B) -> eq A a b -> eq B (f a) (f b)
        Definition::axiom_poly(
            "congr2",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_v(),
                    Term::pi(
                        "a",
                        v1(),
                        Term::pi(
                            "b",
                            v2(),
                            Term::pi(
                                "f",
                                Term::pi("_", v3(), v3()),
                                Term::pi(
                                    "H",
                                    Term::apps(&eq_at(u()), &[v4(), v2(), v1()]),
                                    Term::apps(
                                        &eq_at(v()),
                                        &[
                                            v4(),
                                            Term::app(v1(), v3()),
                                            Term::app(v1(), v2()),
                                        ],
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // congr.{u,v} : (A : Sort u) -> (B : Sort v) -> (f g : A -> B) ->
        //               (a b : A) -> eq (A -> B) f g -> eq A a b ->
        //               eq B (f a) (g b)
        Definition::axiom_poly(
            "congr",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_v(),
                    Term::pi(
                        "f",
                        Term::pi("_", v1(), v1()),
                        Term::pi(
                            "g",
                            Term::pi("_", v2(), v2()),
                            Term::pi(
                                "a",
                                v3(),
                                Term::pi(
                                    "b",
                                    v4(),
                                    Term::pi(
                                        "H1",
                                        Term::apps(
                                            &eq_at(iuv.clone()),
                                            &[Term::pi("_", v5(), v5()), v3(), v2()],
                                        ),
                                        Term::pi(
                                            "H2",
                                            Term::apps(&eq_at(u()), &[v6(), v2(), v1()]),
                                            Term::apps(
                                                &eq_at(v()),
                                                &[
                                                    v6(),
                                                    Term::app(v5(), v3()),
                                                    Term::app(v4(), v2()),
                                                ],
                                            ),
                                        ),
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // hcongr.{u,v} : (A A' : Sort u) -> (B : A -> Sort v) ->
        //                (B' : A' -> Sort v) -> (f : (x : A) -> B x) ->
        //                (f' : (x : A') -> B' x) -> (a : A) -> (a' : A') ->
        //                heq ((x : A) -> B x) ((x : A') -> B' x) f f' ->
        //                heq A A' a a' ->
        //                heq (B a) (B' a') (f a) (f' a')
        Definition::axiom_poly(
            "hcongr",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "A'",
                    sort_u(),
                    Term::pi(
                        "B",
                        Term::pi("_", v1(), sort_v()),
                        Term::pi(
                            "B'",
                            Term::pi("_", v1(), sort_v()),
                            Term::pi(
                                "f",
                                Term::pi("x", v3(), Term::app(v2(), v0())),
                                Term::pi(
                                    "f'",
                                    Term::pi("x", v3(), Term::app(v2(), v0())),
                                    Term::pi(
                                        "a",
                                        v5(),
                                        Term::pi(
                                            "a'",
                                            v5(),
                                            Term::pi(
                                                "H1",
                                                Term::apps(
                                                    &heq_at(iuv.clone()),
                                                    &[
                                                        Term::pi(
                                                            "x",
                                                            v7(),
                                                            Term::app(v6(), v0()),
                                                        ),
                                                        Term::pi(
                                                            "x",
                                                            v6(),
                                                            Term::app(v5(), v0()),
                                                        ),
                                                        v3(),
                                                        v2(),
                                                    ],
                                                ),
                                                Term::pi(
                                                    "H2",
                                                    Term::apps(
                                                        &heq_at(u()),
                                                        &[v8(), v7(), v2(), v1()],
                                                    ),
                                                    Term::apps(
                                                        &heq_at(v()),
                                                        &[
                                                            Term::app(v7(), v3()),
                                                            Term::app(v6(), v2()),
                                                            Term::app(v5(), v3()),
                                                            Term::app(v4(), v2()),
                                                        ],
                                                    ),
                                                ),
                                            ),
                                        ),
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // subst.{u} : (A : Sort u) -> (a b : A) -> (P : A -> Prop) ->
        //             P a -> eq A a b -> P b
        Definition::axiom_poly(
            "subst",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "a",
                    v0(),
                    Term::pi(
                        "b",
                        v1(),
                        Term::pi(
                            "P",
                            Term::pi("_", v2(), prop()),
                            Term::pi(
                                "H1",
                                Term::app(v0(), v2()),
                                Term::pi(
                                    "H2",
                                    Term::apps(&eq_at(u()), &[v4(), v3(), v2()]),
                                    Term::app(v2(), v3()),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // funext.{u,v} : (A : Sort u) -> (B : A -> Sort v) ->
        //                (f g : (x : A) -> B x) ->
        //                ((x : A) -> eq (B x) (f x) (g x)) ->
        //                eq ((x : A) -> B x) f g
        Definition::axiom_poly(
            "funext",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    Term::pi("_", v0(), sort_v()),
                    Term::pi(
                        "f",
                        Term::pi("x", v1(), Term::app(v1(), v0())),
                        Term::pi(
                            "g",
                            Term::pi("x", v2(), Term::app(v2(), v0())),
                            Term::pi(
                                "H",
                                Term::pi(
                                    "x",
                                    v3(),
                                    Term::apps(
                                        &eq_at(v()),
                                        &[
                                            Term::app(v3(), v0()),
                                            Term::app(v2(), v0()),
                                            Term::app(v1(), v0()),
                                        ],
                                    ),
                                ),
                                Term::apps(
                                    &eq_at(iuv.clone()),
                                    &[Term::pi("x", v4(), Term::app(v4(), v0())), v2(), v1()],
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // allext.{u} : (A : Sort u) -> (P Q : A -> Prop) ->
        //              ((x : A) -> eq Prop (P x) (Q x)) ->
        //              eq Prop ((x : A) -> P x) ((x : A) -> Q x)
        Definition::axiom_poly(
            "allext",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "P",
                    Term::pi("_", v0(), prop()),
                    Term::pi(
                        "Q",
                        Term::pi("_", v1(), prop()),
                        Term::pi(
                            "H",
                            Term::pi(
                                "x",
                                v2(),
                                Term::apps(
                                    &eq_at(one()),
                                    &[prop(), Term::app(v2(), v0()), Term::app(v1(), v0())],
                                ),
                            ),
                            Term::apps(
                                &eq_at(one()),
                                &[
                                    prop(),
                                    Term::pi("x", v3(), Term::app(v3(), v0())),
                                    Term::pi("x", v3(), Term::app(v2(), v0())),
                                ],
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // eta.{u,v} : (A : Sort u) -> (B : A -> Sort v) ->
        //             (f : (x : A) -> B x) ->
        //             eq ((x : A) -> B x) (fun (x : A) => f x) f
        Definition::axiom_poly(
            "eta",
            &["u", "v"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    Term::pi("_", v0(), sort_v()),
                    Term::pi(
                        "f",
                        Term::pi("x", v1(), Term::app(v1(), v0())),
                        Term::apps(
                            &eq_at(iuv),
                            &[
                                Term::pi("x", v2(), Term::app(v2(), v0())),
                                Term::lam("x", v2(), Term::app(v1(), v0())),
                                v0(),
                            ],
                        ),
                    ),
                ),
            ),
        ),
        // eqt_elim : (p : Prop) -> eq Prop p true -> p
        Definition::axiom(
            "eqt_elim",
            Term::pi(
                "p",
                prop(),
                Term::pi(
                    "H",
                    Term::apps(&eq_at(one()), &[prop(), v0(), tru()]),
                    v1(),
                ),
            ),
        ),
        // eqt_intro : (p : Prop) -> p -> eq Prop p true
        Definition::axiom(
            "eqt_intro",
            Term::pi(
                "p",
                prop(),
                Term::pi("H", v0(), Term::apps(&eq_at(one()), &[prop(), v1(), tru()])),
            ),
        ),
        // eqf_intro : (p : Prop) -> not p -> eq Prop p false
        Definition::axiom(
            "eqf_intro",
            Term::pi(
                "p",
                prop(),
                Term::pi(
                    "H",
                    Term::app(Term::constant("not"), v0()),
                    Term::apps(&eq_at(one()), &[prop(), v1(), fls()]),
                ),
            ),
        ),
        // cast.{u} : (A B : Sort u) -> heq (Sort u) (Sort u) A B -> A -> B
        Definition::axiom_poly(
            "cast",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_u(),
                    Term::pi(
                        "H",
                        Term::apps(
                            &heq_at(level_succ(u())),
                            &[sort_u(), sort_u(), v1(), v0()],
                        ),
                        Term::pi("a", v2(), v2()),
                    ),
                ),
            ),
        ),
        // cast_heq.{u} : (A B : Sort u) -> (H : heq (Sort u) (Sort u) A B) ->
        //                (a : A) -> heq B A (cast A B H a) a
        Definition::axiom_poly(
            "cast_heq",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "B",
                    sort_u(),
                    Term::pi(
                        "H",
                        Term::apps(
                            &heq_at(level_succ(u())),
                            &[sort_u(), sort_u(), v1(), v0()],
                        ),
                        Term::pi(
                            "a",
                            v2(),
                            Term::apps(
                                &heq_at(u()),
                                &[
                                    v2(),
                                    v3(),
                                    Term::apps(
                                        &Term::const_levels("cast", vec![u()]),
                                        &[v3(), v2(), v1(), v0()],
                                    ),
                                    v0(),
                                ],
                            ),
                        ),
                    ),
                ),
            ),
        ),
        // if_congr.{u} : (A : Sort u) -> (c c' : Prop) -> (t t' e e' : A) ->
        //                eq Prop c c' -> (c' -> eq A t t') ->
        //                (not c' -> eq A e e') ->
        //                eq A (ite A c t e) (ite A c' t' e')
        Definition::axiom_poly(
            "if_congr",
            &["u"],
            Term::pi(
                "A",
                sort_u(),
                Term::pi(
                    "c",
                    prop(),
                    Term::pi(
                        "c'",
                        prop(),
                        Term::pi(
                            "t",
                            v2(),
                            Term::pi(
                                "t'",
                                v3(),
                                Term::pi(
                                    "e",
                                    v4(),
                                    Term::pi(
                                        "e'",
                                        v5(),
                                        Term::pi(
                                            "H1",
                                            Term::apps(&eq_at(one()), &[prop(), v5(), v4()]),
                                            Term::pi(
                                                "H2",
                                                Term::pi(
                                                    "_",
                                                    v5(),
                                                    Term::apps(
                                                        &eq_at(u()),
                                                        &[v8(), v5(), v4()],
                                                    ),
                                                ),
                                                Term::pi(
                                                    "H3",
                                                    Term::pi(
                                                        "_",
                                                        Term::app(Term::constant("not"), v6()),
                                                        Term::apps(
                                                            &eq_at(u()),
                                                            &[v9(), v6(), v5()],
                                                        ),
                                                    ),
                                                    Term::apps(
                                                        &eq_at(u()),
                                                        &[
                                                            v9(),
                                                            Term::apps(
                                                                &Term::const_levels(
                                                                    "ite",
                                                                    vec![u()],
                                                                ),
                                                                &[v9(), v8(), v6(), v4()],
                                                            ),
                                                            Term::apps(
                                                                &Term::const_levels(
                                                                    "ite",
                                                                    vec![u()],
                                                                ),
                                                                &[v9(), v7(), v5(), v3()],
                                                            ),
                                                        ],
                                                    ),
                                                ),
                                            ),
                                        ),
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        ),
    ];
    for d in defs {
        env.add_definition(d).expect("prelude: duplicate definition");
    }
}

/// The standard environment without the heterogeneous-equality and cast
/// feature imports. Lambda and Pi bodies are simplified in this
/// configuration.
pub fn std_env_core() -> Env {
    let mut env = Env::new();
    add_axioms(&mut env);
    add_eq_axioms(&mut env);
    env
}

/// The full standard environment: `std_env_core` plus the "heq" and
/// "cast" imports that enable heterogeneous congruence and cast
/// elimination.
pub fn std_env() -> Env {
    let mut env = std_env_core();
    env.import("heq");
    env.import("cast");
    env
}
