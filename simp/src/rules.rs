//! Rewrite rules and rule sets.
//!
//! `insert` compiles a Pi-prefixed equational fact into a rule: `eq`
//! bodies are used directly, `not P` becomes `P = false` through
//! `eqf_intro`, and any other propositional body `P` becomes `P = true`
//! through `eqt_intro`. Rules whose right-hand side is the left-hand side
//! up to a renaming of the rule binders are flagged permutative and only
//! fire when they decrease the term order.

use crate::congr::CongrSchema;
use kernel::ast::{level_succ, Level, Literal, Term};
use kernel::checker::Env;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRule {
    /// Owner label, for diagnostics only.
    pub id: String,
    pub lhs: Rc<Term>,
    pub rhs: Rc<Term>,
    pub proof: Rc<Term>,
    pub arity: usize,
    /// The Pi-prefixed equational form; its binder domains drive
    /// conditional rewriting.
    pub ceq: Rc<Term>,
    pub is_permutation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HeadKey {
    Const(String),
    Value(Literal),
    Var,
    Sort,
    Meta,
    Lam,
    Pi,
    Let,
}

fn head_key(t: &Rc<Term>) -> HeadKey {
    match &**t.head() {
        Term::Const(n, _) => HeadKey::Const(n.clone()),
        Term::Value(l) => HeadKey::Value(*l),
        Term::Var(_) => HeadKey::Var,
        Term::Sort(_) => HeadKey::Sort,
        Term::Meta(_) => HeadKey::Meta,
        Term::Lam(..) => HeadKey::Lam,
        Term::Pi(..) => HeadKey::Pi,
        Term::Let(..) => HeadKey::Let,
        Term::App(_) => unreachable!("application heads are flattened"),
    }
}

fn strip_pi_prefix(fact: &Rc<Term>) -> (Vec<(String, Rc<Term>)>, Rc<Term>) {
    let mut domains = Vec::new();
    let mut body = fact.clone();
    loop {
        match &*body.clone() {
            Term::Pi(n, dom, b) => {
                domains.push((n.clone(), dom.clone()));
                body = b.clone();
            }
            _ => return (domains, body),
        }
    }
}

/// `lhs` and `rhs` are equal up to a bijective renaming of the holes.
fn is_permutation_pair(lhs: &Rc<Term>, rhs: &Rc<Term>, arity: usize) -> bool {
    fn walk(
        l: &Rc<Term>,
        r: &Rc<Term>,
        depth: usize,
        arity: usize,
        map: &mut [Option<usize>],
        used: &mut [bool],
    ) -> bool {
        match (&**l, &**r) {
            (Term::Var(i), Term::Var(j)) => {
                if *i >= depth && *j >= depth && i - depth < arity && j - depth < arity {
                    let (hi, hj) = (i - depth, j - depth);
                    match map[hi] {
                        Some(x) => x == hj,
                        None => {
                            if used[hj] {
                                false
                            } else {
                                map[hi] = Some(hj);
                                used[hj] = true;
                                true
                            }
                        }
                    }
                } else {
                    i == j
                }
            }
            (Term::App(ls), Term::App(rs)) => {
                ls.len() == rs.len()
                    && ls
                        .iter()
                        .zip(rs.iter())
                        .all(|(a, b)| walk(a, b, depth, arity, map, used))
            }
            (Term::Lam(_, d1, b1), Term::Lam(_, d2, b2))
            | (Term::Pi(_, d1, b1), Term::Pi(_, d2, b2))
            | (Term::Let(_, d1, b1), Term::Let(_, d2, b2)) => {
                walk(d1, d2, depth, arity, map, used)
                    && walk(b1, b2, depth + 1, arity, map, used)
            }
            _ => l == r,
        }
    }
    let mut map = vec![None; arity];
    let mut used = vec![false; arity];
    walk(lhs, rhs, 0, arity, &mut map, &mut used)
}

/// Wrap `inner` (living under the fact's binders) into the fact's lambda
/// prefix.
fn close_under(domains: &[(String, Rc<Term>)], inner: Rc<Term>) -> Rc<Term> {
    let mut out = inner;
    for (n, dom) in domains.iter().rev() {
        out = Term::lam(n, dom.clone(), out);
    }
    out
}

fn pis_under(domains: &[(String, Rc<Term>)], inner: Rc<Term>) -> Rc<Term> {
    let mut out = inner;
    for (n, dom) in domains.iter().rev() {
        out = Term::pi(n, dom.clone(), out);
    }
    out
}

/// The fact's proof applied to the fact's binders, for use under them.
fn applied_proof(proof: &Rc<Term>, arity: usize) -> Rc<Term> {
    if arity == 0 {
        return proof.clone();
    }
    let vars: Vec<Rc<Term>> = (0..arity).map(|i| Term::var(arity - 1 - i)).collect();
    Term::apps(&proof.shift(0, arity), &vars)
}

fn compile(owner: &str, fact: &Rc<Term>, proof: &Rc<Term>) -> Option<RewriteRule> {
    let (domains, body) = strip_pi_prefix(fact);
    let arity = domains.len();
    let one = level_succ(Level::Zero);
    let (lhs, rhs, ceq, proof) = match &*body {
        Term::App(cs) if cs.len() == 4 && cs[0].const_name() == Some("eq") => {
            (cs[2].clone(), cs[3].clone(), fact.clone(), proof.clone())
        }
        Term::App(cs) if cs.len() == 2 && cs[0].const_name() == Some("not") => {
            // not P  ~>  P = false, via eqf_intro
            let p = cs[1].clone();
            let stmt = Term::apps(
                &Term::const_levels("eq", vec![one]),
                &[Term::prop(), p.clone(), Term::constant("false")],
            );
            let pr = close_under(
                &domains,
                Term::apps(
                    &Term::constant("eqf_intro"),
                    &[p.clone(), applied_proof(proof, arity)],
                ),
            );
            (p, Term::constant("false"), pis_under(&domains, stmt), pr)
        }
        _ => {
            // any other propositional fact P  ~>  P = true, via eqt_intro
            let p = body.clone();
            let stmt = Term::apps(
                &Term::const_levels("eq", vec![one]),
                &[Term::prop(), p.clone(), Term::constant("true")],
            );
            let pr = close_under(
                &domains,
                Term::apps(
                    &Term::constant("eqt_intro"),
                    &[p.clone(), applied_proof(proof, arity)],
                ),
            );
            (p, Term::constant("true"), pis_under(&domains, stmt), pr)
        }
    };
    // a bare hole as left-hand side matches everything; unusable
    if matches!(&*lhs, Term::Var(i) if *i < arity) {
        log::debug!("rule {} skipped: left-hand side is a pattern variable", owner);
        return None;
    }
    let is_permutation = arity > 0 && is_permutation_pair(&lhs, &rhs, arity);
    Some(RewriteRule {
        id: owner.to_string(),
        lhs,
        rhs,
        proof,
        arity,
        ceq,
        is_permutation,
    })
}

/// An indexed collection of rewrite rules plus the congruence schemas
/// declared alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    name: String,
    rules: Vec<RewriteRule>,
    index: HashMap<HeadKey, Vec<usize>>,
    congrs: Vec<CongrSchema>,
}

impl RuleSet {
    pub fn new(name: &str) -> Self {
        RuleSet {
            name: name.to_string(),
            ..RuleSet::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile `fact` (a Pi-prefixed proposition proved by `proof`) into a
    /// rewrite rule. Unusable facts are skipped.
    pub fn insert(&mut self, owner: &str, fact: &Rc<Term>, proof: &Rc<Term>) {
        if let Some(rule) = compile(owner, fact, proof) {
            self.add_rule(rule);
        }
    }

    /// Insert the statement of a (monomorphic) environment constant.
    pub fn insert_const(&mut self, env: &Env, name: &str) -> bool {
        let def = match env.get_definition(name) {
            Some(d) => d,
            None => {
                log::debug!("rule {} skipped: unknown constant", name);
                return false;
            }
        };
        if !def.univ_params.is_empty() {
            log::debug!("rule {} skipped: universe-polymorphic statement", name);
            return false;
        }
        self.insert(name, &def.ty.clone(), &Term::constant(name));
        true
    }

    pub fn add_rule(&mut self, rule: RewriteRule) {
        let key = head_key(&rule.lhs);
        let idx = self.rules.len();
        self.rules.push(rule);
        self.index.entry(key).or_default().push(idx);
    }

    /// Candidate rules for `target`, in declaration order.
    pub fn candidates(&self, target: &Rc<Term>) -> Vec<RewriteRule> {
        match self.index.get(&head_key(target)) {
            Some(ids) => ids.iter().map(|i| self.rules[*i].clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn add_congr(&mut self, schema: CongrSchema) {
        self.congrs.push(schema);
    }

    pub fn for_each_congr(&self, mut f: impl FnMut(&CongrSchema)) {
        for c in &self.congrs {
            f(c);
        }
    }
}

/// Named rule sets, for the entry point that resolves sets by name.
#[derive(Debug, Clone, Default)]
pub struct RuleSetStore {
    sets: HashMap<String, RuleSet>,
}

impl RuleSetStore {
    pub fn new() -> Self {
        RuleSetStore::default()
    }

    pub fn register(&mut self, set: RuleSet) {
        self.sets.insert(set.name().to_string(), set);
    }

    pub fn get(&self, name: &str) -> Option<&RuleSet> {
        self.sets.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RuleSet> {
        self.sets.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::prelude::std_env;

    fn one() -> Level {
        level_succ(Level::Zero)
    }

    fn nat() -> Rc<Term> {
        Term::constant("Nat")
    }

    fn eq_nat(l: Rc<Term>, r: Rc<Term>) -> Rc<Term> {
        Term::apps(&Term::const_levels("eq", vec![one()]), &[nat(), l, r])
    }

    #[test]
    fn compiles_equations_directly() {
        let mut rs = RuleSet::new("test");
        // (x y : Nat) -> eq Nat (add x y) (add y x)
        let fact = Term::pi(
            "x",
            nat(),
            Term::pi(
                "y",
                nat(),
                eq_nat(
                    Term::apps(&Term::constant("add"), &[Term::var(1), Term::var(0)]),
                    Term::apps(&Term::constant("add"), &[Term::var(0), Term::var(1)]),
                ),
            ),
        );
        rs.insert("add_comm", &fact, &Term::constant("add_comm"));
        assert_eq!(rs.len(), 1);
        let target = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::nat(1)]);
        let cands = rs.candidates(&target);
        assert_eq!(cands.len(), 1);
        assert!(cands[0].is_permutation);
        assert_eq!(cands[0].arity, 2);
    }

    #[test]
    fn non_permutative_equations_are_not_flagged() {
        let mut rs = RuleSet::new("test");
        // (x : Nat) -> eq Nat (add x 0) x
        let fact = Term::pi(
            "x",
            nat(),
            eq_nat(
                Term::apps(&Term::constant("add"), &[Term::var(0), Term::nat(0)]),
                Term::var(0),
            ),
        );
        rs.insert("add_zero", &fact, &Term::constant("add_zero"));
        let target = Term::apps(&Term::constant("add"), &[Term::nat(5), Term::nat(0)]);
        let cands = rs.candidates(&target);
        assert_eq!(cands.len(), 1);
        assert!(!cands[0].is_permutation);
    }

    #[test]
    fn negated_facts_rewrite_to_false() {
        let mut rs = RuleSet::new("test");
        let c = Term::constant("c");
        let fact = Term::app(Term::constant("not"), c.clone());
        let proof = Term::constant("h");
        rs.insert("h", &fact, &proof);
        let cands = rs.candidates(&c);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].rhs, Term::constant("false"));
        // eqf_intro c h
        let expected = Term::apps(&Term::constant("eqf_intro"), &[c, proof]);
        assert_eq!(cands[0].proof, expected);
    }

    #[test]
    fn plain_facts_rewrite_to_true() {
        let mut rs = RuleSet::new("test");
        let c = Term::constant("c");
        rs.insert("h", &c, &Term::constant("h"));
        let cands = rs.candidates(&c);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].rhs, Term::constant("true"));
    }

    #[test]
    fn insert_const_reads_the_environment() {
        let mut env = std_env();
        env.add_definition(kernel::checker::Definition::axiom(
            "zero_le",
            Term::pi(
                "x",
                nat(),
                Term::apps(&Term::constant("le"), &[Term::nat(0), Term::var(0)]),
            ),
        ))
        .unwrap();
        let mut rs = RuleSet::new("arith");
        assert!(rs.insert_const(&env, "zero_le"));
        assert!(!rs.insert_const(&env, "missing"));
        // compiled as `le 0 x = true`
        let target = Term::apps(&Term::constant("le"), &[Term::nat(0), Term::nat(3)]);
        assert_eq!(rs.candidates(&target).len(), 1);
    }
}
