//! Higher-order pattern matching.
//!
//! A pattern is a rule left-hand side whose free variables stand for the
//! rule's Pi binders: at binder depth `d`, `Var(d + h)` is the hole with
//! raw index `h`, filling substitution slot `arity - 1 - h` (slots are in
//! Pi-prefix order, outermost first).
//!
//! Matching is first-order, plus the Miller-pattern case: a hole applied
//! to distinct locally bound variables matches by abstracting the target
//! over those binders.

use kernel::ast::{level_eq, Term};
use std::rc::Rc;

/// Match `target` against `pattern`, filling `subst` (one slot per rule
/// binder, in Pi-prefix order). Returns false and leaves `subst` in an
/// unspecified state on failure. Slots already filled act as constraints.
pub fn hop_match(pattern: &Rc<Term>, target: &Rc<Term>, subst: &mut [Option<Rc<Term>>]) -> bool {
    let mut binders: Vec<(String, Rc<Term>)> = Vec::new();
    mtch(pattern, target, 0, subst, &mut binders)
}

fn mtch(
    p: &Rc<Term>,
    t: &Rc<Term>,
    depth: usize,
    subst: &mut [Option<Rc<Term>>],
    binders: &mut Vec<(String, Rc<Term>)>,
) -> bool {
    let arity = subst.len();
    if let Term::Var(i) = &**p {
        if *i >= depth {
            let hole = i - depth;
            if hole >= arity {
                // a free variable of the enclosing scope, not a hole
                return matches!(&**t, Term::Var(j) if j == i);
            }
            return assign(hole, t, depth, subst);
        }
    }
    if let Term::App(cs) = &**p {
        if let Some((hole, bound)) = as_ho_pattern(cs, depth, arity) {
            return assign_ho(hole, &bound, t, depth, subst, binders);
        }
    }
    match (&**p, &**t) {
        (Term::Var(i), Term::Var(j)) => i == j,
        (Term::Sort(l1), Term::Sort(l2)) => level_eq(l1, l2),
        (Term::Const(n1, ls1), Term::Const(n2, ls2)) => {
            n1 == n2
                && ls1.len() == ls2.len()
                && ls1.iter().zip(ls2.iter()).all(|(a, b)| level_eq(a, b))
        }
        (Term::Value(a), Term::Value(b)) => a == b,
        (Term::Meta(i), Term::Meta(j)) => i == j,
        (Term::App(ps), Term::App(ts)) => {
            ps.len() == ts.len()
                && ps
                    .iter()
                    .zip(ts.iter())
                    .all(|(a, b)| mtch(a, b, depth, subst, binders))
        }
        (Term::Lam(_, pd, pb), Term::Lam(tn, td, tb))
        | (Term::Pi(_, pd, pb), Term::Pi(tn, td, tb)) => {
            if !mtch(pd, td, depth, subst, binders) {
                return false;
            }
            binders.push((tn.clone(), td.clone()));
            let ok = mtch(pb, tb, depth + 1, subst, binders);
            binders.pop();
            ok
        }
        (Term::Let(_, pv, pb), Term::Let(tn, tv, tb)) => {
            if !mtch(pv, tv, depth, subst, binders) {
                return false;
            }
            binders.push((tn.clone(), tv.clone()));
            let ok = mtch(pb, tb, depth + 1, subst, binders);
            binders.pop();
            ok
        }
        _ => false,
    }
}

/// `cs` is `?h x1 .. xk` with the `xi` distinct bound variables.
fn as_ho_pattern(cs: &[Rc<Term>], depth: usize, arity: usize) -> Option<(usize, Vec<usize>)> {
    let hole = match &*cs[0] {
        Term::Var(i) if *i >= depth && i - depth < arity => i - depth,
        _ => return None,
    };
    let mut bound = Vec::with_capacity(cs.len() - 1);
    for a in &cs[1..] {
        match &**a {
            Term::Var(j) if *j < depth && !bound.contains(j) => bound.push(*j),
            _ => return None,
        }
    }
    Some((hole, bound))
}

/// Store `t`, lowered out of the local binders, into the hole's slot.
fn assign(hole: usize, t: &Rc<Term>, depth: usize, subst: &mut [Option<Rc<Term>>]) -> bool {
    if t.has_free_var_below(depth) {
        return false;
    }
    let closed = t.lower_free_vars(0, depth);
    let slot = subst.len() - 1 - hole;
    match &subst[slot] {
        Some(prev) => *prev == closed,
        None => {
            subst[slot] = Some(closed);
            true
        }
    }
}

/// Miller-pattern assignment: bind the hole to `fun xs => t'` where `t'`
/// renames the given bound variables to the new binders. Fails when `t`
/// mentions any other local binder, or when a needed binder domain is not
/// closed.
fn assign_ho(
    hole: usize,
    bound: &[usize],
    t: &Rc<Term>,
    depth: usize,
    subst: &mut [Option<Rc<Term>>],
    binders: &[(String, Rc<Term>)],
) -> bool {
    fn walk(t: &Rc<Term>, c: usize, bound: &[usize], depth: usize) -> Option<Rc<Term>> {
        let k = bound.len();
        match &**t {
            Term::Var(i) => {
                if *i < c {
                    Some(Term::var(*i))
                } else {
                    let v = i - c;
                    if v < depth {
                        let pos = bound.iter().position(|b| *b == v)?;
                        Some(Term::var(k - 1 - pos + c))
                    } else {
                        Some(Term::var(v - depth + k + c))
                    }
                }
            }
            Term::App(cs) => {
                let cs = cs
                    .iter()
                    .map(|a| walk(a, c, bound, depth))
                    .collect::<Option<Vec<_>>>()?;
                Some(Term::app_vec(cs))
            }
            Term::Lam(n, ty, body) => Some(Term::lam(
                n,
                walk(ty, c, bound, depth)?,
                walk(body, c + 1, bound, depth)?,
            )),
            Term::Pi(n, ty, body) => Some(Term::pi(
                n,
                walk(ty, c, bound, depth)?,
                walk(body, c + 1, bound, depth)?,
            )),
            Term::Let(n, v, b) => Some(Term::let_(
                n,
                walk(v, c, bound, depth)?,
                walk(b, c + 1, bound, depth)?,
            )),
            _ => Some(t.clone()),
        }
    }

    let body = match walk(t, 0, bound, depth) {
        Some(b) => b,
        None => return false,
    };
    // wrap binders innermost-last: bound[i] becomes Var(k - 1 - i)
    let mut out = body;
    for (i, j) in bound.iter().enumerate().rev() {
        let pos = depth - 1 - j;
        let (name, dom) = &binders[pos];
        if dom.has_free_var_below(pos) {
            return false;
        }
        let dom = dom.lower_free_vars(0, pos).shift(0, i);
        out = Term::lam(name, dom, out);
    }
    let slot = subst.len() - 1 - hole;
    match &subst[slot] {
        Some(prev) => *prev == out,
        None => {
            subst[slot] = Some(out);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> Rc<Term> {
        Term::constant("Nat")
    }

    #[test]
    fn matches_first_order_patterns() {
        // pattern: add ?x ?y  (two binders, x outermost)
        let pat = Term::apps(&Term::constant("add"), &[Term::var(1), Term::var(0)]);
        let target = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::nat(1)]);
        let mut subst = vec![None, None];
        assert!(hop_match(&pat, &target, &mut subst));
        assert_eq!(subst[0], Some(Term::nat(2)));
        assert_eq!(subst[1], Some(Term::nat(1)));
    }

    #[test]
    fn repeated_holes_must_agree() {
        // pattern: add ?x ?x
        let pat = Term::apps(&Term::constant("add"), &[Term::var(0), Term::var(0)]);
        let same = Term::apps(&Term::constant("add"), &[Term::nat(3), Term::nat(3)]);
        let diff = Term::apps(&Term::constant("add"), &[Term::nat(3), Term::nat(4)]);
        let mut subst = vec![None];
        assert!(hop_match(&pat, &same, &mut subst));
        let mut subst = vec![None];
        assert!(!hop_match(&pat, &diff, &mut subst));
    }

    #[test]
    fn rejects_escaping_bound_variables() {
        // pattern: fun (x : Nat) => ?y   -- y may not mention x
        let pat = Term::lam("x", nat(), Term::var(1));
        let bad = Term::lam("x", nat(), Term::var(0));
        let mut subst = vec![None];
        assert!(!hop_match(&pat, &bad, &mut subst));
        let good = Term::lam("x", nat(), Term::nat(7));
        let mut subst = vec![None];
        assert!(hop_match(&pat, &good, &mut subst));
        assert_eq!(subst[0], Some(Term::nat(7)));
    }

    #[test]
    fn miller_pattern_abstracts_target() {
        // pattern: fun (x : Nat) => ?f x
        let pat = Term::lam("x", nat(), Term::app(Term::var(1), Term::var(0)));
        let target = Term::lam(
            "x",
            nat(),
            Term::apps(&Term::constant("add"), &[Term::var(0), Term::nat(1)]),
        );
        let mut subst = vec![None];
        assert!(hop_match(&pat, &target, &mut subst));
        let expected = Term::lam(
            "x",
            nat(),
            Term::apps(&Term::constant("add"), &[Term::var(0), Term::nat(1)]),
        );
        assert_eq!(subst[0], Some(expected));
    }

    #[test]
    fn mismatched_heads_fail() {
        let pat = Term::apps(&Term::constant("add"), &[Term::var(0), Term::var(0)]);
        let target = Term::apps(&Term::constant("mul"), &[Term::nat(1), Term::nat(1)]);
        let mut subst = vec![None];
        assert!(!hop_match(&pat, &target, &mut subst));
    }
}
