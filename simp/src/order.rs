//! Total structural order on terms, used to orient permutative rules.
//!
//! Terms are compared by node weight first, then by shape rank, then
//! lexicographically on the components. Literals compare by value, so
//! `add 1 2 < add 2 1`.

use kernel::ast::{Level, Literal, Term};
use std::cmp::Ordering;
use std::rc::Rc;

fn weight(t: &Term) -> u64 {
    match t {
        Term::App(cs) => 1 + cs.iter().map(|a| weight(a)).sum::<u64>(),
        Term::Lam(_, ty, body) | Term::Pi(_, ty, body) => 1 + weight(ty) + weight(body),
        Term::Let(_, v, b) => 1 + weight(v) + weight(b),
        _ => 1,
    }
}

fn kind_rank(t: &Term) -> u8 {
    match t {
        Term::Var(_) => 0,
        Term::Sort(_) => 1,
        Term::Const(..) => 2,
        Term::Value(_) => 3,
        Term::Meta(_) => 4,
        Term::App(_) => 5,
        Term::Lam(..) => 6,
        Term::Pi(..) => 7,
        Term::Let(..) => 8,
    }
}

fn level_rank(l: &Level) -> u8 {
    match l {
        Level::Zero => 0,
        Level::Succ(_) => 1,
        Level::Max(..) => 2,
        Level::IMax(..) => 3,
        Level::Param(_) => 4,
    }
}

fn cmp_level(l1: &Level, l2: &Level) -> Ordering {
    level_rank(l1).cmp(&level_rank(l2)).then_with(|| match (l1, l2) {
        (Level::Zero, Level::Zero) => Ordering::Equal,
        (Level::Succ(a), Level::Succ(b)) => cmp_level(a, b),
        (Level::Max(a1, b1), Level::Max(a2, b2)) | (Level::IMax(a1, b1), Level::IMax(a2, b2)) => {
            cmp_level(a1, a2).then_with(|| cmp_level(b1, b2))
        }
        (Level::Param(a), Level::Param(b)) => a.cmp(b),
        _ => unreachable!("level ranks matched"),
    })
}

fn cmp_levels(ls1: &[Level], ls2: &[Level]) -> Ordering {
    ls1.len().cmp(&ls2.len()).then_with(|| {
        for (a, b) in ls1.iter().zip(ls2.iter()) {
            let o = cmp_level(a, b);
            if o != Ordering::Equal {
                return o;
            }
        }
        Ordering::Equal
    })
}

/// Total order on terms.
pub fn cmp_term(a: &Rc<Term>, b: &Rc<Term>) -> Ordering {
    if Rc::ptr_eq(a, b) {
        return Ordering::Equal;
    }
    weight(a)
        .cmp(&weight(b))
        .then_with(|| kind_rank(a).cmp(&kind_rank(b)))
        .then_with(|| match (&**a, &**b) {
            (Term::Var(i), Term::Var(j)) => i.cmp(j),
            (Term::Sort(l1), Term::Sort(l2)) => cmp_level(l1, l2),
            (Term::Const(n1, ls1), Term::Const(n2, ls2)) => {
                n1.cmp(n2).then_with(|| cmp_levels(ls1, ls2))
            }
            (Term::Value(Literal::Nat(x)), Term::Value(Literal::Nat(y))) => x.cmp(y),
            (Term::Meta(i), Term::Meta(j)) => i.cmp(j),
            (Term::App(cs1), Term::App(cs2)) => {
                cs1.len().cmp(&cs2.len()).then_with(|| {
                    for (x, y) in cs1.iter().zip(cs2.iter()) {
                        let o = cmp_term(x, y);
                        if o != Ordering::Equal {
                            return o;
                        }
                    }
                    Ordering::Equal
                })
            }
            (Term::Lam(_, d1, b1), Term::Lam(_, d2, b2))
            | (Term::Pi(_, d1, b1), Term::Pi(_, d2, b2))
            | (Term::Let(_, d1, b1), Term::Let(_, d2, b2)) => {
                cmp_term(d1, d2).then_with(|| cmp_term(b1, b2))
            }
            _ => unreachable!("kind ranks matched"),
        })
}

/// `a < b` in the term order; with `weak`, `a <= b`.
pub fn is_lt(a: &Rc<Term>, b: &Rc<Term>, weak: bool) -> bool {
    match cmp_term(a, b) {
        Ordering::Less => true,
        Ordering::Equal => weak,
        Ordering::Greater => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_order_applications() {
        let a = Term::apps(&Term::constant("add"), &[Term::nat(1), Term::nat(2)]);
        let b = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::nat(1)]);
        assert!(is_lt(&a, &b, false));
        assert!(!is_lt(&b, &a, false));
        assert!(!is_lt(&a, &a, false));
        assert!(is_lt(&a, &a, true));
    }

    #[test]
    fn weight_dominates_shape() {
        let small = Term::constant("z");
        let big = Term::apps(&Term::constant("f"), &[Term::constant("z")]);
        assert!(is_lt(&small, &big, false));
    }

    #[test]
    fn order_is_total_on_distinct_terms() {
        let a = Term::constant("a");
        let b = Term::constant("b");
        assert!(is_lt(&a, &b, false) ^ is_lt(&b, &a, false));
    }
}
