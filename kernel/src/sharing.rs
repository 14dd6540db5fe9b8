use crate::ast::Term;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Hash-consing table. Interned terms have a single canonical `Rc` per
/// structure, so pointer equality on shared terms coincides with structural
/// equality. The simplifier uses the canonical pointers as cache keys.
#[derive(Default)]
pub struct MaxSharing {
    table: HashMap<Rc<Term>, Rc<Term>>,
}

impl MaxSharing {
    pub fn new() -> Self {
        MaxSharing {
            table: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Canonicalize `e` bottom-up.
    pub fn share(&mut self, e: &Rc<Term>) -> Rc<Term> {
        if let Some(c) = self.table.get(e) {
            return c.clone();
        }
        let rebuilt = match &**e {
            Term::App(cs) => {
                let cs = cs.iter().map(|a| self.share(a)).collect();
                Rc::new(Term::App(cs))
            }
            Term::Lam(n, ty, body) => {
                let ty = self.share(ty);
                let body = self.share(body);
                Rc::new(Term::Lam(n.clone(), ty, body))
            }
            Term::Pi(n, ty, body) => {
                let ty = self.share(ty);
                let body = self.share(body);
                Rc::new(Term::Pi(n.clone(), ty, body))
            }
            Term::Let(n, v, b) => {
                let v = self.share(v);
                let b = self.share(b);
                Rc::new(Term::Let(n.clone(), v, b))
            }
            _ => e.clone(),
        };
        self.table.insert(rebuilt.clone(), rebuilt.clone());
        rebuilt
    }
}

/// Cache key: pointer identity of a maximally shared term.
#[derive(Clone, Debug)]
pub struct TermKey(pub Rc<Term>);

impl PartialEq for TermKey {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TermKey {}

impl Hash for TermKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Term;

    #[test]
    fn sharing_canonicalizes_equal_structures() {
        let mut sharing = MaxSharing::new();
        let a = Term::apps(&Term::constant("f"), &[Term::nat(1), Term::nat(2)]);
        let b = Term::apps(&Term::constant("f"), &[Term::nat(1), Term::nat(2)]);
        assert!(!Rc::ptr_eq(&a, &b));
        let sa = sharing.share(&a);
        let sb = sharing.share(&b);
        assert!(Rc::ptr_eq(&sa, &sb));
    }

    #[test]
    fn sharing_is_idempotent() {
        let mut sharing = MaxSharing::new();
        let a = Term::lam("x", Term::constant("A"), Term::var(0));
        let s1 = sharing.share(&a);
        let s2 = sharing.share(&s1);
        assert!(Rc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn term_keys_compare_by_pointer() {
        let mut sharing = MaxSharing::new();
        let a = sharing.share(&Term::constant("a"));
        let b = sharing.share(&Term::constant("a"));
        assert_eq!(TermKey(a.clone()), TermKey(b));
        let c = Term::constant("a");
        assert_ne!(TermKey(a), TermKey(c));
    }
}
