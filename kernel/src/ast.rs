use std::rc::Rc;

/// Universe levels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Zero,
    Succ(Box<Level>),
    Max(Box<Level>, Box<Level>),
    IMax(Box<Level>, Box<Level>),
    Param(String),
}

pub fn level_succ(l: Level) -> Level {
    Level::Succ(Box::new(l))
}

pub fn level_max(l1: Level, l2: Level) -> Level {
    Level::Max(Box::new(l1), Box::new(l2))
}

pub fn level_imax(l1: Level, l2: Level) -> Level {
    Level::IMax(Box::new(l1), Box::new(l2))
}

/// Concrete height of a level, when it contains no parameters.
fn level_to_nat(l: &Level) -> Option<u64> {
    match l {
        Level::Zero => Some(0),
        Level::Succ(x) => level_to_nat(x).map(|n| n + 1),
        Level::Max(a, b) => Some(level_to_nat(a)?.max(level_to_nat(b)?)),
        Level::IMax(a, b) => {
            let b = level_to_nat(b)?;
            if b == 0 {
                Some(0)
            } else {
                Some(level_to_nat(a)?.max(b))
            }
        }
        Level::Param(_) => None,
    }
}

fn level_from_nat(n: u64) -> Level {
    let mut l = Level::Zero;
    for _ in 0..n {
        l = level_succ(l);
    }
    l
}

/// Push `max`/`imax` through concrete sub-levels.
pub fn reduce_level(l: Level) -> Level {
    if let Some(n) = level_to_nat(&l) {
        return level_from_nat(n);
    }
    match l {
        Level::Succ(x) => level_succ(reduce_level(*x)),
        Level::Max(a, b) => {
            let a = reduce_level(*a);
            let b = reduce_level(*b);
            if a == Level::Zero {
                b
            } else if b == Level::Zero || a == b {
                a
            } else {
                level_max(a, b)
            }
        }
        Level::IMax(a, b) => {
            let a = reduce_level(*a);
            let b = reduce_level(*b);
            match &b {
                // imax(_, 0) = 0 (impredicativity)
                Level::Zero => Level::Zero,
                // imax(a, succ _) = max(a, succ _)
                Level::Succ(_) => reduce_level(level_max(a, b)),
                _ => {
                    if a == Level::Zero {
                        b
                    } else {
                        level_imax(a, b)
                    }
                }
            }
        }
        other => other,
    }
}

/// Substitute universe parameters by the given levels.
pub fn instantiate_level(l: &Level, params: &[String], args: &[Level]) -> Level {
    match l {
        Level::Zero => Level::Zero,
        Level::Succ(x) => level_succ(instantiate_level(x, params, args)),
        Level::Max(a, b) => level_max(
            instantiate_level(a, params, args),
            instantiate_level(b, params, args),
        ),
        Level::IMax(a, b) => level_imax(
            instantiate_level(a, params, args),
            instantiate_level(b, params, args),
        ),
        Level::Param(name) => match params.iter().position(|p| p == name) {
            Some(i) => args.get(i).cloned().unwrap_or(Level::Param(name.clone())),
            None => Level::Param(name.clone()),
        },
    }
}

pub fn level_eq(l1: &Level, l2: &Level) -> bool {
    reduce_level(l1.clone()) == reduce_level(l2.clone())
}

/// Partial order on levels, complete on concrete levels.
pub fn level_leq(l1: &Level, l2: &Level) -> bool {
    let r1 = reduce_level(l1.clone());
    let r2 = reduce_level(l2.clone());
    if r1 == r2 || r1 == Level::Zero {
        return true;
    }
    match (level_to_nat(&r1), level_to_nat(&r2)) {
        (Some(n1), Some(n2)) => n1 <= n2,
        _ => false,
    }
}

/// Opaque semantic primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Nat(u128),
}

/// The core terms of the calculus, using de Bruijn indices.
///
/// Applications are n-ary: the head is child 0 and is itself never an
/// application (the smart constructors flatten).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Bound variable (de Bruijn index)
    Var(usize),
    /// Universe
    Sort(Level),
    /// Constant (global definition), with universe-level arguments
    Const(String, Vec<Level>),
    /// Semantic value
    Value(Literal),
    /// Metavariable; treated as rigid by everything in this crate
    Meta(usize),
    /// Application: children, head at position 0, `len >= 2`
    App(Vec<Rc<Term>>),
    /// Lambda abstraction: \(x : A). b
    Lam(String, Rc<Term>, Rc<Term>),
    /// Pi type: (x : A) -> B
    Pi(String, Rc<Term>, Rc<Term>),
    /// Let binding: let x := v in b
    Let(String, Rc<Term>, Rc<Term>),
}

impl Term {
    pub fn var(n: usize) -> Rc<Self> {
        Rc::new(Term::Var(n))
    }

    pub fn sort(l: Level) -> Rc<Self> {
        Rc::new(Term::Sort(l))
    }

    /// `Prop`, the impredicative bottom sort.
    pub fn prop() -> Rc<Self> {
        Term::sort(Level::Zero)
    }

    pub fn constant(name: &str) -> Rc<Self> {
        Rc::new(Term::Const(name.to_string(), vec![]))
    }

    pub fn const_levels(name: &str, levels: Vec<Level>) -> Rc<Self> {
        Rc::new(Term::Const(name.to_string(), levels))
    }

    pub fn nat(n: u128) -> Rc<Self> {
        Rc::new(Term::Value(Literal::Nat(n)))
    }

    pub fn meta(i: usize) -> Rc<Self> {
        Rc::new(Term::Meta(i))
    }

    pub fn app(f: Rc<Term>, a: Rc<Term>) -> Rc<Self> {
        Term::apps(&f, std::slice::from_ref(&a))
    }

    /// Build an application of `f` to `args`, flattening nested heads.
    pub fn apps(f: &Rc<Term>, args: &[Rc<Term>]) -> Rc<Self> {
        if args.is_empty() {
            return f.clone();
        }
        let mut children = match &**f {
            Term::App(cs) => cs.clone(),
            _ => vec![f.clone()],
        };
        children.extend(args.iter().cloned());
        Rc::new(Term::App(children))
    }

    /// Build an application from a full child vector (head at position 0).
    pub fn app_vec(children: Vec<Rc<Term>>) -> Rc<Self> {
        debug_assert!(children.len() >= 2);
        match children.split_first() {
            Some((head, rest)) => Term::apps(head, rest),
            None => unreachable!("app_vec: empty children"),
        }
    }

    pub fn lam(name: &str, dom: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Lam(name.to_string(), dom, body))
    }

    pub fn pi(name: &str, dom: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Pi(name.to_string(), dom, body))
    }

    /// Non-dependent function type `a -> b`; `b` is a term outside the binder.
    pub fn arrow(a: Rc<Term>, b: Rc<Term>) -> Rc<Self> {
        let body = b.shift(0, 1);
        Rc::new(Term::Pi("_".to_string(), a, body))
    }

    pub fn let_(name: &str, value: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Let(name.to_string(), value, body))
    }

    pub fn is_app(&self) -> bool {
        matches!(self, Term::App(_))
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, Term::Lam(..))
    }

    pub fn is_pi(&self) -> bool {
        matches!(self, Term::Pi(..))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Term::Value(_))
    }

    /// Children of an application; for any other term, the term alone.
    pub fn args(self: &Rc<Self>) -> &[Rc<Term>] {
        match &**self {
            Term::App(cs) => cs,
            _ => std::slice::from_ref(self),
        }
    }

    pub fn head(self: &Rc<Self>) -> &Rc<Term> {
        match &**self {
            Term::App(cs) => &cs[0],
            _ => self,
        }
    }

    pub fn const_name(&self) -> Option<&str> {
        match self {
            Term::Const(n, _) => Some(n),
            _ => None,
        }
    }

    /// A Pi whose body does not mention the bound variable.
    pub fn is_arrow(&self) -> bool {
        match self {
            Term::Pi(_, _, body) => !body.has_free_var(0),
            _ => false,
        }
    }

    /// Shift indices by `d` above cutoff `c`.
    pub fn shift(&self, c: usize, d: usize) -> Rc<Term> {
        if d == 0 {
            return Rc::new(self.clone());
        }
        match self {
            Term::Var(k) => {
                if *k < c {
                    Rc::new(Term::Var(*k))
                } else {
                    Rc::new(Term::Var(k + d))
                }
            }
            Term::App(cs) => Rc::new(Term::App(cs.iter().map(|a| a.shift(c, d)).collect())),
            Term::Lam(n, ty, body) => {
                Rc::new(Term::Lam(n.clone(), ty.shift(c, d), body.shift(c + 1, d)))
            }
            Term::Pi(n, ty, body) => {
                Rc::new(Term::Pi(n.clone(), ty.shift(c, d), body.shift(c + 1, d)))
            }
            Term::Let(n, v, b) => Rc::new(Term::Let(n.clone(), v.shift(c, d), b.shift(c + 1, d))),
            _ => Rc::new(self.clone()),
        }
    }

    /// Lower free variables `>= c` by `d`. The caller must guarantee that no
    /// variable in `[c - d, c)` occurs free (those would refer to the binders
    /// being removed).
    pub fn lower_free_vars(&self, c: usize, d: usize) -> Rc<Term> {
        if d == 0 {
            return Rc::new(self.clone());
        }
        match self {
            Term::Var(k) => {
                if *k < c {
                    debug_assert!(*k + d < c, "lower_free_vars: dangling variable {}", k);
                    Rc::new(Term::Var(*k))
                } else {
                    debug_assert!(*k >= d, "lower_free_vars: variable {} underflows", k);
                    Rc::new(Term::Var(k - d))
                }
            }
            Term::App(cs) => Rc::new(Term::App(
                cs.iter().map(|a| a.lower_free_vars(c, d)).collect(),
            )),
            Term::Lam(n, ty, body) => Rc::new(Term::Lam(
                n.clone(),
                ty.lower_free_vars(c, d),
                body.lower_free_vars(c + 1, d),
            )),
            Term::Pi(n, ty, body) => Rc::new(Term::Pi(
                n.clone(),
                ty.lower_free_vars(c, d),
                body.lower_free_vars(c + 1, d),
            )),
            Term::Let(n, v, b) => Rc::new(Term::Let(
                n.clone(),
                v.lower_free_vars(c, d),
                b.lower_free_vars(c + 1, d),
            )),
            _ => Rc::new(self.clone()),
        }
    }

    /// Substitute `s` for variable `k`; variables above `k` are lowered.
    pub fn subst(&self, k: usize, s: &Rc<Term>) -> Rc<Term> {
        match self {
            Term::Var(i) => {
                if *i == k {
                    s.clone()
                } else if *i > k {
                    Rc::new(Term::Var(i - 1))
                } else {
                    Rc::new(Term::Var(*i))
                }
            }
            Term::App(cs) => Term::app_vec(cs.iter().map(|a| a.subst(k, s)).collect()),
            Term::Lam(n, ty, body) => Rc::new(Term::Lam(
                n.clone(),
                ty.subst(k, s),
                body.subst(k + 1, &s.shift(0, 1)),
            )),
            Term::Pi(n, ty, body) => Rc::new(Term::Pi(
                n.clone(),
                ty.subst(k, s),
                body.subst(k + 1, &s.shift(0, 1)),
            )),
            Term::Let(n, v, b) => Rc::new(Term::Let(
                n.clone(),
                v.subst(k, s),
                b.subst(k + 1, &s.shift(0, 1)),
            )),
            _ => Rc::new(self.clone()),
        }
    }

    /// Instantiate the body of a binder with `s`.
    pub fn instantiate(&self, s: &Rc<Term>) -> Rc<Term> {
        self.subst(0, s)
    }

    /// Simultaneously instantiate variables `0 .. args.len()` with `args`
    /// given in binder-prefix order (`args[0]` is the outermost binder, i.e.
    /// the variable with the highest index).
    pub fn instantiate_many(&self, args: &[Rc<Term>]) -> Rc<Term> {
        fn walk(t: &Term, c: usize, args: &[Rc<Term>]) -> Rc<Term> {
            let n = args.len();
            match t {
                Term::Var(i) => {
                    if *i < c {
                        Rc::new(Term::Var(*i))
                    } else {
                        let k = i - c;
                        if k < n {
                            args[n - 1 - k].shift(0, c)
                        } else {
                            Rc::new(Term::Var(i - n))
                        }
                    }
                }
                Term::App(cs) => Term::app_vec(cs.iter().map(|a| walk(a, c, args)).collect()),
                Term::Lam(nm, ty, body) => Rc::new(Term::Lam(
                    nm.clone(),
                    walk(ty, c, args),
                    walk(body, c + 1, args),
                )),
                Term::Pi(nm, ty, body) => Rc::new(Term::Pi(
                    nm.clone(),
                    walk(ty, c, args),
                    walk(body, c + 1, args),
                )),
                Term::Let(nm, v, b) => {
                    Rc::new(Term::Let(nm.clone(), walk(v, c, args), walk(b, c + 1, args)))
                }
                other => Rc::new(other.clone()),
            }
        }
        if args.is_empty() {
            Rc::new(self.clone())
        } else {
            walk(self, 0, args)
        }
    }

    /// Replace every occurrence of the constant `name` by a fresh bound
    /// variable, lifting the remaining free variables to make room for the
    /// binder the caller is about to wrap around the result.
    pub fn abstract_const(&self, name: &str) -> Rc<Term> {
        fn walk(t: &Term, c: usize, name: &str) -> Rc<Term> {
            match t {
                Term::Const(n, _) if n == name => Rc::new(Term::Var(c)),
                Term::Var(i) => {
                    if *i < c {
                        Rc::new(Term::Var(*i))
                    } else {
                        Rc::new(Term::Var(i + 1))
                    }
                }
                Term::App(cs) => Term::app_vec(cs.iter().map(|a| walk(a, c, name)).collect()),
                Term::Lam(nm, ty, body) => Rc::new(Term::Lam(
                    nm.clone(),
                    walk(ty, c, name),
                    walk(body, c + 1, name),
                )),
                Term::Pi(nm, ty, body) => Rc::new(Term::Pi(
                    nm.clone(),
                    walk(ty, c, name),
                    walk(body, c + 1, name),
                )),
                Term::Let(nm, v, b) => {
                    Rc::new(Term::Let(nm.clone(), walk(v, c, name), walk(b, c + 1, name)))
                }
                other => Rc::new(other.clone()),
            }
        }
        walk(self, 0, name)
    }

    /// Whether the variable `i` (adjusted under binders) occurs free.
    pub fn has_free_var(&self, i: usize) -> bool {
        match self {
            Term::Var(k) => *k == i,
            Term::App(cs) => cs.iter().any(|a| a.has_free_var(i)),
            Term::Lam(_, ty, body) | Term::Pi(_, ty, body) => {
                ty.has_free_var(i) || body.has_free_var(i + 1)
            }
            Term::Let(_, v, b) => v.has_free_var(i) || b.has_free_var(i + 1),
            _ => false,
        }
    }

    /// Whether any variable below `bound` occurs free.
    pub fn has_free_var_below(&self, bound: usize) -> bool {
        fn walk(t: &Term, c: usize, bound: usize) -> bool {
            match t {
                Term::Var(k) => *k >= c && *k < c + bound,
                Term::App(cs) => cs.iter().any(|a| walk(a, c, bound)),
                Term::Lam(_, ty, body) | Term::Pi(_, ty, body) => {
                    walk(ty, c, bound) || walk(body, c + 1, bound)
                }
                Term::Let(_, v, b) => walk(v, c, bound) || walk(b, c + 1, bound),
                _ => false,
            }
        }
        if bound == 0 {
            false
        } else {
            walk(self, 0, bound)
        }
    }

    /// Contract the outermost redexes of an application head.
    pub fn head_beta_reduce(e: &Rc<Term>) -> Rc<Term> {
        let cs = match &**e {
            Term::App(cs) => cs,
            _ => return e.clone(),
        };
        let mut f = cs[0].clone();
        let mut i = 1;
        while i < cs.len() {
            let body = match &*f {
                Term::Lam(_, _, body) => body.clone(),
                _ => break,
            };
            f = body.instantiate(&cs[i]);
            i += 1;
        }
        Term::apps(&f, &cs[i..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_flattening_keeps_head_first() {
        let f = Term::constant("f");
        let a = Term::var(0);
        let b = Term::var(1);
        let fa = Term::app(f.clone(), a.clone());
        let fab = Term::app(fa, b.clone());
        match &*fab {
            Term::App(cs) => {
                assert_eq!(cs.len(), 3);
                assert_eq!(cs[0], f);
                assert_eq!(cs[1], a);
                assert_eq!(cs[2], b);
            }
            other => panic!("expected App, got {:?}", other),
        }
    }

    #[test]
    fn head_beta_reduces_nested_lambdas() {
        // (\x. \y. x) a b  ~>  a
        let k = Term::lam(
            "x",
            Term::constant("A"),
            Term::lam("y", Term::constant("A"), Term::var(1)),
        );
        let e = Term::apps(&k, &[Term::constant("a"), Term::constant("b")]);
        let r = Term::head_beta_reduce(&e);
        assert_eq!(r, Term::constant("a"));
    }

    #[test]
    fn instantiate_many_uses_prefix_order() {
        // body of (pi x (pi y ...)): x = Var 1, y = Var 0
        let body = Term::apps(&Term::constant("f"), &[Term::var(1), Term::var(0)]);
        let out = body.instantiate_many(&[Term::constant("a"), Term::constant("b")]);
        let expected = Term::apps(
            &Term::constant("f"),
            &[Term::constant("a"), Term::constant("b")],
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn abstract_const_lifts_other_vars() {
        let e = Term::apps(&Term::constant("f"), &[Term::constant("h"), Term::var(0)]);
        let out = e.abstract_const("h");
        let expected = Term::apps(&Term::constant("f"), &[Term::var(0), Term::var(1)]);
        assert_eq!(out, expected);
    }

    #[test]
    fn imax_is_impredicative() {
        let prop = level_imax(level_succ(Level::Zero), Level::Zero);
        assert_eq!(reduce_level(prop), Level::Zero);
        let t1 = level_imax(level_succ(Level::Zero), level_succ(Level::Zero));
        assert_eq!(reduce_level(t1), level_succ(Level::Zero));
    }
}
