use crate::ast::{
    instantiate_level, level_eq, level_imax, level_leq, level_succ, reduce_level, Level, Term,
};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

/// Reduction fuel for `whnf`; generous, only there to turn runaway
/// definition chains into an error instead of a hang.
pub const DEFAULT_WHNF_FUEL: usize = 100_000;

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(usize),
    #[error("Unknown constant: {0}")]
    UnknownConst(String),
    #[error("Definition already exists: {0}")]
    DefinitionAlreadyExists(String),
    #[error("Type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: Rc<Term>, got: Rc<Term> },
    #[error("Expected function type, got {0:?}")]
    ExpectedFunction(Rc<Term>),
    #[error("Expected sort, got {0:?}")]
    ExpectedSort(Rc<Term>),
    #[error("Constant {name} expects {expected} universe levels, got {got}")]
    LevelArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Unresolved metavariable ?{0}")]
    UnresolvedMeta(usize),
    #[error("Evaluation fuel exhausted")]
    EvalFuelExhausted,
}

impl TypeError {
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            TypeError::UnknownVariable(_) => "K0001",
            TypeError::UnknownConst(_) => "K0002",
            TypeError::DefinitionAlreadyExists(_) => "K0003",
            TypeError::TypeMismatch { .. } => "K0004",
            TypeError::ExpectedFunction(_) => "K0005",
            TypeError::ExpectedSort(_) => "K0006",
            TypeError::LevelArityMismatch { .. } => "K0007",
            TypeError::UnresolvedMeta(_) => "K0008",
            TypeError::EvalFuelExhausted => "K0009",
        }
    }
}

/// Typing context: ordered `(binder name, type)` entries, innermost last.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Context {
    entries: Vec<(String, Rc<Term>)>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&self, name: &str, ty: Rc<Term>) -> Self {
        let mut entries = self.entries.clone();
        entries.push((name.to_string(), ty));
        Context { entries }
    }

    /// Type of the variable with de Bruijn index `idx`, as stored
    /// (the caller shifts by `idx + 1` to use it at the reference site).
    pub fn get(&self, idx: usize) -> Option<Rc<Term>> {
        if idx < self.entries.len() {
            Some(self.entries[self.entries.len() - 1 - idx].1.clone())
        } else {
            None
        }
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        if idx < self.entries.len() {
            Some(&self.entries[self.entries.len() - 1 - idx].0)
        } else {
            None
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// A global definition, axiom, or builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub univ_params: Vec<String>,
    pub ty: Rc<Term>,
    pub value: Option<Rc<Term>>,
    pub opaque: bool,
    pub builtin: bool,
}

impl Definition {
    pub fn definition(name: &str, ty: Rc<Term>, value: Rc<Term>) -> Self {
        Definition {
            name: name.to_string(),
            univ_params: vec![],
            ty,
            value: Some(value),
            opaque: false,
            builtin: false,
        }
    }

    pub fn opaque_definition(name: &str, ty: Rc<Term>, value: Rc<Term>) -> Self {
        Definition {
            opaque: true,
            ..Definition::definition(name, ty, value)
        }
    }

    pub fn axiom(name: &str, ty: Rc<Term>) -> Self {
        Definition {
            name: name.to_string(),
            univ_params: vec![],
            ty,
            value: None,
            opaque: true,
            builtin: false,
        }
    }

    pub fn axiom_poly(name: &str, univ_params: &[&str], ty: Rc<Term>) -> Self {
        Definition {
            univ_params: univ_params.iter().map(|p| p.to_string()).collect(),
            ..Definition::axiom(name, ty)
        }
    }

    /// A constant reduced semantically by the evaluator.
    pub fn builtin(name: &str, ty: Rc<Term>) -> Self {
        Definition {
            name: name.to_string(),
            univ_params: vec![],
            ty,
            value: None,
            opaque: true,
            builtin: true,
        }
    }

    /// A builtin that stands for a concrete value.
    pub fn builtin_value(name: &str, ty: Rc<Term>, value: Rc<Term>) -> Self {
        Definition {
            value: Some(value),
            opaque: false,
            ..Definition::builtin(name, ty)
        }
    }

    pub fn should_unfold(&self) -> bool {
        !self.opaque && self.value.is_some()
    }

    pub fn instantiated_ty(&self, levels: &[Level]) -> Rc<Term> {
        instantiate_univ_params(&self.ty, &self.univ_params, levels)
    }

    pub fn instantiated_value(&self, levels: &[Level]) -> Option<Rc<Term>> {
        self.value
            .as_ref()
            .map(|v| instantiate_univ_params(v, &self.univ_params, levels))
    }
}

/// Substitute universe parameters throughout a term.
pub fn instantiate_univ_params(t: &Rc<Term>, params: &[String], args: &[Level]) -> Rc<Term> {
    if params.is_empty() {
        return t.clone();
    }
    match &**t {
        Term::Sort(l) => Term::sort(instantiate_level(l, params, args)),
        Term::Const(n, ls) => Rc::new(Term::Const(
            n.clone(),
            ls.iter().map(|l| instantiate_level(l, params, args)).collect(),
        )),
        Term::App(cs) => Term::app_vec(
            cs.iter()
                .map(|a| instantiate_univ_params(a, params, args))
                .collect(),
        ),
        Term::Lam(n, ty, body) => Rc::new(Term::Lam(
            n.clone(),
            instantiate_univ_params(ty, params, args),
            instantiate_univ_params(body, params, args),
        )),
        Term::Pi(n, ty, body) => Rc::new(Term::Pi(
            n.clone(),
            instantiate_univ_params(ty, params, args),
            instantiate_univ_params(body, params, args),
        )),
        Term::Let(n, v, b) => Rc::new(Term::Let(
            n.clone(),
            instantiate_univ_params(v, params, args),
            instantiate_univ_params(b, params, args),
        )),
        _ => t.clone(),
    }
}

/// Global environment: definitions plus imported feature sets.
#[derive(Clone, Default)]
pub struct Env {
    definitions: HashMap<String, Definition>,
    imports: HashSet<String>,
}

impl Env {
    pub fn new() -> Self {
        Env {
            definitions: HashMap::new(),
            imports: HashSet::new(),
        }
    }

    pub fn add_definition(&mut self, def: Definition) -> Result<(), TypeError> {
        if self.definitions.contains_key(&def.name) {
            return Err(TypeError::DefinitionAlreadyExists(def.name));
        }
        self.definitions.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get_definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn import(&mut self, feature: &str) {
        self.imports.insert(feature.to_string());
    }

    pub fn imported(&self, feature: &str) -> bool {
        self.imports.contains(feature)
    }
}

fn unfold_const(env: &Env, name: &str, levels: &[Level]) -> Option<Rc<Term>> {
    let def = env.get_definition(name)?;
    if def.should_unfold() {
        def.instantiated_value(levels)
    } else {
        None
    }
}

/// Weak head normal form: beta, let and delta reduction of non-opaque
/// definitions at the head, plus semantic reduction of builtin
/// applications whose arguments are already values.
pub fn whnf(env: &Env, e: &Rc<Term>) -> Result<Rc<Term>, TypeError> {
    let mut e = e.clone();
    let mut fuel = DEFAULT_WHNF_FUEL;
    loop {
        if fuel == 0 {
            return Err(TypeError::EvalFuelExhausted);
        }
        fuel -= 1;
        let next = match &*e {
            Term::Let(_, v, b) => b.instantiate(v),
            Term::Const(name, levels) => match unfold_const(env, name, levels) {
                Some(v) => v,
                None => return Ok(e),
            },
            Term::App(cs) => {
                let f = whnf(env, &cs[0])?;
                if f.is_lambda() {
                    Term::head_beta_reduce(&Term::apps(&f, &cs[1..]))
                } else if let Some(r) = crate::eval::eval_primitive(env, &f, &cs[1..]) {
                    r
                } else if !Rc::ptr_eq(&f, &cs[0]) {
                    return Ok(Term::apps(&f, &cs[1..]));
                } else {
                    return Ok(e);
                }
            }
            _ => return Ok(e),
        };
        e = next;
    }
}

/// Weak head normal form refined to a Pi, or an error.
pub fn ensure_pi(env: &Env, e: &Rc<Term>) -> Result<Rc<Term>, TypeError> {
    let w = whnf(env, e)?;
    if w.is_pi() {
        Ok(w)
    } else {
        Err(TypeError::ExpectedFunction(w))
    }
}

fn ensure_sort(env: &Env, e: &Rc<Term>) -> Result<Level, TypeError> {
    let w = whnf(env, e)?;
    match &*w {
        Term::Sort(l) => Ok(l.clone()),
        _ => Err(TypeError::ExpectedSort(w)),
    }
}

/// Definitional equality: whnf both sides, compare heads structurally,
/// descend under binders, eta-expand a lone lambda side.
pub fn is_def_eq(env: &Env, t1: &Rc<Term>, t2: &Rc<Term>) -> Result<bool, TypeError> {
    if t1 == t2 {
        return Ok(true);
    }
    let w1 = whnf(env, t1)?;
    let w2 = whnf(env, t2)?;
    match (&*w1, &*w2) {
        (Term::Sort(l1), Term::Sort(l2)) => Ok(level_eq(l1, l2)),
        (Term::Var(i), Term::Var(j)) => Ok(i == j),
        (Term::Value(a), Term::Value(b)) => Ok(a == b),
        (Term::Meta(i), Term::Meta(j)) => Ok(i == j),
        (Term::Const(n1, ls1), Term::Const(n2, ls2)) => Ok(n1 == n2
            && ls1.len() == ls2.len()
            && ls1.iter().zip(ls2.iter()).all(|(a, b)| level_eq(a, b))),
        (Term::App(cs1), Term::App(cs2)) => {
            if cs1.len() != cs2.len() {
                return Ok(false);
            }
            for (a, b) in cs1.iter().zip(cs2.iter()) {
                if !is_def_eq(env, a, b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Term::Lam(_, d1, b1), Term::Lam(_, d2, b2))
        | (Term::Pi(_, d1, b1), Term::Pi(_, d2, b2)) => {
            Ok(is_def_eq(env, d1, d2)? && is_def_eq(env, b1, b2)?)
        }
        (Term::Lam(_, _, b), _) => {
            let expanded = Term::app(w2.shift(0, 1), Term::var(0));
            is_def_eq(env, b, &expanded)
        }
        (_, Term::Lam(_, _, b)) => {
            let expanded = Term::app(w1.shift(0, 1), Term::var(0));
            is_def_eq(env, &expanded, b)
        }
        _ => Ok(false),
    }
}

/// Convertibility: definitional equality plus sort cumulativity.
pub fn is_convertible(env: &Env, t1: &Rc<Term>, t2: &Rc<Term>) -> Result<bool, TypeError> {
    if is_def_eq(env, t1, t2)? {
        return Ok(true);
    }
    let w1 = whnf(env, t1)?;
    let w2 = whnf(env, t2)?;
    match (&*w1, &*w2) {
        (Term::Sort(l1), Term::Sort(l2)) => Ok(level_leq(l1, l2)),
        _ => Ok(false),
    }
}

/// Whether `e` is a proposition, i.e. its type is `Prop`.
pub fn is_proposition(env: &Env, ctx: &Context, e: &Rc<Term>) -> Result<bool, TypeError> {
    let ty = infer_type(env, ctx, e)?;
    Ok(matches!(&*whnf(env, &ty)?, Term::Sort(Level::Zero)))
}

/// Type inference.
pub fn infer_type(env: &Env, ctx: &Context, term: &Rc<Term>) -> Result<Rc<Term>, TypeError> {
    match &**term {
        Term::Var(idx) => match ctx.get(*idx) {
            Some(ty) => Ok(ty.shift(0, idx + 1)),
            None => Err(TypeError::UnknownVariable(*idx)),
        },
        Term::Sort(l) => Ok(Term::sort(level_succ(l.clone()))),
        Term::Const(name, levels) => {
            let def = env
                .get_definition(name)
                .ok_or_else(|| TypeError::UnknownConst(name.clone()))?;
            if def.univ_params.len() != levels.len() {
                return Err(TypeError::LevelArityMismatch {
                    name: name.clone(),
                    expected: def.univ_params.len(),
                    got: levels.len(),
                });
            }
            Ok(def.instantiated_ty(levels))
        }
        Term::Value(_) => Ok(Term::constant("Nat")),
        Term::Meta(i) => Err(TypeError::UnresolvedMeta(*i)),
        Term::App(cs) => {
            let mut f_ty = infer_type(env, ctx, &cs[0])?;
            for a in &cs[1..] {
                let pi = ensure_pi(env, &f_ty)?;
                let (dom, body) = match &*pi {
                    Term::Pi(_, dom, body) => (dom.clone(), body.clone()),
                    _ => unreachable!("ensure_pi returned a non-Pi"),
                };
                let a_ty = infer_type(env, ctx, a)?;
                if !is_convertible(env, &a_ty, &dom)? {
                    return Err(TypeError::TypeMismatch {
                        expected: dom,
                        got: a_ty,
                    });
                }
                f_ty = body.instantiate(a);
            }
            Ok(f_ty)
        }
        Term::Lam(name, dom, body) => {
            ensure_sort(env, &infer_type(env, ctx, dom)?)?;
            let body_ty = infer_type(env, &ctx.push(name, dom.clone()), body)?;
            Ok(Term::pi(name, dom.clone(), body_ty))
        }
        Term::Pi(name, dom, body) => {
            let l1 = ensure_sort(env, &infer_type(env, ctx, dom)?)?;
            let l2 = ensure_sort(env, &infer_type(env, &ctx.push(name, dom.clone()), body)?)?;
            Ok(Term::sort(reduce_level(level_imax(l1, l2))))
        }
        Term::Let(_, v, b) => infer_type(env, ctx, &b.instantiate(v)),
    }
}
