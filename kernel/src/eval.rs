use crate::ast::{Literal, Term};
use crate::checker::{Env, TypeError};
use std::rc::Rc;

pub const DEFAULT_EVAL_FUEL: usize = 100_000;

/// Normalize `e` bottom-up: beta, let, delta, and semantic reduction of
/// builtin arithmetic and decidable comparisons over values. Comparison
/// results are the canonical `true`/`false` constants.
pub fn normalize(env: &Env, e: &Rc<Term>) -> Result<Rc<Term>, TypeError> {
    let mut fuel = DEFAULT_EVAL_FUEL;
    norm(env, e, &mut fuel)
}

fn norm(env: &Env, e: &Rc<Term>, fuel: &mut usize) -> Result<Rc<Term>, TypeError> {
    if *fuel == 0 {
        return Err(TypeError::EvalFuelExhausted);
    }
    *fuel -= 1;
    match &**e {
        Term::Let(_, v, b) => norm(env, &b.instantiate(v), fuel),
        Term::Const(name, levels) => {
            let def = match env.get_definition(name) {
                Some(d) => d,
                None => return Ok(e.clone()),
            };
            if def.should_unfold() {
                match def.instantiated_value(levels) {
                    Some(v) => norm(env, &v, fuel),
                    None => Ok(e.clone()),
                }
            } else {
                Ok(e.clone())
            }
        }
        Term::App(cs) => {
            let head = norm(env, &cs[0], fuel)?;
            let mut args = Vec::with_capacity(cs.len() - 1);
            for a in &cs[1..] {
                args.push(norm(env, a, fuel)?);
            }
            if head.is_lambda() {
                return norm(env, &Term::head_beta_reduce(&Term::apps(&head, &args)), fuel);
            }
            if let Some(r) = eval_primitive(env, &head, &args) {
                return Ok(r);
            }
            Ok(Term::apps(&head, &args))
        }
        Term::Lam(n, ty, body) => Ok(Term::lam(n, norm(env, ty, fuel)?, norm(env, body, fuel)?)),
        Term::Pi(n, ty, body) => Ok(Term::pi(n, norm(env, ty, fuel)?, norm(env, body, fuel)?)),
        _ => Ok(e.clone()),
    }
}

fn truth(b: bool) -> Rc<Term> {
    if b {
        Term::constant("true")
    } else {
        Term::constant("false")
    }
}

fn nat_of(t: &Rc<Term>) -> Option<u128> {
    match &**t {
        Term::Value(Literal::Nat(n)) => Some(*n),
        _ => None,
    }
}

/// Semantic reduction of a builtin application when its (relevant)
/// arguments are values; `None` when nothing computes.
pub(crate) fn eval_primitive(env: &Env, head: &Rc<Term>, args: &[Rc<Term>]) -> Option<Rc<Term>> {
    let name = head.const_name()?;
    // eq/neq take a leading type argument, heq takes two
    match name {
        "eq" | "neq" if args.len() == 3 => {
            let (a, b) = (&args[1], &args[2]);
            if a.is_value() && b.is_value() {
                let same = a == b;
                return Some(truth(if name == "eq" { same } else { !same }));
            }
            return None;
        }
        "heq" if args.len() == 4 => {
            let (a, b) = (&args[2], &args[3]);
            if a.is_value() && b.is_value() {
                return Some(truth(a == b));
            }
            return None;
        }
        _ => {}
    }
    let def = env.get_definition(name)?;
    if !def.builtin || args.len() != 2 {
        return None;
    }
    let a = nat_of(&args[0])?;
    let b = nat_of(&args[1])?;
    match name {
        "add" => Some(Term::nat(a.checked_add(b)?)),
        "sub" => Some(Term::nat(a.saturating_sub(b))),
        "mul" => Some(Term::nat(a.checked_mul(b)?)),
        "le" => Some(truth(a <= b)),
        "lt" => Some(truth(a < b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::std_env;

    #[test]
    fn evaluates_builtin_arithmetic() {
        let env = std_env();
        let e = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::nat(1)]);
        let r = normalize(&env, &e).expect("normalize failed");
        assert_eq!(r, Term::nat(3));
    }

    #[test]
    fn evaluates_equality_on_values() {
        let env = std_env();
        let eq1 = Term::const_levels("eq", vec![crate::ast::level_succ(crate::ast::Level::Zero)]);
        let e = Term::apps(&eq1, &[Term::constant("Nat"), Term::nat(0), Term::nat(0)]);
        let r = normalize(&env, &e).expect("normalize failed");
        assert_eq!(r, Term::constant("true"));
        let e2 = Term::apps(&eq1, &[Term::constant("Nat"), Term::nat(0), Term::nat(1)]);
        let r2 = normalize(&env, &e2).expect("normalize failed");
        assert_eq!(r2, Term::constant("false"));
    }

    #[test]
    fn leaves_neutral_applications_alone() {
        let env = std_env();
        let e = Term::apps(&Term::constant("add"), &[Term::nat(2), Term::var(0)]);
        let r = normalize(&env, &e).expect("normalize failed");
        assert_eq!(r, e);
    }
}
