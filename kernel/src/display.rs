//! Pretty printer resolving de Bruijn indices to binder names.

use crate::ast::{Level, Literal, Term};
use std::fmt;
use std::rc::Rc;

pub struct DisplayTerm<'a> {
    term: &'a Rc<Term>,
    names: Vec<String>,
}

/// Render a closed term.
pub fn display(term: &Rc<Term>) -> DisplayTerm<'_> {
    DisplayTerm {
        term,
        names: Vec::new(),
    }
}

/// Render a term whose free variables refer to the given binder names
/// (outermost first).
pub fn display_in<'a>(term: &'a Rc<Term>, names: Vec<String>) -> DisplayTerm<'a> {
    DisplayTerm { term, names }
}

impl fmt::Display for DisplayTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names.clone();
        write(f, self.term, &mut names)
    }
}

fn fmt_level(f: &mut fmt::Formatter<'_>, l: &Level) -> fmt::Result {
    fn height(l: &Level) -> Option<u64> {
        match l {
            Level::Zero => Some(0),
            Level::Succ(x) => height(x).map(|n| n + 1),
            _ => None,
        }
    }
    match height(l) {
        Some(n) => write!(f, "{}", n),
        None => match l {
            Level::Succ(x) => {
                fmt_level(f, x)?;
                write!(f, "+1")
            }
            Level::Max(a, b) => {
                write!(f, "max(")?;
                fmt_level(f, a)?;
                write!(f, ", ")?;
                fmt_level(f, b)?;
                write!(f, ")")
            }
            Level::IMax(a, b) => {
                write!(f, "imax(")?;
                fmt_level(f, a)?;
                write!(f, ", ")?;
                fmt_level(f, b)?;
                write!(f, ")")
            }
            Level::Param(p) => write!(f, "{}", p),
            _ => unreachable!("concrete level handled above"),
        },
    }
}

fn fresh(names: &[String], base: &str) -> String {
    let base = if base.is_empty() || base == "_" {
        "x".to_string()
    } else {
        base.to_string()
    };
    let mut name = base.clone();
    let mut i = 0;
    while names.iter().any(|n| *n == name) {
        i += 1;
        name = format!("{}{}", base, i);
    }
    name
}

fn atomic(t: &Term) -> bool {
    matches!(
        t,
        Term::Var(_) | Term::Const(..) | Term::Value(_) | Term::Meta(_) | Term::Sort(_)
    )
}

fn write_atom(f: &mut fmt::Formatter<'_>, t: &Rc<Term>, names: &mut Vec<String>) -> fmt::Result {
    if atomic(t) {
        write(f, t, names)
    } else {
        write!(f, "(")?;
        write(f, t, names)?;
        write!(f, ")")
    }
}

fn write(f: &mut fmt::Formatter<'_>, t: &Rc<Term>, names: &mut Vec<String>) -> fmt::Result {
    match &**t {
        Term::Var(i) => {
            if *i < names.len() {
                write!(f, "{}", names[names.len() - 1 - i])
            } else {
                write!(f, "#{}", i)
            }
        }
        Term::Sort(Level::Zero) => write!(f, "Prop"),
        Term::Sort(l) => {
            if *l == Level::Succ(Box::new(Level::Zero)) {
                write!(f, "Type")
            } else {
                write!(f, "Sort ")?;
                fmt_level(f, l)
            }
        }
        Term::Const(n, _) => write!(f, "{}", n),
        Term::Value(Literal::Nat(n)) => write!(f, "{}", n),
        Term::Meta(i) => write!(f, "?m{}", i),
        Term::App(cs) => {
            write_atom(f, &cs[0], names)?;
            for a in &cs[1..] {
                write!(f, " ")?;
                write_atom(f, a, names)?;
            }
            Ok(())
        }
        Term::Lam(n, ty, body) => {
            let n = fresh(names, n);
            write!(f, "fun ({} : ", n)?;
            write(f, ty, names)?;
            write!(f, ") => ")?;
            names.push(n);
            let r = write(f, body, names);
            names.pop();
            r
        }
        Term::Pi(n, ty, body) => {
            if !body.has_free_var(0) {
                write_atom(f, ty, names)?;
                write!(f, " -> ")?;
                names.push("_".to_string());
                let r = write(f, body, names);
                names.pop();
                r
            } else {
                let n = fresh(names, n);
                write!(f, "({} : ", n)?;
                write(f, ty, names)?;
                write!(f, ") -> ")?;
                names.push(n);
                let r = write(f, body, names);
                names.pop();
                r
            }
        }
        Term::Let(n, v, b) => {
            let n = fresh(names, n);
            write!(f, "let {} := ", n)?;
            write(f, v, names)?;
            write!(f, " in ")?;
            names.push(n);
            let r = write(f, b, names);
            names.pop();
            r
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_binders_with_names() {
        let t = Term::lam(
            "x",
            Term::constant("Nat"),
            Term::apps(&Term::constant("f"), &[Term::var(0), Term::nat(2)]),
        );
        assert_eq!(format!("{}", display(&t)), "fun (x : Nat) => f x 2");
    }

    #[test]
    fn prints_arrows_without_binder() {
        let t = Term::arrow(Term::constant("Nat"), Term::prop());
        assert_eq!(format!("{}", display(&t)), "Nat -> Prop");
    }

    #[test]
    fn freshens_clashing_names() {
        let t = Term::lam(
            "x",
            Term::prop(),
            Term::lam("x", Term::prop(), Term::apps(&Term::constant("f"), &[Term::var(1), Term::var(0)])),
        );
        assert_eq!(
            format!("{}", display(&t)),
            "fun (x : Prop) => fun (x1 : Prop) => f x x1"
        );
    }
}
