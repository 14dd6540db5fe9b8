use kernel::ast::Term;
use std::rc::Rc;

/// Which equality a proof witnesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// Homogeneous equality between terms of the same type.
    Eq,
    /// Heterogeneous equality between terms of possibly different types.
    Heq,
}

/// One simplification step: the output term together with an optional
/// equality proof. A missing proof means input and output are
/// definitionally equal.
#[derive(Debug, Clone)]
pub struct SimpResult {
    pub out: Rc<Term>,
    pub proof: Option<Rc<Term>>,
    pub kind: ProofKind,
}

impl SimpResult {
    pub fn refl(out: Rc<Term>) -> Self {
        SimpResult {
            out,
            proof: None,
            kind: ProofKind::Eq,
        }
    }

    pub fn proved(out: Rc<Term>, proof: Rc<Term>, kind: ProofKind) -> Self {
        SimpResult {
            out,
            proof: Some(proof),
            kind,
        }
    }

    pub fn is_heq(&self) -> bool {
        self.kind == ProofKind::Heq
    }
}
