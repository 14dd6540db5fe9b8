//! Congruence schemas.
//!
//! A schema describes, per argument position of a function head, whether
//! the simplifier may rewrite that argument and under which hypothetical
//! context, together with where the `(original, new, proof)` triple of
//! each argument lands in the schema proof's argument list.

use kernel::ast::Term;
use std::rc::Rc;

/// Hypothetical context of an argument: the hypothesis is drawn from the
/// sibling at `dep_pos` (the already-simplified sibling when
/// `use_new_value`), negated when `positive` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongrContext {
    pub dep_pos: usize,
    pub use_new_value: bool,
    pub positive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CongrArgKind {
    /// Copied verbatim.
    Fixed,
    /// Simplified, optionally under a hypothesis.
    Simplify { context: Option<CongrContext> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongrArgInfo {
    /// Position in the application (head is 0).
    pub arg_pos: usize,
    pub kind: CongrArgKind,
    /// Index of the original argument in the proof-argument vector.
    pub pos_at_proof: usize,
    /// Index of the simplified argument, for simplified arguments.
    pub new_pos_at_proof: Option<usize>,
    /// Index of the argument's equality proof, for simplified arguments.
    pub proof_pos_at_proof: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongrSchema {
    /// Name of the function head this schema applies to. The proof
    /// constant is instantiated with the head occurrence's universe
    /// levels.
    pub head: String,
    pub proof_const: String,
    pub num_proof_args: usize,
    pub args: Vec<CongrArgInfo>,
}

impl CongrSchema {
    /// Whether `head` (the child at position 0 of an application) is this
    /// schema's function.
    pub fn applies_to(&self, head: &Rc<Term>) -> bool {
        head.const_name() == Some(self.head.as_str())
    }

    /// The schema proof instantiated at the head occurrence's levels.
    pub fn proof_term(&self, head: &Rc<Term>) -> Rc<Term> {
        match &**head {
            Term::Const(_, levels) => Term::const_levels(&self.proof_const, levels.clone()),
            _ => Term::constant(&self.proof_const),
        }
    }

    /// The `if_congr` schema for `ite A c t e`: the condition is
    /// simplified plainly, the then-branch under the simplified
    /// condition, the else-branch under its negation.
    ///
    /// Proof-argument layout of `if_congr`:
    /// `A c c' t t' e e' Hc Ht He` at positions 0..9.
    pub fn for_ite() -> CongrSchema {
        CongrSchema {
            head: "ite".to_string(),
            proof_const: "if_congr".to_string(),
            num_proof_args: 10,
            args: vec![
                CongrArgInfo {
                    arg_pos: 1,
                    kind: CongrArgKind::Fixed,
                    pos_at_proof: 0,
                    new_pos_at_proof: None,
                    proof_pos_at_proof: None,
                },
                CongrArgInfo {
                    arg_pos: 2,
                    kind: CongrArgKind::Simplify { context: None },
                    pos_at_proof: 1,
                    new_pos_at_proof: Some(2),
                    proof_pos_at_proof: Some(7),
                },
                CongrArgInfo {
                    arg_pos: 3,
                    kind: CongrArgKind::Simplify {
                        context: Some(CongrContext {
                            dep_pos: 2,
                            use_new_value: true,
                            positive: true,
                        }),
                    },
                    pos_at_proof: 3,
                    new_pos_at_proof: Some(4),
                    proof_pos_at_proof: Some(8),
                },
                CongrArgInfo {
                    arg_pos: 4,
                    kind: CongrArgKind::Simplify {
                        context: Some(CongrContext {
                            dep_pos: 2,
                            use_new_value: true,
                            positive: false,
                        }),
                    },
                    pos_at_proof: 5,
                    new_pos_at_proof: Some(6),
                    proof_pos_at_proof: Some(9),
                },
            ],
        }
    }
}
