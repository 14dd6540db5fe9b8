//! A proof-producing term simplifier for the kernel's dependently-typed
//! calculus. Driven by user-supplied rewrite-rule sets plus built-in
//! reductions (beta, eta, definitional unfolding, semantic evaluation,
//! and congruence-guided subterm rewriting under contextual hypotheses).

pub mod congr;
pub mod hop;
pub mod order;
mod proofs;
pub mod result;
pub mod rules;
pub mod simplifier;

pub use congr::{CongrArgInfo, CongrArgKind, CongrContext, CongrSchema};
pub use hop::hop_match;
pub use order::is_lt;
pub use result::{ProofKind, SimpResult};
pub use rules::{RewriteRule, RuleSet, RuleSetStore};
pub use simplifier::{simplify, simplify_named, SimpError, SimpOptions, Simplifier};
