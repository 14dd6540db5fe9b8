//! The simplifier: structural traversal with rule-based rewriting,
//! congruence-schema driven contextual simplification, proof assembly,
//! memoization and budget enforcement.

use crate::congr::{CongrArgKind, CongrSchema};
use crate::hop::hop_match;
use crate::order::is_lt;
use crate::result::{ProofKind, SimpResult};
use crate::rules::{RewriteRule, RuleSet, RuleSetStore};
use kernel::ast::Term;
use kernel::checker::{self, Context, Env, TypeError};
use kernel::sharing::{MaxSharing, TermKey};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Owner label for hypothesis rules inserted during contextual rewriting.
const LOCAL_RULE_OWNER: &str = "local";

#[derive(Error, Debug)]
pub enum SimpError {
    #[error("simplifier failed, maximum number of steps exceeded")]
    MaxStepsExceeded,
    #[error("simplifier interrupted")]
    Interrupted,
    #[error("unknown rule set: {0}")]
    UnknownRuleSet(String),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Simplifier configuration. Field names and defaults follow the option
/// table of the embedding surface.
#[derive(Debug, Clone)]
pub struct SimpOptions {
    /// Emit equality proofs.
    pub proofs: bool,
    /// Honor congruence schemas with hypothetical context.
    pub contextual: bool,
    /// Do not re-simplify after a successful rewrite.
    pub single_pass: bool,
    /// Head-beta applied lambdas.
    pub beta: bool,
    /// Eta-contract eligible lambdas.
    pub eta: bool,
    /// Normalize applications whose key arguments are values.
    pub eval: bool,
    /// Unfold non-opaque constants.
    pub unfold: bool,
    /// Attempt to discharge propositional premises.
    pub conditional: bool,
    /// Cache intermediate results.
    pub memoize: bool,
    /// Abort after this many traversal steps.
    pub max_steps: u64,
}

impl Default for SimpOptions {
    fn default() -> Self {
        SimpOptions {
            proofs: true,
            contextual: true,
            single_pass: false,
            beta: true,
            eta: true,
            eval: true,
            unfold: false,
            conditional: true,
            memoize: true,
            max_steps: u64::MAX,
        }
    }
}

type Cache = HashMap<TermKey, SimpResult>;

/// One simplification session. Owns the traversal state; a top-level
/// `run` freezes the context and cache, and restores them on every exit
/// path.
pub struct Simplifier<'e> {
    pub(crate) env: &'e Env,
    pub(crate) ctx: Context,
    pub(crate) rule_sets: Vec<RuleSet>,
    congr_schemas: Vec<CongrSchema>,
    cache: Cache,
    sharing: MaxSharing,
    contextual_depth: usize,
    num_steps: u64,
    has_heq: bool,
    has_cast: bool,
    interrupt: Option<Arc<AtomicBool>>,
    opts: SimpOptions,
}

impl<'e> Simplifier<'e> {
    pub fn new(env: &'e Env, opts: SimpOptions, rule_sets: Vec<RuleSet>) -> Self {
        let has_heq = env.imported("heq");
        let has_cast = env.imported("cast");
        let mut all_sets = Vec::with_capacity(rule_sets.len() + 1);
        if opts.contextual {
            // scratch set receiving hypothesis rules during contextual rewriting
            all_sets.push(RuleSet::new("contextual"));
        }
        all_sets.extend(rule_sets);
        let mut congr_schemas: Vec<CongrSchema> = Vec::new();
        if opts.contextual {
            for rs in &all_sets {
                rs.for_each_congr(|c| {
                    if congr_schemas.iter().all(|seen| seen.head != c.head) {
                        congr_schemas.push(c.clone());
                    }
                });
            }
        }
        Simplifier {
            env,
            ctx: Context::new(),
            rule_sets: all_sets,
            congr_schemas,
            cache: Cache::new(),
            sharing: MaxSharing::new(),
            contextual_depth: 0,
            num_steps: 0,
            has_heq,
            has_cast,
            interrupt: None,
            opts,
        }
    }

    pub fn set_interrupt(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    pub(crate) fn proofs_enabled(&self) -> bool {
        self.opts.proofs
    }

    /// Top-level entry: simplify `e` in `ctx`, returning the simplified
    /// term and an equality proof (reflexivity when nothing fired).
    pub fn run(&mut self, e: &Rc<Term>, ctx: Context) -> Result<(Rc<Term>, Rc<Term>), SimpError> {
        self.num_steps = 0;
        let saved_ctx = std::mem::replace(&mut self.ctx, ctx);
        let saved_cache = std::mem::take(&mut self.cache);
        let r = self.simplify(e).and_then(|res| {
            let proof = self.get_proof(&res)?;
            Ok((res.out, proof))
        });
        self.ctx = saved_ctx;
        self.cache = saved_cache;
        r
    }

    // ---- scoped state ----------------------------------------------------

    /// Run `f` in `new_ctx`. Cache entries are only valid for the
    /// (context, rule set) configuration they were computed under, so the
    /// scope gets a fresh cache; the re-entry in `rewrite` relies on this
    /// swap happening at every configuration change.
    fn with_context<R>(&mut self, new_ctx: Context, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved_ctx = std::mem::replace(&mut self.ctx, new_ctx);
        let saved_cache = std::mem::take(&mut self.cache);
        let r = f(self);
        self.ctx = saved_ctx;
        self.cache = saved_cache;
        r
    }

    /// Run `f` with `fact` inserted into the scratch rule set, under a
    /// fresh cache. Both are restored on every exit path.
    fn with_hypothesis<R>(
        &mut self,
        fact: &Rc<Term>,
        proof: &Rc<Term>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved_rules = self.rule_sets[0].clone();
        let saved_cache = std::mem::take(&mut self.cache);
        self.rule_sets[0].insert(LOCAL_RULE_OWNER, fact, proof);
        let r = f(self);
        self.rule_sets[0] = saved_rules;
        self.cache = saved_cache;
        r
    }

    fn check_interrupt(&self) -> Result<(), SimpError> {
        if let Some(flag) = &self.interrupt {
            if flag.load(Ordering::Relaxed) {
                return Err(SimpError::Interrupted);
            }
        }
        Ok(())
    }

    fn save(&mut self, key: &Rc<Term>, r: SimpResult) -> SimpResult {
        if !self.opts.memoize {
            return r;
        }
        let out = self.sharing.share(&r.out);
        let shared = SimpResult {
            out,
            proof: r.proof,
            kind: r.kind,
        };
        self.cache.insert(TermKey(key.clone()), shared.clone());
        shared
    }

    // ---- traversal core --------------------------------------------------

    pub(crate) fn simplify(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        self.check_interrupt()?;
        self.num_steps += 1;
        if self.num_steps > self.opts.max_steps {
            return Err(SimpError::MaxStepsExceeded);
        }
        let e = if self.opts.memoize {
            let shared = self.sharing.share(e);
            if let Some(r) = self.cache.get(&TermKey(shared.clone())) {
                return Ok(r.clone());
            }
            shared
        } else {
            e.clone()
        };
        let r = match &*e {
            Term::Var(_) => Ok(self.simplify_var(&e)),
            Term::Sort(_) | Term::Meta(_) | Term::Value(_) => Ok(SimpResult::refl(e.clone())),
            Term::Const(..) => self.simplify_constant(&e),
            Term::App(_) => self.simplify_app(&e),
            Term::Lam(..) => self.simplify_lambda(&e),
            Term::Pi(..) => self.simplify_pi(&e),
            Term::Let(_, v, b) => self.simplify(&b.instantiate(v)),
        }?;
        Ok(self.save(&e, r))
    }

    /// Variables are rigid; rewriting them would need heterogeneous
    /// support that is deliberately not provided.
    fn simplify_var(&self, e: &Rc<Term>) -> SimpResult {
        SimpResult::refl(e.clone())
    }

    fn simplify_constant(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        if self.opts.unfold || self.opts.eval {
            if let Term::Const(name, levels) = &**e {
                let env = self.env;
                if let Some(def) = env.get_definition(name) {
                    if self.opts.unfold && !def.builtin && def.should_unfold() {
                        if let Some(v) = def.instantiated_value(levels) {
                            return if self.opts.single_pass {
                                Ok(SimpResult::refl(v))
                            } else {
                                self.simplify(&v)
                            };
                        }
                    }
                    if self.opts.eval && def.builtin {
                        if let Some(v) = def.instantiated_value(levels) {
                            return Ok(SimpResult::refl(v));
                        }
                    }
                }
            }
        }
        let r = SimpResult::refl(e.clone());
        self.rewrite(e, r)
    }

    // ---- applications ----------------------------------------------------

    fn simplify_app(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        if self.has_cast && is_cast_app(e) {
            return self.simplify_cast(e);
        }
        if self.opts.contextual {
            if let Some(schema) = self.schema_for(e.head()) {
                return self.simplify_app_congr(e, &schema);
            }
        }
        self.simplify_app_default(e)
    }

    fn schema_for(&self, head: &Rc<Term>) -> Option<CongrSchema> {
        self.congr_schemas
            .iter()
            .find(|s| s.applies_to(head))
            .cloned()
    }

    /// `cast A B H a` collapses to the simplification of `a`, with a
    /// heterogeneous proof stitched from `cast_heq`.
    fn simplify_cast(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        let cs = e.args().to_vec();
        let a_ty = cs[1].clone();
        let b_ty = cs[2].clone();
        let a = cs[4].clone();
        if !self.opts.proofs {
            return self.simplify(&a);
        }
        let res_a = self.simplify(&a)?;
        let c = res_a.out.clone();
        // cast_heq A B H a : heq B A (cast A B H a) a
        let cast_pr = {
            let mut children = cs.clone();
            children[0] = match &*cs[0] {
                Term::Const(_, levels) => Term::const_levels("cast_heq", levels.clone()),
                _ => Term::constant("cast_heq"),
            };
            Term::app_vec(children)
        };
        match &res_a.proof {
            None => Ok(SimpResult::proved(c, cast_pr, ProofKind::Heq)),
            Some(h_ac) => {
                let pr = if res_a.is_heq() {
                    let c_ty = self.infer_type(&c)?;
                    self.mk_htrans_th(&b_ty, &a_ty, &c_ty, e, &a, &c, &cast_pr, h_ac)?
                } else {
                    let h_ac = self.mk_to_heq_th(&a_ty, &a, &c, h_ac)?;
                    self.mk_htrans_th(&b_ty, &a_ty, &a_ty, e, &a, &c, &cast_pr, &h_ac)?
                };
                Ok(SimpResult::proved(c, pr, ProofKind::Heq))
            }
        }
    }

    /// Simplify an application through its head's congruence schema:
    /// each declared argument is simplified, possibly under a hypothesis
    /// drawn from a sibling, and the schema proof is instantiated with
    /// the collected `(old, new, proof)` triples.
    fn simplify_app_congr(
        &mut self,
        e: &Rc<Term>,
        cg: &CongrSchema,
    ) -> Result<SimpResult, SimpError> {
        let args = e.args().to_vec();
        let mut new_args = args.clone();
        let mut proof_args: Vec<Option<Rc<Term>>> = vec![None; cg.num_proof_args];
        let mut changed = false;
        for info in &cg.args {
            let pos = info.arg_pos;
            if pos >= args.len() {
                return self.simplify_app_default(e);
            }
            let a = args[pos].clone();
            match &info.kind {
                CongrArgKind::Fixed => {
                    proof_args[info.pos_at_proof] = Some(a.clone());
                }
                CongrArgKind::Simplify { context: None } => {
                    let mut res_a = self.simplify(&a)?;
                    if self.opts.proofs && !self.ensure_homogeneous(&a, &mut res_a)? {
                        return self.simplify_app_default(e);
                    }
                    new_args[pos] = res_a.out.clone();
                    if self.opts.proofs {
                        let (Some(new_pos), Some(proof_pos)) =
                            (info.new_pos_at_proof, info.proof_pos_at_proof)
                        else {
                            return self.simplify_app_default(e);
                        };
                        proof_args[info.pos_at_proof] = Some(a.clone());
                        proof_args[new_pos] = Some(res_a.out.clone());
                        proof_args[proof_pos] = Some(self.get_proof(&res_a)?);
                    }
                }
                CongrArgKind::Simplify { context: Some(cx) } => {
                    let mut h = if cx.use_new_value {
                        new_args[cx.dep_pos].clone()
                    } else {
                        args[cx.dep_pos].clone()
                    };
                    if !cx.positive {
                        h = Term::app(Term::constant("not"), h);
                    }
                    if !self.opts.proofs {
                        // contextual reasoning without proofs
                        let dummy = Term::constant("trivial");
                        let res_a = self.with_hypothesis(&h, &dummy, |s| s.simplify(&a))?;
                        new_args[pos] = res_a.out;
                    } else {
                        self.contextual_depth += 1;
                        let witness_name = format!("#h{}", self.contextual_depth);
                        let hyp_binder = format!("C{}", self.contextual_depth);
                        let witness = Term::constant(&witness_name);
                        let res = self.with_hypothesis(&h, &witness, |s| s.simplify(&a));
                        self.contextual_depth -= 1;
                        let mut res_a = res?;
                        if !self.ensure_homogeneous(&a, &mut res_a)? {
                            return self.simplify_app_default(e);
                        }
                        new_args[pos] = res_a.out.clone();
                        let (Some(new_pos), Some(proof_pos)) =
                            (info.new_pos_at_proof, info.proof_pos_at_proof)
                        else {
                            return self.simplify_app_default(e);
                        };
                        proof_args[info.pos_at_proof] = Some(a.clone());
                        proof_args[new_pos] = Some(res_a.out.clone());
                        // the argument proof is parameterized on the local
                        // hypothesis: fun (C : H) => proof[witness := C]
                        let arg_proof = self.get_proof(&res_a)?;
                        proof_args[proof_pos] = Some(Term::lam(
                            &hyp_binder,
                            h.clone(),
                            arg_proof.abstract_const(&witness_name),
                        ));
                    }
                }
            }
            if new_args[pos] != args[pos] {
                changed = true;
            }
        }
        if !changed {
            return self.rewrite_app(e, SimpResult::refl(e.clone()));
        }
        let out = Term::app_vec(new_args);
        if !self.opts.proofs {
            return self.rewrite_app(e, SimpResult::refl(out));
        }
        let mut children = Vec::with_capacity(cg.num_proof_args + 1);
        children.push(cg.proof_term(&args[0]));
        for pa in proof_args {
            match pa {
                Some(p) => children.push(p),
                None => {
                    log::debug!("congruence schema for {} left a proof slot empty", cg.head);
                    return self.simplify_app_default(e);
                }
            }
        }
        let pr = Term::app_vec(children);
        self.rewrite_app(e, SimpResult::proved(out, pr, ProofKind::Eq))
    }

    /// Left-to-right congruence with a cursor over the function type and,
    /// when a heterogeneous step widened it, a parallel cursor over the
    /// new function type.
    fn simplify_app_default(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        let args = e.args().to_vec();
        let num = args.len();
        let mut new_args: Vec<Rc<Term>> = Vec::with_capacity(num);
        let mut proofs: Vec<Option<Rc<Term>>> = Vec::with_capacity(num);
        let mut f_types: Vec<Rc<Term>> = Vec::with_capacity(num);
        let mut new_f_types: Vec<Rc<Term>> = Vec::with_capacity(num);
        let mut heq_proofs: Vec<bool> = Vec::with_capacity(num);
        let mut changed = false;

        let f = args[0].clone();
        let mut f_type = self.infer_type(&f)?;
        let res_f = self.simplify(&f)?;
        let new_f = res_f.out.clone();
        if new_f != f {
            changed = true;
        }
        new_args.push(new_f.clone());
        let mut new_f_type = f_type.clone();
        let mut diverged = false;
        if self.opts.proofs {
            proofs.push(res_f.proof.clone());
            heq_proofs.push(res_f.is_heq());
            if res_f.is_heq() {
                new_f_type = self.infer_type(&new_f)?;
                diverged = true;
            }
            f_types.push(f_type.clone());
            new_f_types.push(new_f_type.clone());
        }

        for i in 1..num {
            f_type = self.ensure_pi(&f_type)?;
            if diverged {
                new_f_type = self.ensure_pi(&new_f_type)?;
            } else {
                new_f_type = f_type.clone();
            }
            if self.opts.proofs {
                // keep the Pi forms; the proof builders peel them
                f_types[i - 1] = f_type.clone();
                new_f_types[i - 1] = new_f_type.clone();
            }
            let f_arrow = f_type.is_arrow();
            let a = args[i].clone();
            let mut res_a = SimpResult::refl(a.clone());
            if self.has_heq || f_arrow {
                res_a = self.simplify(&a)?;
                if res_a.out != a {
                    changed = true;
                }
            }
            let new_a = res_a.out.clone();
            new_args.push(new_a.clone());
            if self.opts.proofs {
                proofs.push(res_a.proof.clone());
                heq_proofs.push(res_a.is_heq());
            }
            // advance the type cursors
            if f_arrow {
                f_type = pi_body_lowered(&f_type)?;
                new_f_type = if diverged {
                    pi_body_lowered(&new_f_type)?
                } else {
                    f_type.clone()
                };
            } else if a == new_a {
                f_type = pi_body_at(&f_type, &a)?;
                new_f_type = if diverged {
                    pi_body_at(&new_f_type, &a)?
                } else {
                    f_type.clone()
                };
            } else {
                f_type = pi_body_at(&f_type, &a)?;
                new_f_type = pi_body_at(&new_f_type, &new_a)?;
                diverged = true;
            }
            if self.opts.proofs {
                f_types.push(f_type.clone());
                new_f_types.push(new_f_type.clone());
            }
        }

        if !changed {
            return self.rewrite_app(e, SimpResult::refl(e.clone()));
        }
        let out = Term::app_vec(new_args.clone());
        if !self.opts.proofs {
            return self.rewrite_app(e, SimpResult::refl(out));
        }

        let mut i = 0;
        while i < num && proofs[i].is_none() {
            i += 1;
        }
        if i == num {
            return self.rewrite_app(e, SimpResult::refl(out));
        }
        let mut pr: Rc<Term>;
        let mut heq_proof = false;
        if i == 0 {
            pr = match &proofs[0] {
                Some(p) => p.clone(),
                None => unreachable!("scanned to a present proof"),
            };
            heq_proof = self.has_heq && heq_proofs[0];
        } else {
            let pr_i = match &proofs[i] {
                Some(p) => p.clone(),
                None => unreachable!("scanned to a present proof"),
            };
            if self.has_heq && (heq_proofs[i] || !f_types[i - 1].is_arrow()) {
                let fpre = mk_app_prefix(i, &new_args);
                let hrefl = self.mk_hrefl_th(&f_types[i - 1], &fpre)?;
                match self.mk_hcongr_th(
                    &f_types[i - 1],
                    &f_types[i - 1],
                    &fpre,
                    &fpre,
                    &args[i],
                    &new_args[i],
                    &hrefl,
                    pr_i,
                    heq_proofs[i],
                )? {
                    Some(p) => {
                        pr = p;
                        heq_proof = true;
                    }
                    None => {
                        log::debug!("hcongr failed; returning the subterm unchanged");
                        return self.rewrite_app(e, SimpResult::refl(e.clone()));
                    }
                }
            } else {
                let fpre = mk_app_prefix(i, &new_args);
                pr = self.mk_congr2_th(&f_types[i - 1], &args[i], &new_args[i], &fpre, &pr_i)?;
            }
        }
        i += 1;
        while i < num {
            let fpre = mk_app_prefix(i, &args);
            let new_fpre = mk_app_prefix(i, &new_args);
            match proofs[i].clone() {
                Some(pr_i) => {
                    if self.has_heq && heq_proofs[i] {
                        if !heq_proof {
                            pr = self.mk_to_heq_th(&f_types[i - 1], &fpre, &new_fpre, &pr)?;
                        }
                        match self.mk_hcongr_th(
                            &f_types[i - 1],
                            &new_f_types[i - 1],
                            &fpre,
                            &new_fpre,
                            &args[i],
                            &new_args[i],
                            &pr,
                            pr_i,
                            true,
                        )? {
                            Some(p) => {
                                pr = p;
                                heq_proof = true;
                            }
                            None => {
                                log::debug!("hcongr failed; returning the subterm unchanged");
                                return self.rewrite_app(e, SimpResult::refl(e.clone()));
                            }
                        }
                    } else if heq_proof {
                        match self.mk_hcongr_th(
                            &f_types[i - 1],
                            &new_f_types[i - 1],
                            &fpre,
                            &new_fpre,
                            &args[i],
                            &new_args[i],
                            &pr,
                            pr_i,
                            false,
                        )? {
                            Some(p) => pr = p,
                            None => {
                                log::debug!("hcongr failed; returning the subterm unchanged");
                                return self.rewrite_app(e, SimpResult::refl(e.clone()));
                            }
                        }
                    } else {
                        pr = self.mk_congr_th(
                            &f_types[i - 1],
                            &fpre,
                            &new_fpre,
                            &args[i],
                            &new_args[i],
                            &pr,
                            &pr_i,
                        )?;
                    }
                }
                None => {
                    if heq_proof {
                        let a_ty = self.infer_type(&args[i])?;
                        let refl_a = self.mk_refl_th(&a_ty, &args[i])?;
                        match self.mk_hcongr_th(
                            &f_types[i - 1],
                            &new_f_types[i - 1],
                            &fpre,
                            &new_fpre,
                            &args[i],
                            &args[i],
                            &pr,
                            refl_a,
                            false,
                        )? {
                            Some(p) => pr = p,
                            None => {
                                log::debug!("hcongr failed; returning the subterm unchanged");
                                return self.rewrite_app(e, SimpResult::refl(e.clone()));
                            }
                        }
                    } else {
                        pr = self.mk_congr1_th(&f_types[i - 1], &fpre, &new_fpre, &args[i], &pr)?;
                    }
                }
            }
            i += 1;
        }
        let kind = if heq_proof {
            ProofKind::Heq
        } else {
            ProofKind::Eq
        };
        self.rewrite_app(e, SimpResult::proved(out, pr, kind))
    }

    /// Whether the evaluator should be consulted for `e`.
    fn evaluate_app(&self, e: &Rc<Term>) -> bool {
        if !self.opts.eval {
            return false;
        }
        let cs = match &**e {
            Term::App(cs) => cs,
            _ => return false,
        };
        if cs[1..].iter().all(|a| a.is_value()) {
            return true;
        }
        // equality and disequality carry type arguments in front; the
        // decidable part is the last two arguments
        let n = cs.len();
        matches!(cs[0].const_name(), Some("eq" | "neq" | "heq"))
            && n >= 3
            && cs[n - 2].is_value()
            && cs[n - 1].is_value()
    }

    /// Post-congruence step for applications: evaluation, head beta, then
    /// the rewrite engine.
    fn rewrite_app(&mut self, lhs: &Rc<Term>, rhs: SimpResult) -> Result<SimpResult, SimpError> {
        if self.evaluate_app(&rhs.out) {
            let new_out = self.normalize(&rhs.out)?;
            if is_evaluation_result(&new_out) {
                // definitional step, no proof node needed
                let r = SimpResult {
                    out: new_out,
                    proof: rhs.proof.clone(),
                    kind: rhs.kind,
                };
                return self.rewrite(lhs, r);
            }
        }
        if self.opts.beta && rhs.out.head().is_lambda() {
            let new_out = Term::head_beta_reduce(&rhs.out);
            let r = SimpResult {
                out: new_out,
                proof: rhs.proof,
                kind: rhs.kind,
            };
            return self.rewrite(lhs, r);
        }
        self.rewrite(lhs, rhs)
    }

    // ---- binders ---------------------------------------------------------

    fn simplify_lambda(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        let (name, dom, body) = match &**e {
            Term::Lam(n, d, b) => (n.clone(), d.clone(), b.clone()),
            _ => unreachable!("simplify_lambda on a non-lambda"),
        };
        if self.has_heq {
            // bodies may change type under heterogeneous rewriting; this
            // configuration is deliberately left alone
            return Ok(SimpResult::refl(e.clone()));
        }
        let new_ctx = self.ctx.push(&name, dom.clone());
        let res_body = self.with_context(new_ctx, |s| s.simplify(&body))?;
        debug_assert!(!res_body.is_heq());
        if res_body.out == body {
            return self.rewrite_lambda(e, SimpResult::refl(e.clone()));
        }
        let out = Term::lam(&name, dom.clone(), res_body.out.clone());
        match (&res_body.proof, self.proofs_enabled()) {
            (Some(body_proof), true) => {
                let inner_ctx = self.ctx.push(&name, dom.clone());
                let body_type = checker::infer_type(self.env, &inner_ctx, &body)?;
                let u = self.sort_level_of(&dom)?;
                let v = self.sort_level_of_open(&name, &dom, &body_type)?;
                let pr = Term::apps(
                    &Term::const_levels("funext", vec![u, v]),
                    &[
                        dom.clone(),
                        Term::lam(&name, dom.clone(), body_type),
                        e.clone(),
                        out.clone(),
                        Term::lam(&name, dom, body_proof.clone()),
                    ],
                );
                self.rewrite_lambda(e, SimpResult::proved(out, pr, ProofKind::Eq))
            }
            _ => self.rewrite_lambda(e, SimpResult::refl(out)),
        }
    }

    /// Post step for lambdas: eta contraction, then the rewrite engine.
    fn rewrite_lambda(&mut self, lhs: &Rc<Term>, rhs: SimpResult) -> Result<SimpResult, SimpError> {
        if self.opts.eta && is_eta_target(&rhs.out) {
            let (name, dom, body) = match &*rhs.out {
                Term::Lam(n, d, b) => (n.clone(), d.clone(), b.clone()),
                _ => unreachable!("eta target is a lambda"),
            };
            let bargs = body.args();
            let stripped = if bargs.len() > 2 {
                Term::app_vec(bargs[..bargs.len() - 1].to_vec())
            } else {
                bargs[0].clone()
            };
            let new_out = stripped.lower_free_vars(1, 1);
            let new_out_type = self.ensure_pi(&self.infer_type(&new_out)?)?;
            let (_, new_dom, new_body_ty) = match &*new_out_type {
                Term::Pi(n, d, b) => (n.clone(), d.clone(), b.clone()),
                _ => unreachable!("ensure_pi returned a non-Pi"),
            };
            if self.is_definitionally_equal(&new_dom, &dom)? {
                if self.opts.proofs {
                    let u = self.sort_level_of(&dom)?;
                    let v = self.sort_level_of_open(&name, &dom, &new_body_ty)?;
                    let new_proof = Term::apps(
                        &Term::const_levels("eta", vec![u, v]),
                        &[
                            dom.clone(),
                            Term::lam(&name, dom.clone(), new_body_ty),
                            new_out.clone(),
                        ],
                    );
                    let r = self.mk_trans_result(lhs, &rhs, &new_out, Some(new_proof))?;
                    return self.rewrite(lhs, r);
                } else {
                    return self.rewrite(lhs, SimpResult::refl(new_out));
                }
            }
        }
        self.rewrite(lhs, rhs)
    }

    fn simplify_pi(&mut self, e: &Rc<Term>) -> Result<SimpResult, SimpError> {
        let (name, dom, body) = match &**e {
            Term::Pi(n, d, b) => (n.clone(), d.clone(), b.clone()),
            _ => unreachable!("simplify_pi on a non-Pi"),
        };
        if self.has_heq {
            // see simplify_lambda
            return Ok(SimpResult::refl(e.clone()));
        }
        if !self.is_proposition(e)? {
            // only universally quantified propositions are simplified
            return Ok(SimpResult::refl(e.clone()));
        }
        let new_ctx = self.ctx.push(&name, dom.clone());
        let res_body = self.with_context(new_ctx, |s| s.simplify(&body))?;
        debug_assert!(!res_body.is_heq());
        if res_body.out == body {
            return self.rewrite(e, SimpResult::refl(e.clone()));
        }
        let new_body = res_body.out.clone();
        let out = Term::pi(&name, dom.clone(), new_body.clone());
        match res_body.proof.clone() {
            Some(p) if self.opts.proofs => {
                let u = self.sort_level_of(&dom)?;
                let pr = Term::apps(
                    &Term::const_levels("allext", vec![u]),
                    &[
                        dom.clone(),
                        Term::lam(&name, dom.clone(), body),
                        Term::lam(&name, dom.clone(), new_body),
                        Term::lam(&name, dom, p),
                    ],
                );
                self.rewrite(e, SimpResult::proved(out, pr, ProofKind::Eq))
            }
            _ => self.rewrite(e, SimpResult::refl(out)),
        }
    }

    // ---- rewrite engine --------------------------------------------------

    /// Try every active rule set on `rhs.out`; compose an accepted
    /// rewrite through `trans`, and in fixpoint mode keep simplifying.
    fn rewrite(&mut self, lhs: &Rc<Term>, rhs: SimpResult) -> Result<SimpResult, SimpError> {
        let target = rhs.out.clone();
        for rs_idx in 0..self.rule_sets.len() {
            let candidates = self.rule_sets[rs_idx].candidates(&target);
            for rule in candidates {
                if let Some((new_out, new_proof)) = self.try_rule(&rule, &target)? {
                    log::trace!("rule {} fired", rule.id);
                    let new_r1 = self.mk_trans_result(lhs, &rhs, &new_out, new_proof)?;
                    if self.opts.single_pass {
                        return Ok(new_r1);
                    }
                    let new_r2 = self.simplify(&new_r1.out)?;
                    return self.mk_trans_result2(lhs, &new_r1, new_r2);
                }
            }
        }
        if !self.opts.single_pass && lhs != &target {
            let new_rhs = self.simplify(&target)?;
            return self.mk_trans_result2(lhs, &rhs, new_rhs);
        }
        Ok(rhs)
    }

    /// Match `rule` against `target`. Unbound propositional premises are
    /// discharged by simplifying them to the canonical `true`; permutative
    /// rules additionally require a strict decrease in the term order.
    fn try_rule(
        &mut self,
        rule: &RewriteRule,
        target: &Rc<Term>,
    ) -> Result<Option<(Rc<Term>, Option<Rc<Term>>)>, SimpError> {
        let num = rule.arity;
        let mut subst: Vec<Option<Rc<Term>>> = vec![None; num];
        if !hop_match(&rule.lhs, target, &mut subst) {
            return Ok(None);
        }
        if subst.iter().all(|s| s.is_some()) {
            // easy case: every binder was bound by matching
            let inst: Vec<Rc<Term>> = subst.iter().filter_map(|s| s.clone()).collect();
            let new_out = rule.rhs.instantiate_many(&inst);
            if rule.is_permutation && !is_lt(&new_out, target, false) {
                return Ok(None);
            }
            let proof = if self.opts.proofs {
                Some(if num > 0 {
                    Term::apps(&rule.proof, &inst)
                } else {
                    rule.proof.clone()
                })
            } else {
                None
            };
            return Ok(Some((new_out, proof)));
        }
        if !self.opts.conditional {
            return Ok(None);
        }
        // conditional rewriting: fill the unbound slots by proving the
        // propositional premises
        let mut ceq = rule.ceq.clone();
        let mut proof_args: Vec<Rc<Term>> = Vec::new();
        if self.opts.proofs {
            proof_args.push(rule.proof.clone());
        }
        for slot in subst.iter().take(num) {
            let (dom, body) = match &*ceq {
                Term::Pi(_, d, b) => (d.clone(), b.clone()),
                _ => return Ok(None),
            };
            match slot {
                Some(s) => {
                    ceq = body.instantiate(s);
                    if self.opts.proofs {
                        proof_args.push(s.clone());
                    }
                }
                None => {
                    if !self.is_proposition(&dom)? {
                        // not a dischargeable premise
                        return Ok(None);
                    }
                    let d_res = self.simplify(&dom)?;
                    if !is_true_const(&d_res.out) {
                        return Ok(None);
                    }
                    if self.opts.proofs {
                        let d_proof = match &d_res.proof {
                            // definitionally true
                            None => Term::constant("trivial"),
                            Some(p) => self.mk_eqt_elim_th(&dom, p),
                        };
                        ceq = body.instantiate(&d_proof);
                        proof_args.push(d_proof);
                    } else if !body.has_free_var(0) {
                        ceq = body.lower_free_vars(1, 1);
                    } else {
                        // the remaining statement depends on this premise's
                        // proof, which we are not building
                        return Ok(None);
                    }
                }
            }
        }
        let new_out = match &*ceq {
            Term::App(cs) if cs.len() == 4 && cs[0].const_name() == Some("eq") => cs[3].clone(),
            _ => return Ok(None),
        };
        if rule.is_permutation && !is_lt(&new_out, target, false) {
            return Ok(None);
        }
        let proof = if self.opts.proofs {
            Some(Term::app_vec(proof_args))
        } else {
            None
        };
        Ok(Some((new_out, proof)))
    }
}

fn mk_app_prefix(i: usize, children: &[Rc<Term>]) -> Rc<Term> {
    debug_assert!(i > 0);
    if i == 1 {
        children[0].clone()
    } else {
        Term::app_vec(children[..i].to_vec())
    }
}

fn pi_body_lowered(pi: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
    match &**pi {
        Term::Pi(_, _, body) => Ok(body.lower_free_vars(1, 1)),
        _ => Err(SimpError::Type(TypeError::ExpectedFunction(pi.clone()))),
    }
}

fn pi_body_at(pi: &Rc<Term>, a: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
    match &**pi {
        Term::Pi(_, _, body) => Ok(body.instantiate(a)),
        _ => Err(SimpError::Type(TypeError::ExpectedFunction(pi.clone()))),
    }
}

fn is_cast_app(e: &Rc<Term>) -> bool {
    e.args().len() == 5 && e.head().const_name() == Some("cast")
}

fn is_true_const(t: &Rc<Term>) -> bool {
    t.const_name() == Some("true")
}

fn is_evaluation_result(t: &Rc<Term>) -> bool {
    t.is_value() || matches!(t.const_name(), Some("true" | "false"))
}

/// `fun (x : A) => f ... x` where `x` occurs nowhere else.
fn is_eta_target(e: &Rc<Term>) -> bool {
    let body = match &**e {
        Term::Lam(_, _, body) => body,
        _ => return false,
    };
    let cs = match &**body {
        Term::App(cs) => cs,
        _ => return false,
    };
    matches!(&*cs[cs.len() - 1], Term::Var(0))
        && cs[..cs.len() - 1].iter().all(|a| !a.has_free_var(0))
}

/// Simplify `e` in `ctx`, returning the simplified term and a proof of
/// equality with the input (reflexivity when no step produced one).
pub fn simplify(
    e: &Rc<Term>,
    env: &Env,
    ctx: Context,
    opts: SimpOptions,
    rule_sets: &[RuleSet],
) -> Result<(Rc<Term>, Rc<Term>), SimpError> {
    Simplifier::new(env, opts, rule_sets.to_vec()).run(e, ctx)
}

/// Companion entry point resolving rule sets by name.
pub fn simplify_named(
    e: &Rc<Term>,
    env: &Env,
    ctx: Context,
    opts: SimpOptions,
    store: &RuleSetStore,
    names: &[&str],
) -> Result<(Rc<Term>, Rc<Term>), SimpError> {
    let mut sets = Vec::with_capacity(names.len());
    for name in names {
        match store.get(name) {
            Some(rs) => sets.push(rs.clone()),
            None => return Err(SimpError::UnknownRuleSet(name.to_string())),
        }
    }
    simplify(e, env, ctx, opts, &sets)
}
