//! Proof builders: thin adapters over the term library assembling
//! applications of the prelude's equality lemmas, instantiated at the
//! right universe levels, plus the transitive composition of results.

use crate::result::{ProofKind, SimpResult};
use crate::simplifier::{SimpError, Simplifier};
use kernel::ast::{reduce_level, Level, Term};
use kernel::checker;
use std::rc::Rc;

impl<'e> Simplifier<'e> {
    // ---- type-checker adapters -------------------------------------------

    pub(crate) fn infer_type(&self, e: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
        Ok(checker::infer_type(self.env, &self.ctx, e)?)
    }

    pub(crate) fn ensure_pi(&self, e: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
        Ok(checker::ensure_pi(self.env, e)?)
    }

    pub(crate) fn is_proposition(&self, e: &Rc<Term>) -> Result<bool, SimpError> {
        Ok(checker::is_proposition(self.env, &self.ctx, e)?)
    }

    pub(crate) fn is_convertible(&self, t1: &Rc<Term>, t2: &Rc<Term>) -> Result<bool, SimpError> {
        Ok(checker::is_convertible(self.env, t1, t2)?)
    }

    pub(crate) fn is_definitionally_equal(
        &self,
        t1: &Rc<Term>,
        t2: &Rc<Term>,
    ) -> Result<bool, SimpError> {
        Ok(checker::is_def_eq(self.env, t1, t2)?)
    }

    pub(crate) fn normalize(&self, e: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
        Ok(kernel::eval::normalize(self.env, e)?)
    }

    /// The level `u` with `ty : Sort u`.
    pub(crate) fn sort_level_of(&self, ty: &Rc<Term>) -> Result<Level, SimpError> {
        let s = checker::whnf(self.env, &checker::infer_type(self.env, &self.ctx, ty)?)?;
        match &*s {
            Term::Sort(l) => Ok(reduce_level(l.clone())),
            _ => Err(SimpError::Type(checker::TypeError::ExpectedSort(s))),
        }
    }

    /// The level of `body : Sort v` under the binder `(name : dom)`.
    pub(crate) fn sort_level_of_open(
        &self,
        name: &str,
        dom: &Rc<Term>,
        body: &Rc<Term>,
    ) -> Result<Level, SimpError> {
        let ctx = self.ctx.push(name, dom.clone());
        let s = checker::whnf(self.env, &checker::infer_type(self.env, &ctx, body)?)?;
        match &*s {
            Term::Sort(l) => Ok(reduce_level(l.clone())),
            _ => Err(SimpError::Type(checker::TypeError::ExpectedSort(s))),
        }
    }

    // ---- lemma applications ----------------------------------------------

    pub(crate) fn mk_refl_th(&self, ty: &Rc<Term>, a: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(ty)?;
        Ok(Term::apps(
            &Term::const_levels("refl", vec![u]),
            &[ty.clone(), a.clone()],
        ))
    }

    pub(crate) fn mk_hrefl_th(&self, ty: &Rc<Term>, a: &Rc<Term>) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(ty)?;
        Ok(Term::apps(
            &Term::const_levels("hrefl", vec![u]),
            &[ty.clone(), a.clone()],
        ))
    }

    pub(crate) fn mk_trans_th(
        &self,
        ty: &Rc<Term>,
        a: &Rc<Term>,
        b: &Rc<Term>,
        c: &Rc<Term>,
        h_ab: &Rc<Term>,
        h_bc: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(ty)?;
        Ok(Term::apps(
            &Term::const_levels("trans", vec![u]),
            &[
                ty.clone(),
                a.clone(),
                b.clone(),
                c.clone(),
                h_ab.clone(),
                h_bc.clone(),
            ],
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mk_htrans_th(
        &self,
        a_ty: &Rc<Term>,
        b_ty: &Rc<Term>,
        c_ty: &Rc<Term>,
        a: &Rc<Term>,
        b: &Rc<Term>,
        c: &Rc<Term>,
        h_ab: &Rc<Term>,
        h_bc: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(a_ty)?;
        Ok(Term::apps(
            &Term::const_levels("htrans", vec![u]),
            &[
                a_ty.clone(),
                b_ty.clone(),
                c_ty.clone(),
                a.clone(),
                b.clone(),
                c.clone(),
                h_ab.clone(),
                h_bc.clone(),
            ],
        ))
    }

    pub(crate) fn mk_to_eq_th(
        &self,
        ty: &Rc<Term>,
        a: &Rc<Term>,
        b: &Rc<Term>,
        h: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(ty)?;
        Ok(Term::apps(
            &Term::const_levels("to_eq", vec![u]),
            &[ty.clone(), a.clone(), b.clone(), h.clone()],
        ))
    }

    pub(crate) fn mk_to_heq_th(
        &self,
        ty: &Rc<Term>,
        a: &Rc<Term>,
        b: &Rc<Term>,
        h: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(ty)?;
        Ok(Term::apps(
            &Term::const_levels("to_heq", vec![u]),
            &[ty.clone(), a.clone(), b.clone(), h.clone()],
        ))
    }

    pub(crate) fn mk_eqt_elim_th(&self, p: &Rc<Term>, h: &Rc<Term>) -> Rc<Term> {
        Term::apps(&Term::constant("eqt_elim"), &[p.clone(), h.clone()])
    }

    /// Convert a proof `h : eq A a b` into `eq B a b` when `A` is
    /// convertible, but not definitionally equal, to `B`:
    /// `subst A a b (fun (x : A) => eq B a x) (refl B a) h`.
    pub(crate) fn translate_eq_proof(
        &self,
        a_ty: &Rc<Term>,
        a: &Rc<Term>,
        b: &Rc<Term>,
        h: &Rc<Term>,
        b_ty: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let u = self.sort_level_of(a_ty)?;
        let v = self.sort_level_of(b_ty)?;
        let motive = Term::lam(
            "x",
            a_ty.clone(),
            Term::apps(
                &Term::const_levels("eq", vec![v.clone()]),
                &[b_ty.shift(0, 1), a.shift(0, 1), Term::var(0)],
            ),
        );
        let refl_a = Term::apps(
            &Term::const_levels("refl", vec![v]),
            &[b_ty.clone(), a.clone()],
        );
        Ok(Term::apps(
            &Term::const_levels("subst", vec![u]),
            &[
                a_ty.clone(),
                a.clone(),
                b.clone(),
                motive,
                refl_a,
                h.clone(),
            ],
        ))
    }

    fn split_pi(&self, f_type: &Rc<Term>) -> Result<(String, Rc<Term>, Rc<Term>), SimpError> {
        match &**f_type {
            Term::Pi(n, dom, body) => Ok((n.clone(), dom.clone(), body.clone())),
            _ => Err(SimpError::Type(checker::TypeError::ExpectedFunction(
                f_type.clone(),
            ))),
        }
    }

    /// `congr1 A B f g a h : eq B (f a) (g a)`; `f_type` is an arrow.
    pub(crate) fn mk_congr1_th(
        &self,
        f_type: &Rc<Term>,
        f: &Rc<Term>,
        new_f: &Rc<Term>,
        a: &Rc<Term>,
        heq_f: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let (_, a_dom, body) = self.split_pi(f_type)?;
        let b_cod = body.lower_free_vars(1, 1);
        let u = self.sort_level_of(&a_dom)?;
        let v = self.sort_level_of(&b_cod)?;
        Ok(Term::apps(
            &Term::const_levels("congr1", vec![u, v]),
            &[
                a_dom,
                b_cod,
                f.clone(),
                new_f.clone(),
                a.clone(),
                heq_f.clone(),
            ],
        ))
    }

    /// `congr2 A B a a' f h : eq B (f a) (f a')`; `f_type` is an arrow.
    pub(crate) fn mk_congr2_th(
        &self,
        f_type: &Rc<Term>,
        a: &Rc<Term>,
        new_a: &Rc<Term>,
        f: &Rc<Term>,
        heq_a: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let (_, a_dom, body) = self.split_pi(f_type)?;
        let b_cod = body.lower_free_vars(1, 1);
        let a_type = self.infer_type(a)?;
        let mut heq_a = heq_a.clone();
        if !self.is_definitionally_equal(&a_dom, &a_type)? {
            heq_a = self.translate_eq_proof(&a_type, a, new_a, &heq_a, &a_dom)?;
        }
        let u = self.sort_level_of(&a_dom)?;
        let v = self.sort_level_of(&b_cod)?;
        Ok(Term::apps(
            &Term::const_levels("congr2", vec![u, v]),
            &[a_dom, b_cod, a.clone(), new_a.clone(), f.clone(), heq_a],
        ))
    }

    /// `congr A B f g a a' hf ha : eq B (f a) (g a')`; `f_type` is an arrow.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mk_congr_th(
        &self,
        f_type: &Rc<Term>,
        f: &Rc<Term>,
        new_f: &Rc<Term>,
        a: &Rc<Term>,
        new_a: &Rc<Term>,
        heq_f: &Rc<Term>,
        heq_a: &Rc<Term>,
    ) -> Result<Rc<Term>, SimpError> {
        let (_, a_dom, body) = self.split_pi(f_type)?;
        let b_cod = body.lower_free_vars(1, 1);
        let a_type = self.infer_type(a)?;
        let mut heq_a = heq_a.clone();
        if !self.is_definitionally_equal(&a_dom, &a_type)? {
            heq_a = self.translate_eq_proof(&a_type, a, new_a, &heq_a, &a_dom)?;
        }
        let u = self.sort_level_of(&a_dom)?;
        let v = self.sort_level_of(&b_cod)?;
        Ok(Term::apps(
            &Term::const_levels("congr", vec![u, v]),
            &[
                a_dom,
                b_cod,
                f.clone(),
                new_f.clone(),
                a.clone(),
                new_a.clone(),
                heq_f.clone(),
                heq_a,
            ],
        ))
    }

    /// Heterogeneous congruence. Returns `None` when the domains cannot be
    /// reconciled; the caller falls back to returning the subterm
    /// unchanged.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mk_hcongr_th(
        &self,
        f_type: &Rc<Term>,
        new_f_type: &Rc<Term>,
        f: &Rc<Term>,
        new_f: &Rc<Term>,
        a: &Rc<Term>,
        new_a: &Rc<Term>,
        heq_f: &Rc<Term>,
        heq_a: Rc<Term>,
        heq_a_is_heq: bool,
    ) -> Result<Option<Rc<Term>>, SimpError> {
        let (f_name, a_dom, f_body) = self.split_pi(f_type)?;
        let (nf_name, new_a_dom, nf_body) = self.split_pi(new_f_type)?;
        let a_type = self.infer_type(a)?;
        let new_a_type = self.infer_type(new_a)?;
        if !self.is_convertible(&new_a_type, &new_a_dom)? {
            return Ok(None);
        }
        let mut heq_a = heq_a;
        let mut heq_a_is_heq = heq_a_is_heq;
        if !self.is_definitionally_equal(&a_dom, &a_type)?
            || !self.is_definitionally_equal(&new_a_dom, &new_a_type)?
        {
            if heq_a_is_heq {
                if self.is_definitionally_equal(&a_type, &new_a_type)?
                    && self.is_definitionally_equal(&a_dom, &new_a_dom)?
                {
                    heq_a = self.mk_to_eq_th(&a_type, a, new_a, &heq_a)?;
                    heq_a_is_heq = false;
                } else {
                    return Ok(None);
                }
            }
            heq_a = self.translate_eq_proof(&a_type, a, new_a, &heq_a, &a_dom)?;
        }
        if !heq_a_is_heq {
            heq_a = self.mk_to_heq_th(&a_dom, a, new_a, &heq_a)?;
        }
        let u = self.sort_level_of(&a_dom)?;
        let v = self.sort_level_of_open(&f_name, &a_dom, &f_body)?;
        let b_fam = Term::lam(&f_name, a_dom.clone(), f_body);
        let new_b_fam = Term::lam(&nf_name, new_a_dom.clone(), nf_body);
        Ok(Some(Term::apps(
            &Term::const_levels("hcongr", vec![u, v]),
            &[
                a_dom,
                new_a_dom,
                b_fam,
                new_b_fam,
                f.clone(),
                new_f.clone(),
                a.clone(),
                new_a.clone(),
                heq_f.clone(),
                heq_a,
            ],
        )))
    }

    // ---- result composition ----------------------------------------------

    /// The proof carried by `rhs`, or reflexivity when the step was
    /// definitional.
    pub(crate) fn get_proof(&self, rhs: &SimpResult) -> Result<Rc<Term>, SimpError> {
        match &rhs.proof {
            Some(p) => Ok(p.clone()),
            None => {
                let ty = self.infer_type(&rhs.out)?;
                self.mk_refl_th(&ty, &rhs.out)
            }
        }
    }

    /// Given `a = b_res.out` (by `b_res`) and `b_res.out = c` (by `h_bc`),
    /// produce `a = c`.
    pub(crate) fn mk_trans_result(
        &self,
        a: &Rc<Term>,
        b_res: &SimpResult,
        c: &Rc<Term>,
        h_bc: Option<Rc<Term>>,
    ) -> Result<SimpResult, SimpError> {
        if !self.proofs_enabled() {
            return Ok(SimpResult::refl(c.clone()));
        }
        let h_bc = match h_bc {
            Some(h) => h,
            // the second leg was definitional
            None => {
                return Ok(SimpResult {
                    out: c.clone(),
                    proof: b_res.proof.clone(),
                    kind: b_res.kind,
                })
            }
        };
        match &b_res.proof {
            // the first leg was reflexivity
            None => Ok(SimpResult::proved(c.clone(), h_bc, ProofKind::Eq)),
            Some(h_ab) => {
                let b = &b_res.out;
                if b_res.is_heq() {
                    let a_ty = self.infer_type(a)?;
                    let b_ty = self.infer_type(b)?;
                    // b and c have the same type
                    let h_bc = self.mk_to_heq_th(&b_ty, b, c, &h_bc)?;
                    let pr = self.mk_htrans_th(&a_ty, &b_ty, &b_ty, a, b, c, h_ab, &h_bc)?;
                    Ok(SimpResult::proved(c.clone(), pr, ProofKind::Heq))
                } else {
                    let a_ty = self.infer_type(a)?;
                    let pr = self.mk_trans_th(&a_ty, a, b, c, h_ab, &h_bc)?;
                    Ok(SimpResult::proved(c.clone(), pr, ProofKind::Eq))
                }
            }
        }
    }

    /// Given `a = b_res.out` and `b_res.out = c_res.out`, produce
    /// `a = c_res.out`.
    pub(crate) fn mk_trans_result2(
        &self,
        a: &Rc<Term>,
        b_res: &SimpResult,
        c_res: SimpResult,
    ) -> Result<SimpResult, SimpError> {
        if !self.proofs_enabled() {
            return Ok(c_res);
        }
        let h_ab = match &b_res.proof {
            None => return Ok(c_res),
            Some(h) => h.clone(),
        };
        let h_bc = match &c_res.proof {
            None => {
                return Ok(SimpResult {
                    out: c_res.out,
                    proof: Some(h_ab),
                    kind: b_res.kind,
                })
            }
            Some(h) => h.clone(),
        };
        let b = &b_res.out;
        let c = &c_res.out;
        if b_res.is_heq() || c_res.is_heq() {
            let a_ty = self.infer_type(a)?;
            let b_ty = self.infer_type(b)?;
            let c_ty = self.infer_type(c)?;
            let h_ab = if b_res.is_heq() {
                h_ab
            } else {
                self.mk_to_heq_th(&a_ty, a, b, &h_ab)?
            };
            let h_bc = if c_res.is_heq() {
                h_bc
            } else {
                self.mk_to_heq_th(&b_ty, b, c, &h_bc)?
            };
            let pr = self.mk_htrans_th(&a_ty, &b_ty, &c_ty, a, b, c, &h_ab, &h_bc)?;
            Ok(SimpResult::proved(c.clone(), pr, ProofKind::Heq))
        } else {
            let a_ty = self.infer_type(a)?;
            let pr = self.mk_trans_th(&a_ty, a, b, c, &h_ab, &h_bc)?;
            Ok(SimpResult::proved(c.clone(), pr, ProofKind::Eq))
        }
    }

    /// Force `rhs` back to homogeneous equality via `to_eq`, when the
    /// endpoint types agree definitionally. Returns false when the caller
    /// should fall back to the default congruence path.
    pub(crate) fn ensure_homogeneous(
        &self,
        lhs: &Rc<Term>,
        rhs: &mut SimpResult,
    ) -> Result<bool, SimpError> {
        if !rhs.is_heq() {
            return Ok(true);
        }
        let proof = match &rhs.proof {
            Some(p) => p.clone(),
            None => {
                rhs.kind = ProofKind::Eq;
                return Ok(true);
            }
        };
        let lhs_ty = self.infer_type(lhs)?;
        let rhs_ty = self.infer_type(&rhs.out)?;
        if self.is_definitionally_equal(&lhs_ty, &rhs_ty)? {
            rhs.proof = Some(self.mk_to_eq_th(&lhs_ty, lhs, &rhs.out, &proof)?);
            rhs.kind = ProofKind::Eq;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
