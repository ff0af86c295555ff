//! Proof-expression builder (C9)
//!
//! A thunk-based layer above the raw [`Interpreter`] capability set: each
//! [`ProofThunk`] pairs a `conclusion` computed purely from [`Pattern`]
//! operations with a `build` closure that replays the matching interpreter
//! ops. Running a thunk asserts the interpreter actually arrived at the
//! claimed conclusion, catching mis-wired combinators immediately rather
//! than downstream at `PublishProof`.
//!
//! [`ProofExp`] aggregates axioms, notations, claims, proof expressions and
//! submodules and drives the three-phase `execute_full` sequence described
//! in spec §4.9.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::interpreter::{InterpError, Interpreter};
use crate::pattern::Pattern;
use crate::proved::Proved;

/// A claim: the pattern a proof expression is required to derive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim(Pattern);

impl Claim {
    pub fn new(pattern: Pattern) -> Self {
        Claim(pattern)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.0
    }
}

type BuildFn<'a> = Box<dyn FnOnce(&mut dyn Interpreter) -> Result<(), InterpError> + 'a>;

/// A lazily-built proof step: `build` drives the interpreter, `conclusion`
/// is the pattern that build is expected to leave on top of the stack as a
/// `Proved`. The two are computed independently (conclusion via pure
/// `Pattern` arithmetic, build via interpreter ops) so that `invoke`'s
/// equality check is a real cross-check, not a tautology.
pub struct ProofThunk<'a> {
    conclusion: Pattern,
    build: BuildFn<'a>,
}

impl<'a> ProofThunk<'a> {
    pub fn new(conclusion: Pattern, build: impl FnOnce(&mut dyn Interpreter) -> Result<(), InterpError> + 'a) -> Self {
        ProofThunk { conclusion, build: Box::new(build) }
    }

    pub fn conclusion(&self) -> &Pattern {
        &self.conclusion
    }

    /// Run `build` against `interp`, then assert the resulting stack top is
    /// a `Proved` whose conclusion equals this thunk's stated conclusion.
    pub fn invoke(self, interp: &mut dyn Interpreter) -> Result<Proved, InterpError> {
        let ProofThunk { conclusion, build } = self;
        build(interp)?;
        let actual = interp
            .stack()
            .last()
            .and_then(|item| item.as_proved())
            .cloned()
            .ok_or_else(|| InterpError::ShapeMismatch("proof thunk did not leave a Proved on the stack".to_string()))?;
        if *actual.conclusion() != conclusion {
            return Err(InterpError::ClaimMismatch {
                expected: conclusion.to_string(),
                actual: actual.conclusion().to_string(),
            });
        }
        Ok(actual)
    }
}

/// `prop1 : phi0 -> (phi1 -> phi0)`.
pub fn prop1<'a>() -> ProofThunk<'a> {
    let phi0 = Pattern::clean_metavar(0);
    let phi1 = Pattern::clean_metavar(1);
    let conclusion = Pattern::implies(phi0.clone(), Pattern::implies(phi1, phi0));
    ProofThunk::new(conclusion, |interp| interp.prop1())
}

/// `prop2 : (phi0 -> (phi1 -> phi2)) -> ((phi0 -> phi1) -> (phi0 -> phi2))`.
pub fn prop2<'a>() -> ProofThunk<'a> {
    let phi0 = Pattern::clean_metavar(0);
    let phi1 = Pattern::clean_metavar(1);
    let phi2 = Pattern::clean_metavar(2);
    let inner = Pattern::implies(phi0.clone(), Pattern::implies(phi1.clone(), phi2.clone()));
    let outer = Pattern::implies(Pattern::implies(phi0.clone(), phi1), Pattern::implies(phi0, phi2));
    let conclusion = Pattern::implies(inner, outer);
    ProofThunk::new(conclusion, |interp| interp.prop2())
}

/// `prop3 : ~(~phi0) -> phi0`.
pub fn prop3<'a>() -> ProofThunk<'a> {
    let phi0 = Pattern::clean_metavar(0);
    let bot = Pattern::symbol(crate::interpreter::BOT);
    let not_not_phi0 = Pattern::implies(Pattern::implies(phi0.clone(), bot.clone()), bot);
    let conclusion = Pattern::implies(not_not_phi0, phi0);
    ProofThunk::new(conclusion, |interp| interp.prop3())
}

/// `modus_ponens(implication, antecedent)`: pushes `implication` then
/// `antecedent` (so the interpreter's pop order — antecedent first, off the
/// top — lines up), then calls the primitive op.
pub fn modus_ponens<'a>(implication: ProofThunk<'a>, antecedent: ProofThunk<'a>) -> Result<ProofThunk<'a>, InterpError> {
    let (left, right) = implication.conclusion().as_implies()?;
    if *left != *antecedent.conclusion() {
        return Err(InterpError::ShapeMismatch(format!(
            "modus_ponens: antecedent `{}` does not match implication's left side `{left}`",
            antecedent.conclusion()
        )));
    }
    let conclusion = right.clone();
    let build = move |interp: &mut dyn Interpreter| -> Result<(), InterpError> {
        implication.invoke(interp)?;
        antecedent.invoke(interp)?;
        interp.modus_ponens()
    };
    Ok(ProofThunk::new(conclusion, build))
}

/// `exists_quantifier : phi0[x/0] -> (exists 0. phi0)`, the primitive
/// existence axiom schema.
pub fn exists_quantifier<'a>() -> ProofThunk<'a> {
    let phi0 = Pattern::clean_metavar(0);
    let substituted = Pattern::esubst(phi0.clone(), 0, Pattern::evar(1));
    let conclusion = Pattern::implies(substituted, Pattern::exists(0, phi0));
    ProofThunk::new(conclusion, |interp| interp.exists_quantifier())
}

/// `exists_generalization(pf, var)`: from `pf : a -> b` with `var` not free
/// in `b`, derive `(exists var. a) -> b`.
pub fn exists_generalization<'a>(pf: ProofThunk<'a>, var_id: u32) -> Result<ProofThunk<'a>, InterpError> {
    let (a, b) = pf.conclusion().as_implies()?;
    if crate::pattern::free_evars(b).contains(&var_id) {
        return Err(InterpError::ShapeMismatch(format!("exists_generalization: x{var_id} occurs free in `{b}`")));
    }
    let conclusion = Pattern::implies(Pattern::exists(var_id, a.clone()), b.clone());
    let build = move |interp: &mut dyn Interpreter| -> Result<(), InterpError> {
        pf.invoke(interp)?;
        interp.exists_generalization(var_id)
    };
    Ok(ProofThunk::new(conclusion, build))
}

/// `instantiate(target, delta)`: pushes each plug in ascending meta-id
/// order, then `target` itself (so it ends up on top, since `Instantiate`
/// pops its target first), then calls `Instantiate` with the ids in
/// descending order — the id whose plug landed closest to the target
/// (the most recently pushed one) must come first, since `Instantiate`
/// pops plugs top-down after the target.
pub fn instantiate<'a>(target: ProofThunk<'a>, delta: BTreeMap<u32, Pattern>) -> ProofThunk<'a> {
    let conclusion = target.conclusion().instantiate(&delta);
    let build = move |interp: &mut dyn Interpreter| -> Result<(), InterpError> {
        for plug in delta.values() {
            interp.pattern(plug)?;
        }
        target.invoke(interp)?;
        let ids: Vec<u32> = delta.keys().rev().copied().collect();
        interp.instantiate(&ids)
    };
    ProofThunk::new(conclusion, build)
}

/// Alias for [`instantiate`]: the reference's `dynamic_inst` additionally
/// lifts plug patterns through the interpreter so they participate in
/// memoization, which is exactly what `instantiate`'s `interp.pattern(plug)`
/// call already does.
pub fn dynamic_inst<'a>(target: ProofThunk<'a>, delta: BTreeMap<u32, Pattern>) -> ProofThunk<'a> {
    instantiate(target, delta)
}

/// `load_axiom(p)`: emit a `Load` for a previously `Save`d axiom instead of
/// rebuilding it. `index` is the memory slot the axiom was saved at.
pub fn load_axiom<'a>(conclusion: Pattern, index: usize) -> ProofThunk<'a> {
    ProofThunk::new(conclusion, move |interp| interp.load(index))
}

/// A builder aggregating the axioms, notations, claims and proof
/// expressions of one proof module, plus imported submodules.
#[derive(Default)]
pub struct ProofExp<'a> {
    pub axioms: Vec<Pattern>,
    pub notations: Vec<(Pattern, String)>,
    pub claims: Vec<Claim>,
    pub proof_expressions: Vec<ProofThunk<'a>>,
    pub submodules: Vec<ProofExp<'a>>,
}

impl<'a> ProofExp<'a> {
    pub fn new() -> Self {
        ProofExp::default()
    }

    fn publish_axioms(&self, interp: &mut dyn Interpreter) -> Result<(), InterpError> {
        for sub in &self.submodules {
            sub.publish_axioms(interp)?;
        }
        for axiom in &self.axioms {
            interp.pattern(axiom)?;
            interp.publish_axiom()?;
        }
        Ok(())
    }

    /// Run the full Γ → Claim → Proof sequence (spec §4.9) and return the
    /// proved conclusions, in proof-expression order.
    pub fn execute_full(self, interp: &mut dyn Interpreter) -> Result<Vec<Proved>, InterpError> {
        self.publish_axioms(interp)?;
        interp.into_claim_phase()?;

        for claim in self.claims.iter().rev() {
            interp.pattern(claim.pattern())?;
            interp.publish_claim()?;
        }
        interp.into_proof_phase()?;

        let mut proved = Vec::with_capacity(self.proof_expressions.len());
        for thunk in self.proof_expressions {
            let result = thunk.invoke(interp)?;
            interp.publish_proof()?;
            proved.push(result);
        }
        Ok(proved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Phase, StatefulInterpreter};

    #[test]
    fn modus_ponens_rejects_mismatched_antecedent() {
        assert!(modus_ponens(prop1(), prop2()).is_err());
    }

    #[test]
    fn simple_module_executes_through_all_three_phases() {
        let phi0 = Pattern::clean_metavar(0);
        let claim = Claim::new(Pattern::implies(phi0.clone(), Pattern::implies(Pattern::clean_metavar(1), phi0)));
        let module = ProofExp {
            axioms: vec![],
            notations: vec![],
            claims: vec![claim],
            proof_expressions: vec![prop1()],
            submodules: vec![],
        };
        let mut interp = StatefulInterpreter::new(Phase::Gamma);
        let proved = module.execute_full(&mut interp).unwrap();
        assert_eq!(proved.len(), 1);
    }
}
