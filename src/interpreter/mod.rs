//! Interpreter core (C3)
//!
//! The interpreter is an abstract stack machine: every op pops its inputs,
//! pushes its output, and optionally mutates the diagnostic channel. This
//! module defines the capability set (the [`Interpreter`] trait — one
//! method per instruction, mirroring the opcode enumeration in
//! [`crate::instruction`]) and [`StatefulInterpreter`], the base
//! implementation that performs the actual stack mutation with no I/O.
//!
//! Every other interpreter in this crate (serializing, pretty-printing,
//! counting, memoizing) is a decorator around a `StatefulInterpreter` or
//! around another `Interpreter`: the base performs the state mutation, the
//! wrapper performs the side effect, following the pre-/post-hook pattern
//! from SPEC_FULL.md §A and the teacher's scheduler phase discipline.

#![forbid(unsafe_code)]

pub mod counting;
pub mod deserialize;
pub mod memoizing;
pub mod pretty;
pub mod serializing;

use std::collections::BTreeMap;

use crate::pattern::{self, MetaVarConditions, Pattern, PatternError};
use crate::proved::Proved;

/// One of the three monotone execution phases (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Gamma,
    Claim,
    Proof,
}

/// An item on the interpreter's stack or in its memory table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackItem {
    Pattern(Pattern),
    Proved(Proved),
}

impl StackItem {
    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            StackItem::Pattern(p) => Some(p),
            StackItem::Proved(_) => None,
        }
    }

    pub fn as_proved(&self) -> Option<&Proved> {
        match self {
            StackItem::Proved(p) => Some(p),
            StackItem::Pattern(_) => None,
        }
    }

    /// The pattern this item stands for: a plain pattern, or a proved
    /// conclusion.
    pub fn pattern(&self) -> &Pattern {
        match self {
            StackItem::Pattern(p) => p,
            StackItem::Proved(p) => p.conclusion(),
        }
    }
}

/// The error taxonomy of §7: every fallible interpreter operation returns
/// one of these. There is no local recovery — a proof run is atomic.
#[derive(Debug, thiserror::Error)]
pub enum InterpError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("phase violation: {op} is not legal in phase {phase:?}")]
    PhaseViolation { op: &'static str, phase: Phase },
    #[error("claim mismatch: expected `{expected}`, derived `{actual}`")]
    ClaimMismatch { expected: String, actual: String },
    #[error("no claim left to publish against")]
    NoClaimExpected,
    #[error("metavariable {id} obligation violated: {reason}")]
    MetaObligation { id: u32, reason: &'static str },
    #[error("unknown variable or notation: {0}")]
    UnknownName(String),
    #[error("stack underflow: expected {expected} item(s)")]
    StackUnderflow { expected: usize },
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("unknown opcode byte {0}")]
    UnknownOpcode(u8),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The capability set every interpreter variant implements — one method per
/// instruction in [`crate::instruction::Instruction`], plus the generic
/// `pattern` builder used by proof-expression code to emit the op sequence
/// for an arbitrary [`Pattern`] value (spec §9 "dynamic dispatch" note).
pub trait Interpreter {
    fn evar(&mut self, id: u32) -> Result<(), InterpError>;
    fn svar(&mut self, id: u32) -> Result<(), InterpError>;
    fn symbol(&mut self, name: &str) -> Result<(), InterpError>;
    fn implies(&mut self) -> Result<(), InterpError>;
    fn app(&mut self) -> Result<(), InterpError>;
    fn exists(&mut self, var_id: u32) -> Result<(), InterpError>;
    fn mu(&mut self, var_id: u32) -> Result<(), InterpError>;
    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError>;
    fn clean_metavar(&mut self, id: u32) -> Result<(), InterpError>;
    fn esubst(&mut self, evar_id: u32) -> Result<(), InterpError>;
    fn ssubst(&mut self, svar_id: u32) -> Result<(), InterpError>;
    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError>;

    fn prop1(&mut self) -> Result<(), InterpError>;
    fn prop2(&mut self) -> Result<(), InterpError>;
    fn prop3(&mut self) -> Result<(), InterpError>;
    fn modus_ponens(&mut self) -> Result<(), InterpError>;
    fn exists_quantifier(&mut self) -> Result<(), InterpError>;
    fn exists_generalization(&mut self, var_id: u32) -> Result<(), InterpError>;

    fn pop(&mut self) -> Result<(), InterpError>;
    fn save(&mut self) -> Result<usize, InterpError>;
    fn load(&mut self, index: usize) -> Result<(), InterpError>;
    fn publish_axiom(&mut self) -> Result<(), InterpError>;
    fn publish_claim(&mut self) -> Result<(), InterpError>;
    fn publish_proof(&mut self) -> Result<(), InterpError>;

    fn into_claim_phase(&mut self) -> Result<(), InterpError>;
    fn into_proof_phase(&mut self) -> Result<(), InterpError>;

    fn phase(&self) -> Phase;
    fn stack(&self) -> &[StackItem];

    /// Emit the op sequence that constructs `p` node-by-node. The default
    /// walks the pattern recursively; [`memoizing::MemoizingInterpreter`]
    /// overrides this to short-circuit reusable sub-patterns with `Load`.
    fn pattern(&mut self, p: &Pattern) -> Result<(), InterpError> {
        push_pattern(self, p)
    }
}

/// Shared recursive-descent implementation of [`Interpreter::pattern`]'s
/// default, factored out so both the trait default and any wrapper that
/// wants to fall back to "just build it" can call the same code.
pub fn push_pattern<I: Interpreter + ?Sized>(interp: &mut I, p: &Pattern) -> Result<(), InterpError> {
    match p {
        Pattern::EVar(id) => interp.evar(*id),
        Pattern::SVar(id) => interp.svar(*id),
        Pattern::Symbol(name) => interp.symbol(name),
        Pattern::Implies(l, r) => {
            interp.pattern(l)?;
            interp.pattern(r)?;
            interp.implies()
        }
        Pattern::App(l, r) => {
            interp.pattern(l)?;
            interp.pattern(r)?;
            interp.app()
        }
        Pattern::Exists(v, body) => {
            interp.pattern(body)?;
            interp.exists(*v)
        }
        Pattern::Mu(v, body) => {
            interp.pattern(body)?;
            interp.mu(*v)
        }
        Pattern::MetaVar(id, cond) => {
            if *cond == MetaVarConditions::empty() {
                interp.clean_metavar(*id)
            } else {
                interp.metavar(*id, cond.clone())
            }
        }
        Pattern::ESubst { pattern, evar_id, plug } => {
            interp.pattern(pattern)?;
            interp.pattern(plug)?;
            interp.esubst(*evar_id)
        }
        Pattern::SSubst { pattern, svar_id, plug } => {
            interp.pattern(pattern)?;
            interp.pattern(plug)?;
            interp.ssubst(*svar_id)
        }
    }
}

/// Canonical bottom symbol used by `Prop3`'s negation encoding.
pub const BOT: &str = "\\bot";

/// The base interpreter: pure stack-machine state, no side effects. Every
/// decorator in this crate wraps one of these (directly, or indirectly
/// through another `Interpreter`).
#[derive(Debug, Default)]
pub struct StatefulInterpreter {
    phase: Phase,
    stack: Vec<StackItem>,
    memory: Vec<StackItem>,
    claims: Vec<Pattern>,
    safe_interpreting: bool,
    interpreting_warnings: Vec<String>,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Gamma
    }
}

impl StatefulInterpreter {
    pub fn new(phase: Phase) -> Self {
        StatefulInterpreter { phase, safe_interpreting: true, ..Default::default() }
    }

    /// Construct with safety checks disabled: meta-obligation violations
    /// are recorded as warnings instead of aborting the run (spec §7's
    /// "unsafe interpretation warning" row).
    pub fn new_unsafe(phase: Phase) -> Self {
        StatefulInterpreter { phase, safe_interpreting: false, ..Default::default() }
    }

    pub fn with_claims(phase: Phase, claims: Vec<Pattern>) -> Self {
        StatefulInterpreter { phase, claims, safe_interpreting: true, ..Default::default() }
    }

    pub fn warnings(&self) -> &[String] {
        &self.interpreting_warnings
    }

    pub fn memory(&self) -> &[StackItem] {
        &self.memory
    }

    fn push(&mut self, item: StackItem) {
        self.stack.push(item);
    }

    fn pop_item(&mut self) -> Result<StackItem, InterpError> {
        self.stack.pop().ok_or(InterpError::StackUnderflow { expected: 1 })
    }

    fn pop_pattern(&mut self) -> Result<Pattern, InterpError> {
        match self.pop_item()? {
            StackItem::Pattern(p) => Ok(p),
            StackItem::Proved(p) => Ok(p.conclusion().clone()),
        }
    }

    fn pop_proved(&mut self) -> Result<Proved, InterpError> {
        match self.pop_item()? {
            StackItem::Proved(p) => Ok(p),
            StackItem::Pattern(p) => {
                Err(InterpError::ShapeMismatch(format!("expected a Proved, found pattern {p}")))
            }
        }
    }

    fn check_phase(&self, op: &'static str, allowed: &[Phase]) -> Result<(), InterpError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(InterpError::PhaseViolation { op, phase: self.phase })
        }
    }

    fn record_warning(&mut self, message: String) {
        self.interpreting_warnings.push(message);
    }

    /// Check (or, if unsafe, merely warn about) the side conditions a
    /// `MetaVar(id, conditions)` declares, against a candidate plug.
    fn check_obligations(
        &mut self,
        id: u32,
        conditions: &MetaVarConditions,
        plug: &Pattern,
    ) -> Result<(), InterpError> {
        let violation = conditions
            .e_fresh
            .iter()
            .find(|v| pattern::free_evars(plug).contains(v))
            .map(|_| "e_fresh: plug mentions a variable required fresh")
            .or_else(|| {
                conditions
                    .positive
                    .iter()
                    .find(|v| !pattern::occurs_only_positively(plug, **v))
                    .map(|_| "positive: plug does not occur only positively")
            })
            .or_else(|| {
                conditions
                    .negative
                    .iter()
                    .find(|v| !pattern::occurs_only_negatively(plug, **v))
                    .map(|_| "negative: plug does not occur only negatively")
            })
            .or_else(|| {
                conditions
                    .application_context
                    .iter()
                    .find(|v| !pattern::is_application_context(plug, **v))
                    .map(|_| "application_context: plug is not an application context")
            });

        match (violation, self.safe_interpreting) {
            (None, _) => Ok(()),
            (Some(reason), true) => Err(InterpError::MetaObligation { id, reason }),
            (Some(reason), false) => {
                self.record_warning(format!("meta {id} obligation ignored ({reason})"));
                Ok(())
            }
        }
    }

    fn find_conditions<'a>(pattern: &'a Pattern, id: u32) -> Option<&'a MetaVarConditions> {
        match pattern {
            Pattern::MetaVar(k, cond) if *k == id => Some(cond),
            Pattern::Implies(l, r) | Pattern::App(l, r) => {
                Self::find_conditions(l, id).or_else(|| Self::find_conditions(r, id))
            }
            Pattern::Exists(_, body) | Pattern::Mu(_, body) => Self::find_conditions(body, id),
            Pattern::ESubst { pattern, plug, .. } | Pattern::SSubst { pattern, plug, .. } => {
                Self::find_conditions(pattern, id).or_else(|| Self::find_conditions(plug, id))
            }
            _ => None,
        }
    }

    fn do_instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        let target = self.pop_item()?;
        let mut delta = BTreeMap::new();
        let mut plugs = Vec::with_capacity(meta_ids.len());
        for _ in meta_ids {
            plugs.push(self.pop_pattern()?);
        }
        for (id, plug) in meta_ids.iter().zip(plugs.into_iter()) {
            if let Some(conditions) = Self::find_conditions(target.pattern(), *id) {
                self.check_obligations(*id, &conditions.clone(), &plug)?;
            }
            delta.insert(*id, plug);
        }
        match target {
            StackItem::Pattern(p) => self.push(StackItem::Pattern(p.instantiate(&delta))),
            StackItem::Proved(p) => {
                self.push(StackItem::Proved(Proved::new(p.conclusion().instantiate(&delta))))
            }
        }
        Ok(())
    }
}

impl Interpreter for StatefulInterpreter {
    fn evar(&mut self, id: u32) -> Result<(), InterpError> {
        self.push(StackItem::Pattern(Pattern::evar(id)));
        Ok(())
    }

    fn svar(&mut self, id: u32) -> Result<(), InterpError> {
        self.push(StackItem::Pattern(Pattern::svar(id)));
        Ok(())
    }

    fn symbol(&mut self, name: &str) -> Result<(), InterpError> {
        self.push(StackItem::Pattern(Pattern::symbol(name)));
        Ok(())
    }

    fn implies(&mut self) -> Result<(), InterpError> {
        let right = self.pop_pattern()?;
        let left = self.pop_pattern()?;
        self.push(StackItem::Pattern(Pattern::implies(left, right)));
        Ok(())
    }

    fn app(&mut self) -> Result<(), InterpError> {
        let right = self.pop_pattern()?;
        let left = self.pop_pattern()?;
        self.push(StackItem::Pattern(Pattern::app(left, right)));
        Ok(())
    }

    fn exists(&mut self, var_id: u32) -> Result<(), InterpError> {
        let body = self.pop_pattern()?;
        self.push(StackItem::Pattern(Pattern::exists(var_id, body)));
        Ok(())
    }

    fn mu(&mut self, var_id: u32) -> Result<(), InterpError> {
        let body = self.pop_pattern()?;
        let p = Pattern::mu(var_id, body)?;
        self.push(StackItem::Pattern(p));
        Ok(())
    }

    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError> {
        self.push(StackItem::Pattern(Pattern::metavar(id, conditions)));
        Ok(())
    }

    fn clean_metavar(&mut self, id: u32) -> Result<(), InterpError> {
        self.push(StackItem::Pattern(Pattern::clean_metavar(id)));
        Ok(())
    }

    fn esubst(&mut self, evar_id: u32) -> Result<(), InterpError> {
        let plug = self.pop_pattern()?;
        let pattern = self.pop_pattern()?;
        self.push(StackItem::Pattern(Pattern::esubst(pattern, evar_id, plug)));
        Ok(())
    }

    fn ssubst(&mut self, svar_id: u32) -> Result<(), InterpError> {
        let plug = self.pop_pattern()?;
        let pattern = self.pop_pattern()?;
        self.push(StackItem::Pattern(Pattern::ssubst(pattern, svar_id, plug)));
        Ok(())
    }

    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        self.do_instantiate(meta_ids)
    }

    fn prop1(&mut self) -> Result<(), InterpError> {
        self.check_phase("Prop1", &[Phase::Gamma, Phase::Proof])?;
        let phi0 = Pattern::clean_metavar(0);
        let phi1 = Pattern::clean_metavar(1);
        let p = Pattern::implies(phi0.clone(), Pattern::implies(phi1, phi0));
        self.push(StackItem::Proved(Proved::new(p)));
        Ok(())
    }

    fn prop2(&mut self) -> Result<(), InterpError> {
        self.check_phase("Prop2", &[Phase::Gamma, Phase::Proof])?;
        let phi0 = Pattern::clean_metavar(0);
        let phi1 = Pattern::clean_metavar(1);
        let phi2 = Pattern::clean_metavar(2);
        let inner = Pattern::implies(phi0.clone(), Pattern::implies(phi1.clone(), phi2.clone()));
        let outer = Pattern::implies(
            Pattern::implies(phi0.clone(), phi1),
            Pattern::implies(phi0, phi2),
        );
        self.push(StackItem::Proved(Proved::new(Pattern::implies(inner, outer))));
        Ok(())
    }

    fn prop3(&mut self) -> Result<(), InterpError> {
        self.check_phase("Prop3", &[Phase::Gamma, Phase::Proof])?;
        let phi0 = Pattern::clean_metavar(0);
        let bot = Pattern::symbol(BOT);
        let not_not_phi0 = Pattern::implies(Pattern::implies(phi0.clone(), bot.clone()), bot);
        self.push(StackItem::Proved(Proved::new(Pattern::implies(not_not_phi0, phi0))));
        Ok(())
    }

    fn modus_ponens(&mut self) -> Result<(), InterpError> {
        self.check_phase("ModusPonens", &[Phase::Gamma, Phase::Proof])?;
        let proof_of_a = self.pop_proved()?;
        let proof_of_a_implies_b = self.pop_proved()?;
        let (antecedent, consequent) = proof_of_a_implies_b.conclusion().as_implies()?;
        if antecedent != proof_of_a.conclusion() {
            return Err(InterpError::ShapeMismatch(format!(
                "ModusPonens: antecedent `{antecedent}` does not match `{}`",
                proof_of_a.conclusion()
            )));
        }
        self.push(StackItem::Proved(Proved::new(consequent.clone())));
        Ok(())
    }

    fn exists_quantifier(&mut self) -> Result<(), InterpError> {
        self.check_phase("Quantifier", &[Phase::Gamma, Phase::Proof])?;
        let phi0 = Pattern::clean_metavar(0);
        let bound = 0u32;
        let free = 1u32;
        let substituted = Pattern::esubst(phi0.clone(), bound, Pattern::evar(free));
        let p = Pattern::implies(substituted, Pattern::exists(bound, phi0));
        self.push(StackItem::Proved(Proved::new(p)));
        Ok(())
    }

    fn exists_generalization(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.check_phase("Generalization", &[Phase::Gamma, Phase::Proof])?;
        let proof_of_a_implies_b = self.pop_proved()?;
        let (a, b) = proof_of_a_implies_b.conclusion().as_implies()?;
        if pattern::free_evars(b).contains(&var_id) {
            return Err(InterpError::ShapeMismatch(format!(
                "ExistsGeneralization: x{var_id} occurs free in `{b}`"
            )));
        }
        let p = Pattern::implies(Pattern::exists(var_id, a.clone()), b.clone());
        self.push(StackItem::Proved(Proved::new(p)));
        Ok(())
    }

    fn pop(&mut self) -> Result<(), InterpError> {
        self.pop_item()?;
        Ok(())
    }

    fn save(&mut self) -> Result<usize, InterpError> {
        let top = self.stack.last().ok_or(InterpError::StackUnderflow { expected: 1 })?.clone();
        self.memory.push(top);
        Ok(self.memory.len() - 1)
    }

    fn load(&mut self, index: usize) -> Result<(), InterpError> {
        let item = self
            .memory
            .get(index)
            .cloned()
            .ok_or_else(|| InterpError::UnknownName(format!("memory index {index}")))?;
        self.push(item);
        Ok(())
    }

    fn publish_axiom(&mut self) -> Result<(), InterpError> {
        self.check_phase("PublishAxiom", &[Phase::Gamma])?;
        // Nothing further to record here beyond the phase check: the axiom
        // pattern stays on the stack for downstream `Save`/use, matching
        // the reference's `publish_axiom` which writes and leaves it live.
        Ok(())
    }

    fn publish_claim(&mut self) -> Result<(), InterpError> {
        self.check_phase("PublishClaim", &[Phase::Claim])?;
        let top = self.stack.last().ok_or(InterpError::StackUnderflow { expected: 1 })?;
        self.claims.push(top.pattern().clone());
        Ok(())
    }

    fn publish_proof(&mut self) -> Result<(), InterpError> {
        self.check_phase("PublishProof", &[Phase::Proof])?;
        let proved = self.pop_proved()?;
        let expected = self.claims.pop().ok_or(InterpError::NoClaimExpected)?;
        if *proved.conclusion() != expected {
            return Err(InterpError::ClaimMismatch {
                expected: expected.to_string(),
                actual: proved.conclusion().to_string(),
            });
        }
        Ok(())
    }

    fn into_claim_phase(&mut self) -> Result<(), InterpError> {
        self.check_phase("into_claim_phase", &[Phase::Gamma])?;
        self.phase = Phase::Claim;
        Ok(())
    }

    fn into_proof_phase(&mut self) -> Result<(), InterpError> {
        self.check_phase("into_proof_phase", &[Phase::Claim])?;
        self.phase = Phase::Proof;
        Ok(())
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn stack(&self) -> &[StackItem] {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_pop_after_prop1_leaves_stack_empty() {
        let mut interp = StatefulInterpreter::new(Phase::Proof);
        interp.prop1().unwrap();
        Interpreter::pop(&mut interp).unwrap();
        assert!(interp.stack().is_empty());
    }

    #[test]
    fn modus_ponens_requires_matching_antecedent() {
        let mut interp = StatefulInterpreter::new(Phase::Proof);
        interp.prop1().unwrap(); // phi0 -> (phi1 -> phi0)
        interp.prop2().unwrap(); // unrelated Proved, wrong shape as "a"
        assert!(matches!(interp.modus_ponens(), Err(InterpError::ShapeMismatch(_))));
    }

    #[test]
    fn publish_proof_checks_claim_shape() {
        let claim = Pattern::implies(Pattern::clean_metavar(5), Pattern::clean_metavar(5));
        let mut interp = StatefulInterpreter::with_claims(Phase::Proof, vec![claim]);
        interp.prop1().unwrap();
        assert!(matches!(interp.publish_proof(), Err(InterpError::ClaimMismatch { .. })));
    }

    #[test]
    fn phase_transitions_are_one_way() {
        let mut interp = StatefulInterpreter::new(Phase::Gamma);
        interp.into_claim_phase().unwrap();
        assert_eq!(interp.phase(), Phase::Claim);
        assert!(matches!(interp.into_claim_phase(), Err(InterpError::PhaseViolation { .. })));
        interp.into_proof_phase().unwrap();
        assert_eq!(interp.phase(), Phase::Proof);
    }

    #[test]
    fn prop_rules_rejected_in_claim_phase() {
        let mut interp = StatefulInterpreter::new(Phase::Gamma);
        interp.into_claim_phase().unwrap();
        assert!(matches!(interp.prop1(), Err(InterpError::PhaseViolation { .. })));
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut interp = StatefulInterpreter::new(Phase::Proof);
        interp.evar(3).unwrap();
        let idx = Interpreter::save(&mut interp).unwrap();
        Interpreter::pop(&mut interp).unwrap();
        assert!(interp.stack().is_empty());
        interp.load(idx).unwrap();
        assert_eq!(interp.stack()[0], StackItem::Pattern(Pattern::evar(3)));
    }
}
