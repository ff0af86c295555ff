//! Memoizing interpreter (C8)
//!
//! Wraps another `Interpreter` and overrides [`Interpreter::pattern`]: on
//! the first occurrence of a pattern the [`counting::ReuseSet`] marks as
//! reused, builds it normally then `Save`s it; on every later occurrence,
//! emits a `Load` instead of rebuilding it. Proof-rule calls (`prop1`,
//! `modus_ponens`, ...) still run through to the wrapped interpreter
//! unchanged — only pattern construction is memoized, matching spec §9's
//! "dynamic dispatch" note that the memoizer only intercepts tree-shaped
//! pattern pushes, not derivation steps.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::pattern::{MetaVarConditions, Pattern};

use super::counting::ReuseSet;
use super::{push_pattern, InterpError, Interpreter, Phase, StackItem};

/// Digest used to key already-`Save`d slots, matching `counting::Digest`'s
/// shape without exposing that module's private alias.
type Digest = [u8; 32];

fn digest_of_pattern(p: &Pattern) -> Digest {
    ReuseSet::hash_of(&StackItem::Pattern(p.clone()))
}

pub struct MemoizingInterpreter<I: Interpreter> {
    inner: I,
    reuse: ReuseSet,
    memory_slots: HashMap<Digest, usize>,
}

impl<I: Interpreter> MemoizingInterpreter<I> {
    pub fn new(inner: I, reuse: ReuseSet) -> Self {
        MemoizingInterpreter { inner, reuse, memory_slots: HashMap::new() }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }

    fn build_and_save(&mut self, p: &Pattern) -> Result<(), InterpError> {
        push_pattern(self, p)?;
        let index = self.inner.save()?;
        self.memory_slots.insert(digest_of_pattern(p), index);
        Ok(())
    }
}

impl<I: Interpreter> Interpreter for MemoizingInterpreter<I> {
    fn evar(&mut self, id: u32) -> Result<(), InterpError> {
        self.inner.evar(id)
    }

    fn svar(&mut self, id: u32) -> Result<(), InterpError> {
        self.inner.svar(id)
    }

    fn symbol(&mut self, name: &str) -> Result<(), InterpError> {
        self.inner.symbol(name)
    }

    fn implies(&mut self) -> Result<(), InterpError> {
        self.inner.implies()
    }

    fn app(&mut self) -> Result<(), InterpError> {
        self.inner.app()
    }

    fn exists(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.inner.exists(var_id)
    }

    fn mu(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.inner.mu(var_id)
    }

    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError> {
        self.inner.metavar(id, conditions)
    }

    fn clean_metavar(&mut self, id: u32) -> Result<(), InterpError> {
        self.inner.clean_metavar(id)
    }

    fn esubst(&mut self, evar_id: u32) -> Result<(), InterpError> {
        self.inner.esubst(evar_id)
    }

    fn ssubst(&mut self, svar_id: u32) -> Result<(), InterpError> {
        self.inner.ssubst(svar_id)
    }

    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        self.inner.instantiate(meta_ids)
    }

    fn prop1(&mut self) -> Result<(), InterpError> {
        self.inner.prop1()
    }

    fn prop2(&mut self) -> Result<(), InterpError> {
        self.inner.prop2()
    }

    fn prop3(&mut self) -> Result<(), InterpError> {
        self.inner.prop3()
    }

    fn modus_ponens(&mut self) -> Result<(), InterpError> {
        self.inner.modus_ponens()
    }

    fn exists_quantifier(&mut self) -> Result<(), InterpError> {
        self.inner.exists_quantifier()
    }

    fn exists_generalization(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.inner.exists_generalization(var_id)
    }

    fn pop(&mut self) -> Result<(), InterpError> {
        Interpreter::pop(&mut self.inner)
    }

    fn save(&mut self) -> Result<usize, InterpError> {
        self.inner.save()
    }

    fn load(&mut self, index: usize) -> Result<(), InterpError> {
        self.inner.load(index)
    }

    fn publish_axiom(&mut self) -> Result<(), InterpError> {
        self.inner.publish_axiom()
    }

    fn publish_claim(&mut self) -> Result<(), InterpError> {
        self.inner.publish_claim()
    }

    fn publish_proof(&mut self) -> Result<(), InterpError> {
        self.inner.publish_proof()
    }

    fn into_claim_phase(&mut self) -> Result<(), InterpError> {
        self.inner.into_claim_phase()
    }

    fn into_proof_phase(&mut self) -> Result<(), InterpError> {
        self.inner.into_proof_phase()
    }

    fn phase(&self) -> Phase {
        self.inner.phase()
    }

    fn stack(&self) -> &[StackItem] {
        self.inner.stack()
    }

    fn pattern(&mut self, p: &Pattern) -> Result<(), InterpError> {
        if !self.reuse.should_memoize(&StackItem::Pattern(p.clone())) {
            return push_pattern(self, p);
        }
        let digest = digest_of_pattern(p);
        match self.memory_slots.get(&digest) {
            Some(&index) => self.inner.load(index),
            None => self.build_and_save(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::interpreter::counting::CountingInterpreter;
    use crate::interpreter::serializing::SerializingInterpreter;

    #[test]
    fn second_occurrence_loads_instead_of_rebuilding() {
        let shared = Pattern::implies(Pattern::evar(1), Pattern::evar(1));
        let whole = Pattern::implies(shared.clone(), shared);

        let mut counter = CountingInterpreter::new(Phase::Proof);
        push_pattern(&mut counter, &whole).unwrap();
        let reuse = counter.finalize();

        let mut memo = MemoizingInterpreter::new(SerializingInterpreter::new(Phase::Proof), reuse);
        memo.pattern(&whole).unwrap();
        let (_, _, proof) = memo.into_inner().into_streams();
        assert!(proof.contains(&Instruction::Load.as_byte()));
        assert!(proof.contains(&Instruction::Save.as_byte()));
    }

    #[test]
    fn non_repeated_pattern_is_never_saved() {
        let whole = Pattern::implies(Pattern::evar(1), Pattern::evar(2));
        let mut counter = CountingInterpreter::new(Phase::Proof);
        push_pattern(&mut counter, &whole).unwrap();
        let reuse = counter.finalize();

        let mut memo = MemoizingInterpreter::new(SerializingInterpreter::new(Phase::Proof), reuse);
        memo.pattern(&whole).unwrap();
        let (_, _, proof) = memo.into_inner().into_streams();
        assert!(!proof.contains(&Instruction::Save.as_byte()));
    }
}
