//! Counting interpreter (C7)
//!
//! A dry run that wraps a `StatefulInterpreter` internally (for correct
//! stack simulation) and counts how many times each distinct pattern or
//! proved conclusion is constructed, keyed by a structural (blake3) hash.
//! [`memoizing::MemoizingInterpreter`] consumes the resulting reuse set to
//! decide where to splice in `Save`/`Load`.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::pattern::{MetaVarConditions, Pattern};

use super::{InterpError, Interpreter, Phase, StackItem, StatefulInterpreter};

/// Fixed-size digest used as a hash-map key, stable across process runs
/// (unlike `Hash`/`HashMap`'s randomized default) so memoization decisions
/// are reproducible. Grounded on the teacher's use of `blake3` for
/// transcript hashing in `transcript.rs`, repurposed here for content
/// addressing rather than Fiat-Shamir challenges.
type Digest = [u8; 32];

fn structural_hash(item: &StackItem) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hash_stack_item(&mut hasher, item);
    *hasher.finalize().as_bytes()
}

fn hash_stack_item(hasher: &mut blake3::Hasher, item: &StackItem) {
    match item {
        StackItem::Pattern(p) => {
            hasher.update(b"pattern");
            hash_pattern(hasher, p);
        }
        StackItem::Proved(p) => {
            hasher.update(b"proved");
            hash_pattern(hasher, p.conclusion());
        }
    }
}

fn hash_pattern(hasher: &mut blake3::Hasher, p: &Pattern) {
    match p {
        Pattern::EVar(id) => {
            hasher.update(b"evar");
            hasher.update(&id.to_le_bytes());
        }
        Pattern::SVar(id) => {
            hasher.update(b"svar");
            hasher.update(&id.to_le_bytes());
        }
        Pattern::Symbol(name) => {
            hasher.update(b"sym");
            hasher.update(name.as_bytes());
        }
        Pattern::Implies(l, r) => {
            hasher.update(b"implies(");
            hash_pattern(hasher, l);
            hasher.update(b",");
            hash_pattern(hasher, r);
            hasher.update(b")");
        }
        Pattern::App(l, r) => {
            hasher.update(b"app(");
            hash_pattern(hasher, l);
            hasher.update(b",");
            hash_pattern(hasher, r);
            hasher.update(b")");
        }
        Pattern::Exists(v, body) => {
            hasher.update(b"exists(");
            hasher.update(&v.to_le_bytes());
            hash_pattern(hasher, body);
            hasher.update(b")");
        }
        Pattern::Mu(v, body) => {
            hasher.update(b"mu(");
            hasher.update(&v.to_le_bytes());
            hash_pattern(hasher, body);
            hasher.update(b")");
        }
        Pattern::MetaVar(id, cond) => {
            hasher.update(b"meta(");
            hasher.update(&id.to_le_bytes());
            hash_conditions(hasher, cond);
            hasher.update(b")");
        }
        Pattern::ESubst { pattern, evar_id, plug } => {
            hasher.update(b"esubst(");
            hash_pattern(hasher, pattern);
            hasher.update(&evar_id.to_le_bytes());
            hash_pattern(hasher, plug);
            hasher.update(b")");
        }
        Pattern::SSubst { pattern, svar_id, plug } => {
            hasher.update(b"ssubst(");
            hash_pattern(hasher, pattern);
            hasher.update(&svar_id.to_le_bytes());
            hash_pattern(hasher, plug);
            hasher.update(b")");
        }
    }
}

fn hash_conditions(hasher: &mut blake3::Hasher, cond: &MetaVarConditions) {
    for set in [&cond.e_fresh, &cond.s_fresh, &cond.positive, &cond.negative, &cond.application_context] {
        for id in set {
            hasher.update(&id.to_le_bytes());
        }
        hasher.update(b"|");
    }
}

/// Wraps a `StatefulInterpreter` to simulate the run and tally occurrences.
#[derive(Debug, Default)]
pub struct CountingInterpreter {
    base: StatefulInterpreter,
    counts: HashMap<Digest, (u32, StackItem)>,
}

impl CountingInterpreter {
    pub fn new(phase: Phase) -> Self {
        CountingInterpreter { base: StatefulInterpreter::new(phase), counts: HashMap::new() }
    }

    pub fn with_claims(phase: Phase, claims: Vec<Pattern>) -> Self {
        CountingInterpreter { base: StatefulInterpreter::with_claims(phase, claims), counts: HashMap::new() }
    }

    fn tally(&mut self) {
        if let Some(top) = self.base.stack().last().cloned() {
            let hash = structural_hash(&top);
            self.counts.entry(hash).or_insert_with(|| (0, top)).0 += 1;
        }
    }

    /// Finish the dry run and return the set of structural hashes that
    /// occurred more than once — candidates for `Save`/`Load` memoization.
    pub fn finalize(self) -> ReuseSet {
        let reused = self.counts.into_iter().filter(|(_, (n, _))| *n > 1).map(|(h, _)| h).collect();
        ReuseSet { reused }
    }
}

/// The output of a counting pass: which structural hashes are worth
/// memoizing. Opaque on purpose — [`super::memoizing::MemoizingInterpreter`]
/// is the only intended consumer.
#[derive(Debug, Default, Clone)]
pub struct ReuseSet {
    reused: std::collections::HashSet<Digest>,
}

impl ReuseSet {
    pub fn should_memoize(&self, item: &StackItem) -> bool {
        self.reused.contains(&structural_hash(item))
    }

    pub fn hash_of(item: &StackItem) -> Digest {
        structural_hash(item)
    }
}

macro_rules! tallying_unary {
    ($name:ident) => {
        fn $name(&mut self) -> Result<(), InterpError> {
            self.base.$name()?;
            self.tally();
            Ok(())
        }
    };
}

macro_rules! tallying_with_id {
    ($name:ident) => {
        fn $name(&mut self, id: u32) -> Result<(), InterpError> {
            self.base.$name(id)?;
            self.tally();
            Ok(())
        }
    };
}

impl Interpreter for CountingInterpreter {
    tallying_with_id!(evar);
    tallying_with_id!(svar);

    fn symbol(&mut self, name: &str) -> Result<(), InterpError> {
        self.base.symbol(name)?;
        self.tally();
        Ok(())
    }

    tallying_unary!(implies);
    tallying_unary!(app);
    tallying_with_id!(exists);
    tallying_with_id!(mu);

    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError> {
        self.base.metavar(id, conditions)?;
        self.tally();
        Ok(())
    }

    tallying_with_id!(clean_metavar);
    tallying_with_id!(esubst);
    tallying_with_id!(ssubst);

    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        self.base.instantiate(meta_ids)?;
        self.tally();
        Ok(())
    }

    tallying_unary!(prop1);
    tallying_unary!(prop2);
    tallying_unary!(prop3);
    tallying_unary!(modus_ponens);
    tallying_unary!(exists_quantifier);
    tallying_with_id!(exists_generalization);

    fn pop(&mut self) -> Result<(), InterpError> {
        Interpreter::pop(&mut self.base)
    }

    fn save(&mut self) -> Result<usize, InterpError> {
        self.base.save()
    }

    fn load(&mut self, index: usize) -> Result<(), InterpError> {
        self.base.load(index)?;
        self.tally();
        Ok(())
    }

    fn publish_axiom(&mut self) -> Result<(), InterpError> {
        self.base.publish_axiom()
    }

    fn publish_claim(&mut self) -> Result<(), InterpError> {
        self.base.publish_claim()
    }

    fn publish_proof(&mut self) -> Result<(), InterpError> {
        self.base.publish_proof()
    }

    fn into_claim_phase(&mut self) -> Result<(), InterpError> {
        self.base.into_claim_phase()
    }

    fn into_proof_phase(&mut self) -> Result<(), InterpError> {
        self.base.into_proof_phase()
    }

    fn phase(&self) -> Phase {
        self.base.phase()
    }

    fn stack(&self) -> &[StackItem] {
        self.base.stack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_pattern_construction_is_tallied() {
        let mut interp = CountingInterpreter::new(Phase::Proof);
        interp.evar(4).unwrap();
        interp.pop().unwrap();
        interp.evar(4).unwrap();
        let reuse = interp.finalize();
        assert!(reuse.should_memoize(&StackItem::Pattern(Pattern::evar(4))));
    }

    #[test]
    fn singleton_construction_is_not_memoized() {
        let mut interp = CountingInterpreter::new(Phase::Proof);
        interp.evar(4).unwrap();
        let reuse = interp.finalize();
        assert!(!reuse.should_memoize(&StackItem::Pattern(Pattern::evar(9))));
    }
}
