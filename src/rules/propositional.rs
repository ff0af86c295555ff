//! Propositional-logic lemmas built from the primitive proof rules.
//!
//! `imp_refl` is the canonical worked example of spec §8 invariant 6: its
//! exact op sequence (and therefore its exact emitted byte sequence) is
//! pinned down by the conformance test below.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::pattern::Pattern;
use crate::proof_expr::{instantiate, modus_ponens, prop1, prop2, Claim, ProofExp, ProofThunk};

/// Derives `phi0 -> phi0` from `prop1` and `prop2` by two applications of
/// modus ponens, following the classical Hilbert-style derivation:
///
/// 1. `prop2[phi1 := (phi0 -> phi0), phi2 := phi0] : (phi0 -> ((phi0 -> phi0) -> phi0)) -> ((phi0 -> (phi0 -> phi0)) -> (phi0 -> phi0))`
/// 2. `prop1[phi1 := (phi0 -> phi0)] : phi0 -> ((phi0 -> phi0) -> phi0)`
/// 3. modus ponens of 1 and 2 : `(phi0 -> (phi0 -> phi0)) -> (phi0 -> phi0)`
/// 4. `prop1[phi1 := phi0] : phi0 -> (phi0 -> phi0)`
/// 5. modus ponens of 3 and 4 : `phi0 -> phi0`
pub fn imp_refl<'a>() -> ProofThunk<'a> {
    let phi0 = Pattern::clean_metavar(0);
    let self_implies = Pattern::implies(phi0.clone(), phi0.clone());

    let mut delta1 = BTreeMap::new();
    delta1.insert(1, self_implies.clone());
    delta1.insert(2, phi0.clone());
    let step1 = instantiate(prop2(), delta1);

    let mut delta2 = BTreeMap::new();
    delta2.insert(1, self_implies.clone());
    let step2 = instantiate(prop1(), delta2);

    let step3 = modus_ponens(step1, step2).expect("prop2/prop1 antecedents line up by construction");

    let mut delta3 = BTreeMap::new();
    delta3.insert(1, phi0);
    let step4 = instantiate(prop1(), delta3);

    modus_ponens(step3, step4).expect("step3/step4 antecedents line up by construction")
}

/// A module exposing just the reflexivity lemma, claiming `phi0 -> phi0`.
pub fn module<'a>() -> ProofExp<'a> {
    let phi0 = Pattern::clean_metavar(0);
    ProofExp {
        axioms: vec![],
        notations: vec![],
        claims: vec![Claim::new(Pattern::implies(phi0.clone(), phi0))],
        proof_expressions: vec![imp_refl()],
        submodules: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::interpreter::serializing::SerializingInterpreter;
    use crate::interpreter::{Phase, StatefulInterpreter};

    #[test]
    fn imp_refl_proves_phi0_implies_phi0() {
        let phi0 = Pattern::clean_metavar(0);
        let mut interp = StatefulInterpreter::new(Phase::Proof);
        let proved = imp_refl().invoke(&mut interp).unwrap();
        assert_eq!(*proved.conclusion(), Pattern::implies(phi0.clone(), phi0));
    }

    #[test]
    fn imp_refl_emits_the_documented_byte_sequence() {
        let mut interp = SerializingInterpreter::new(Phase::Gamma);
        module().execute_full(&mut interp).unwrap();
        let (_, _, proof) = interp.into_streams();

        let expected: Vec<u8> = vec![
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::Implies.as_byte(),
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::Prop2.as_byte(),
            Instruction::Instantiate.as_byte(), 2, 2, 1,
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::Implies.as_byte(),
            Instruction::Prop1.as_byte(),
            Instruction::Instantiate.as_byte(), 1, 1,
            Instruction::ModusPonens.as_byte(),
            Instruction::CleanMetaVar.as_byte(), 0,
            Instruction::Prop1.as_byte(),
            Instruction::Instantiate.as_byte(), 1, 1,
            Instruction::ModusPonens.as_byte(),
            Instruction::Publish.as_byte(),
        ];
        assert_eq!(proof, expected);
    }
}
