//! Serializing interpreter (C4)
//!
//! Wraps a [`StatefulInterpreter`] and, after each op mutates the base
//! state, appends the op's binary encoding to whichever of the three
//! in-memory buffers (gamma/claim/proof) matches the interpreter's current
//! phase. No semantic state lives here beyond a first-use symbol table —
//! the instruction stream is a pure function of the sequence of op calls
//! (spec §5's ordering guarantee). Callers flush the three buffers to
//! `.ml-gamma`/`.ml-claim`/`.ml-proof` files once the run completes.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::instruction::Instruction;
use crate::pattern::MetaVarConditions;

use super::{push_pattern, InterpError, Interpreter, Phase, StackItem, StatefulInterpreter};

/// First-use interning table mapping a symbol's printable name to the
/// 1-byte id the wire format carries (spec §6.1: "interning handled out of
/// band"). Shared shape between the serializer and the deserializer, which
/// must both assign ids in the same first-appearance order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    by_name: HashMap<String, u8>,
}

impl SymbolTable {
    pub fn intern(&mut self, name: &str) -> Result<u8, InterpError> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        let id = u8::try_from(self.names.len())
            .map_err(|_| InterpError::UnknownName(format!("symbol table exhausted before interning `{name}`")))?;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn resolve(&self, id: u8) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }
}

fn wire_id(id: u32) -> Result<u8, InterpError> {
    u8::try_from(id).map_err(|_| InterpError::UnknownName(format!("id {id} exceeds the 1-byte wire range")))
}

fn write_ids(out: &mut Vec<u8>, ids: &[u32]) -> Result<(), InterpError> {
    let len = u8::try_from(ids.len())
        .map_err(|_| InterpError::UnknownName(format!("{} ids exceeds the 1-byte length prefix", ids.len())))?;
    out.push(len);
    for &id in ids {
        out.push(wire_id(id)?);
    }
    Ok(())
}

fn write_conditions(out: &mut Vec<u8>, conditions: &MetaVarConditions) -> Result<(), InterpError> {
    write_ids(out, &conditions.e_fresh.iter().copied().collect::<Vec<_>>())?;
    write_ids(out, &conditions.s_fresh.iter().copied().collect::<Vec<_>>())?;
    write_ids(out, &conditions.positive.iter().copied().collect::<Vec<_>>())?;
    write_ids(out, &conditions.negative.iter().copied().collect::<Vec<_>>())?;
    write_ids(out, &conditions.application_context.iter().copied().collect::<Vec<_>>())?;
    Ok(())
}

/// The three parallel output streams, one per phase (spec §6.1). Backed by
/// `StatefulInterpreter` for the actual stack semantics; this wrapper only
/// ever appends bytes, never inspects or mutates the base's stack itself.
#[derive(Debug, Default)]
pub struct SerializingInterpreter {
    base: StatefulInterpreter,
    symbols: SymbolTable,
    gamma: Vec<u8>,
    claim: Vec<u8>,
    proof: Vec<u8>,
}

impl SerializingInterpreter {
    pub fn new(phase: Phase) -> Self {
        SerializingInterpreter { base: StatefulInterpreter::new(phase), ..Default::default() }
    }

    pub fn with_claims(phase: Phase, claims: Vec<crate::pattern::Pattern>) -> Self {
        SerializingInterpreter { base: StatefulInterpreter::with_claims(phase, claims), ..Default::default() }
    }

    pub fn warnings(&self) -> &[String] {
        self.base.warnings()
    }

    /// Consume the interpreter, returning the three emitted byte streams in
    /// `(gamma, claim, proof)` order — exactly the three sinks a caller
    /// writes to `.ml-gamma`, `.ml-claim`, `.ml-proof`.
    pub fn into_streams(self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (self.gamma, self.claim, self.proof)
    }

    fn sink(&mut self) -> &mut Vec<u8> {
        match self.base.phase() {
            Phase::Gamma => &mut self.gamma,
            Phase::Claim => &mut self.claim,
            Phase::Proof => &mut self.proof,
        }
    }

    fn emit(&mut self, instr: Instruction, immediates: &[u8]) -> Result<(), InterpError> {
        let sink = self.sink();
        sink.push(instr.as_byte());
        sink.extend_from_slice(immediates);
        Ok(())
    }
}

impl Interpreter for SerializingInterpreter {
    fn evar(&mut self, id: u32) -> Result<(), InterpError> {
        self.base.evar(id)?;
        self.emit(Instruction::EVar, &[wire_id(id)?])
    }

    fn svar(&mut self, id: u32) -> Result<(), InterpError> {
        self.base.svar(id)?;
        self.emit(Instruction::SVar, &[wire_id(id)?])
    }

    fn symbol(&mut self, name: &str) -> Result<(), InterpError> {
        self.base.symbol(name)?;
        let id = self.symbols.intern(name)?;
        self.emit(Instruction::Symbol, &[id])
    }

    fn implies(&mut self) -> Result<(), InterpError> {
        self.base.implies()?;
        self.emit(Instruction::Implies, &[])
    }

    fn app(&mut self) -> Result<(), InterpError> {
        self.base.app()?;
        self.emit(Instruction::App, &[])
    }

    fn exists(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.base.exists(var_id)?;
        self.emit(Instruction::Exists, &[wire_id(var_id)?])
    }

    fn mu(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.base.mu(var_id)?;
        self.emit(Instruction::Mu, &[wire_id(var_id)?])
    }

    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError> {
        self.base.metavar(id, conditions.clone())?;
        let encoded_id = wire_id(id)?;
        let sink = self.sink();
        sink.push(Instruction::MetaVar.as_byte());
        sink.push(encoded_id);
        write_conditions(sink, &conditions)
    }

    fn clean_metavar(&mut self, id: u32) -> Result<(), InterpError> {
        self.base.clean_metavar(id)?;
        self.emit(Instruction::CleanMetaVar, &[wire_id(id)?])
    }

    fn esubst(&mut self, evar_id: u32) -> Result<(), InterpError> {
        self.base.esubst(evar_id)?;
        self.emit(Instruction::ESubst, &[wire_id(evar_id)?])
    }

    fn ssubst(&mut self, svar_id: u32) -> Result<(), InterpError> {
        self.base.ssubst(svar_id)?;
        self.emit(Instruction::SSubst, &[wire_id(svar_id)?])
    }

    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        self.base.instantiate(meta_ids)?;
        let sink = self.sink();
        sink.push(Instruction::Instantiate.as_byte());
        write_ids(sink, meta_ids)
    }

    fn prop1(&mut self) -> Result<(), InterpError> {
        self.base.prop1()?;
        self.emit(Instruction::Prop1, &[])
    }

    fn prop2(&mut self) -> Result<(), InterpError> {
        self.base.prop2()?;
        self.emit(Instruction::Prop2, &[])
    }

    fn prop3(&mut self) -> Result<(), InterpError> {
        self.base.prop3()?;
        self.emit(Instruction::Prop3, &[])
    }

    fn modus_ponens(&mut self) -> Result<(), InterpError> {
        self.base.modus_ponens()?;
        self.emit(Instruction::ModusPonens, &[])
    }

    fn exists_quantifier(&mut self) -> Result<(), InterpError> {
        self.base.exists_quantifier()?;
        self.emit(Instruction::Quantifier, &[])
    }

    fn exists_generalization(&mut self, var_id: u32) -> Result<(), InterpError> {
        self.base.exists_generalization(var_id)?;
        self.emit(Instruction::Generalization, &[wire_id(var_id)?])
    }

    fn pop(&mut self) -> Result<(), InterpError> {
        Interpreter::pop(&mut self.base)?;
        self.emit(Instruction::Pop, &[])
    }

    fn save(&mut self) -> Result<usize, InterpError> {
        let index = self.base.save()?;
        self.emit(Instruction::Save, &[])?;
        Ok(index)
    }

    fn load(&mut self, index: usize) -> Result<(), InterpError> {
        self.base.load(index)?;
        let byte = u8::try_from(index)
            .map_err(|_| InterpError::UnknownName(format!("memory index {index} exceeds 1 byte")))?;
        self.emit(Instruction::Load, &[byte])
    }

    fn publish_axiom(&mut self) -> Result<(), InterpError> {
        self.base.publish_axiom()?;
        self.emit(Instruction::Publish, &[])
    }

    fn publish_claim(&mut self) -> Result<(), InterpError> {
        self.base.publish_claim()?;
        self.emit(Instruction::Publish, &[])
    }

    fn publish_proof(&mut self) -> Result<(), InterpError> {
        self.base.publish_proof()?;
        self.emit(Instruction::Publish, &[])
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

/// Generic fallback kept for completeness: any `Interpreter` (not just this
/// one) can construct a pattern by recursive descent through `push_pattern`
/// rather than a hand-built op sequence.
pub fn build_pattern<I: Interpreter + ?Sized>(interp: &mut I, p: &crate::pattern::Pattern) -> Result<(), InterpError> {
    push_pattern(interp, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    #[test]
    fn evar_emits_opcode_then_id() {
        let mut interp = SerializingInterpreter::new(Phase::Proof);
        interp.evar(5).unwrap();
        interp.pop().unwrap();
        let (_, _, proof) = interp.into_streams();
        assert_eq!(proof, vec![Instruction::EVar.as_byte(), 5, Instruction::Pop.as_byte()]);
    }

    #[test]
    fn symbol_interning_is_first_use_order() {
        let mut interp = SerializingInterpreter::new(Phase::Proof);
        interp.symbol("a").unwrap();
        interp.symbol("b").unwrap();
        interp.symbol("a").unwrap();
        assert_eq!(interp.symbols.resolve(0), Some("a"));
        assert_eq!(interp.symbols.resolve(1), Some("b"));
        let (_, _, proof) = interp.into_streams();
        assert_eq!(
            proof,
            vec![
                Instruction::Symbol.as_byte(),
                0,
                Instruction::Symbol.as_byte(),
                1,
                Instruction::Symbol.as_byte(),
                0,
            ]
        );
    }

    #[test]
    fn prop1_then_pop_round_trips_through_the_base_stack() {
        let mut interp = SerializingInterpreter::new(Phase::Proof);
        interp.prop1().unwrap();
        assert_eq!(interp.stack().len(), 1);
        interp.pop().unwrap();
        assert!(interp.stack().is_empty());
        let (_, _, proof) = interp.into_streams();
        assert_eq!(proof, vec![Instruction::Prop1.as_byte(), Instruction::Pop.as_byte()]);
    }

    #[test]
    fn phases_route_to_separate_streams() {
        let mut interp = SerializingInterpreter::new(Phase::Gamma);
        interp.evar(1).unwrap();
        interp.into_claim_phase().unwrap();
        interp.svar(2).unwrap();
        let (gamma, claim, proof) = interp.into_streams();
        assert_eq!(gamma, vec![Instruction::EVar.as_byte(), 1]);
        assert_eq!(claim, vec![Instruction::SVar.as_byte(), 2]);
        assert!(proof.is_empty());
    }

    #[test]
    fn pattern_with_metavar_id_over_255_is_rejected() {
        let mut interp = SerializingInterpreter::new(Phase::Proof);
        assert!(interp.pattern(&Pattern::evar(300)).is_err());
    }
}
