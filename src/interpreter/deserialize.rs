//! Binary stream deserializer (C6)
//!
//! Reads a byte stream produced by [`super::serializing::SerializingInterpreter`]
//! and drives it into any `impl Interpreter`, decoding opcodes through
//! [`Instruction::from_byte`]. An unknown opcode aborts the stream
//! immediately (spec §4.6) rather than attempting resynchronization.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::instruction::Instruction;
use crate::pattern::MetaVarConditions;

use super::{InterpError, Interpreter};

/// A cursor over an in-memory instruction stream plus the first-use symbol
/// table it needs to recover `Symbol` names from their interned byte ids.
pub struct Deserializer<'a> {
    bytes: &'a [u8],
    pos: usize,
    symbols: Vec<String>,
}

impl<'a> Deserializer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Deserializer { bytes, pos: 0, symbols: Vec::new() }
    }

    /// Register the name a given interned symbol id maps to. Callers that
    /// serialized the stream in the same run already know this table; a
    /// replay driver reading a stream cold instead reconstructs it by
    /// convention (first-use order, 0-based) as symbols are encountered —
    /// `next_symbol_name` does that automatically when no override has been
    /// registered for an id.
    pub fn register_symbol(&mut self, id: u8, name: impl Into<String>) {
        let name = name.into();
        let idx = id as usize;
        if self.symbols.len() <= idx {
            self.symbols.resize(idx + 1, String::new());
        }
        self.symbols[idx] = name;
    }

    fn next_byte(&mut self) -> Result<u8, InterpError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| InterpError::UnknownName("unexpected end of instruction stream".to_string()))?;
        self.pos += 1;
        Ok(b)
    }

    fn next_id(&mut self) -> Result<u32, InterpError> {
        self.next_byte().map(u32::from)
    }

    fn next_ids(&mut self) -> Result<Vec<u32>, InterpError> {
        let len = self.next_byte()?;
        (0..len).map(|_| self.next_id()).collect()
    }

    fn next_id_set(&mut self) -> Result<BTreeSet<u32>, InterpError> {
        Ok(self.next_ids()?.into_iter().collect())
    }

    fn symbol_name(&mut self, id: u8) -> String {
        self.symbols
            .get(id as usize)
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("sym#{id}"))
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode and apply exactly one instruction to `interp`. Returns the
    /// decoded opcode so callers (e.g. the replay CLI) can log progress.
    pub fn step<I: Interpreter + ?Sized>(&mut self, interp: &mut I) -> Result<Instruction, InterpError> {
        let opcode = self.next_byte()?;
        let instr = Instruction::from_byte(opcode).ok_or(InterpError::UnknownOpcode(opcode))?;
        match instr {
            Instruction::EVar => {
                let id = self.next_id()?;
                interp.evar(id)?;
            }
            Instruction::SVar => {
                let id = self.next_id()?;
                interp.svar(id)?;
            }
            Instruction::Symbol => {
                let id = self.next_byte()?;
                let name = self.symbol_name(id);
                interp.symbol(&name)?;
            }
            Instruction::Implies => interp.implies()?,
            Instruction::App => interp.app()?,
            Instruction::Exists => {
                let id = self.next_id()?;
                interp.exists(id)?;
            }
            Instruction::Mu => {
                let id = self.next_id()?;
                interp.mu(id)?;
            }
            Instruction::MetaVar => {
                let id = self.next_id()?;
                let conditions = MetaVarConditions {
                    e_fresh: self.next_id_set()?,
                    s_fresh: self.next_id_set()?,
                    positive: self.next_id_set()?,
                    negative: self.next_id_set()?,
                    application_context: self.next_id_set()?,
                };
                interp.metavar(id, conditions)?;
            }
            Instruction::ESubst => {
                let id = self.next_id()?;
                interp.esubst(id)?;
            }
            Instruction::SSubst => {
                let id = self.next_id()?;
                interp.ssubst(id)?;
            }
            Instruction::Prop1 => interp.prop1()?,
            Instruction::Prop2 => interp.prop2()?,
            Instruction::Prop3 => interp.prop3()?,
            Instruction::ModusPonens => interp.modus_ponens()?,
            Instruction::Quantifier => interp.exists_quantifier()?,
            Instruction::Generalization => {
                let id = self.next_id()?;
                interp.exists_generalization(id)?;
            }
            Instruction::Instantiate => {
                let ids = self.next_ids()?;
                interp.instantiate(&ids)?;
            }
            Instruction::Pop => interp.pop()?,
            Instruction::Save => {
                interp.save()?;
            }
            Instruction::Load => {
                let index = self.next_byte()? as usize;
                interp.load(index)?;
            }
            Instruction::Publish => {
                match interp.phase() {
                    super::Phase::Gamma => interp.publish_axiom()?,
                    super::Phase::Claim => interp.publish_claim()?,
                    super::Phase::Proof => interp.publish_proof()?,
                }
            }
            Instruction::Version => {
                let _version = self.next_byte()?;
            }
            Instruction::CleanMetaVar => {
                let id = self.next_id()?;
                interp.clean_metavar(id)?;
            }
        }
        Ok(instr)
    }

    /// Drive every remaining instruction into `interp`.
    pub fn run<I: Interpreter + ?Sized>(&mut self, interp: &mut I) -> Result<(), InterpError> {
        while !self.is_empty() {
            self.step(interp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Phase, StatefulInterpreter};

    #[test]
    fn round_trips_through_serializer() {
        use crate::interpreter::serializing::SerializingInterpreter;

        let mut ser = SerializingInterpreter::new(Phase::Proof);
        ser.evar(9).unwrap();
        ser.pop().unwrap();
        let (_, _, proof) = ser.into_streams();

        let mut replay = StatefulInterpreter::new(Phase::Proof);
        let mut de = Deserializer::new(&proof);
        de.run(&mut replay).unwrap();
        assert!(replay.stack().is_empty());
    }

    #[test]
    fn unknown_opcode_aborts() {
        let bytes = [255u8];
        let mut replay = StatefulInterpreter::new(Phase::Proof);
        let mut de = Deserializer::new(&bytes);
        assert!(matches!(de.step(&mut replay), Err(InterpError::UnknownOpcode(255))));
    }

    #[test]
    fn truncated_stream_is_an_error_not_a_panic() {
        let bytes = [Instruction::EVar.as_byte()];
        let mut replay = StatefulInterpreter::new(Phase::Proof);
        let mut de = Deserializer::new(&bytes);
        assert!(de.step(&mut replay).is_err());
    }
}
