//! Binary instruction opcodes — the wire contract
//!
//! This module centralizes the **stable** numeric opcode assigned to each
//! instruction in the proof stream. Every serializer, deserializer and
//! pretty-printer in this crate dispatches off [`Instruction`]; changing a
//! discriminant here changes the wire format for every proof ever emitted.
//!
//! A single canonical enum, documented as append-only: adding a new variant
//! at the end is backward compatible, reordering or renumbering existing
//! ones is not.

#![forbid(unsafe_code)]

/// One opcode per instruction accepted by an [`crate::interpreter::Interpreter`].
///
/// The numeric values are part of the wire contract (§6.1): the serializer
/// writes them, the deserializer matches on them, and both MUST agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    EVar = 0,
    SVar = 1,
    Symbol = 2,
    Implies = 3,
    App = 4,
    Exists = 5,
    Mu = 6,
    MetaVar = 7,
    ESubst = 8,
    SSubst = 9,
    Prop1 = 10,
    Prop2 = 11,
    Prop3 = 12,
    ModusPonens = 13,
    Quantifier = 14,
    Generalization = 15,
    Instantiate = 16,
    Pop = 17,
    Save = 18,
    Load = 19,
    Publish = 20,
    Version = 21,
    CleanMetaVar = 22,
}

impl Instruction {
    /// Decode a raw opcode byte. Unknown opcodes abort the stream (§4.6).
    pub fn from_byte(b: u8) -> Option<Self> {
        use Instruction::*;
        Some(match b {
            0 => EVar,
            1 => SVar,
            2 => Symbol,
            3 => Implies,
            4 => App,
            5 => Exists,
            6 => Mu,
            7 => MetaVar,
            8 => ESubst,
            9 => SSubst,
            10 => Prop1,
            11 => Prop2,
            12 => Prop3,
            13 => ModusPonens,
            14 => Quantifier,
            15 => Generalization,
            16 => Instantiate,
            17 => Pop,
            18 => Save,
            19 => Load,
            20 => Publish,
            21 => Version,
            22 => CleanMetaVar,
            _ => return None,
        })
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Current wire format version, emitted by the `Version` instruction.
pub const WIRE_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode() {
        for b in 0u8..=22 {
            let instr = Instruction::from_byte(b).expect("opcode in range must decode");
            assert_eq!(instr.as_byte(), b);
        }
    }

    #[test]
    fn unknown_opcode_rejected() {
        assert!(Instruction::from_byte(23).is_none());
        assert!(Instruction::from_byte(255).is_none());
    }
}
