//! Pretty-printing interpreter (C5)
//!
//! Wraps a [`StatefulInterpreter`] and appends one line of human-readable
//! trace per op, in the form `<op-name>\t<stack-top-after>`. Save/Load and
//! the Publish* family are intentionally quiet about the full stack dump —
//! they print just the op name, matching `pretty_printing_interpreter.py`'s
//! `_print` suppression for those ops.

#![forbid(unsafe_code)]

use std::fmt::Write as _;

use crate::pattern::{MetaVarConditions, PrettyOptions};

use super::{InterpError, Interpreter, Phase, StackItem, StatefulInterpreter};

/// Decorator that narrates every op to one of three internal text logs
/// (mirroring [`super::serializing::SerializingInterpreter`]'s three byte
/// sinks) instead of mutating state — the base interpreter still does that.
#[derive(Debug, Default)]
pub struct PrettyPrintingInterpreter {
    base: StatefulInterpreter,
    opts: PrettyOptions,
    gamma: String,
    claim: String,
    proof: String,
}

impl PrettyPrintingInterpreter {
    pub fn new(phase: Phase) -> Self {
        PrettyPrintingInterpreter { base: StatefulInterpreter::new(phase), ..Default::default() }
    }

    pub fn with_options(phase: Phase, opts: PrettyOptions) -> Self {
        PrettyPrintingInterpreter { base: StatefulInterpreter::new(phase), opts, ..Default::default() }
    }

    pub fn warnings(&self) -> &[String] {
        self.base.warnings()
    }

    /// Consume the interpreter, returning `(gamma, claim, proof)` — the
    /// three text traces a caller writes to `.pretty-gamma`,
    /// `.pretty-claim`, `.pretty-proof`.
    pub fn into_logs(self) -> (String, String, String) {
        (self.gamma, self.claim, self.proof)
    }

    fn log(&mut self) -> &mut String {
        match self.base.phase() {
            Phase::Gamma => &mut self.gamma,
            Phase::Claim => &mut self.claim,
            Phase::Proof => &mut self.proof,
        }
    }

    fn narrate(&mut self, op: &str) {
        let top = self
            .base
            .stack()
            .last()
            .map(|item| match item {
                StackItem::Pattern(p) => p.pretty(&self.opts),
                StackItem::Proved(p) => p.pretty(&self.opts),
            })
            .unwrap_or_else(|| "<empty>".to_string());
        let _ = writeln!(self.log(), "{op}\t{top}");
    }

    fn narrate_quiet(&mut self, op: &str) {
        let _ = writeln!(self.log(), "{op}");
    }
}

macro_rules! traced_unary {
    ($name:ident, $op:literal) => {
        fn $name(&mut self) -> Result<(), InterpError> {
            self.base.$name()?;
            self.narrate($op);
            Ok(())
        }
    };
}

macro_rules! traced_with_id {
    ($name:ident, $op:literal) => {
        fn $name(&mut self, id: u32) -> Result<(), InterpError> {
            self.base.$name(id)?;
            self.narrate($op);
            Ok(())
        }
    };
}

impl Interpreter for PrettyPrintingInterpreter {
    traced_with_id!(evar, "EVar");
    traced_with_id!(svar, "SVar");

    fn symbol(&mut self, name: &str) -> Result<(), InterpError> {
        self.base.symbol(name)?;
        self.narrate("Symbol");
        Ok(())
    }

    traced_unary!(implies, "Implies");
    traced_unary!(app, "App");

    traced_with_id!(exists, "Exists");
    traced_with_id!(mu, "Mu");

    fn metavar(&mut self, id: u32, conditions: MetaVarConditions) -> Result<(), InterpError> {
        self.base.metavar(id, conditions)?;
        self.narrate("MetaVar");
        Ok(())
    }

    traced_with_id!(clean_metavar, "CleanMetaVar");
    traced_with_id!(esubst, "ESubst");
    traced_with_id!(ssubst, "SSubst");

    fn instantiate(&mut self, meta_ids: &[u32]) -> Result<(), InterpError> {
        self.base.instantiate(meta_ids)?;
        self.narrate("Instantiate");
        Ok(())
    }

    traced_unary!(prop1, "Prop1");
    traced_unary!(prop2, "Prop2");
    traced_unary!(prop3, "Prop3");
    traced_unary!(modus_ponens, "ModusPonens");
    traced_unary!(exists_quantifier, "Quantifier");
    traced_with_id!(exists_generalization, "Generalization");

    fn pop(&mut self) -> Result<(), InterpError> {
        Interpreter::pop(&mut self.base)?;
        self.narrate_quiet("Pop");
        Ok(())
    }

    fn save(&mut self) -> Result<usize, InterpError> {
        let index = self.base.save()?;
        self.narrate_quiet("Save");
        Ok(index)
    }

    fn load(&mut self, index: usize) -> Result<(), InterpError> {
        self.base.load(index)?;
        self.narrate("Load");
        Ok(())
    }

    fn publish_axiom(&mut self) -> Result<(), InterpError> {
        self.base.publish_axiom()?;
        self.narrate_quiet("Publish(axiom)");
        Ok(())
    }

    fn publish_claim(&mut self) -> Result<(), InterpError> {
        self.base.publish_claim()?;
        self.narrate_quiet("Publish(claim)");
        Ok(())
    }

    fn publish_proof(&mut self) -> Result<(), InterpError> {
        self.base.publish_proof()?;
        self.narrate_quiet("Publish(proof)");
        Ok(())
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
    fn prop1_narrates_the_new_top_of_stack() {
        let mut interp = PrettyPrintingInterpreter::new(Phase::Proof);
        interp.prop1().unwrap();
        let (_, _, proof) = interp.into_logs();
        assert!(proof.starts_with("Prop1\t"));
        assert!(proof.contains("->"));
    }

    #[test]
    fn pop_and_save_are_quiet_about_the_stack() {
        let mut interp = PrettyPrintingInterpreter::new(Phase::Proof);
        interp.evar(7).unwrap();
        interp.save().unwrap();
        interp.pop().unwrap();
        let (_, _, proof) = interp.into_logs();
        assert!(proof.contains("Save\n"));
        assert!(proof.contains("Pop\n"));
    }
}
