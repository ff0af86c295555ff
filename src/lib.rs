//! Crate root: public surface for the matching-logic proof toolkit.
//!
//! This module is the **single canonical entry-point** for downstream users
//! of the library. It re-exports the pattern algebra, the proof object, the
//! interpreter capability set and its concrete variants, the proof-
//! expression builder, and the instruction wire contract.
//!
//! ## Invariants
//!
//! - **Structural equality.** `Pattern` equality and hashing are purely
//!   structural; no interning or identity comparison is ever substituted
//!   for it (spec §8 invariant 1).
//! - **Three monotone phases.** Every interpreter transitions
//!   `Gamma -> Claim -> Proof` exactly once each, never backward.
//! - **No unsafe.** We **forbid unsafe** throughout the crate.
//! - **Atomic runs.** A proof pipeline either completes or aborts with a
//!   precise [`interpreter::InterpError`]; there is no partial-emission
//!   recovery (spec §7).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Binary instruction opcodes — the wire contract shared by every
/// serializer, deserializer and pretty-printer in this crate.
pub mod instruction;
/// The interpreter capability set and its concrete variants (stateful,
/// serializing, pretty-printing, counting, memoizing, deserializing).
pub mod interpreter;
/// Immutable pattern terms, metavariable side conditions, and substitution.
pub mod pattern;
/// Thunk-based proof-expression builder (axioms, claims, proof steps).
pub mod proof_expr;
/// Type-level evidence that a pattern has been derived by an interpreter.
pub mod proved;
/// Concrete proof-expression modules (propositional logic, ...).
pub mod rules;

pub use instruction::{Instruction, WIRE_VERSION};
pub use interpreter::{InterpError, Interpreter, Phase, StackItem, StatefulInterpreter};
pub use pattern::{MetaVarConditions, Pattern, PatternError, PrettyOptions};
pub use proof_expr::{Claim, ProofExp, ProofThunk};
pub use proved::Proved;
