//! Concrete proof-expression modules.
//!
//! Each submodule is a [`crate::proof_expr::ProofExp`]-shaped collection of
//! lemmas grounded in a specific fragment of the object theory. So far:
//! propositional logic's reflexivity lemma, the canonical worked example
//! of spec §8 invariant 6.

pub mod propositional;
