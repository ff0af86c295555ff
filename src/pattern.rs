//! Pattern algebra (C1)
//!
//! `Pattern` is the immutable term language of the object logic: element and
//! set variables, symbols, implication, application, the two binders
//! (`Exists`, `Mu`), schematic metavariables carrying side conditions, and
//! deferred element/set substitutions. Equality is always structural
//! (spec §8 invariant 1) — sharing via [`Rc`] is purely a performance
//! device, never a semantic one.
//!
//! Construction goes through smart constructors (`Pattern::implies`,
//! `Pattern::mu`, …) so that the two structural invariants this module owns
//! — sorted/deduplicated metavariable side-condition sets, and positivity of
//! `Mu`'s bound variable — can never be violated by a live `Pattern` value.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Errors raised by pattern construction and destruction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("set variable {0} does not occur only positively in the body of Mu")]
    NotPositive(u32),
    #[error("expected an Implies pattern, found a different head constructor")]
    NotImplies,
}

/// Side-condition sets carried by a [`Pattern::MetaVar`].
///
/// Each set is a sorted, duplicate-free sequence of variable ids (spec §3
/// invariant 2); `BTreeSet` gives us that for free and compares as a set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MetaVarConditions {
    pub e_fresh: BTreeSet<u32>,
    pub s_fresh: BTreeSet<u32>,
    pub positive: BTreeSet<u32>,
    pub negative: BTreeSet<u32>,
    pub application_context: BTreeSet<u32>,
}

impl MetaVarConditions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A metavariable is taken to occur positively in `x` unless it has
    /// explicitly declared `x` as one of its negative occurrences: the
    /// schema is trusted unless it says otherwise. Symmetric for negative.
    /// This is the documented resolution of the positivity-of-metavariables
    /// open question (see DESIGN.md).
    fn positive_in(&self, x: u32) -> bool {
        !self.negative.contains(&x)
    }

    fn negative_in(&self, x: u32) -> bool {
        !self.positive.contains(&x)
    }
}

/// A term of the matching-logic object language.
///
/// All recursive fields are [`Rc`]-shared so cloning a large pattern is
/// O(1); equality and hashing still recurse structurally through the `Rc`,
/// matching spec §8 invariant 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    EVar(u32),
    SVar(u32),
    Symbol(Rc<str>),
    Implies(Rc<Pattern>, Rc<Pattern>),
    App(Rc<Pattern>, Rc<Pattern>),
    Exists(u32, Rc<Pattern>),
    Mu(u32, Rc<Pattern>),
    MetaVar(u32, MetaVarConditions),
    ESubst { pattern: Rc<Pattern>, evar_id: u32, plug: Rc<Pattern> },
    SSubst { pattern: Rc<Pattern>, svar_id: u32, plug: Rc<Pattern> },
}

impl Pattern {
    pub fn evar(id: u32) -> Pattern {
        Pattern::EVar(id)
    }

    pub fn svar(id: u32) -> Pattern {
        Pattern::SVar(id)
    }

    pub fn symbol(name: impl Into<Rc<str>>) -> Pattern {
        Pattern::Symbol(name.into())
    }

    pub fn implies(left: Pattern, right: Pattern) -> Pattern {
        Pattern::Implies(Rc::new(left), Rc::new(right))
    }

    pub fn app(left: Pattern, right: Pattern) -> Pattern {
        Pattern::App(Rc::new(left), Rc::new(right))
    }

    pub fn exists(var_id: u32, body: Pattern) -> Pattern {
        Pattern::Exists(var_id, Rc::new(body))
    }

    /// Construct `Mu(var_id, body)`, rejecting the pattern if `var_id` does
    /// not occur only positively in `body` (spec §3 invariant 3).
    pub fn mu(var_id: u32, body: Pattern) -> Result<Pattern, PatternError> {
        if !occurs_only_positively(&body, var_id) {
            return Err(PatternError::NotPositive(var_id));
        }
        Ok(Pattern::Mu(var_id, Rc::new(body)))
    }

    /// Construct `Mu` without the positivity check, for callers that have
    /// already established it (e.g. the deserializer, which must accept
    /// whatever a trusted serializer emitted without re-deriving the proof).
    pub(crate) fn mu_unchecked(var_id: u32, body: Pattern) -> Pattern {
        Pattern::Mu(var_id, Rc::new(body))
    }

    pub fn metavar(id: u32, conditions: MetaVarConditions) -> Pattern {
        Pattern::MetaVar(id, conditions)
    }

    /// A metavariable with no side conditions at all — the `CleanMetaVar`
    /// instruction shorthand (spec §4.3).
    pub fn clean_metavar(id: u32) -> Pattern {
        Pattern::MetaVar(id, MetaVarConditions::empty())
    }

    pub fn esubst(pattern: Pattern, evar_id: u32, plug: Pattern) -> Pattern {
        Pattern::ESubst { pattern: Rc::new(pattern), evar_id, plug: Rc::new(plug) }
    }

    pub fn ssubst(pattern: Pattern, svar_id: u32, plug: Pattern) -> Pattern {
        Pattern::SSubst { pattern: Rc::new(pattern), svar_id, plug: Rc::new(plug) }
    }

    /// Destructure an `Implies`, failing if the head constructor differs
    /// (spec §4.1 `extract`).
    pub fn as_implies(&self) -> Result<(&Pattern, &Pattern), PatternError> {
        match self {
            Pattern::Implies(l, r) => Ok((l, r)),
            _ => Err(PatternError::NotImplies),
        }
    }

    /// Pure total substitution of every `MetaVar(k)` for `delta[k]`, subject
    /// to the side conditions the caller is responsible for upholding (spec
    /// §4.1, §8 invariants 2–3).
    pub fn instantiate(&self, delta: &std::collections::BTreeMap<u32, Pattern>) -> Pattern {
        match self {
            Pattern::EVar(_) | Pattern::SVar(_) | Pattern::Symbol(_) => self.clone(),
            Pattern::MetaVar(k, _) => match delta.get(k) {
                Some(plug) => plug.clone(),
                None => self.clone(),
            },
            Pattern::Implies(l, r) => {
                Pattern::implies(l.instantiate(delta), r.instantiate(delta))
            }
            Pattern::App(l, r) => Pattern::app(l.instantiate(delta), r.instantiate(delta)),
            Pattern::Exists(v, body) => Pattern::exists(*v, body.instantiate(delta)),
            Pattern::Mu(v, body) => Pattern::mu_unchecked(*v, body.instantiate(delta)),
            Pattern::ESubst { pattern, evar_id, plug } => {
                let pattern = pattern.instantiate(delta);
                let plug = plug.instantiate(delta);
                if matches!(pattern, Pattern::MetaVar(_, _)) {
                    Pattern::esubst(pattern, *evar_id, plug)
                } else {
                    push_esubst(&pattern, *evar_id, &plug)
                }
            }
            Pattern::SSubst { pattern, svar_id, plug } => {
                let pattern = pattern.instantiate(delta);
                let plug = plug.instantiate(delta);
                if matches!(pattern, Pattern::MetaVar(_, _)) {
                    Pattern::ssubst(pattern, *svar_id, plug)
                } else {
                    push_ssubst(&pattern, *svar_id, &plug)
                }
            }
        }
    }

    /// Deterministic textual form. `notations` maps a pattern to a
    /// printable abbreviation used only for display (spec §4.1, §4.5); it
    /// never affects equality or instantiation.
    pub fn pretty(&self, opts: &PrettyOptions) -> String {
        let mut out = String::new();
        self.pretty_into(opts, &mut out);
        out
    }

    fn pretty_into(&self, opts: &PrettyOptions, out: &mut String) {
        if let Some(notation) = opts.notations.iter().find(|(p, _)| p.as_ref() == self) {
            out.push_str(&notation.1);
            return;
        }
        match self {
            Pattern::EVar(id) => out.push_str(&format!("x{id}")),
            Pattern::SVar(id) => out.push_str(&format!("X{id}")),
            Pattern::Symbol(name) => out.push_str(name),
            Pattern::Implies(l, r) => {
                out.push('(');
                l.pretty_into(opts, out);
                out.push_str(" -> ");
                r.pretty_into(opts, out);
                out.push(')');
            }
            Pattern::App(l, r) => {
                out.push('(');
                l.pretty_into(opts, out);
                out.push(' ');
                r.pretty_into(opts, out);
                out.push(')');
            }
            Pattern::Exists(v, body) => {
                out.push_str(&format!("(exists x{v} . "));
                body.pretty_into(opts, out);
                out.push(')');
            }
            Pattern::Mu(v, body) => {
                out.push_str(&format!("(mu X{v} . "));
                body.pretty_into(opts, out);
                out.push(')');
            }
            Pattern::MetaVar(id, cond) => {
                out.push_str(&format!("phi{id}"));
                if !cond.e_fresh.is_empty()
                    || !cond.s_fresh.is_empty()
                    || !cond.positive.is_empty()
                    || !cond.negative.is_empty()
                    || !cond.application_context.is_empty()
                {
                    out.push_str(&format!("{cond:?}"));
                }
            }
            Pattern::ESubst { pattern, evar_id, plug } => {
                pattern.pretty_into(opts, out);
                out.push_str(&format!("[x{evar_id} <- "));
                plug.pretty_into(opts, out);
                out.push(']');
            }
            Pattern::SSubst { pattern, svar_id, plug } => {
                pattern.pretty_into(opts, out);
                out.push_str(&format!("[X{svar_id} <- "));
                plug.pretty_into(opts, out);
                out.push(']');
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(&PrettyOptions::default()))
    }
}

/// Printing-only options: a notation table mapping whole pattern shapes to
/// abbreviations, plus display toggles. Never consulted by `instantiate` or
/// `==` (spec §4.1).
#[derive(Clone, Debug, Default)]
pub struct PrettyOptions {
    pub notations: Vec<(Pattern, String)>,
    /// Collapse a chain of `Instantiate`-produced substitutions into a
    /// single display form instead of showing the raw `ESubst`/`SSubst`
    /// nesting (matches the reference `simplify_instantiations` flag).
    pub simplify_instantiations: bool,
}

/// Free element-variable ids occurring anywhere in `p` (crossing substitution
/// boundaries without resolving them, since `ESubst`/`SSubst` are opaque
/// until instantiated).
pub fn free_evars(p: &Pattern) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    collect_free_evars(p, &mut out);
    out
}

fn collect_free_evars(p: &Pattern, out: &mut BTreeSet<u32>) {
    match p {
        Pattern::EVar(id) => {
            out.insert(*id);
        }
        Pattern::SVar(_) | Pattern::Symbol(_) | Pattern::MetaVar(_, _) => {}
        Pattern::Implies(l, r) | Pattern::App(l, r) => {
            collect_free_evars(l, out);
            collect_free_evars(r, out);
        }
        Pattern::Exists(v, body) => {
            let mut inner = BTreeSet::new();
            collect_free_evars(body, &mut inner);
            inner.remove(v);
            out.extend(inner);
        }
        Pattern::Mu(_, body) => collect_free_evars(body, out),
        Pattern::ESubst { pattern, evar_id, plug } => {
            let mut inner = BTreeSet::new();
            collect_free_evars(pattern, &mut inner);
            inner.remove(evar_id);
            out.extend(inner);
            collect_free_evars(plug, out);
        }
        Pattern::SSubst { pattern, plug, .. } => {
            collect_free_evars(pattern, out);
            collect_free_evars(plug, out);
        }
    }
}

/// Whether `x` occurs only positively / only negatively in `p` — the same
/// predicate `Pattern::mu` enforces on its own bound variable, exposed for
/// the interpreter to check a `MetaVar`'s `positive`/`negative` obligations
/// against a candidate plug (spec §4.1, §4.3 meta-obligation checks).
pub fn occurs_only_positively(p: &Pattern, x: u32) -> bool {
    positive_in(p, x)
}

pub fn occurs_only_negatively(p: &Pattern, x: u32) -> bool {
    negative_in(p, x)
}

/// Whether `plug` is syntactically an application context around `v`: `v`
/// occurs exactly once, reachable from the root only through `App` nodes
/// (spec §4.1 `application_context` obligation). This is the documented,
/// deliberately conservative resolution — see DESIGN.md.
pub fn is_application_context(plug: &Pattern, v: u32) -> bool {
    match plug {
        Pattern::SVar(id) => *id == v,
        Pattern::App(l, r) => {
            let (lh, rh) = (mentions_svar(l, v), mentions_svar(r, v));
            match (lh, rh) {
                (true, false) => is_application_context(l, v),
                (false, true) => is_application_context(r, v),
                _ => false,
            }
        }
        _ => false,
    }
}

/// Mirrors the original reference's `Scope.unambiguize`: split a set of
/// ambiguous variable names into every element/set-variable assignment
/// (powerset enumeration). Exposed as a standalone helper, not wired into
/// the instruction set — see SPEC_FULL.md §B.5 / DESIGN.md's resolution of
/// the corresponding Open Question.
pub fn unambiguize_bindings(vars: &[u32]) -> Vec<Vec<(u32, bool)>> {
    if vars.is_empty() {
        return vec![Vec::new()];
    }
    let mut scopes: Vec<Vec<(u32, bool)>> = vec![Vec::new()];
    for &v in vars {
        let mut next = Vec::with_capacity(scopes.len() * 2);
        for scope in &scopes {
            let mut as_evar = scope.clone();
            as_evar.push((v, true));
            let mut as_svar = scope.clone();
            as_svar.push((v, false));
            next.push(as_evar);
            next.push(as_svar);
        }
        scopes = next;
    }
    scopes
}

fn positive_in(p: &Pattern, x: u32) -> bool {
    match p {
        Pattern::EVar(_) | Pattern::Symbol(_) => true,
        Pattern::SVar(_) => true, // a bare occurrence carries zero negations
        Pattern::MetaVar(_, cond) => cond.positive_in(x),
        Pattern::Implies(l, r) => negative_in(l, x) && positive_in(r, x),
        Pattern::App(l, r) => positive_in(l, x) && positive_in(r, x),
        Pattern::Exists(_, body) => positive_in(body, x),
        Pattern::Mu(v, body) => *v == x || positive_in(body, x),
        Pattern::ESubst { pattern, plug, .. } => positive_in(pattern, x) && positive_in(plug, x),
        Pattern::SSubst { pattern, plug, svar_id } => {
            if *svar_id == x {
                // the bound occurrence is shadowed by this very substitution
                positive_in(plug, x) || !mentions_svar(pattern, x)
            } else {
                positive_in(pattern, x) && positive_in(plug, x)
            }
        }
    }
}

fn negative_in(p: &Pattern, x: u32) -> bool {
    match p {
        Pattern::EVar(_) | Pattern::Symbol(_) => true,
        Pattern::SVar(v) => *v != x,
        Pattern::MetaVar(_, cond) => cond.negative_in(x),
        Pattern::Implies(l, r) => positive_in(l, x) && negative_in(r, x),
        Pattern::App(l, r) => negative_in(l, x) && negative_in(r, x),
        Pattern::Exists(_, body) => negative_in(body, x),
        Pattern::Mu(v, body) => *v == x || negative_in(body, x),
        Pattern::ESubst { pattern, plug, .. } => negative_in(pattern, x) && negative_in(plug, x),
        Pattern::SSubst { pattern, plug, svar_id } => {
            if *svar_id == x {
                negative_in(plug, x) || !mentions_svar(pattern, x)
            } else {
                negative_in(pattern, x) && negative_in(plug, x)
            }
        }
    }
}

fn mentions_svar(p: &Pattern, x: u32) -> bool {
    match p {
        Pattern::EVar(_) | Pattern::Symbol(_) => false,
        Pattern::SVar(v) => *v == x,
        Pattern::MetaVar(_, cond) => {
            cond.positive.contains(&x) || cond.negative.contains(&x) || cond.application_context.contains(&x)
        }
        Pattern::Implies(l, r) | Pattern::App(l, r) => mentions_svar(l, x) || mentions_svar(r, x),
        Pattern::Exists(_, body) => mentions_svar(body, x),
        Pattern::Mu(v, body) => *v != x && mentions_svar(body, x),
        Pattern::ESubst { pattern, plug, .. } => mentions_svar(pattern, x) || mentions_svar(plug, x),
        Pattern::SSubst { pattern, plug, svar_id } => {
            (*svar_id != x && mentions_svar(pattern, x)) || mentions_svar(plug, x)
        }
    }
}

/// Push a deferred element-variable substitution through constructors until
/// it reaches a `MetaVar` (where it must stop being deferred again) or a
/// leaf. Used only by `instantiate` (spec §4.1); never applied implicitly.
fn push_esubst(pattern: &Pattern, evar_id: u32, plug: &Pattern) -> Pattern {
    match pattern {
        Pattern::MetaVar(_, _) => Pattern::esubst(pattern.clone(), evar_id, plug.clone()),
        Pattern::EVar(id) => if *id == evar_id { plug.clone() } else { pattern.clone() },
        Pattern::SVar(_) | Pattern::Symbol(_) => pattern.clone(),
        Pattern::Implies(l, r) => {
            Pattern::implies(push_esubst(l, evar_id, plug), push_esubst(r, evar_id, plug))
        }
        Pattern::App(l, r) => Pattern::app(push_esubst(l, evar_id, plug), push_esubst(r, evar_id, plug)),
        Pattern::Exists(v, body) => {
            if *v == evar_id {
                pattern.clone()
            } else {
                Pattern::exists(*v, push_esubst(body, evar_id, plug))
            }
        }
        Pattern::Mu(v, body) => Pattern::mu_unchecked(*v, push_esubst(body, evar_id, plug)),
        Pattern::ESubst { pattern: inner, evar_id: id2, plug: plug2 } => Pattern::esubst(
            push_esubst(inner, evar_id, plug),
            *id2,
            push_esubst(plug2, evar_id, plug),
        ),
        Pattern::SSubst { pattern: inner, svar_id, plug: plug2 } => Pattern::ssubst(
            push_esubst(inner, evar_id, plug),
            *svar_id,
            push_esubst(plug2, evar_id, plug),
        ),
    }
}

/// Set-variable counterpart of [`push_esubst`].
fn push_ssubst(pattern: &Pattern, svar_id: u32, plug: &Pattern) -> Pattern {
    match pattern {
        Pattern::MetaVar(_, _) => Pattern::ssubst(pattern.clone(), svar_id, plug.clone()),
        Pattern::SVar(id) => if *id == svar_id { plug.clone() } else { pattern.clone() },
        Pattern::EVar(_) | Pattern::Symbol(_) => pattern.clone(),
        Pattern::Implies(l, r) => {
            Pattern::implies(push_ssubst(l, svar_id, plug), push_ssubst(r, svar_id, plug))
        }
        Pattern::App(l, r) => Pattern::app(push_ssubst(l, svar_id, plug), push_ssubst(r, svar_id, plug)),
        Pattern::Exists(v, body) => Pattern::exists(*v, push_ssubst(body, svar_id, plug)),
        Pattern::Mu(v, body) => {
            if *v == svar_id {
                pattern.clone()
            } else {
                Pattern::mu_unchecked(*v, push_ssubst(body, svar_id, plug))
            }
        }
        Pattern::ESubst { pattern: inner, evar_id, plug: plug2 } => Pattern::esubst(
            push_ssubst(inner, svar_id, plug),
            *evar_id,
            push_ssubst(plug2, svar_id, plug),
        ),
        Pattern::SSubst { pattern: inner, svar_id: id2, plug: plug2 } => Pattern::ssubst(
            push_ssubst(inner, svar_id, plug),
            *id2,
            push_ssubst(plug2, svar_id, plug),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mv(id: u32) -> Pattern {
        Pattern::clean_metavar(id)
    }

    fn mv_ef(id: u32, fresh: u32) -> Pattern {
        let mut cond = MetaVarConditions::empty();
        cond.e_fresh.insert(fresh);
        Pattern::metavar(id, cond)
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Pattern::implies(mv(0), mv(0)), Pattern::implies(mv(0), mv(0)));
        assert_ne!(Pattern::implies(mv(0), mv(1)), Pattern::implies(mv(0), mv(0)));
    }

    #[test]
    fn s1_metavar_self_instantiate() {
        let delta = BTreeMap::from([(0, mv_ef(0, 0))]);
        assert_eq!(mv(0).instantiate(&delta), mv_ef(0, 0));
    }

    #[test]
    fn s2_implies_instantiate() {
        let delta = BTreeMap::from([(0, mv(1))]);
        assert_eq!(
            Pattern::implies(mv(0), mv(0)).instantiate(&delta),
            Pattern::implies(mv(1), mv(1))
        );
    }

    #[test]
    fn s3_exists_instantiate() {
        let delta = BTreeMap::from([(1, mv_ef(0, 0))]);
        assert_eq!(
            Pattern::exists(0, mv(1)).instantiate(&delta),
            Pattern::exists(0, mv_ef(0, 0))
        );
    }

    #[test]
    fn instantiate_identity_on_disjoint_delta() {
        let p = Pattern::implies(mv(0), Pattern::evar(3));
        let delta = BTreeMap::from([(7, mv(9))]);
        assert_eq!(p.instantiate(&delta), p);
    }

    #[test]
    fn mu_rejects_negative_occurrence() {
        let body = Pattern::implies(Pattern::svar(0), Pattern::symbol("bot"));
        assert_eq!(Pattern::mu(0, body), Err(PatternError::NotPositive(0)));
    }

    #[test]
    fn mu_accepts_positive_occurrence() {
        let body = Pattern::implies(Pattern::symbol("bot"), Pattern::svar(0));
        assert!(Pattern::mu(0, body).is_ok());
    }

    #[test]
    fn mu_rebinding_is_always_fine() {
        // `mu X0 . (X1 -> X0)` is a valid positive recursive definition on
        // its own (X0 only occurs as the consequent).
        let inner = Pattern::mu(0, Pattern::implies(Pattern::svar(1), Pattern::svar(0))).unwrap();
        // Nesting it as the antecedent of another implication would flip the
        // sign for a free X0 — but X0 is rebound by the inner Mu, so it
        // doesn't occur free in `outer_body` at all, and the outer Mu is fine.
        let outer_body = Pattern::implies(inner, Pattern::symbol("bot"));
        assert!(Pattern::mu(0, outer_body).is_ok());
    }

    #[test]
    fn as_implies_destructures() {
        let p = Pattern::implies(Pattern::evar(0), Pattern::evar(1));
        let (l, r) = p.as_implies().unwrap();
        assert_eq!(*l, Pattern::evar(0));
        assert_eq!(*r, Pattern::evar(1));
    }

    #[test]
    fn as_implies_fails_on_wrong_head() {
        assert_eq!(Pattern::evar(0).as_implies(), Err(PatternError::NotImplies));
    }

    #[test]
    fn pretty_is_deterministic() {
        let p = Pattern::implies(mv(0), mv(1));
        let opts = PrettyOptions::default();
        assert_eq!(p.pretty(&opts), p.pretty(&opts));
    }

    #[test]
    fn unambiguize_enumerates_powerset() {
        let scopes = unambiguize_bindings(&[1, 2]);
        assert_eq!(scopes.len(), 4);
    }
}
