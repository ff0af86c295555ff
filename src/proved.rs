//! Proved wrapper (C2)
//!
//! A `Proved` is the type-level evidence that its `conclusion` has actually
//! been derived by an interpreter. Construction is restricted to this crate
//! so that holding a `Proved` really does mean "some interpreter ran a
//! proof rule that produced this pattern" (spec §4.2).

#![forbid(unsafe_code)]

use std::fmt;

use crate::pattern::{Pattern, PrettyOptions};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Proved {
    conclusion: Pattern,
}

impl Proved {
    /// Restricted to the crate: only interpreter rule implementations mint
    /// a `Proved`, never external callers.
    pub(crate) fn new(conclusion: Pattern) -> Self {
        Proved { conclusion }
    }

    pub fn conclusion(&self) -> &Pattern {
        &self.conclusion
    }

    pub fn pretty(&self, opts: &PrettyOptions) -> String {
        format!("⊢ {}", self.conclusion.pretty(opts))
    }
}

impl fmt::Display for Proved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(&PrettyOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_turnstile() {
        let p = Proved::new(Pattern::evar(0));
        assert_eq!(p.to_string(), "⊢ x0");
    }
}
