//! Triggers: the events plans react to.
//!
//! A trigger pairs a [`TriggerKind`] with a literal. Plans are indexed by the
//! trigger's [`TriggerShape`] (event kind, functor, arity, polarity), which
//! ignores the argument values entirely.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::{Literal, Path};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The event kind of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// `+b`: a belief was added.
    BeliefAdded,
    /// `-b`: a belief was removed.
    BeliefRemoved,
    /// `+!g`: a goal was requested.
    GoalAdded,
    /// `-!g`: a goal was dropped or failed.
    GoalRemoved,
}

impl TriggerKind {
    pub fn symbol(self) -> &'static str {
        match self {
            TriggerKind::BeliefAdded => "+",
            TriggerKind::BeliefRemoved => "-",
            TriggerKind::GoalAdded => "+!",
            TriggerKind::GoalRemoved => "-!",
        }
    }

    pub fn is_goal(self) -> bool {
        matches!(self, TriggerKind::GoalAdded | TriggerKind::GoalRemoved)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An event paired with the literal it concerns.
///
/// Equality is structural over kind and literal, so it never depends on
/// what the literal's variables are bound to elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trigger {
    kind: TriggerKind,
    literal: Literal,
}

/// Index key of a trigger: everything except the argument values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerShape {
    pub kind: TriggerKind,
    pub functor: Path,
    pub arity: usize,
    pub negated: bool,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl Trigger {
    pub fn new(kind: TriggerKind, literal: Literal) -> Self {
        Self { kind, literal }
    }

    pub fn belief_added(literal: Literal) -> Self {
        Self::new(TriggerKind::BeliefAdded, literal)
    }

    pub fn belief_removed(literal: Literal) -> Self {
        Self::new(TriggerKind::BeliefRemoved, literal)
    }

    pub fn goal_added(literal: Literal) -> Self {
        Self::new(TriggerKind::GoalAdded, literal)
    }

    pub fn goal_removed(literal: Literal) -> Self {
        Self::new(TriggerKind::GoalRemoved, literal)
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    pub fn literal(&self) -> &Literal {
        &self.literal
    }

    pub fn shape(&self) -> TriggerShape {
        TriggerShape {
            kind: self.kind,
            functor: self.literal.functor().clone(),
            arity: self.literal.arity(),
            negated: self.literal.is_negated(),
        }
    }

    /// Same kind, literal with fresh variables.
    pub(crate) fn with_literal(&self, literal: Literal) -> Self {
        Self {
            kind: self.kind,
            literal,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.literal)
    }
}

impl fmt::Display for TriggerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neg = if self.negated { "~" } else { "" };
        write!(f, "{}{}{}/{}", self.kind, neg, self.functor, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Term, Variable};

    #[test]
    fn shape_ignores_argument_values() {
        let a = Trigger::goal_added(Literal::new("move", [Term::int(1)]).unwrap());
        let x = Variable::named("X");
        let b = Trigger::goal_added(Literal::new("move", [Term::var(&x)]).unwrap());
        assert_ne!(a, b);
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn shape_distinguishes_kind_arity_and_polarity() {
        let lit = Literal::new("p", [Term::int(1)]).unwrap();
        let added = Trigger::belief_added(lit.clone()).shape();
        assert_ne!(added, Trigger::belief_removed(lit.clone()).shape());
        assert_ne!(added, Trigger::belief_added(lit.negate()).shape());
        assert_ne!(
            added,
            Trigger::belief_added(Literal::new("p", [Term::int(1), Term::int(2)]).unwrap()).shape()
        );
    }

    #[test]
    fn display_uses_agentspeak_symbols() {
        let lit = Literal::new("clean", [Term::atom("room")]).unwrap();
        assert_eq!(Trigger::goal_added(lit.clone()).to_string(), "+!clean(room)");
        assert_eq!(Trigger::belief_removed(lit.clone()).to_string(), "-clean(room)");
        assert_eq!(
            Trigger::goal_removed(lit).shape().to_string(),
            "-!clean/1"
        );
    }
}
