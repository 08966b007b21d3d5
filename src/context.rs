//! Execution contexts.
//!
//! A [`Context`] is the scope a plan body runs in: the bindings produced by
//! plan selection, a snapshot of the agent's beliefs, the call stack and the
//! cancellation/budget handles the interpreter passes back into the core.
//! Contexts are owned by the thread evaluating the plan instance and are
//! never shared; [`CancellationToken`] is the only part meant to cross
//! threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::beliefbase::BeliefSnapshot;
use crate::error::{BindError, SelectError, SelectResult};
use crate::term::{BindMode, Literal, Renaming, Term, Variable};
use crate::unify::{Substitution, Unifier};

// ---------------------------------------------------------------------------
// Cancellation and budgets
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked between candidate plans and
/// between substitutions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token has been triggered.
    pub fn check(&self) -> SelectResult<()> {
        if self.is_cancelled() {
            Err(SelectError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Limits for one evaluation: rule call depth and resolution steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_rule_depth: usize,
    /// `None` means unlimited.
    pub max_steps: Option<u64>,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_rule_depth: 64,
            max_steps: None,
        }
    }
}

impl Budget {
    pub fn with_depth(max_rule_depth: usize) -> Self {
        Self {
            max_rule_depth,
            ..Self::default()
        }
    }

    pub fn with_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// `Err(StepBudgetExceeded)` once `used` passes the step limit.
    pub fn check_steps(&self, used: u64) -> SelectResult<()> {
        match self.max_steps {
            Some(limit) if used > limit => Err(SelectError::StepBudgetExceeded { steps: limit }),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// One entry of the call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    /// Variables introduced by this frame; their bindings are dropped when
    /// the frame is popped.
    pub locals: Vec<Variable>,
}

/// Evaluation scope of one plan instance.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: Substitution,
    beliefs: Option<BeliefSnapshot>,
    frames: Vec<Frame>,
    cancel: CancellationToken,
    budget: Budget,
}

impl Context {
    pub fn new(beliefs: BeliefSnapshot) -> Self {
        Self {
            beliefs: Some(beliefs),
            ..Self::default()
        }
    }

    pub fn with_bindings(mut self, bindings: Substitution) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn bindings(&self) -> &Substitution {
        &self.bindings
    }

    pub fn beliefs(&self) -> Option<&BeliefSnapshot> {
        self.beliefs.as_ref()
    }

    /// Point the context at a newer belief snapshot, e.g. after the plan
    /// body committed a belief change.
    pub fn refresh_beliefs(&mut self, beliefs: BeliefSnapshot) {
        self.beliefs = Some(beliefs);
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Bind a variable in this context.
    ///
    /// A fixed variable that is already bound unifies its current value
    /// with the new one: a chain ending in an unbound variable binds that
    /// variable, and only two clashing values are refused. A relocatable
    /// variable is rebound.
    pub fn bind(&mut self, var: &Variable, value: Term) -> Result<(), BindError> {
        if !self.bindings.contains(var) {
            return self.bindings.bind(var, value);
        }
        match var.mode() {
            BindMode::Fixed => self.bind_fixed(var, value),
            BindMode::Relocatable => {
                let previous = self.bindings.get(var).cloned();
                self.bindings.remove(var.id());
                let result = self.bindings.bind(var, value);
                if result.is_err() {
                    if let Some(previous) = previous {
                        self.bindings.insert_unchecked(var.clone(), previous);
                    }
                }
                result
            }
        }
    }

    fn bind_fixed(&mut self, var: &Variable, value: Term) -> Result<(), BindError> {
        let current = self.bindings.walk(&Term::var(var)).clone();
        let value = self.bindings.walk(&value).clone();
        if current == value {
            return Ok(());
        }
        match (current, value) {
            (Term::Variable(end), value) => self.bindings.bind(&end, value),
            (current, Term::Variable(end)) => self.bindings.bind(&end, current),
            (Term::Literal(a), Term::Literal(b)) => {
                match Unifier::default().unify_pair(&a, &b, &self.bindings) {
                    Some(merged) => {
                        self.bindings = merged;
                        Ok(())
                    }
                    None => Err(BindError::FixedRebind {
                        var: var.name().to_string(),
                    }),
                }
            }
            _ => Err(BindError::FixedRebind {
                var: var.name().to_string(),
            }),
        }
    }

    /// Fold a substitution (from unification or rule resolution) into the
    /// context.
    pub fn merge(&mut self, other: &Substitution) -> Result<(), BindError> {
        self.bindings = self.bindings.merge(other)?;
        Ok(())
    }

    /// Fully resolved value of a term, evaluate-at-use variables included.
    pub fn resolve(&self, term: &Term) -> Term {
        self.bindings.resolve_all(term)
    }

    /// Apply the bindings to a literal, leaving evaluate-at-use variables
    /// symbolic.
    pub fn apply(&self, literal: &Literal) -> Literal {
        self.bindings.apply(literal)
    }

    /// Drop the bindings of every relocatable variable, so the context can
    /// run another iteration.
    pub fn reset_relocatable(&mut self) {
        let relocatable: Vec<Variable> = self
            .bindings
            .iter()
            .filter(|(v, _)| v.mode() == BindMode::Relocatable)
            .map(|(v, _)| v.clone())
            .collect();
        for var in relocatable {
            self.bindings.remove(var.id());
        }
    }

    /// Copy with every bound variable remapped to a fresh one. The copy
    /// shares no variable state with `self`.
    pub fn duplicate(&self) -> (Context, Renaming) {
        let mut renaming = Renaming::new();
        let mut bindings = Substitution::new();
        for (var, value) in self.bindings.iter() {
            let fresh = renaming.rename(var);
            bindings.insert_unchecked(fresh, value.deep_copy_with(&mut renaming));
        }
        let frames = self
            .frames
            .iter()
            .map(|f| Frame {
                name: f.name.clone(),
                locals: f.locals.iter().map(|v| renaming.rename(v)).collect(),
            })
            .collect();
        let copy = Context {
            bindings,
            beliefs: self.beliefs.clone(),
            frames,
            cancel: self.cancel.clone(),
            budget: self.budget,
        };
        (copy, renaming)
    }

    pub fn push_frame(&mut self, name: &str, locals: Vec<Variable>) {
        self.frames.push(Frame {
            name: name.to_string(),
            locals,
        });
    }

    /// Pop the innermost frame and forget its locals' bindings.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        for var in &frame.locals {
            self.bindings.remove(var.id());
        }
        Some(frame)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn call_stack(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().rev().map(|f| f.name.as_str())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert_eq!(token.check(), Err(SelectError::Cancelled));
    }

    #[test]
    fn step_budget() {
        let budget = Budget::default().with_steps(3);
        assert!(budget.check_steps(3).is_ok());
        assert!(matches!(
            budget.check_steps(4),
            Err(SelectError::StepBudgetExceeded { steps: 3 })
        ));
        assert!(Budget::default().check_steps(u64::MAX).is_ok());
    }

    #[test]
    fn fixed_variables_are_single_assignment() {
        let x = Variable::named("X");
        let mut ctx = Context::default();
        ctx.bind(&x, Term::int(1)).unwrap();
        ctx.bind(&x, Term::float(1.0)).unwrap();
        assert_eq!(
            ctx.bind(&x, Term::int(2)),
            Err(BindError::FixedRebind { var: "X".into() })
        );
        assert_eq!(ctx.resolve(&Term::var(&x)), Term::int(1));
    }

    #[test]
    fn fixed_variable_bound_to_unbound_variable_binds_through_the_chain() {
        let (x, y) = (Variable::named("X"), Variable::named("Y"));
        let mut ctx = Context::default();
        ctx.bind(&x, Term::var(&y)).unwrap();
        ctx.bind(&x, Term::int(1)).unwrap();
        assert_eq!(ctx.resolve(&Term::var(&y)), Term::int(1));
        assert_eq!(
            ctx.bind(&x, Term::int(2)),
            Err(BindError::FixedRebind { var: "X".into() })
        );

        // partially bound structures unify with the new value
        let (p, z) = (Variable::named("P"), Variable::named("Z"));
        let point = Literal::new("point", [Term::var(&z), Term::int(0)]).unwrap();
        ctx.bind(&p, Term::from(point)).unwrap();
        let given = Literal::new("point", [Term::int(3), Term::int(0)]).unwrap();
        ctx.bind(&p, Term::from(given.clone())).unwrap();
        assert_eq!(ctx.resolve(&Term::var(&z)), Term::int(3));
        let other = Literal::new("point", [Term::int(4), Term::int(0)]).unwrap();
        assert!(ctx.bind(&p, Term::from(other)).is_err());
        assert_eq!(ctx.resolve(&Term::var(&p)), Term::from(given));
    }

    #[test]
    fn relocatable_variables_rebind_and_reset() {
        let i = Variable::named("I").relocatable();
        let n = Variable::named("N");
        let mut ctx = Context::default();
        ctx.bind(&n, Term::int(10)).unwrap();
        ctx.bind(&i, Term::int(1)).unwrap();
        ctx.bind(&i, Term::int(2)).unwrap();
        assert_eq!(ctx.resolve(&Term::var(&i)), Term::int(2));

        ctx.reset_relocatable();
        assert_eq!(ctx.bindings().len(), 1);
        assert_eq!(ctx.resolve(&Term::var(&n)), Term::int(10));
    }

    #[test]
    fn failed_relocation_keeps_previous_value() {
        let i = Variable::named("I").relocatable();
        let mut ctx = Context::default();
        ctx.bind(&i, Term::int(1)).unwrap();
        let cyclic = Literal::new("f", [Term::var(&i)]).unwrap();
        assert!(ctx.bind(&i, cyclic.into()).is_err());
        assert_eq!(ctx.resolve(&Term::var(&i)), Term::int(1));
    }

    #[test]
    fn duplicate_shares_no_variables() {
        let x = Variable::named("X");
        let y = Variable::named("Y");
        let mut ctx = Context::default();
        ctx.bind(&x, Literal::new("f", [Term::var(&y)]).unwrap().into())
            .unwrap();
        let (copy, renaming) = ctx.duplicate();
        let x2 = renaming.get(&x).cloned().unwrap();
        let y2 = renaming.get(&y).cloned().unwrap();
        assert!(copy.bindings().get(&x).is_none());
        assert_eq!(
            copy.resolve(&Term::var(&x2)),
            Literal::new("f", [Term::var(&y2)]).unwrap().into()
        );
    }

    #[test]
    fn popping_a_frame_forgets_its_locals() {
        let outer = Variable::named("Outer");
        let local = Variable::named("Local");
        let mut ctx = Context::default();
        ctx.bind(&outer, Term::int(1)).unwrap();
        ctx.push_frame("helper", vec![local.clone()]);
        ctx.bind(&local, Term::int(2)).unwrap();
        assert_eq!(ctx.call_stack().collect::<Vec<_>>(), vec!["helper"]);

        let frame = ctx.pop_frame().unwrap();
        assert_eq!(frame.name, "helper");
        assert!(!ctx.bindings().contains(&local));
        assert!(ctx.bindings().contains(&outer));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn merge_extends_bindings() {
        let x = Variable::named("X");
        let mut s = Substitution::new();
        s.bind(&x, Term::atom("a")).unwrap();
        let mut ctx = Context::default();
        ctx.merge(&s).unwrap();
        assert_eq!(ctx.apply(&Literal::new("p", [Term::var(&x)]).unwrap()).to_string(), "p(a)");
    }
}
