//! Plans, rules and their selection.
//!
//! - [`trigger`]: trigger kinds and the shape plans are indexed by
//! - [`rule`]: logic-programming style rules and their library
//! - [`statistic`]: per-plan success/failure counters
//! - [`select`]: [`Selector`], which turns a trigger into a ranked lazy
//!   sequence of applicable plans
//! - [`resolve`]: depth-bounded SLD resolution used for rule calls and
//!   plan guards
//!
//! Plans and libraries are immutable values. Self-modification produces a
//! new library through [`PlanLibrary::with_plan`] or
//! [`PlanLibrary::without_plan`].

pub mod resolve;
pub mod rule;
pub mod select;
pub mod statistic;
pub mod trigger;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::term::{Literal, Renaming};

pub use resolve::Resolution;
pub use rule::{Rule, RuleLibrary};
pub use select::{ApplicablePlan, ApplicablePlans, PlanRanking, Selector};
pub use statistic::{PlanStat, PlanStatistics};
pub use trigger::{Trigger, TriggerKind, TriggerShape};

// ---------------------------------------------------------------------------
// Plan identity
// ---------------------------------------------------------------------------

static NEXT_PLAN: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a plan, stable across library replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanId(u64);

impl PlanId {
    fn fresh() -> Self {
        PlanId(NEXT_PLAN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Guards and bodies
// ---------------------------------------------------------------------------

/// A context condition of a plan, or a goal in a rule body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Guard {
    /// The literal must be provable.
    Holds(Literal),
    /// Negation as failure: the literal must not be provable.
    NotHolds(Literal),
}

impl Guard {
    pub fn literal(&self) -> &Literal {
        match self {
            Guard::Holds(l) | Guard::NotHolds(l) => l,
        }
    }

    pub fn deep_copy_with(&self, renaming: &mut Renaming) -> Guard {
        match self {
            Guard::Holds(l) => Guard::Holds(l.deep_copy_with(renaming)),
            Guard::NotHolds(l) => Guard::NotHolds(l.deep_copy_with(renaming)),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Holds(l) => write!(f, "{l}"),
            Guard::NotHolds(l) => write!(f, "not {l}"),
        }
    }
}

/// Opaque executable body of a plan, interpreted outside this crate.
#[derive(Clone, Default)]
pub struct Body(Option<Arc<dyn Any + Send + Sync>>);

impl Body {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Body(Some(Arc::new(value)))
    }

    pub fn empty() -> Self {
        Body(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Body(empty)")
        } else {
            f.write_str("Body(..)")
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// A plan: the trigger it reacts to, its guards and an opaque body.
#[derive(Debug, Clone)]
pub struct Plan {
    id: PlanId,
    name: String,
    trigger: Trigger,
    guards: Vec<Guard>,
    body: Body,
}

impl Plan {
    pub fn new(name: &str, trigger: Trigger) -> Self {
        Self {
            id: PlanId::fresh(),
            name: name.to_string(),
            trigger,
            guards: Vec::new(),
            body: Body::empty(),
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn shape(&self) -> TriggerShape {
        self.trigger.shape()
    }

    /// Fresh copy of the trigger and guards for one selection attempt.
    /// Trigger and guards share a renaming, so variables they have in
    /// common stay linked.
    pub fn instantiate(&self) -> (Trigger, Vec<Guard>, Renaming) {
        let mut renaming = Renaming::new();
        let literal = self.trigger.literal().deep_copy_with(&mut renaming);
        let guards = self
            .guards
            .iter()
            .map(|g| g.deep_copy_with(&mut renaming))
            .collect();
        (self.trigger.with_literal(literal), guards, renaming)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} {}", self.name, self.trigger)?;
        for (i, guard) in self.guards.iter().enumerate() {
            f.write_str(if i == 0 { " : " } else { " & " })?;
            write!(f, "{guard}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plan library
// ---------------------------------------------------------------------------

/// An immutable, shape-indexed list of plans in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PlanLibrary {
    plans: Vec<Arc<Plan>>,
    index: HashMap<TriggerShape, Vec<usize>>,
}

impl PlanLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        Self::from_arcs(plans.into_iter().map(Arc::new).collect())
    }

    fn from_arcs(plans: Vec<Arc<Plan>>) -> Self {
        let mut index: HashMap<TriggerShape, Vec<usize>> = HashMap::new();
        for (position, plan) in plans.iter().enumerate() {
            index.entry(plan.shape()).or_default().push(position);
        }
        Self { plans, index }
    }

    /// A new library with `plan` appended.
    pub fn with_plan(&self, plan: Plan) -> Self {
        let mut plans = self.plans.clone();
        plans.push(Arc::new(plan));
        Self::from_arcs(plans)
    }

    /// A new library without the plan `id`.
    pub fn without_plan(&self, id: PlanId) -> Self {
        Self::from_arcs(
            self.plans
                .iter()
                .filter(|p| p.id() != id)
                .cloned()
                .collect(),
        )
    }

    /// Plans whose trigger has this shape, in declaration order.
    pub fn plans_for<'s>(&'s self, shape: &TriggerShape) -> impl Iterator<Item = &'s Arc<Plan>> + use<'s> {
        self.index
            .get(shape)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.plans[i])
    }

    pub fn get(&self, id: PlanId) -> Option<&Arc<Plan>> {
        self.plans.iter().find(|p| p.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Plan>> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
