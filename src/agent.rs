//! An agent: one belief store, its plan and rule libraries, and the queue
//! of triggers its belief changes produce.
//!
//! Agents are `Send + Sync` and meant to run on their own thread. Readers
//! (selection, queries, consistency scoring) work on snapshots, so they
//! never hold the belief lock while unifying.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use crate::beliefbase::{BeliefEvent, BeliefSnapshot, BeliefStore};
use crate::config::CredoConfig;
use crate::context::CancellationToken;
use crate::error::{BeliefResult, SelectResult};
use crate::plan::{
    ApplicablePlan, Guard, PlanId, PlanLibrary, PlanStatistics, RuleLibrary, Selector, Trigger,
};
use crate::term::{Literal, Path};
use crate::unify::Substitution;

pub struct Agent {
    name: String,
    beliefs: RwLock<BeliefStore>,
    plans: RwLock<Arc<PlanLibrary>>,
    rules: Arc<RuleLibrary>,
    statistics: Arc<PlanStatistics>,
    triggers: Mutex<VecDeque<Trigger>>,
    selector: Selector,
    cancel: CancellationToken,
}

impl Agent {
    pub fn new(name: &str, config: &CredoConfig, plans: PlanLibrary, rules: RuleLibrary) -> Self {
        let rules = Arc::new(rules);
        let statistics = Arc::new(PlanStatistics::new());
        let cancel = CancellationToken::new();
        let selector = Selector::from_config(config)
            .with_rules(Arc::clone(&rules))
            .with_statistics(Arc::clone(&statistics))
            .with_cancellation(cancel.clone());
        info!(
            agent = name,
            plans = plans.len(),
            rules = rules.len(),
            algorithm = %config.unifier.algorithm,
            "creating agent"
        );
        Self {
            name: name.to_string(),
            beliefs: RwLock::new(BeliefStore::with_config(&config.beliefs)),
            plans: RwLock::new(Arc::new(plans)),
            rules,
            statistics,
            triggers: Mutex::new(VecDeque::new()),
            selector,
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Beliefs
    // -----------------------------------------------------------------------

    pub fn add_belief(&self, literal: Literal) -> Option<BeliefEvent> {
        let event = self.write_beliefs().add(literal);
        self.enqueue(event.as_ref());
        event
    }

    pub fn remove_belief(&self, literal: &Literal) -> Option<BeliefEvent> {
        let event = self.write_beliefs().remove(literal);
        self.enqueue(event.as_ref());
        event
    }

    /// Atomic retract-and-assert; enqueues at most one trigger.
    pub fn replace_belief(&self, old: &Literal, new: Literal) -> Option<BeliefEvent> {
        let event = self.write_beliefs().replace(old, new);
        self.enqueue(event.as_ref());
        event
    }

    /// Post an achievement goal.
    pub fn add_goal(&self, goal: Literal) {
        self.push_trigger(Trigger::goal_added(goal));
    }

    pub fn push_trigger(&self, trigger: Trigger) {
        debug!(agent = %self.name, %trigger, "trigger queued");
        self.triggers
            .lock()
            .expect("trigger queue lock poisoned")
            .push_back(trigger);
    }

    fn enqueue(&self, event: Option<&BeliefEvent>) {
        if let Some(trigger) = event.and_then(BeliefEvent::trigger) {
            self.push_trigger(trigger);
        }
    }

    fn write_beliefs(&self) -> std::sync::RwLockWriteGuard<'_, BeliefStore> {
        self.beliefs.write().expect("belief store lock poisoned")
    }

    /// Oldest pending trigger.
    pub fn next_trigger(&self) -> Option<Trigger> {
        self.triggers
            .lock()
            .expect("trigger queue lock poisoned")
            .pop_front()
    }

    pub fn pending_triggers(&self) -> usize {
        self.triggers.lock().expect("trigger queue lock poisoned").len()
    }

    /// Point-in-time view of the whole belief store.
    pub fn snapshot(&self) -> BeliefSnapshot {
        self.beliefs.read().expect("belief store lock poisoned").snapshot()
    }

    pub fn view(&self, path: &Path) -> BeliefResult<BeliefSnapshot> {
        self.beliefs.read().expect("belief store lock poisoned").view(path)
    }

    pub fn contains(&self, literal: &Literal) -> bool {
        self.beliefs
            .read()
            .expect("belief store lock poisoned")
            .contains(literal)
    }

    // -----------------------------------------------------------------------
    // Plans and rules
    // -----------------------------------------------------------------------

    /// The current plan library. Later modifications do not affect it.
    pub fn plans(&self) -> Arc<PlanLibrary> {
        Arc::clone(&self.plans.read().expect("plan library lock poisoned"))
    }

    pub fn rules(&self) -> &Arc<RuleLibrary> {
        &self.rules
    }

    /// Replace the plan library with `f(current)`. Selections already under
    /// way keep the library they started with.
    pub fn modify_plans(&self, f: impl FnOnce(&PlanLibrary) -> PlanLibrary) {
        let mut plans = self.plans.write().expect("plan library lock poisoned");
        let next = f(&plans);
        debug!(agent = %self.name, before = plans.len(), after = next.len(), "plan library replaced");
        *plans = Arc::new(next);
    }

    pub fn statistics(&self) -> &Arc<PlanStatistics> {
        &self.statistics
    }

    /// Report how a selected plan's body ended.
    pub fn record_outcome(&self, plan: PlanId, success: bool) {
        if success {
            self.statistics.record_success(plan);
        } else {
            self.statistics.record_failure(plan);
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    // -----------------------------------------------------------------------
    // Reasoning
    // -----------------------------------------------------------------------

    /// All applicable plans for `trigger`, best first, against a fresh
    /// snapshot of the beliefs.
    pub fn applicable_plans(&self, trigger: &Trigger) -> SelectResult<Vec<ApplicablePlan>> {
        let plans = self.plans();
        let snapshot = self.snapshot();
        self.selector
            .applicable_plans(trigger, &plans, &snapshot)
            .collect()
    }

    /// Take the next trigger and select the best plan for it.
    ///
    /// Returns `None` when the queue is empty. A trigger without applicable
    /// plans comes back paired with `None` (or an error in strict mode).
    pub fn step(&self) -> Option<(Trigger, SelectResult<Option<ApplicablePlan>>)> {
        let trigger = self.next_trigger()?;
        let plans = self.plans();
        let snapshot = self.snapshot();
        let selected = self
            .selector
            .applicable_plans(&trigger, &plans, &snapshot)
            .next()
            .transpose();
        Some((trigger, selected))
    }

    /// Every solution of `goal` over beliefs and rules.
    pub fn query(&self, goal: &Literal) -> SelectResult<Vec<Substitution>> {
        let snapshot = self.snapshot();
        self.selector
            .solve(&[Guard::Holds(goal.clone())], &snapshot, &Substitution::new())
            .collect()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .field("pending_triggers", &self.pending_triggers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectError;
    use crate::plan::{Plan, Rule, TriggerKind};
    use crate::term::{Term, Variable};

    fn lit(functor: &str, args: Vec<Term>) -> Literal {
        Literal::new(functor, args).unwrap()
    }

    fn agent() -> Agent {
        let x = Variable::named("X");
        let plans = PlanLibrary::from_plans([
            Plan::new("greet", Trigger::belief_added(lit("seen", vec![Term::var(&x)]))),
            Plan::new("tidy", Trigger::goal_added(lit("clean", vec![Term::var(&x)])))
                .with_guard(Guard::Holds(lit("dirty", vec![Term::var(&x)]))),
        ]);
        let rules = RuleLibrary::from_rules([Rule::new(
            lit("dirty", vec![Term::var(&x)]),
            [Guard::Holds(lit("mud", vec![Term::var(&x)]))],
        )]);
        Agent::new("bob", &CredoConfig::default(), plans, rules)
    }

    #[test]
    fn belief_changes_queue_triggers_in_order() {
        let agent = agent();
        agent.add_belief(lit("seen", vec![Term::atom("alice")]));
        agent.add_belief(lit("seen", vec![Term::atom("alice")]));
        agent.remove_belief(&lit("seen", vec![Term::atom("carol")]));
        agent.replace_belief(
            &lit("seen", vec![Term::atom("alice")]),
            lit("seen", vec![Term::atom("dave")]),
        );
        assert_eq!(agent.pending_triggers(), 2);

        let first = agent.next_trigger().unwrap();
        assert_eq!(first.kind(), TriggerKind::BeliefAdded);
        assert_eq!(first.literal(), &lit("seen", vec![Term::atom("alice")]));
        let second = agent.next_trigger().unwrap();
        assert_eq!(second.literal(), &lit("seen", vec![Term::atom("dave")]));
        assert!(agent.next_trigger().is_none());
    }

    #[test]
    fn step_selects_a_plan_for_the_oldest_trigger() {
        let agent = agent();
        agent.add_belief(lit("seen", vec![Term::atom("alice")]));
        let (trigger, selected) = agent.step().unwrap();
        assert_eq!(trigger.kind(), TriggerKind::BeliefAdded);
        let selected = selected.unwrap().unwrap();
        assert_eq!(selected.plan.name(), "greet");
        assert_eq!(selected.value_of("X"), Some(Term::atom("alice")));
        assert!(agent.step().is_none());
    }

    #[test]
    fn goal_guards_use_rules() {
        let agent = agent();
        agent.add_goal(lit("clean", vec![Term::atom("kitchen")]));
        let (_, selected) = agent.step().unwrap();
        assert!(selected.unwrap().is_none());

        agent.add_belief(lit("mud", vec![Term::atom("kitchen")]));
        let plans = agent
            .applicable_plans(&Trigger::goal_added(lit("clean", vec![Term::atom("kitchen")])))
            .unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan.name(), "tidy");
    }

    #[test]
    fn query_uses_beliefs_and_rules() {
        let agent = agent();
        agent.add_belief(lit("mud", vec![Term::atom("hall")]));
        agent.add_belief(lit("mud", vec![Term::atom("yard")]));
        let x = Variable::named("X");
        let answers = agent.query(&lit("dirty", vec![Term::var(&x)])).unwrap();
        assert_eq!(answers.len(), 2);
    }

    #[test]
    fn modify_plans_leaves_earlier_handles_untouched() {
        let agent = agent();
        let before = agent.plans();
        let greet = before.iter().next().unwrap().id();
        agent.modify_plans(|plans| plans.without_plan(greet));
        assert_eq!(before.len(), 2);
        assert_eq!(agent.plans().len(), 1);
        assert!(
            agent
                .applicable_plans(&Trigger::belief_added(lit("seen", vec![Term::atom("x")])))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn cancelled_agent_reports_cancellation() {
        let agent = agent();
        agent.cancellation().cancel();
        let err = agent
            .applicable_plans(&Trigger::belief_added(lit("seen", vec![Term::atom("x")])))
            .unwrap_err();
        assert_eq!(err, SelectError::Cancelled);
    }

    #[test]
    fn agents_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Agent>();
    }
}
