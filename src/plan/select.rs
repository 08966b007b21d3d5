//! Plan selection.
//!
//! For an incoming trigger the [`Selector`]:
//!
//! 1. looks up the plans indexed under the trigger's shape,
//! 2. ranks them (declaration order unless configured otherwise),
//! 3. unifies each plan's freshly copied trigger literal with the event,
//! 4. proves the plan's guards against the belief snapshot and the rule
//!    library, keeping the first solution,
//! 5. yields the survivors one at a time.
//!
//! Nothing is cached between calls: a retry after a failed plan body calls
//! [`Selector::applicable_plans`] again and sees the current beliefs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::beliefbase::BeliefSnapshot;
use crate::config::CredoConfig;
use crate::context::{Budget, CancellationToken, Context};
use crate::error::{SelectError, SelectResult};
use crate::term::{Literal, Renaming};
use crate::unify::{Substitution, Unifier};

use super::{Guard, Plan, PlanLibrary, PlanStatistics, Resolution, RuleLibrary, Trigger};

/// Order in which applicable plans are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanRanking {
    /// Declaration order.
    #[default]
    Declaration,
    /// Highest success ratio first; declaration order breaks ties.
    SuccessRatio,
}

/// A plan whose trigger matched and whose guards hold.
#[derive(Debug, Clone)]
pub struct ApplicablePlan {
    pub plan: Arc<Plan>,
    /// Bindings of the plan's fresh variables (and of the event's).
    pub substitution: Substitution,
    /// Maps the plan's declared variables onto the fresh ones the
    /// substitution talks about.
    pub renaming: Renaming,
}

impl ApplicablePlan {
    /// An execution context for running this plan's body.
    pub fn context(&self, beliefs: BeliefSnapshot) -> Context {
        Context::new(beliefs).with_bindings(self.substitution.clone())
    }

    /// The value a variable declared in the plan was bound to.
    pub fn value_of(&self, name: &str) -> Option<crate::term::Term> {
        let fresh = self.renaming.by_name(name)?;
        self.substitution.value_of(fresh)
    }
}

/// Stateless plan and rule selector.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    unifier: Unifier,
    ranking: PlanRanking,
    strict: bool,
    budget: Budget,
    cancel: CancellationToken,
    statistics: Option<Arc<PlanStatistics>>,
    rules: Arc<RuleLibrary>,
}

impl Selector {
    pub fn new(unifier: Unifier) -> Self {
        Self {
            unifier,
            ..Self::default()
        }
    }

    pub fn from_config(config: &CredoConfig) -> Self {
        Self::new(Unifier::new(config.unifier.algorithm))
            .with_ranking(config.selector.ranking)
            .with_strict(config.selector.strict)
            .with_budget(config.selector.budget())
    }

    pub fn with_ranking(mut self, ranking: PlanRanking) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_statistics(mut self, statistics: Arc<PlanStatistics>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Rules available to guards.
    pub fn with_rules(mut self, rules: Arc<RuleLibrary>) -> Self {
        self.rules = rules;
        self
    }

    pub fn unifier(&self) -> Unifier {
        self.unifier
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Lazily yield the applicable plans for `trigger`, best first.
    ///
    /// Errors are `Cancelled`, `StepBudgetExceeded` and, in strict mode,
    /// `NoApplicablePlan`; each ends the sequence. A plan whose guard only
    /// fails by running out of rule depth is skipped.
    pub fn applicable_plans<'a>(
        &'a self,
        trigger: &Trigger,
        library: &PlanLibrary,
        beliefs: &'a BeliefSnapshot,
    ) -> ApplicablePlans<'a> {
        let mut candidates: Vec<Arc<Plan>> = library.plans_for(&trigger.shape()).cloned().collect();
        if let (PlanRanking::SuccessRatio, Some(stats)) = (self.ranking, &self.statistics) {
            candidates.sort_by(|a, b| {
                let ra = stats.get(a.id()).success_ratio();
                let rb = stats.get(b.id()).success_ratio();
                rb.total_cmp(&ra)
            });
        }
        tracing::debug!(
            trigger = %trigger,
            candidates = candidates.len(),
            ranking = ?self.ranking,
            "selecting plans"
        );
        ApplicablePlans {
            selector: self,
            beliefs,
            trigger: trigger.clone(),
            candidates: candidates.into_iter(),
            yielded: 0,
            finished: false,
        }
    }

    /// Resolve a rule call against `rules` and `beliefs` within
    /// `max_depth` nested rule expansions.
    pub fn resolve_rule<'a>(
        &self,
        call: &Literal,
        rules: &'a RuleLibrary,
        beliefs: &'a BeliefSnapshot,
        max_depth: usize,
    ) -> Resolution<'a> {
        self.resolve_rule_with(call, rules, beliefs, max_depth, &Substitution::new())
    }

    /// [`resolve_rule`](Self::resolve_rule) starting from existing bindings.
    pub fn resolve_rule_with<'a>(
        &self,
        call: &Literal,
        rules: &'a RuleLibrary,
        beliefs: &'a BeliefSnapshot,
        max_depth: usize,
        incoming: &Substitution,
    ) -> Resolution<'a> {
        let budget = Budget {
            max_rule_depth: max_depth,
            ..self.budget
        };
        Resolution::new(
            self.unifier,
            rules,
            beliefs,
            budget,
            self.cancel.clone(),
            &[Guard::Holds(call.clone())],
            incoming,
        )
    }

    /// Prove a conjunction of goals with the selector's own rules.
    pub fn solve<'a>(
        &'a self,
        goals: &[Guard],
        beliefs: &'a BeliefSnapshot,
        incoming: &Substitution,
    ) -> Resolution<'a> {
        Resolution::new(
            self.unifier,
            &self.rules,
            beliefs,
            self.budget,
            self.cancel.clone(),
            goals,
            incoming,
        )
    }

    /// Trigger unification plus guards for one plan.
    fn try_plan(&self, plan: &Arc<Plan>, trigger: &Trigger, beliefs: &BeliefSnapshot) -> SelectResult<Option<ApplicablePlan>> {
        let (head, guards, renaming) = plan.instantiate();
        let Some(bound) = self
            .unifier
            .unify_pair(head.literal(), trigger.literal(), &Substitution::new())
        else {
            tracing::trace!(plan = %plan.name(), "trigger does not unify");
            return Ok(None);
        };

        let mut exhausted = None;
        for solution in self.solve(&guards, beliefs, &bound) {
            match solution {
                Ok(substitution) => {
                    return Ok(Some(ApplicablePlan {
                        plan: Arc::clone(plan),
                        substitution,
                        renaming,
                    }));
                }
                Err(e @ SelectError::RecursionBudgetExceeded { .. }) => {
                    exhausted.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        match exhausted {
            Some(e) => tracing::warn!(plan = %plan.name(), error = %e, "guard ran out of rule depth"),
            None => tracing::trace!(plan = %plan.name(), "guards do not hold"),
        }
        Ok(None)
    }
}

/// Lazy, ranked sequence of applicable plans.
pub struct ApplicablePlans<'a> {
    selector: &'a Selector,
    beliefs: &'a BeliefSnapshot,
    trigger: Trigger,
    candidates: std::vec::IntoIter<Arc<Plan>>,
    yielded: usize,
    finished: bool,
}

impl ApplicablePlans<'_> {
    /// Candidates not tried yet.
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }
}

impl Iterator for ApplicablePlans<'_> {
    type Item = SelectResult<ApplicablePlan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Err(e) = self.selector.cancel.check() {
                tracing::warn!(trigger = %self.trigger, "plan selection cancelled");
                self.finished = true;
                return Some(Err(e));
            }
            let Some(plan) = self.candidates.next() else {
                self.finished = true;
                if self.selector.strict && self.yielded == 0 {
                    return Some(Err(SelectError::NoApplicablePlan {
                        trigger: self.trigger.to_string(),
                    }));
                }
                if self.yielded == 0 {
                    tracing::debug!(trigger = %self.trigger, "no applicable plan");
                }
                return None;
            };
            match self.selector.try_plan(&plan, &self.trigger, self.beliefs) {
                Ok(Some(applicable)) => {
                    self.yielded += 1;
                    return Some(Ok(applicable));
                }
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
