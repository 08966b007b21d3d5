//! Depth-bounded SLD resolution.
//!
//! A [`Resolution`] proves a conjunction of goals against a belief snapshot
//! and a rule library, depth first and left to right, yielding one
//! substitution per proof. Goals are matched against beliefs first and then
//! against rule heads, in declaration order.
//!
//! Every rule expansion deepens the call by one. When a goal would need a
//! rule expansion at the depth limit, the sequence yields
//! `Err(RecursionBudgetExceeded)` in place of that branch and carries on
//! with the remaining alternatives. Cancellation and the step budget end
//! the sequence.

use crate::beliefbase::BeliefSnapshot;
use crate::context::{Budget, CancellationToken};
use crate::error::{SelectError, SelectResult};
use crate::term::{Literal, Variable};
use crate::unify::{Substitution, Unifier};

use super::{Guard, RuleLibrary};

#[derive(Debug, Clone)]
struct Pending {
    guard: Guard,
    depth: usize,
}

#[derive(Debug)]
enum Choice {
    /// Goals still to prove (next goal last) under a substitution.
    Goals {
        pending: Vec<Pending>,
        subst: Substitution,
    },
    /// A rule call that hit the depth limit.
    Exceeded { call: String },
}

/// Lazy sequence of proofs.
pub struct Resolution<'a> {
    unifier: Unifier,
    rules: &'a RuleLibrary,
    beliefs: &'a BeliefSnapshot,
    budget: Budget,
    cancel: CancellationToken,
    stack: Vec<Choice>,
    keep: Vec<Variable>,
    steps: u64,
    attempts: usize,
    finished: bool,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(
        unifier: Unifier,
        rules: &'a RuleLibrary,
        beliefs: &'a BeliefSnapshot,
        budget: Budget,
        cancel: CancellationToken,
        goals: &[Guard],
        incoming: &Substitution,
    ) -> Self {
        let mut keep: Vec<Variable> = incoming.iter().map(|(v, _)| v.clone()).collect();
        for goal in goals {
            for var in goal.literal().variables() {
                if !keep.contains(&var) {
                    keep.push(var);
                }
            }
        }
        let pending = goals
            .iter()
            .rev()
            .map(|g| Pending {
                guard: g.clone(),
                depth: 0,
            })
            .collect();
        Self {
            unifier,
            rules,
            beliefs,
            budget,
            cancel,
            stack: vec![Choice::Goals {
                pending,
                subst: incoming.clone(),
            }],
            keep,
            steps: 0,
            attempts: 0,
            finished: false,
        }
    }

    /// Rule expansions performed so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Goals expanded so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn fail(&mut self, error: SelectError) -> Option<SelectResult<Substitution>> {
        tracing::warn!(error = %error, steps = self.steps, "resolution stopped");
        self.finished = true;
        self.stack.clear();
        Some(Err(error))
    }

    fn expand(&mut self, goal: Pending, rest: Vec<Pending>, subst: Substitution) -> SelectResult<()> {
        let mut children = Vec::new();
        match goal.guard {
            Guard::Holds(literal) => {
                for found in self
                    .unifier
                    .unify(&literal, self.beliefs.candidates(&literal), &subst)
                {
                    children.push(Choice::Goals {
                        pending: rest.clone(),
                        subst: found,
                    });
                }
                self.expand_rules(&literal, goal.depth, &rest, &subst, &mut children);
            }
            Guard::NotHolds(literal) => {
                if !self.provable(&literal, goal.depth, &subst)? {
                    children.push(Choice::Goals {
                        pending: rest,
                        subst,
                    });
                }
            }
        }
        self.stack.extend(children.into_iter().rev());
        Ok(())
    }

    fn expand_rules(
        &mut self,
        literal: &Literal,
        depth: usize,
        rest: &[Pending],
        subst: &Substitution,
        children: &mut Vec<Choice>,
    ) {
        let rules = self.rules;
        let mut matching = rules.matching(literal).peekable();
        if matching.peek().is_none() {
            return;
        }
        if depth >= self.budget.max_rule_depth {
            children.push(Choice::Exceeded {
                call: subst.apply(literal).to_string(),
            });
            return;
        }
        for rule in matching {
            let (head, body) = rule.instantiate();
            let Some(unified) = self.unifier.unify_pair(literal, &head, subst) else {
                continue;
            };
            self.attempts += 1;
            tracing::trace!(call = %subst.apply(literal), rule = %rule, depth, "rule expansion");
            let mut pending = rest.to_vec();
            pending.extend(body.into_iter().rev().map(|guard| Pending {
                guard,
                depth: depth + 1,
            }));
            children.push(Choice::Goals {
                pending,
                subst: unified,
            });
        }
    }

    /// Negation as failure: whether `literal` has at least one proof. A
    /// branch that only runs out of depth does not count as a proof.
    fn provable(&mut self, literal: &Literal, depth: usize, subst: &Substitution) -> SelectResult<bool> {
        let mut nested = Resolution::new(
            self.unifier,
            self.rules,
            self.beliefs,
            self.budget,
            self.cancel.clone(),
            &[],
            subst,
        );
        nested.stack = vec![Choice::Goals {
            pending: vec![Pending {
                guard: Guard::Holds(literal.clone()),
                depth,
            }],
            subst: subst.clone(),
        }];
        nested.steps = self.steps;
        let mut outcome = Ok(false);
        for result in nested.by_ref() {
            match result {
                Ok(_) => {
                    outcome = Ok(true);
                    break;
                }
                Err(SelectError::RecursionBudgetExceeded { .. }) => {}
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.steps = nested.steps;
        self.attempts += nested.attempts;
        outcome
    }
}

impl Iterator for Resolution<'_> {
    type Item = SelectResult<Substitution>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if let Err(e) = self.cancel.check() {
                return self.fail(e);
            }
            let Some(choice) = self.stack.pop() else {
                self.finished = true;
                return None;
            };
            match choice {
                Choice::Exceeded { call } => {
                    tracing::warn!(call = %call, depth = self.budget.max_rule_depth, "rule depth budget exceeded");
                    return Some(Err(SelectError::RecursionBudgetExceeded {
                        call,
                        depth: self.budget.max_rule_depth,
                    }));
                }
                Choice::Goals { mut pending, subst } => {
                    let Some(goal) = pending.pop() else {
                        return Some(Ok(subst.project(&self.keep)));
                    };
                    self.steps += 1;
                    if let Err(e) = self.budget.check_steps(self.steps) {
                        return self.fail(e);
                    }
                    if let Err(e) = self.expand(goal, pending, subst) {
                        return self.fail(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beliefbase::BeliefStore;
    use crate::plan::Rule;
    use crate::term::Term;
    use crate::unify::UnifyAlgorithm;

    fn lit(functor: &str, args: Vec<Term>) -> Literal {
        Literal::new(functor, args).unwrap()
    }

    fn run<'a>(
        rules: &'a RuleLibrary,
        beliefs: &'a BeliefSnapshot,
        budget: Budget,
        goals: &[Guard],
    ) -> Resolution<'a> {
        Resolution::new(
            Unifier::new(UnifyAlgorithm::Recursive),
            rules,
            beliefs,
            budget,
            CancellationToken::new(),
            goals,
            &Substitution::new(),
        )
    }

    /// parent/2 facts plus ancestor/2 defined recursively.
    fn family() -> (RuleLibrary, BeliefSnapshot) {
        let store = BeliefStore::from_literals([
            lit("parent", vec![Term::atom("ann"), Term::atom("bob")]),
            lit("parent", vec![Term::atom("bob"), Term::atom("cid")]),
            lit("parent", vec![Term::atom("cid"), Term::atom("dan")]),
        ]);
        let (x, y, z) = (Variable::named("X"), Variable::named("Y"), Variable::named("Z"));
        let rules = RuleLibrary::from_rules([
            Rule::new(
                lit("ancestor", vec![Term::var(&x), Term::var(&y)]),
                [Guard::Holds(lit("parent", vec![Term::var(&x), Term::var(&y)]))],
            ),
            Rule::new(
                lit("ancestor", vec![Term::var(&x), Term::var(&z)]),
                [
                    Guard::Holds(lit("parent", vec![Term::var(&x), Term::var(&y)])),
                    Guard::Holds(lit("ancestor", vec![Term::var(&y), Term::var(&z)])),
                ],
            ),
        ]);
        (rules, store.snapshot())
    }

    #[test]
    fn recursive_rules_enumerate_in_order() {
        let (rules, beliefs) = family();
        let who = Variable::named("Who");
        let goal = Guard::Holds(lit("ancestor", vec![Term::atom("ann"), Term::var(&who)]));
        let found: Vec<Term> = run(&rules, &beliefs, Budget::default(), &[goal])
            .map(|r| r.unwrap().value_of(&who).unwrap())
            .collect();
        assert_eq!(found, vec![Term::atom("bob"), Term::atom("cid"), Term::atom("dan")]);
    }

    #[test]
    fn results_only_bind_query_variables() {
        let (rules, beliefs) = family();
        let who = Variable::named("Who");
        let goal = Guard::Holds(lit("ancestor", vec![Term::atom("ann"), Term::var(&who)]));
        for result in run(&rules, &beliefs, Budget::default(), &[goal]) {
            let subst = result.unwrap();
            assert_eq!(subst.len(), 1);
        }
    }

    #[test]
    fn rule_without_base_case_stops_after_budget() {
        let rules = RuleLibrary::from_rules([Rule::new(
            lit("loop", vec![]),
            [Guard::Holds(lit("loop", vec![]))],
        )]);
        let beliefs = BeliefStore::new().snapshot();
        for depth in [0, 1, 5, 20] {
            let mut resolution = run(
                &rules,
                &beliefs,
                Budget::with_depth(depth),
                &[Guard::Holds(lit("loop", vec![]))],
            );
            let results: Vec<_> = resolution.by_ref().collect();
            assert_eq!(results.len(), 1);
            assert!(matches!(
                &results[0],
                Err(SelectError::RecursionBudgetExceeded { depth: d, .. }) if *d == depth
            ));
            assert_eq!(resolution.attempts(), depth);
        }
    }

    #[test]
    fn budget_error_does_not_hide_other_proofs() {
        let rules = RuleLibrary::from_rules([Rule::new(
            lit("p", vec![]),
            [Guard::Holds(lit("p", vec![]))],
        )]);
        let beliefs = BeliefStore::from_literals([lit("p", vec![])]).snapshot();
        let results: Vec<_> = run(
            &rules,
            &beliefs,
            Budget::with_depth(2),
            &[Guard::Holds(lit("p", vec![]))],
        )
        .collect();
        // one proof per depth from the belief, then the exhausted branch
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
        assert!(results.last().is_some_and(|r| r.is_err()));
    }

    #[test]
    fn negation_as_failure() {
        let beliefs = BeliefStore::from_literals([
            lit("bird", vec![Term::atom("tweety")]),
            lit("bird", vec![Term::atom("pingu")]),
            lit("penguin", vec![Term::atom("pingu")]),
        ])
        .snapshot();
        let rules = RuleLibrary::new();
        let b = Variable::named("B");
        let goals = [
            Guard::Holds(lit("bird", vec![Term::var(&b)])),
            Guard::NotHolds(lit("penguin", vec![Term::var(&b)])),
        ];
        let flyers: Vec<Term> = run(&rules, &beliefs, Budget::default(), &goals)
            .map(|r| r.unwrap().value_of(&b).unwrap())
            .collect();
        assert_eq!(flyers, vec![Term::atom("tweety")]);
    }

    #[test]
    fn step_budget_ends_the_sequence() {
        let (rules, beliefs) = family();
        let who = Variable::named("Who");
        let goal = Guard::Holds(lit("ancestor", vec![Term::atom("ann"), Term::var(&who)]));
        let results: Vec<_> = run(&rules, &beliefs, Budget::default().with_steps(2), &[goal]).collect();
        assert!(matches!(
            results.last(),
            Some(Err(SelectError::StepBudgetExceeded { steps: 2 }))
        ));
    }

    #[test]
    fn cancellation_is_observed_between_proofs() {
        let (rules, beliefs) = family();
        let who = Variable::named("Who");
        let goal = Guard::Holds(lit("ancestor", vec![Term::atom("ann"), Term::var(&who)]));
        let token = CancellationToken::new();
        let mut resolution = Resolution::new(
            Unifier::default(),
            &rules,
            &beliefs,
            Budget::default(),
            token.clone(),
            &[goal],
            &Substitution::new(),
        );
        assert!(resolution.next().is_some_and(|r| r.is_ok()));
        token.cancel();
        assert_eq!(resolution.next(), Some(Err(SelectError::Cancelled)));
        assert_eq!(resolution.next(), None);
    }
}
