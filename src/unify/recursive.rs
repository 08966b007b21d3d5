//! Recursive backtracking matcher.
//!
//! No pre-indexing: every candidate of the right shape is tried with
//! argument-by-argument recursive descent. Bindings made during an attempt
//! are recorded on a trail and undone when the attempt fails, so one
//! working substitution is reused across the whole scan.

use crate::term::{Literal, Term, VarId};

use super::{Leaf, Substitution, deref, leaf};

pub(crate) struct RecursiveMatches<'c> {
    query: Literal,
    candidates: Vec<&'c Literal>,
    position: usize,
    working: Substitution,
    trail: Vec<VarId>,
}

impl<'c> RecursiveMatches<'c> {
    pub(crate) fn new(query: Literal, candidates: Vec<&'c Literal>, incoming: Substitution) -> Self {
        let candidates: Vec<&'c Literal> = candidates
            .into_iter()
            .filter(|c| c.same_shape(&query))
            .collect();
        tracing::trace!(
            query = %query,
            candidates = candidates.len(),
            "recursive unification pass"
        );
        Self {
            query,
            candidates,
            position: 0,
            working: incoming,
            trail: Vec::new(),
        }
    }

    pub(crate) fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn attempt(&mut self, candidate: &Literal) -> Option<Substitution> {
        let mark = self.trail.len();
        let matched = self
            .query
            .args()
            .iter()
            .zip(candidate.args())
            .all(|(q, c)| descend(q, c, &mut self.working, &mut self.trail));
        let snapshot = matched.then(|| self.working.clone());
        undo(&mut self.working, &mut self.trail, mark);
        snapshot
    }
}

impl Iterator for RecursiveMatches<'_> {
    type Item = Substitution;

    fn next(&mut self) -> Option<Substitution> {
        while self.position < self.candidates.len() {
            let candidate = self.candidates[self.position];
            self.position += 1;
            if let Some(found) = self.attempt(candidate) {
                return Some(found);
            }
        }
        None
    }
}

/// Unify `a` (query side) with `b`, recording new bindings on `trail`.
pub(crate) fn descend(a: &Term, b: &Term, subst: &mut Substitution, trail: &mut Vec<VarId>) -> bool {
    let a = deref(subst, a);
    let b = deref(subst, b);
    match leaf(&a, &b) {
        Leaf::Matched => true,
        Leaf::Mismatch => false,
        Leaf::Bind(var, value) => match subst.bind(&var, value) {
            Ok(()) => {
                trail.push(var.id());
                true
            }
            Err(e) => {
                tracing::trace!(error = %e, "candidate rejected");
                false
            }
        },
        Leaf::Descend => match (a.as_ref(), b.as_ref()) {
            (Term::Literal(l), Term::Literal(r)) => l
                .args()
                .iter()
                .zip(r.args())
                .all(|(x, y)| descend(x, y, subst, trail)),
            _ => false,
        },
    }
}

fn undo(subst: &mut Substitution, trail: &mut Vec<VarId>, mark: usize) {
    for id in trail.drain(mark..) {
        subst.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Variable;

    #[test]
    fn failed_attempt_leaves_no_bindings_behind() {
        let x = Variable::named("X");
        let y = Variable::named("Y");
        let query = Literal::new("p", [Term::var(&x), Term::var(&y), Term::int(9)]).unwrap();
        let wrong = Literal::new("p", [Term::int(1), Term::int(2), Term::int(3)]).unwrap();
        let right = Literal::new("p", [Term::int(4), Term::int(5), Term::int(9)]).unwrap();

        let mut matches =
            RecursiveMatches::new(query, vec![&wrong, &right], Substitution::new());
        let found = matches.next().unwrap();
        assert_eq!(found.value_of(&x), Some(Term::int(4)));
        assert_eq!(found.value_of(&y), Some(Term::int(5)));
        assert_eq!(found.len(), 2);
        assert!(matches.next().is_none());
        assert!(matches.working.is_empty());
    }
}
