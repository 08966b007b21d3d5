//! Literal unification against candidate sets.
//!
//! [`Unifier::unify`] matches a query literal against a list of candidates
//! and lazily yields one [`Substitution`] per candidate that unifies. Two
//! algorithms are available and produce the same ordered results:
//!
//! - [`UnifyAlgorithm::HashIndexed`] partitions the candidates by shape and
//!   indexes ground argument values, then runs an iterative single-pass
//!   matcher over the surviving candidates.
//! - [`UnifyAlgorithm::Recursive`] scans every candidate with recursive
//!   descent and undoes failed bindings through a trail.
//!
//! Both walk arguments depth-first, left to right, and bind query-side
//! variables first when two unbound variables meet, so the substitutions
//! they produce are identical.

pub mod hash;
pub mod recursive;
pub mod substitution;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::context::CancellationToken;
use crate::term::{Literal, Term, Variable};

pub use substitution::Substitution;

/// Which matcher [`Unifier`] runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnifyAlgorithm {
    #[default]
    HashIndexed,
    Recursive,
}

impl std::fmt::Display for UnifyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnifyAlgorithm::HashIndexed => f.write_str("hash-indexed"),
            UnifyAlgorithm::Recursive => f.write_str("recursive"),
        }
    }
}

/// Entry point for literal unification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unifier {
    algorithm: UnifyAlgorithm,
}

impl Unifier {
    pub fn new(algorithm: UnifyAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> UnifyAlgorithm {
        self.algorithm
    }

    /// Unify `query` with every candidate, in candidate order.
    ///
    /// Candidates with a different functor, arity or polarity are skipped.
    /// Each yielded substitution extends `incoming` and is independent of
    /// the iterator's working state. Calling `unify` again starts a fresh
    /// pass.
    pub fn unify<'c, I>(&self, query: &Literal, candidates: I, incoming: &Substitution) -> Matches<'c>
    where
        I: IntoIterator<Item = &'c Literal>,
    {
        let candidates: Vec<&'c Literal> = candidates.into_iter().collect();
        let inner = match self.algorithm {
            UnifyAlgorithm::HashIndexed => {
                MatchesInner::Hash(hash::HashMatches::new(query.clone(), candidates, incoming.clone()))
            }
            UnifyAlgorithm::Recursive => MatchesInner::Recursive(recursive::RecursiveMatches::new(
                query.clone(),
                candidates,
                incoming.clone(),
            )),
        };
        Matches {
            inner,
            cancel: None,
            cancelled: false,
        }
    }

    /// Unify two literals directly.
    pub fn unify_pair(&self, a: &Literal, b: &Literal, incoming: &Substitution) -> Option<Substitution> {
        self.unify(a, std::iter::once(b), incoming).next()
    }
}

/// Lazy sequence of substitutions produced by [`Unifier::unify`].
pub struct Matches<'c> {
    inner: MatchesInner<'c>,
    cancel: Option<CancellationToken>,
    cancelled: bool,
}

enum MatchesInner<'c> {
    Hash(hash::HashMatches<'c>),
    Recursive(recursive::RecursiveMatches<'c>),
}

impl<'c> Matches<'c> {
    /// Stop yielding once `token` is cancelled. The token is checked before
    /// each substitution is produced.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether iteration ended because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of candidates that passed the shape pre-filter (and, for the
    /// hash-indexed matcher, the argument index).
    pub fn candidate_count(&self) -> usize {
        match &self.inner {
            MatchesInner::Hash(m) => m.candidate_count(),
            MatchesInner::Recursive(m) => m.candidate_count(),
        }
    }
}

impl Iterator for Matches<'_> {
    type Item = Substitution;

    fn next(&mut self) -> Option<Substitution> {
        if self.cancelled {
            return None;
        }
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                tracing::debug!("unification cancelled");
                self.cancelled = true;
                return None;
            }
        }
        match &mut self.inner {
            MatchesInner::Hash(m) => m.next(),
            MatchesInner::Recursive(m) => m.next(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared pairwise step
// ---------------------------------------------------------------------------

/// Result of comparing two dereferenced terms.
pub(crate) enum Leaf {
    Matched,
    Mismatch,
    Bind(Variable, Term),
    /// Both sides are literals of the same shape; compare arguments.
    Descend,
}

/// Resolve a variable through the substitution. Non-variables are
/// borrowed as they are.
pub(crate) fn deref<'a>(subst: &Substitution, term: &'a Term) -> Cow<'a, Term> {
    match term {
        Term::Variable(_) => Cow::Owned(subst.walk(term).clone()),
        other => Cow::Borrowed(other),
    }
}

/// Compare two dereferenced terms. `a` is the query side.
pub(crate) fn leaf(a: &Term, b: &Term) -> Leaf {
    match (a, b) {
        (Term::Variable(x), _) if x.is_anonymous() => Leaf::Matched,
        (_, Term::Variable(y)) if y.is_anonymous() => Leaf::Matched,
        (Term::Variable(x), Term::Variable(y)) if x == y => Leaf::Matched,
        (Term::Variable(x), other) => Leaf::Bind(x.clone(), other.clone()),
        (other, Term::Variable(y)) => Leaf::Bind(y.clone(), other.clone()),
        (Term::Literal(l), Term::Literal(r)) => {
            if l.same_shape(r) {
                Leaf::Descend
            } else {
                Leaf::Mismatch
            }
        }
        (l, r) => {
            if l == r {
                Leaf::Matched
            } else {
                Leaf::Mismatch
            }
        }
    }
}

/// Unify two terms in place. On failure `subst` may hold partial bindings.
pub(crate) fn unify_terms(a: &Term, b: &Term, subst: &mut Substitution) -> Option<()> {
    let mut trail = Vec::new();
    recursive::descend(a, b, subst, &mut trail).then_some(())
}
