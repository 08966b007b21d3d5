//! Hash-indexed single-pass matcher.
//!
//! Candidates are partitioned by `(functor, arity, polarity)`. Inside the
//! query's partition, every argument position keeps a map from ground
//! argument value to the candidates holding it, plus a list of candidates
//! whose argument at that position is not ground. Ground query positions
//! pick the smallest posting list; only those candidates are unified.
//! Posting lists hold candidate indices in ascending order, so declaration
//! order survives the index.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::term::{Literal, Path, Term};

use super::{Leaf, Substitution, deref, leaf};

type ShapeKey = (Path, usize, bool);

fn shape_of(literal: &Literal) -> ShapeKey {
    (literal.functor().clone(), literal.arity(), literal.is_negated())
}

#[derive(Debug, Default)]
struct Partition {
    members: Vec<usize>,
    /// position → ground value → candidate indices
    by_value: Vec<HashMap<Term, Vec<usize>>>,
    /// position → candidates with a non-ground argument there
    open: Vec<Vec<usize>>,
}

impl Partition {
    fn with_arity(arity: usize) -> Self {
        Self {
            members: Vec::new(),
            by_value: (0..arity).map(|_| HashMap::new()).collect(),
            open: vec![Vec::new(); arity],
        }
    }

    fn insert(&mut self, index: usize, literal: &Literal) {
        self.members.push(index);
        for (position, arg) in literal.args().iter().enumerate() {
            if arg.is_ground() {
                self.by_value[position]
                    .entry(arg.clone())
                    .or_default()
                    .push(index);
            } else {
                self.open[position].push(index);
            }
        }
    }

    /// Candidates that can match a ground `value` at `position`, ascending.
    fn postings(&self, position: usize, value: &Term) -> Vec<usize> {
        let exact = self.by_value[position]
            .get(value)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        merge_sorted(exact, &self.open[position])
    }
}

fn merge_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Shape partitions over a candidate list.
///
/// Built once per unification pass; can also be built once and queried
/// repeatedly through [`CandidateIndex::lookup`].
#[derive(Debug, Default)]
pub struct CandidateIndex {
    partitions: HashMap<ShapeKey, Partition>,
}

impl CandidateIndex {
    pub fn build<'c>(candidates: impl IntoIterator<Item = &'c Literal>) -> Self {
        let mut partitions: HashMap<ShapeKey, Partition> = HashMap::new();
        for (index, literal) in candidates.into_iter().enumerate() {
            partitions
                .entry(shape_of(literal))
                .or_insert_with(|| Partition::with_arity(literal.arity()))
                .insert(index, literal);
        }
        Self { partitions }
    }

    /// Indices of candidates worth unifying with `query` under `subst`,
    /// in ascending order.
    pub fn lookup(&self, query: &Literal, subst: &Substitution) -> Vec<usize> {
        let Some(partition) = self.partitions.get(&shape_of(query)) else {
            return Vec::new();
        };
        let mut best: Option<Vec<usize>> = None;
        for (position, arg) in query.args().iter().enumerate() {
            let value = subst.resolve_all(arg);
            if !value.is_ground() {
                continue;
            }
            let postings = partition.postings(position, &value);
            if best.as_ref().is_none_or(|b| postings.len() < b.len()) {
                best = Some(postings);
            }
        }
        best.unwrap_or_else(|| partition.members.clone())
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

pub(crate) struct HashMatches<'c> {
    query: Literal,
    candidates: Vec<&'c Literal>,
    selected: Vec<usize>,
    position: usize,
    incoming: Substitution,
}

impl<'c> HashMatches<'c> {
    pub(crate) fn new(query: Literal, candidates: Vec<&'c Literal>, incoming: Substitution) -> Self {
        let index = CandidateIndex::build(candidates.iter().copied());
        let selected = index.lookup(&query, &incoming);
        tracing::trace!(
            query = %query,
            candidates = candidates.len(),
            selected = selected.len(),
            "hash-indexed unification pass"
        );
        Self {
            query,
            candidates,
            selected,
            position: 0,
            incoming,
        }
    }

    pub(crate) fn candidate_count(&self) -> usize {
        self.selected.len()
    }
}

impl Iterator for HashMatches<'_> {
    type Item = Substitution;

    fn next(&mut self) -> Option<Substitution> {
        while self.position < self.selected.len() {
            let candidate = self.candidates[self.selected[self.position]];
            self.position += 1;
            if let Some(found) = single_pass(&self.query, candidate, &self.incoming) {
                return Some(found);
            }
        }
        None
    }
}

/// Iterative unification over an explicit work stack. Children are pushed
/// in reverse so pairs are visited depth-first, left to right.
fn single_pass(query: &Literal, candidate: &Literal, incoming: &Substitution) -> Option<Substitution> {
    let mut subst = incoming.clone();
    let mut stack: Vec<(Cow<'_, Term>, Cow<'_, Term>)> = query
        .args()
        .iter()
        .zip(candidate.args())
        .rev()
        .map(|(q, c)| (Cow::Borrowed(q), Cow::Borrowed(c)))
        .collect();

    while let Some((a, b)) = stack.pop() {
        let a = resolve(&subst, a);
        let b = resolve(&subst, b);
        match leaf(&a, &b) {
            Leaf::Matched => {}
            Leaf::Mismatch => return None,
            Leaf::Bind(var, value) => {
                if let Err(e) = subst.bind(&var, value) {
                    tracing::trace!(error = %e, "candidate rejected");
                    return None;
                }
            }
            Leaf::Descend => {
                let (Term::Literal(l), Term::Literal(r)) = (a.as_ref(), b.as_ref()) else {
                    return None;
                };
                for (x, y) in l.args().iter().zip(r.args()).rev() {
                    stack.push((Cow::Owned(x.clone()), Cow::Owned(y.clone())));
                }
            }
        }
    }
    Some(subst)
}

fn resolve<'a>(subst: &Substitution, term: Cow<'a, Term>) -> Cow<'a, Term> {
    match term {
        Cow::Borrowed(t) => deref(subst, t),
        Cow::Owned(t) => Cow::Owned(deref(subst, &t).into_owned()),
    }
}
