//! Belief-set consistency: pairwise distances and multi-store scoring.
//!
//! [`score`] compares two snapshots under a [`Metric`] after applying the
//! same [`Filter`] to both. [`ConsistencyEngine`] scores a whole population
//! of stores at once and turns the pairwise distance matrix into one
//! consistency value per store.

pub mod markov;
pub mod metric;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beliefbase::BeliefSnapshot;
use crate::error::{ConsistencyError, ConsistencyResult};
use crate::term::{Literal, Path};

pub use markov::{ConsistencyEngine, ConsistencyReport, Stationary, Statistics};
pub use metric::{Compression, Metric, MetricKind};

/// Filter names as they appear in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    All,
    Positive,
    Paths,
}

/// Selects which beliefs take part in a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// Every visible belief.
    #[default]
    All,
    /// Only beliefs without strong negation.
    Positive,
    /// Only beliefs whose functor lies under one of these paths.
    Paths(Vec<Path>),
}

impl Filter {
    pub fn from_kind(kind: FilterKind, paths: &[Path]) -> Self {
        match kind {
            FilterKind::All => Filter::All,
            FilterKind::Positive => Filter::Positive,
            FilterKind::Paths => Filter::Paths(paths.to_vec()),
        }
    }

    fn validate(&self) -> ConsistencyResult<()> {
        match self {
            Filter::Paths(paths) if paths.is_empty() => Err(ConsistencyError::InvalidMetricInput {
                message: "path filter without any path".into(),
            }),
            _ => Ok(()),
        }
    }

    pub fn accepts(&self, literal: &Literal) -> bool {
        match self {
            Filter::All => true,
            Filter::Positive => !literal.is_negated(),
            Filter::Paths(paths) => paths.iter().any(|p| literal.functor().starts_with(p)),
        }
    }

    /// The accepted beliefs of `snapshot`.
    pub fn apply<'s>(&self, snapshot: &'s BeliefSnapshot) -> ConsistencyResult<Vec<&'s Literal>> {
        self.validate()?;
        Ok(snapshot.iter().filter(|l| self.accepts(l)).collect())
    }
}

/// Distance between two belief stores.
///
/// Both snapshots are filtered identically before the metric sees them.
/// The result lies in `[0, 1]`, is 0 when the filtered sets are equal and
/// does not depend on argument order.
pub fn score(
    a: &BeliefSnapshot,
    b: &BeliefSnapshot,
    metric: &Metric,
    filter: &Filter,
) -> ConsistencyResult<f64> {
    let left = filter.apply(a)?;
    let right = filter.apply(b)?;
    let distance = metric.distance(&left, &right)?;
    debug!(%metric, left = left.len(), right = right.len(), distance, "scored belief sets");
    Ok(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beliefbase::BeliefStore;
    use crate::term::{Term, WEIGHT_ANNOTATION};

    fn lit(functor: &str, args: Vec<Term>) -> Literal {
        Literal::new(functor, args).unwrap()
    }

    fn store(literals: Vec<Literal>) -> BeliefSnapshot {
        BeliefStore::from_literals(literals).snapshot()
    }

    fn metrics() -> Vec<Metric> {
        vec![
            Metric::Discrete,
            Metric::WeightedDifference,
            Metric::Levenshtein,
            Metric::Ncd(Compression::Deflate),
            Metric::Ncd(Compression::Zlib),
            Metric::Ncd(Compression::Gzip),
        ]
    }

    fn pairs() -> Vec<(BeliefSnapshot, BeliefSnapshot)> {
        vec![
            (
                store(vec![lit("weather/sunny", vec![]), lit("at", vec![Term::atom("home")])]),
                store(vec![lit("weather/rainy", vec![]), lit("at", vec![Term::atom("home")])]),
            ),
            (
                store((0..20).map(|i| lit("count", vec![Term::int(i)])).collect()),
                store((10..25).map(|i| lit("count", vec![Term::int(i)])).collect()),
            ),
            (
                store(vec![
                    lit("door", vec![Term::atom("open")]).with_annotation(WEIGHT_ANNOTATION, 4.0),
                    lit("light", vec![Term::atom("on")]).negate(),
                ]),
                store(vec![lit("door", vec![Term::atom("closed")])]),
            ),
        ]
    }

    #[test]
    fn every_metric_has_identity_and_symmetry() {
        for metric in metrics() {
            for (a, b) in pairs() {
                assert_eq!(score(&a, &a, &metric, &Filter::All).unwrap(), 0.0, "{metric}");
                assert_eq!(score(&b, &b, &metric, &Filter::All).unwrap(), 0.0, "{metric}");
                let ab = score(&a, &b, &metric, &Filter::All).unwrap();
                let ba = score(&b, &a, &metric, &Filter::All).unwrap();
                assert_eq!(ab, ba, "{metric} is not symmetric");
                assert!(ab > 0.0 && ab <= 1.0, "{metric}: {ab}");
            }
        }
    }

    #[test]
    fn weighted_difference_is_exactly_symmetric_with_fractional_weights() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let weighted = |i: i64, rng: &mut StdRng| {
            lit("fact", vec![Term::int(i)]).with_annotation(WEIGHT_ANNOTATION, rng.gen_range(0.01_f64..10.0))
        };
        for _ in 0..50 {
            let a = store((0..12).map(|_| weighted(rng.gen_range(0..20), &mut rng)).collect());
            let b = store((0..12).map(|_| weighted(rng.gen_range(0..20), &mut rng)).collect());
            let metric = Metric::WeightedDifference;
            let ab = score(&a, &b, &metric, &Filter::All).unwrap();
            let ba = score(&b, &a, &metric, &Filter::All).unwrap();
            assert_eq!(ab.to_bits(), ba.to_bits(), "{ab} != {ba}");
            assert_eq!(ab.to_bits(), score(&a, &b, &metric, &Filter::All).unwrap().to_bits());
        }
    }

    #[test]
    fn identity_ignores_annotations_and_number_representation() {
        let a = store(vec![lit("f", vec![Term::int(2)]).with_annotation("source", Term::atom("self"))]);
        let b = store(vec![lit("f", vec![Term::float(2.0)])]);
        for metric in metrics() {
            assert_eq!(score(&a, &b, &metric, &Filter::All).unwrap(), 0.0, "{metric}");
        }
    }

    #[test]
    fn positive_filter_drops_negated_beliefs() {
        let a = store(vec![lit("p", vec![]), lit("q", vec![]).negate()]);
        let b = store(vec![lit("p", vec![])]);
        assert!(score(&a, &b, &Metric::Discrete, &Filter::All).unwrap() > 0.0);
        assert_eq!(score(&a, &b, &Metric::Discrete, &Filter::Positive).unwrap(), 0.0);
    }

    #[test]
    fn path_filter_applies_to_both_sides() {
        let a = store(vec![lit("room/clean", vec![]), lit("mood/happy", vec![])]);
        let b = store(vec![lit("room/clean", vec![]), lit("mood/grumpy", vec![])]);
        let rooms = Filter::Paths(vec![Path::parse("room").unwrap()]);
        assert_eq!(score(&a, &b, &Metric::Discrete, &rooms).unwrap(), 0.0);

        let moods = Filter::Paths(vec![Path::parse("mood").unwrap()]);
        assert_eq!(score(&a, &b, &Metric::Discrete, &moods).unwrap(), 1.0);
    }

    #[test]
    fn empty_path_filter_is_invalid() {
        let a = store(vec![lit("p", vec![])]);
        let err = score(&a, &a, &Metric::Discrete, &Filter::Paths(vec![])).unwrap_err();
        assert!(matches!(err, ConsistencyError::InvalidMetricInput { .. }));
    }
}
