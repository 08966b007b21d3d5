//! Multi-store consistency via the stationary distribution of a Markov chain.
//!
//! Pairwise distances between all registered stores form a symmetric
//! matrix. Each row is normalised into transition probabilities, the
//! diagonal gets a small epsilon, and power iteration on the lazy chain
//! `(I + M) / 2` finds the stationary distribution (the lazy step has the
//! same fixpoint but cannot oscillate). A store the chain tends to move
//! *towards* is far from the others, so its consistency value is the
//! inverted probability, normalised so all values sum to 1.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::beliefbase::BeliefSnapshot;
use crate::config::ConsistencyConfig;
use crate::error::{ConsistencyError, ConsistencyResult};

use super::{Filter, Metric};

/// Seed of the power iteration's start vector.
pub const DEFAULT_SEED: u64 = 0x5eed_c0de;

/// How the stationary distribution is approximated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stationary {
    /// A fixed number of power-iteration steps.
    Fixpoint { iterations: usize },
    /// Iterate until no component moves by more than `tolerance`.
    Converge { tolerance: f64, max_iterations: usize },
}

impl Default for Stationary {
    fn default() -> Self {
        Stationary::Fixpoint { iterations: 8 }
    }
}

/// Summary statistics over the consistency values of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample variance; 0 with fewer than two values.
    pub variance: f64,
}

impl Statistics {
    fn of(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self::default();
        }
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = if count < 2 {
            0.0
        } else {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        };
        Self {
            count,
            mean,
            min,
            max,
            variance,
        }
    }
}

/// Result of one [`ConsistencyEngine::compute`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyReport {
    /// Store names in matrix order.
    pub names: Vec<String>,
    /// Raw symmetric distance matrix.
    pub matrix: Vec<Vec<f64>>,
    pub values: BTreeMap<String, f64>,
    pub statistics: Statistics,
}

impl ConsistencyReport {
    pub fn value(&self, name: &str) -> ConsistencyResult<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ConsistencyError::UnknownStore { name: name.into() })
    }

    /// Distance between two named stores.
    pub fn distance(&self, a: &str, b: &str) -> ConsistencyResult<f64> {
        let index = |name: &str| {
            self.names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| ConsistencyError::UnknownStore { name: name.into() })
        };
        Ok(self.matrix[index(a)?][index(b)?])
    }
}

/// Scores a population of named belief stores against each other.
///
/// The engine only ever holds snapshots, so scoring never blocks the agents
/// that own the stores.
#[derive(Debug, Clone)]
pub struct ConsistencyEngine {
    stores: BTreeMap<String, BeliefSnapshot>,
    metric: Metric,
    filter: Filter,
    stationary: Stationary,
    epsilon: f64,
    seed: u64,
}

impl Default for ConsistencyEngine {
    fn default() -> Self {
        Self::new(Metric::default(), Filter::default())
    }
}

impl ConsistencyEngine {
    pub fn new(metric: Metric, filter: Filter) -> Self {
        Self {
            stores: BTreeMap::new(),
            metric,
            filter,
            stationary: Stationary::default(),
            epsilon: 0.001,
            seed: DEFAULT_SEED,
        }
    }

    pub fn from_config(config: &ConsistencyConfig) -> Self {
        Self::new(config.metric(), config.filter())
            .with_stationary(Stationary::Fixpoint {
                iterations: config.iterations,
            })
            .with_epsilon(config.epsilon)
    }

    pub fn with_stationary(mut self, stationary: Stationary) -> Self {
        self.stationary = stationary;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Register (or replace) a store under `name`. Returns the previous
    /// snapshot, if any.
    pub fn register(&mut self, name: impl Into<String>, snapshot: BeliefSnapshot) -> Option<BeliefSnapshot> {
        self.stores.insert(name.into(), snapshot)
    }

    pub fn remove(&mut self, name: &str) -> ConsistencyResult<BeliefSnapshot> {
        self.stores
            .remove(name)
            .ok_or_else(|| ConsistencyError::UnknownStore { name: name.into() })
    }

    pub fn clear(&mut self) {
        self.stores.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Pairwise distances, computed in parallel.
    pub fn matrix(&self) -> ConsistencyResult<Vec<Vec<f64>>> {
        let snapshots: Vec<&BeliefSnapshot> = self.stores.values().collect();
        let n = snapshots.len();

        let filtered = snapshots
            .iter()
            .map(|s| self.filter.apply(s))
            .collect::<ConsistencyResult<Vec<_>>>()?;

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        let distances = pairs
            .par_iter()
            .map(|&(i, j)| self.metric.distance(&filtered[i], &filtered[j]))
            .collect::<ConsistencyResult<Vec<f64>>>()?;

        let mut matrix = vec![vec![0.0; n]; n];
        for (&(i, j), d) in pairs.iter().zip(distances) {
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
        Ok(matrix)
    }

    /// Score every registered store.
    pub fn compute(&self) -> ConsistencyResult<ConsistencyReport> {
        let names: Vec<String> = self.stores.keys().cloned().collect();
        let n = names.len();
        info!(stores = n, metric = %self.metric, "computing consistency");

        let matrix = self.matrix()?;
        let values = if n < 2 {
            vec![0.0; n]
        } else {
            self.consistency_values(&matrix)
        };

        let statistics = Statistics::of(&values);
        info!(
            mean = statistics.mean,
            min = statistics.min,
            max = statistics.max,
            "consistency computed"
        );
        Ok(ConsistencyReport {
            values: names.iter().cloned().zip(values).collect(),
            names,
            matrix,
            statistics,
        })
    }

    fn consistency_values(&self, distances: &[Vec<f64>]) -> Vec<f64> {
        let n = distances.len();
        let mut transition = distances.to_vec();
        for (i, row) in transition.iter_mut().enumerate() {
            let norm = norm1(row);
            if norm != 0.0 {
                row.iter_mut().for_each(|v| *v /= norm);
            }
            row[i] = self.epsilon;
        }

        // Only the epsilon diagonal left: no store differs from any other.
        let off_diagonal: f64 = transition
            .iter()
            .enumerate()
            .map(|(i, row)| norm1(row) - row[i].abs())
            .sum();
        let probability = if off_diagonal <= 0.0 {
            debug!("transition matrix is empty, using uniform consistency");
            vec![0.0; n]
        } else {
            self.stationary_distribution(&transition)
        };

        let mut inverted: Vec<f64> = probability.iter().map(|p| 1.0 - p).collect();
        let norm = norm1(&inverted);
        if norm != 0.0 {
            inverted.iter_mut().for_each(|v| *v /= norm);
        }
        inverted
    }

    fn stationary_distribution(&self, transition: &[Vec<f64>]) -> Vec<f64> {
        let n = transition.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut p: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();

        let (limit, tolerance) = match self.stationary {
            Stationary::Fixpoint { iterations } => (iterations, None),
            Stationary::Converge {
                tolerance,
                max_iterations,
            } => (max_iterations, Some(tolerance)),
        };
        for step in 0..limit {
            let next = normalize2(lazy_step(transition, &p));
            let delta = next
                .iter()
                .zip(&p)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            p = next;
            if tolerance.is_some_and(|t| delta < t) {
                debug!(steps = step + 1, "power iteration converged");
                break;
            }
        }

        let norm = norm1(&p);
        if norm != 0.0 {
            p.iter_mut().for_each(|v| *v = (*v / norm).abs());
        }
        p
    }
}

fn norm1(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

/// `(p + p·M) / 2`.
fn lazy_step(matrix: &[Vec<f64>], p: &[f64]) -> Vec<f64> {
    let mut next: Vec<f64> = p.iter().map(|x| x / 2.0).collect();
    for (row, weight) in matrix.iter().zip(p) {
        for (out, m) in next.iter_mut().zip(row) {
            *out += weight * m / 2.0;
        }
    }
    next
}

fn normalize2(mut v: Vec<f64>) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm != 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
