//! Distance metrics over belief sets.
//!
//! Every metric returns a value in `[0, 1]`, is 0 for identical sets and
//! symmetric in its arguments. Sets are compared structurally: annotations
//! are ignored and `2` equals `2.0`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io::Write;

use flate2::Compression as Level;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{ConsistencyError, ConsistencyResult};
use crate::term::Literal;

/// Compressor used by the normalized compression distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    Deflate,
    Zlib,
    Gzip,
}

impl Compression {
    /// Compressed size of `input` in bytes.
    pub fn compressed_len(self, input: &[u8]) -> ConsistencyResult<usize> {
        let map = |source| ConsistencyError::Compression { source };
        let out = match self {
            Compression::Deflate => {
                let mut enc = DeflateEncoder::new(Vec::new(), Level::default());
                enc.write_all(input).map_err(map)?;
                enc.finish().map_err(map)?
            }
            Compression::Zlib => {
                let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
                enc.write_all(input).map_err(map)?;
                enc.finish().map_err(map)?
            }
            Compression::Gzip => {
                let mut enc = GzEncoder::new(Vec::new(), Level::default());
                enc.write_all(input).map_err(map)?;
                enc.finish().map_err(map)?
            }
        };
        Ok(out.len())
    }
}

/// Metric names as they appear in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    #[default]
    Discrete,
    WeightedDifference,
    Levenshtein,
    Ncd,
}

/// A belief-set distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Metric {
    /// `|A △ B| / |A ∪ B|`.
    #[default]
    Discrete,
    /// Symmetric difference weighted by each belief's `weight` annotation
    /// (default 1), over the weighted union.
    WeightedDifference,
    /// Character edit distance between the canonical serializations,
    /// divided by the longer one's length.
    Levenshtein,
    /// Normalized compression distance between the canonical
    /// serializations.
    Ncd(Compression),
}

impl Metric {
    pub fn from_kind(kind: MetricKind, compression: Compression) -> Self {
        match kind {
            MetricKind::Discrete => Metric::Discrete,
            MetricKind::WeightedDifference => Metric::WeightedDifference,
            MetricKind::Levenshtein => Metric::Levenshtein,
            MetricKind::Ncd => Metric::Ncd(compression),
        }
    }

    /// Distance between two (already filtered) belief sets.
    pub fn distance(&self, a: &[&Literal], b: &[&Literal]) -> ConsistencyResult<f64> {
        match self {
            Metric::Discrete => Ok(discrete(a, b)),
            Metric::WeightedDifference => weighted_difference(a, b),
            Metric::Levenshtein => Ok(normalized_levenshtein(&canonical(a), &canonical(b))),
            Metric::Ncd(compression) => ncd(*compression, &canonical(a), &canonical(b)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Discrete => f.write_str("discrete"),
            Metric::WeightedDifference => f.write_str("weighted-difference"),
            Metric::Levenshtein => f.write_str("levenshtein"),
            Metric::Ncd(c) => write!(f, "ncd({c:?})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Set metrics
// ---------------------------------------------------------------------------

fn discrete(a: &[&Literal], b: &[&Literal]) -> f64 {
    let a: HashSet<&Literal> = a.iter().copied().collect();
    let b: HashSet<&Literal> = b.iter().copied().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let difference = a.symmetric_difference(&b).count();
    difference as f64 / union as f64
}

fn weights<'l>(set: &[&'l Literal]) -> ConsistencyResult<HashMap<&'l Literal, f64>> {
    let mut out: HashMap<&Literal, f64> = HashMap::new();
    for &literal in set {
        let weight = match literal.annotation(crate::term::WEIGHT_ANNOTATION) {
            None => 1.0,
            Some(_) => literal.weight().ok_or_else(|| ConsistencyError::InvalidMetricInput {
                message: format!("weight of {literal} is not a number"),
            })?,
        };
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConsistencyError::InvalidMetricInput {
                message: format!("weight of {literal} must be finite and non-negative, got {weight}"),
            });
        }
        let entry = out.entry(literal).or_insert(weight);
        *entry = entry.max(weight);
    }
    Ok(out)
}

fn weighted_difference(a: &[&Literal], b: &[&Literal]) -> ConsistencyResult<f64> {
    let wa = weights(a)?;
    let wb = weights(b)?;
    // (canonical form, union weight, difference weight) per distinct literal
    let mut terms: Vec<(String, f64, f64)> = Vec::with_capacity(wa.len() + wb.len());
    for (literal, weight) in &wa {
        match wb.get(literal) {
            Some(other) => terms.push((literal.canonical(), weight.max(*other), 0.0)),
            None => terms.push((literal.canonical(), *weight, *weight)),
        }
    }
    for (literal, weight) in &wb {
        if !wa.contains_key(literal) {
            terms.push((literal.canonical(), *weight, *weight));
        }
    }
    // Float sums depend on order; fix it so both argument orders agree.
    terms.sort_by(|x, y| {
        x.0.cmp(&y.0)
            .then(x.1.total_cmp(&y.1))
            .then(x.2.total_cmp(&y.2))
    });
    let union: f64 = terms.iter().map(|t| t.1).sum();
    let difference: f64 = terms.iter().map(|t| t.2).sum();
    if union == 0.0 {
        return Ok(0.0);
    }
    Ok(difference / union)
}

// ---------------------------------------------------------------------------
// Serialization metrics
// ---------------------------------------------------------------------------

/// Sorted, de-duplicated canonical forms, one per line.
pub fn canonical(set: &[&Literal]) -> String {
    let lines: BTreeSet<String> = set.iter().map(|l| l.canonical()).collect();
    lines.into_iter().collect::<Vec<_>>().join("\n")
}

fn normalized_levenshtein(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `(C(xy) - min(C(x), C(y))) / max(C(x), C(y))`, with `xy` concatenated in
/// lexicographic order so the result does not depend on argument order.
fn ncd(compression: Compression, a: &str, b: &str) -> ConsistencyResult<f64> {
    if a == b {
        return Ok(0.0);
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let ca = compression.compressed_len(first.as_bytes())? as f64;
    let cb = compression.compressed_len(second.as_bytes())? as f64;
    let joined = [first.as_bytes(), second.as_bytes()].concat();
    let cab = compression.compressed_len(&joined)? as f64;
    let largest = ca.max(cb);
    if largest == 0.0 {
        return Ok(0.0);
    }
    Ok(((cab - ca.min(cb)) / largest).clamp(0.0, 1.0))
}
