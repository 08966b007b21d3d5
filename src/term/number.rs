//! Numeric terms.
//!
//! Integers and floats compare by value: `2` and `2.0` are the same term for
//! matching purposes, and they hash identically so that hash-indexed
//! unification finds one from the other.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// An integer or floating-point number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// The integer this number is exactly equal to, if any.
    pub fn as_exact_int(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    let i = f as i64;
                    (i as f64 == f).then_some(i)
                } else {
                    None
                }
            }
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Number::Int(i), f @ Number::Float(_)) | (f @ Number::Float(_), Number::Int(i)) => {
                f.as_exact_int() == Some(*i)
            }
        }
    }
}

// NaN equals NaN here, which makes the relation reflexive.
impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.as_exact_int() {
            Some(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            None => {
                1u8.hash(state);
                let f = self.as_f64();
                let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                bits.hash(state);
            }
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_exact_int(), other.as_exact_int()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ if self == other => Ordering::Equal,
            _ => match (*self, *other) {
                (Number::Int(i), Number::Float(f)) => cmp_int_float(i, f),
                (Number::Float(f), Number::Int(i)) => cmp_int_float(i, f).reverse(),
                (a, b) => a.as_f64().total_cmp(&b.as_f64()),
            },
        }
    }
}

/// Exact comparison; `i as f64` alone rounds above 2^53 and would tie
/// numbers that are not equal.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_finite() && f.fract() == 0.0 {
        i128::from(i).cmp(&(f as i128))
    } else {
        (i as f64).total_cmp(&f)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value.into())
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}
