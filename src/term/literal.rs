//! Literals: a functor path, an optional strong negation, ordered arguments
//! and annotations.
//!
//! Equality and hashing are structural over functor, negation and arguments.
//! Annotations (source, weight, score, ...) ride along through copies but
//! never take part in matching.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{TermError, TermResult};

use super::path::Path;
use super::variable::{Renaming, Variable};
use super::Term;

/// Annotation key read by the weighted consistency metric.
pub const WEIGHT_ANNOTATION: &str = "weight";

/// A structured logical value.
#[derive(Debug, Clone)]
pub struct Literal {
    functor: Path,
    negated: bool,
    args: Vec<Term>,
    annotations: BTreeMap<String, Term>,
}

impl Literal {
    /// Create a positive literal from a `/`-separated functor.
    pub fn new(functor: &str, args: impl IntoIterator<Item = Term>) -> TermResult<Self> {
        Self::from_path(Path::parse(functor)?, args)
    }

    /// Create a positive literal from an already parsed functor path.
    pub fn from_path(functor: Path, args: impl IntoIterator<Item = Term>) -> TermResult<Self> {
        if functor.is_empty() {
            return Err(TermError::EmptyPath { raw: String::new() });
        }
        Ok(Self {
            functor,
            negated: false,
            args: args.into_iter().collect(),
            annotations: BTreeMap::new(),
        })
    }

    /// A zero-arity literal.
    pub fn atom(functor: &str) -> TermResult<Self> {
        Self::new(functor, Vec::new())
    }

    pub fn functor(&self) -> &Path {
        &self.functor
    }

    /// The leaf segment of the functor path.
    pub fn name(&self) -> &str {
        // from_path guarantees a non-empty functor
        self.functor.leaf().unwrap_or_default()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn annotations(&self) -> &BTreeMap<String, Term> {
        &self.annotations
    }

    pub fn annotation(&self, key: &str) -> Option<&Term> {
        self.annotations.get(key)
    }

    /// Numeric value of the `weight` annotation, if present.
    pub fn weight(&self) -> Option<f64> {
        match self.annotation(WEIGHT_ANNOTATION)? {
            Term::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    /// Set the negation flag.
    pub fn with_negation(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// Strongly negated copy (`~p`).
    pub fn negate(&self) -> Self {
        self.clone().with_negation(!self.negated)
    }

    pub fn with_annotation(mut self, key: &str, value: impl Into<Term>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    /// Replace the arguments, keeping functor, negation and annotations.
    pub(crate) fn with_args(&self, args: Vec<Term>) -> Self {
        Self {
            functor: self.functor.clone(),
            negated: self.negated,
            args,
            annotations: self.annotations.clone(),
        }
    }

    /// Shallow copy with a path prefix prepended to the functor.
    /// Variable identity is preserved.
    pub fn with_prefix(&self, prefix: &Path) -> Self {
        Self {
            functor: prefix.append(&self.functor),
            ..self.clone()
        }
    }

    /// Whether this literal has the same functor, arity and polarity as
    /// another one.
    pub fn same_shape(&self, other: &Literal) -> bool {
        self.negated == other.negated
            && self.args.len() == other.args.len()
            && self.functor == other.functor
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Distinct variables in first-occurrence order, arguments only.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        for arg in &self.args {
            arg.collect_variables(&mut out);
        }
        out
    }

    /// Annotation-free text form. Structurally equal literals render the
    /// same, so `f(2)` and `f(2.0)` both give `f(2)`.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_canonical(&mut out, self);
        out
    }

    /// Copy with every variable replaced by a fresh one. Two deep copies
    /// of the same literal never share variable state.
    pub fn deep_copy(&self) -> (Literal, Renaming) {
        let mut renaming = Renaming::new();
        let copy = self.deep_copy_with(&mut renaming);
        (copy, renaming)
    }

    /// Deep copy that shares a renaming with other terms of the same scope
    /// (e.g. a plan trigger and its guards).
    pub fn deep_copy_with(&self, renaming: &mut Renaming) -> Literal {
        Literal {
            functor: self.functor.clone(),
            negated: self.negated,
            args: self.args.iter().map(|a| a.deep_copy_with(renaming)).collect(),
            annotations: self
                .annotations
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_copy_with(renaming)))
                .collect(),
        }
    }
}

fn write_canonical(out: &mut String, literal: &Literal) {
    use std::fmt::Write;

    if literal.negated {
        out.push('~');
    }
    let _ = write!(out, "{}", literal.functor);
    if literal.args.is_empty() {
        return;
    }
    out.push('(');
    for (i, arg) in literal.args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match arg {
            Term::Literal(inner) => write_canonical(out, inner),
            Term::Number(n) => match n.as_exact_int() {
                Some(i) => {
                    let _ = write!(out, "{i}");
                }
                None => {
                    let _ = write!(out, "{n}");
                }
            },
            other => {
                let _ = write!(out, "{other}");
            }
        }
    }
    out.push(')');
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.negated == other.negated && self.functor == other.functor && self.args == other.args
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.negated.hash(state);
        self.functor.hash(state);
        self.args.hash(state);
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("~")?;
        }
        write!(f, "{}", self.functor)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(")")?;
        }
        if !self.annotations.is_empty() {
            f.write_str("[")?;
            for (i, (key, value)) in self.annotations.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}
