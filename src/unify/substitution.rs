//! Variable → term mappings.
//!
//! A [`Substitution`] is a plain value: unifiers hand out independent
//! snapshots, so a consumer can keep one after the iterator that produced it
//! has moved on.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::BindError;
use crate::term::{Literal, Term, VarId, VarKind, Variable};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    var: Variable,
    value: Term,
}

/// A set of variable bindings.
///
/// Bindings may chain (`X ↦ Y`, `Y ↦ 3`); [`bind`](Self::bind) refuses any
/// binding that would make a chain cyclic, so every chain resolves to a
/// fixed point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: BTreeMap<VarId, Binding>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.bindings.contains_key(&var.id())
    }

    /// Raw (unresolved) binding of a variable.
    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.bindings.get(&var.id()).map(|b| &b.value)
    }

    /// Fully resolved value of a variable, if it is bound.
    pub fn value_of(&self, var: &Variable) -> Option<Term> {
        self.get(var).map(|t| self.resolve(t))
    }

    /// Fully resolved value of the first bound variable with this name.
    pub fn value_by_name(&self, name: &str) -> Option<Term> {
        self.bindings
            .values()
            .find(|b| b.var.name() == name)
            .map(|b| self.resolve(&b.value))
    }

    /// Bindings in variable-creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.values().map(|b| (&b.var, &b.value))
    }

    /// Follow a variable chain to its first non-variable or unbound
    /// variable.
    pub fn walk<'a>(&'a self, mut term: &'a Term) -> &'a Term {
        // bind() keeps chains acyclic; the step cap only guards against
        // substitutions assembled through insert_unchecked.
        let mut steps = 0;
        while let Term::Variable(v) = term {
            match self.bindings.get(&v.id()) {
                Some(b) if steps <= self.bindings.len() => {
                    term = &b.value;
                    steps += 1;
                }
                _ => break,
            }
        }
        term
    }

    /// Bind `var` to `value`.
    ///
    /// Anonymous variables and `X ↦ X` are accepted without recording
    /// anything. Rebinding a bound variable, or binding a variable to a
    /// term that contains it, is refused.
    pub fn bind(&mut self, var: &Variable, value: Term) -> Result<(), BindError> {
        if var.is_anonymous() {
            return Ok(());
        }
        if self.contains(var) {
            return Err(BindError::AlreadyBound {
                var: var.name().to_string(),
            });
        }
        let resolved = self.resolve_all(&value);
        if let Term::Variable(v) = &resolved {
            if v == var {
                return Ok(());
            }
        }
        if resolved.contains_var(var.id()) {
            return Err(BindError::CyclicBinding {
                var: var.name().to_string(),
                term: resolved.to_string(),
            });
        }
        self.insert_unchecked(var.clone(), value);
        Ok(())
    }

    /// Overwrite a binding without any check. Callers must guarantee the
    /// result stays acyclic.
    pub(crate) fn insert_unchecked(&mut self, var: Variable, value: Term) {
        self.bindings.insert(var.id(), Binding { var, value });
    }

    pub(crate) fn remove(&mut self, id: VarId) {
        self.bindings.remove(&id);
    }

    /// Apply the bindings to a term. Evaluate-at-use variables stay
    /// symbolic.
    pub fn apply_term(&self, term: &Term) -> Term {
        self.substitute(term, false)
    }

    /// Apply the bindings to every argument and annotation of a literal.
    pub fn apply(&self, literal: &Literal) -> Literal {
        self.substitute_literal(literal, false)
    }

    /// Apply the bindings, resolving evaluate-at-use variables too.
    pub fn resolve_all(&self, term: &Term) -> Term {
        self.substitute(term, true)
    }

    fn resolve(&self, term: &Term) -> Term {
        self.substitute(term, true)
    }

    fn substitute(&self, term: &Term, evaluate: bool) -> Term {
        match term {
            Term::Variable(v) if v.kind() == VarKind::Evaluate && !evaluate => term.clone(),
            Term::Variable(_) => {
                let walked = self.walk(term);
                match walked {
                    Term::Variable(_) => walked.clone(),
                    other => self.substitute(other, evaluate),
                }
            }
            Term::Literal(l) => Term::Literal(self.substitute_literal(l, evaluate)),
            other => other.clone(),
        }
    }

    fn substitute_literal(&self, literal: &Literal, evaluate: bool) -> Literal {
        let args = literal
            .args()
            .iter()
            .map(|a| self.substitute(a, evaluate))
            .collect();
        let mut out = literal.with_args(args);
        for (key, value) in literal.annotations() {
            out = out.with_annotation(key, self.substitute(value, evaluate));
        }
        out
    }

    /// Keep only the bindings for the given variables, resolved.
    pub fn project(&self, vars: &[Variable]) -> Substitution {
        let mut out = Substitution::new();
        for var in vars {
            if let Some(value) = self.value_of(var) {
                out.insert_unchecked(var.clone(), value);
            }
        }
        out
    }

    /// Combine two substitutions. Fails if they bind a shared variable to
    /// values that do not unify, or if the union would be cyclic.
    pub fn merge(&self, other: &Substitution) -> Result<Substitution, BindError> {
        let mut out = self.clone();
        for (var, value) in other.iter() {
            match out.get(var).cloned() {
                None => out.bind(var, value.clone())?,
                Some(existing) => {
                    if super::unify_terms(&existing, value, &mut out).is_none() {
                        return Err(BindError::Conflict {
                            var: var.name().to_string(),
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, _)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let value = self.value_of(var).unwrap_or_else(|| Term::var(var));
            write!(f, "{var} \u{21a6} {value}")?;
        }
        f.write_str("}")
    }
}
