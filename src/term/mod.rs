//! Term model: atoms, numbers, strings, variables and literals.
//!
//! Terms are immutable values. The only mutable state in the model is the
//! binding of a variable, and that lives outside the term in a
//! [`Substitution`](crate::unify::Substitution).

pub mod literal;
pub mod number;
pub mod path;
pub mod variable;

use std::fmt;
use std::sync::Arc;

pub use literal::{Literal, WEIGHT_ANNOTATION};
pub use number::Number;
pub use path::Path;
pub use variable::{BindMode, Renaming, VarId, VarKind, Variable};

/// A logical value.
///
/// Equality is structural: numbers compare across integer/float
/// representations, literals ignore annotations, variables compare by
/// handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Atom(Arc<str>),
    Number(Number),
    String(Arc<str>),
    Variable(Variable),
    Literal(Literal),
}

impl Term {
    pub fn atom(name: &str) -> Self {
        Term::Atom(Arc::from(name))
    }

    pub fn int(value: i64) -> Self {
        Term::Number(Number::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Term::Number(Number::Float(value))
    }

    pub fn string(value: &str) -> Self {
        Term::String(Arc::from(value))
    }

    pub fn var(variable: &Variable) -> Self {
        Term::Variable(variable.clone())
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Term::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// No variables anywhere inside (anonymous ones included).
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Literal(l) => l.is_ground(),
            _ => true,
        }
    }

    /// Whether the given variable occurs in this term.
    pub fn contains_var(&self, id: VarId) -> bool {
        match self {
            Term::Variable(v) => v.id() == id,
            Term::Literal(l) => l.args().iter().any(|a| a.contains_var(id)),
            _ => false,
        }
    }

    /// Distinct variables in first-occurrence order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    pub(crate) fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Term::Variable(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Term::Literal(l) => {
                for arg in l.args() {
                    arg.collect_variables(out);
                }
            }
            _ => {}
        }
    }

    /// Copy with fresh variables, sharing `renaming` with sibling terms.
    pub fn deep_copy_with(&self, renaming: &mut Renaming) -> Term {
        match self {
            Term::Variable(v) => Term::Variable(renaming.rename(v)),
            Term::Literal(l) => Term::Literal(l.deep_copy_with(renaming)),
            other => other.clone(),
        }
    }

    /// Copy with fresh variables.
    pub fn deep_copy(&self) -> (Term, Renaming) {
        let mut renaming = Renaming::new();
        let copy = self.deep_copy_with(&mut renaming);
        (copy, renaming)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => f.write_str(a),
            Term::Number(n) => write!(f, "{n}"),
            Term::String(s) => write!(f, "{s:?}"),
            Term::Variable(v) => write!(f, "{v}"),
            Term::Literal(l) => write!(f, "{l}"),
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::int(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::float(value)
    }
}

impl From<Number> for Term {
    fn from(value: Number) -> Self {
        Term::Number(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::string(value)
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

impl From<&Variable> for Term {
    fn from(value: &Variable) -> Self {
        Term::var(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_detection_descends_into_literals() {
        let x = Variable::named("X");
        let nested = Literal::new("f", [Term::var(&x)]).unwrap();
        assert!(!Term::from(nested).is_ground());
        assert!(Term::from(Literal::new("f", [Term::int(1)]).unwrap()).is_ground());
        assert!(Term::atom("a").is_ground());
    }

    #[test]
    fn variables_are_collected_once_in_order() {
        let x = Variable::named("X");
        let y = Variable::named("Y");
        let inner = Literal::new("g", [Term::var(&y), Term::var(&x)]).unwrap();
        let term = Term::from(Literal::new("f", [Term::var(&x), inner.into()]).unwrap());
        assert_eq!(term.variables(), vec![x.clone(), y.clone()]);
        assert!(term.contains_var(y.id()));
        assert!(!term.contains_var(Variable::named("Z").id()));
    }

    #[test]
    fn atom_and_string_are_distinct() {
        assert_ne!(Term::atom("a"), Term::string("a"));
        assert_eq!(Term::string("a").to_string(), "\"a\"");
    }
}
