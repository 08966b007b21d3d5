//! Rules: heads that are proved by resolving a body of goals.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::term::{Literal, Path, Renaming};

use super::Guard;

/// `head :- body`. A rule with an empty body is an unconditional fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    head: Literal,
    body: Vec<Guard>,
}

impl Rule {
    pub fn new(head: Literal, body: impl IntoIterator<Item = Guard>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }

    pub fn head(&self) -> &Literal {
        &self.head
    }

    pub fn body(&self) -> &[Guard] {
        &self.body
    }

    /// Head and body with fresh variables, sharing one renaming.
    pub fn instantiate(&self) -> (Literal, Vec<Guard>) {
        let mut renaming = Renaming::new();
        let head = self.head.deep_copy_with(&mut renaming);
        let body = self
            .body
            .iter()
            .map(|g| g.deep_copy_with(&mut renaming))
            .collect();
        (head, body)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (i, goal) in self.body.iter().enumerate() {
            f.write_str(if i == 0 { " :- " } else { ", " })?;
            write!(f, "{goal}")?;
        }
        Ok(())
    }
}

type RuleKey = (Path, usize, bool);

fn key_of(literal: &Literal) -> RuleKey {
    (literal.functor().clone(), literal.arity(), literal.is_negated())
}

/// Rules indexed by head functor, arity and polarity.
#[derive(Debug, Clone, Default)]
pub struct RuleLibrary {
    rules: Vec<Arc<Rule>>,
    index: HashMap<RuleKey, Vec<usize>>,
}

impl RuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut library = Self::new();
        for rule in rules {
            library.push(rule);
        }
        library
    }

    /// A new library with `rule` appended.
    pub fn with_rule(&self, rule: Rule) -> Self {
        let mut library = self.clone();
        library.push(rule);
        library
    }

    fn push(&mut self, rule: Rule) {
        self.index
            .entry(key_of(rule.head()))
            .or_default()
            .push(self.rules.len());
        self.rules.push(Arc::new(rule));
    }

    /// Rules whose head could unify with `call`, in declaration order.
    pub fn matching<'s>(&'s self, call: &Literal) -> impl Iterator<Item = &'s Arc<Rule>> + use<'s> {
        self.index
            .get(&key_of(call))
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.rules[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
