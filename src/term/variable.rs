//! Logical variables.
//!
//! A [`Variable`] is a handle: its identity is a process-wide unique
//! [`VarId`], and its binding lives outside of it, in a
//! [`Substitution`](crate::unify::Substitution) or a
//! [`Context`](crate::context::Context). Deep copies remap handles to fresh
//! ones; shallow copies keep them.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name given to anonymous variables.
pub const ANONYMOUS: &str = "_";

static NEXT_VAR: AtomicU64 = AtomicU64::new(1);

/// Unique handle of a variable.
///
/// Handles are allocated monotonically, so ordering by `VarId` is ordering
/// by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VarId(NonZeroU64);

impl VarId {
    /// Allocate a fresh handle.
    pub fn fresh() -> Self {
        let raw = NEXT_VAR.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        VarId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var:{}", self.0)
    }
}

/// How a variable takes part in unification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// An ordinary named variable.
    Named,
    /// `_`: matches anything and is never bound.
    Anonymous,
    /// Bound like a named variable, but left symbolic by
    /// `Substitution::apply` and only resolved at the point of use.
    Evaluate,
}

/// Whether a bound variable may be rebound inside a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindMode {
    /// Single assignment: once set in a context it stays set.
    #[default]
    Fixed,
    /// May be rebound when a context is reused across iterations.
    Relocatable,
}

/// A logical variable.
///
/// Equality and hashing use the handle only; the name is for display and
/// lookup.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VarId,
    name: Arc<str>,
    kind: VarKind,
    mode: BindMode,
}

impl Variable {
    /// A fresh named, fixed variable.
    pub fn named(name: &str) -> Self {
        if name == ANONYMOUS {
            return Self::anonymous();
        }
        Self {
            id: VarId::fresh(),
            name: Arc::from(name),
            kind: VarKind::Named,
            mode: BindMode::Fixed,
        }
    }

    /// A fresh anonymous variable.
    pub fn anonymous() -> Self {
        Self {
            id: VarId::fresh(),
            name: Arc::from(ANONYMOUS),
            kind: VarKind::Anonymous,
            mode: BindMode::Fixed,
        }
    }

    /// A fresh evaluate-at-use variable.
    pub fn evaluate(name: &str) -> Self {
        Self {
            kind: VarKind::Evaluate,
            ..Self::named(name)
        }
    }

    pub fn relocatable(mut self) -> Self {
        self.mode = BindMode::Relocatable;
        self
    }

    pub fn with_mode(mut self, mode: BindMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn mode(&self) -> BindMode {
        self.mode
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == VarKind::Anonymous
    }

    /// Same name, kind and mode, new handle.
    pub fn refresh(&self) -> Self {
        Self {
            id: VarId::fresh(),
            name: Arc::clone(&self.name),
            kind: self.kind,
            mode: self.mode,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VarKind::Anonymous => f.write_str(ANONYMOUS),
            VarKind::Named => f.write_str(&self.name),
            VarKind::Evaluate => write!(f, "!{}", self.name),
        }
    }
}

/// Old handle → fresh variable, produced by a deep copy.
///
/// Lets the owner of an opaque plan body map its variables onto the
/// instance that was actually unified.
#[derive(Debug, Clone, Default)]
pub struct Renaming {
    map: HashMap<VarId, Variable>,
}

impl Renaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fresh copy of `var`, allocating it on first sight.
    pub(crate) fn rename(&mut self, var: &Variable) -> Variable {
        self.map
            .entry(var.id())
            .or_insert_with(|| var.refresh())
            .clone()
    }

    /// Look up the copy of a variable from the original term.
    pub fn get(&self, original: &Variable) -> Option<&Variable> {
        self.map.get(&original.id())
    }

    /// Look up the copy of the first original variable with this name.
    pub fn by_name(&self, name: &str) -> Option<&Variable> {
        self.map.values().find(|v| v.name() == name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handles_are_distinct_and_increasing() {
        let a = Variable::named("X");
        let b = Variable::named("X");
        assert_ne!(a, b);
        assert!(a.id() < b.id());
    }

    #[test]
    fn underscore_is_anonymous() {
        let v = Variable::named("_");
        assert!(v.is_anonymous());
        assert_eq!(v.to_string(), "_");
    }

    #[test]
    fn refresh_keeps_name_and_mode() {
        let v = Variable::named("Y").relocatable();
        let copy = v.refresh();
        assert_ne!(v, copy);
        assert_eq!(copy.name(), "Y");
        assert_eq!(copy.mode(), BindMode::Relocatable);
    }

    #[test]
    fn renaming_is_stable_per_variable() {
        let x = Variable::named("X");
        let mut renaming = Renaming::new();
        let first = renaming.rename(&x);
        let second = renaming.rename(&x);
        assert_eq!(first, second);
        assert_ne!(first, x);
        assert_eq!(renaming.get(&x), Some(&first));
        assert_eq!(renaming.by_name("X"), Some(&first));
    }
}
