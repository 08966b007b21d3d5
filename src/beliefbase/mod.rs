//! The beliefbase: a tree of views holding an agent's beliefs.
//!
//! A literal with functor `a/b/c` lives in view `a/b` under the name `c`.
//! Inside a name, beliefs keep their insertion order and no two
//! structurally equal literals coexist. Every mutation reports at most one
//! [`BeliefEvent`], which maps to at most one [`Trigger`].
//!
//! Readers work on a [`BeliefSnapshot`]: taking one is an `Arc` clone, and
//! later writes copy only the nodes they touch.

pub mod view;

use std::fmt;
use std::sync::Arc;

use crate::config::BeliefsConfig;
use crate::error::BeliefResult;
use crate::plan::Trigger;
use crate::term::{Literal, Path};

pub use view::{BeliefSnapshot, ViewMode};
use view::ViewNode;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeliefEvent {
    Added(Literal),
    Removed(Literal),
    /// An atomic retract + assert.
    Replaced { old: Literal, new: Literal },
    /// The belief was already present. Only reported when the store is
    /// configured to emit it.
    Unchanged(Literal),
}

impl BeliefEvent {
    /// The trigger plans should see for this change. A replacement is
    /// announced as the addition of the new belief.
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            BeliefEvent::Added(l) => Some(Trigger::belief_added(l.clone())),
            BeliefEvent::Removed(l) => Some(Trigger::belief_removed(l.clone())),
            BeliefEvent::Replaced { new, .. } => Some(Trigger::belief_added(new.clone())),
            BeliefEvent::Unchanged(_) => None,
        }
    }
}

impl fmt::Display for BeliefEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeliefEvent::Added(l) => write!(f, "+{l}"),
            BeliefEvent::Removed(l) => write!(f, "-{l}"),
            BeliefEvent::Replaced { old, new } => write!(f, "{old} => {new}"),
            BeliefEvent::Unchanged(l) => write!(f, "={l}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A mutable beliefbase.
#[derive(Debug, Clone)]
pub struct BeliefStore {
    root: Arc<ViewNode>,
    emit_unchanged: bool,
    default_mode: ViewMode,
}

impl Default for BeliefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BeliefStore {
    pub fn new() -> Self {
        Self::with_config(&BeliefsConfig::default())
    }

    pub fn with_config(config: &BeliefsConfig) -> Self {
        Self {
            root: Arc::new(ViewNode::default()),
            emit_unchanged: config.emit_unchanged,
            default_mode: config.default_view_mode,
        }
    }

    /// Build a store from literals, ignoring the events.
    pub fn from_literals(literals: impl IntoIterator<Item = Literal>) -> Self {
        let mut store = Self::new();
        for literal in literals {
            store.add(literal);
        }
        store
    }

    /// Add a belief. Structural duplicates are not stored twice.
    pub fn add(&mut self, literal: Literal) -> Option<BeliefEvent> {
        if self.snapshot().contains(&literal) {
            return self.unchanged(literal);
        }
        let (leaf, parents) = split(literal.functor())?;
        let node = self.node_mut(&parents, true)?;
        node.buckets
            .entry(leaf)
            .or_default()
            .insert(literal.clone());
        tracing::trace!(belief = %literal, "belief added");
        Some(BeliefEvent::Added(literal))
    }

    /// Remove a belief. Removing an absent belief does nothing.
    pub fn remove(&mut self, literal: &Literal) -> Option<BeliefEvent> {
        if !self.snapshot().contains(literal) {
            return None;
        }
        let (leaf, parents) = split(literal.functor())?;
        let node = self.node_mut(&parents, false)?;
        let bucket = node.buckets.get_mut(&leaf)?;
        let removed = bucket.remove(literal)?;
        if bucket.is_empty() {
            node.buckets.remove(&leaf);
        }
        tracing::trace!(belief = %removed, "belief removed");
        Some(BeliefEvent::Removed(removed))
    }

    /// Retract `old` and assert `new` as one change.
    ///
    /// - `old` present, `new` absent: one `Replaced` event. When both share
    ///   a functor, `new` takes the position `old` had.
    /// - `old` present, `new` already present: reduces to removing `old`.
    /// - `old` absent: reduces to adding `new`.
    pub fn replace(&mut self, old: &Literal, new: Literal) -> Option<BeliefEvent> {
        let snapshot = self.snapshot();
        let has_old = snapshot.contains(old);
        let has_new = snapshot.contains(&new);
        drop(snapshot);

        match (has_old, has_new) {
            (false, _) => self.add(new),
            (true, true) if old == &new => self.unchanged(new),
            (true, true) => self.remove(old),
            (true, false) => {
                let removed = if old.functor() == new.functor() {
                    let (leaf, parents) = split(old.functor())?;
                    let node = self.node_mut(&parents, false)?;
                    node.buckets.get_mut(&leaf)?.replace(old, new.clone())?
                } else {
                    let Some(BeliefEvent::Removed(removed)) = self.remove(old) else {
                        return None;
                    };
                    self.add(new.clone());
                    removed
                };
                tracing::trace!(old = %removed, new = %new, "belief replaced");
                Some(BeliefEvent::Replaced { old: removed, new })
            }
        }
    }

    /// Create (or re-mode) the view at `path`.
    pub fn create_view(&mut self, path: &Path, mode: ViewMode) {
        if let Some(node) = self.node_mut(path.segments(), true) {
            node.mode = mode;
        }
    }

    /// Change the mode of an existing view.
    pub fn set_view_mode(&mut self, path: &Path, mode: ViewMode) -> BeliefResult<()> {
        self.snapshot().view(path)?;
        self.create_view(path, mode);
        Ok(())
    }

    /// Beliefs of the view at `path` and its transparent descendants.
    pub fn query(&self, path: &Path) -> Vec<Literal> {
        self.snapshot().query(path)
    }

    /// Read-only handle on the view at `path`.
    pub fn view(&self, path: &Path) -> BeliefResult<BeliefSnapshot> {
        self.snapshot().view(path)
    }

    /// Point-in-time view of the whole store.
    pub fn snapshot(&self) -> BeliefSnapshot {
        BeliefSnapshot::new(Arc::clone(&self.root), Path::root())
    }

    pub fn len(&self) -> usize {
        self.root_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, literal: &Literal) -> bool {
        self.snapshot().contains(literal)
    }

    fn root_count(&self) -> usize {
        self.snapshot().total()
    }

    fn unchanged(&self, literal: Literal) -> Option<BeliefEvent> {
        self.emit_unchanged.then_some(BeliefEvent::Unchanged(literal))
    }

    /// Walk to a node, copying shared nodes on the way. With `create`,
    /// missing views are created in the default mode.
    fn node_mut(&mut self, path: &[String], create: bool) -> Option<&mut ViewNode> {
        let default_mode = self.default_mode;
        let mut node = &mut self.root;
        for segment in path {
            let inner = Arc::make_mut(node);
            node = if create {
                inner
                    .children
                    .entry(segment.clone())
                    .or_insert_with(|| Arc::new(ViewNode::with_mode(default_mode)))
            } else {
                inner.children.get_mut(segment)?
            };
        }
        Some(Arc::make_mut(node))
    }
}

fn split(functor: &Path) -> Option<(String, Vec<String>)> {
    let (leaf, parents) = functor.segments().split_last()?;
    Some((leaf.clone(), parents.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn lit(functor: &str, args: Vec<Term>) -> Literal {
        Literal::new(functor, args).unwrap()
    }

    fn path(raw: &str) -> Path {
        Path::parse(raw).unwrap()
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = BeliefStore::new();
        let a = lit("a", vec![Term::int(1)]);
        assert_eq!(store.add(a.clone()), Some(BeliefEvent::Added(a.clone())));
        assert_eq!(store.add(a.clone()), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unchanged_is_reported_when_configured() {
        let mut store = BeliefStore::with_config(&BeliefsConfig {
            emit_unchanged: true,
            ..BeliefsConfig::default()
        });
        let a = lit("a", vec![]);
        store.add(a.clone());
        let event = store.add(a.clone()).unwrap();
        assert_eq!(event, BeliefEvent::Unchanged(a));
        assert!(event.trigger().is_none());
    }

    #[test]
    fn duplicates_collapse_and_order_is_kept() {
        let store = BeliefStore::from_literals([
            lit("a", vec![Term::int(1)]),
            lit("a", vec![Term::int(2)]),
            lit("a", vec![Term::float(1.0)]),
        ]);
        let found: Vec<_> = store.snapshot().literals(&path("a")).cloned().collect();
        assert_eq!(found, vec![lit("a", vec![Term::int(1)]), lit("a", vec![Term::int(2)])]);
    }

    #[test]
    fn removing_absent_belief_is_a_no_op() {
        let mut store = BeliefStore::new();
        assert!(store.remove(&lit("ghost", vec![])).is_none());
        assert!(store.remove(&lit("deep/ghost", vec![])).is_none());
        assert!(store.view(&path("deep")).is_err());
    }

    #[test]
    fn remove_returns_stored_annotations() {
        let mut store = BeliefStore::new();
        let stored = lit("a", vec![]).with_annotation("source", Term::atom("bob"));
        store.add(stored.clone());
        let Some(BeliefEvent::Removed(removed)) = store.remove(&lit("a", vec![])) else {
            panic!("expected a removal");
        };
        assert_eq!(removed.annotation("source"), Some(&Term::atom("bob")));
        assert!(store.is_empty());
    }

    #[test]
    fn replace_emits_one_event_and_keeps_position() {
        let mut store = BeliefStore::from_literals([
            lit("pos", vec![Term::int(1)]),
            lit("pos", vec![Term::int(2)]),
        ]);
        let event = store
            .replace(&lit("pos", vec![Term::int(1)]), lit("pos", vec![Term::int(9)]))
            .unwrap();
        assert_eq!(
            event.trigger(),
            Some(Trigger::belief_added(lit("pos", vec![Term::int(9)])))
        );
        let found: Vec<_> = store.snapshot().literals(&path("pos")).cloned().collect();
        assert_eq!(found, vec![lit("pos", vec![Term::int(9)]), lit("pos", vec![Term::int(2)])]);
    }

    #[test]
    fn replace_degenerates_to_add_or_remove() {
        let mut store = BeliefStore::new();
        let a = lit("a", vec![]);
        let b = lit("b", vec![]);
        assert_eq!(store.replace(&a, b.clone()), Some(BeliefEvent::Added(b.clone())));
        store.add(a.clone());
        assert_eq!(store.replace(&a, b.clone()), Some(BeliefEvent::Removed(a.clone())));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_across_functors() {
        let mut store = BeliefStore::new();
        let old = lit("x/a", vec![]);
        let new = lit("y/b", vec![]);
        store.add(old.clone());
        let event = store.replace(&old, new.clone()).unwrap();
        assert_eq!(event, BeliefEvent::Replaced { old, new: new.clone() });
        assert_eq!(store.query(&Path::root()), vec![new]);
    }

    #[test]
    fn opaque_views_hide_from_parent_queries() {
        let mut store = BeliefStore::new();
        store.add(lit("top", vec![]));
        store.add(lit("open/a", vec![]));
        store.add(lit("closed/b", vec![]));
        store.set_view_mode(&path("closed"), ViewMode::Opaque).unwrap();

        let root: Vec<String> = store
            .query(&Path::root())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(root, vec!["top", "open/a"]);
        assert_eq!(store.query(&path("closed")), vec![lit("closed/b", vec![])]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let mut store = BeliefStore::new();
        store.add(lit("a", vec![Term::int(1)]));
        let snapshot = store.snapshot();
        store.add(lit("a", vec![Term::int(2)]));
        store.remove(&lit("a", vec![Term::int(1)]));
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&lit("a", vec![Term::int(1)])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn candidates_filter_polarity_and_arity() {
        let store = BeliefStore::from_literals([
            lit("p", vec![Term::int(1)]),
            lit("p", vec![Term::int(2)]).with_negation(true),
            lit("p", vec![Term::int(1), Term::int(2)]),
        ]);
        let snapshot = store.snapshot();
        let query = lit("p", vec![Term::int(0)]).with_negation(true);
        let found: Vec<_> = snapshot.candidates(&query).collect();
        assert_eq!(found, vec![&lit("p", vec![Term::int(2)]).with_negation(true)]);
    }

    #[test]
    fn sub_view_handles_resolve_absolute_functors() {
        let mut store = BeliefStore::new();
        store.add(lit("agents/bob/likes", vec![Term::atom("tea")]));
        let bob = store.view(&path("agents/bob")).unwrap();
        assert_eq!(bob.path().to_string(), "agents/bob");
        assert_eq!(bob.literals(&path("agents/bob/likes")).count(), 1);
        assert_eq!(bob.literals(&path("likes")).count(), 0);
        assert_eq!(bob.query(&Path::root()).len(), 1);
    }
}
