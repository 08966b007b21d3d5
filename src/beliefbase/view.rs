//! Copy-on-write view tree and read-only snapshots of it.
//!
//! Every node of the tree is behind an `Arc`. Writers go through
//! `Arc::make_mut`, so a [`BeliefSnapshot`] taken before a write keeps
//! seeing the tree as it was; only the nodes on the written path are
//! copied.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BeliefError, BeliefResult};
use crate::term::{Literal, Path};

/// Whether a view's beliefs show up in its parent's bulk queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Transparent,
    Opaque,
}

/// Literals sharing a name inside one view, in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Bucket {
    order: Vec<Literal>,
    members: HashSet<Literal>,
}

impl Bucket {
    pub(crate) fn contains(&self, literal: &Literal) -> bool {
        self.members.contains(literal)
    }

    /// Returns `false` if a structurally equal literal is already here.
    pub(crate) fn insert(&mut self, literal: Literal) -> bool {
        if !self.members.insert(literal.clone()) {
            return false;
        }
        self.order.push(literal);
        true
    }

    /// Remove and return the stored copy (annotations included).
    pub(crate) fn remove(&mut self, literal: &Literal) -> Option<Literal> {
        if !self.members.remove(literal) {
            return None;
        }
        let position = self.order.iter().position(|l| l == literal)?;
        Some(self.order.remove(position))
    }

    /// Swap `old` for `new` at the same position.
    pub(crate) fn replace(&mut self, old: &Literal, new: Literal) -> Option<Literal> {
        let position = self.order.iter().position(|l| l == old)?;
        self.members.remove(old);
        self.members.insert(new.clone());
        Some(std::mem::replace(&mut self.order[position], new))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.order.iter()
    }
}

/// One node of the belief tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct ViewNode {
    pub(crate) mode: ViewMode,
    pub(crate) buckets: BTreeMap<String, Bucket>,
    pub(crate) children: BTreeMap<String, Arc<ViewNode>>,
}

impl ViewNode {
    pub(crate) fn with_mode(mode: ViewMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub(crate) fn descend(&self, path: &[String]) -> Option<&ViewNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// The bucket a literal with this (relative) functor lives in.
    pub(crate) fn bucket(&self, functor: &Path) -> Option<&Bucket> {
        let (leaf, parents) = functor.segments().split_last()?;
        self.descend(parents)?.buckets.get(leaf)
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Literal>, include_self_opaque: bool) {
        if self.mode == ViewMode::Opaque && !include_self_opaque {
            return;
        }
        for bucket in self.buckets.values() {
            out.extend(bucket.iter());
        }
        for child in self.children.values() {
            child.collect_into(out, false);
        }
    }

    fn count(&self) -> usize {
        self.buckets.values().map(|b| b.order.len()).sum::<usize>()
            + self.children.values().map(|c| c.count()).sum::<usize>()
    }
}

/// A read-only, point-in-time handle on a belief (sub)tree.
///
/// Cloning is cheap. Mutations of the store made after the snapshot was
/// taken are not visible through it.
#[derive(Debug, Clone)]
pub struct BeliefSnapshot {
    node: Arc<ViewNode>,
    base: Path,
}

impl BeliefSnapshot {
    pub(crate) fn new(node: Arc<ViewNode>, base: Path) -> Self {
        Self { node, base }
    }

    /// Absolute path of this view.
    pub fn path(&self) -> &Path {
        &self.base
    }

    pub fn mode(&self) -> ViewMode {
        self.node.mode
    }

    /// Beliefs of the view at `path` (relative to this one) and of its
    /// transparent descendants. A view queried directly always shows its
    /// own beliefs, even when it is opaque.
    pub fn query(&self, path: &Path) -> Vec<Literal> {
        self.query_refs(path).into_iter().cloned().collect()
    }

    pub(crate) fn query_refs(&self, path: &Path) -> Vec<&Literal> {
        let mut out = Vec::new();
        if let Some(node) = self.node.descend(path.segments()) {
            node.collect_into(&mut out, true);
        }
        out
    }

    /// Every belief visible from this view.
    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.query_refs(&Path::root()).into_iter()
    }

    /// Handle on a descendant view.
    pub fn view(&self, path: &Path) -> BeliefResult<BeliefSnapshot> {
        let mut node = &self.node;
        for segment in path.segments() {
            node = node
                .children
                .get(segment)
                .ok_or_else(|| BeliefError::ViewNotFound {
                    path: self.base.append(path).to_string(),
                })?;
        }
        Ok(BeliefSnapshot::new(Arc::clone(node), self.base.append(path)))
    }

    /// Beliefs with exactly this (absolute) functor, any polarity, in
    /// insertion order.
    pub fn literals<'s>(&'s self, functor: &Path) -> impl Iterator<Item = &'s Literal> + use<'s> {
        functor
            .strip_prefix(&self.base)
            .and_then(|relative| self.node.bucket(&relative))
            .into_iter()
            .flat_map(Bucket::iter)
    }

    /// Unification candidates for `query`: same functor and polarity, in
    /// insertion order.
    pub fn candidates<'s>(&'s self, query: &Literal) -> impl Iterator<Item = &'s Literal> + use<'s> {
        let negated = query.is_negated();
        let arity = query.arity();
        self.literals(query.functor())
            .filter(move |l| l.is_negated() == negated && l.arity() == arity)
    }

    /// Whether a structurally equal belief is stored.
    pub fn contains(&self, literal: &Literal) -> bool {
        literal
            .functor()
            .strip_prefix(&self.base)
            .and_then(|relative| self.node.bucket(&relative))
            .is_some_and(|b| b.contains(literal))
    }

    /// Number of beliefs visible from this view.
    pub fn len(&self) -> usize {
        self.query_refs(&Path::root()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of beliefs in the whole subtree, opaque views included.
    pub fn total(&self) -> usize {
        self.node.count()
    }
}
