// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # credo
//!
//! The reasoning core of a BDI (belief-desire-intention) agent runtime:
//! logic terms, unification, hierarchical belief stores, plan and rule
//! selection, and consistency metrics between the beliefs of several
//! agents.
//!
//! ## Architecture
//!
//! - **Terms** (`term`): atoms, numbers, strings, variables and annotated literals
//! - **Unification** (`unify`): hash-indexed and recursive matchers yielding lazy substitutions
//! - **Beliefs** (`beliefbase`): copy-on-write tree of views with cheap snapshots
//! - **Selection** (`plan`): trigger-indexed plan libraries, guards, depth-bounded rule resolution
//! - **Consistency** (`consistency`): pairwise metrics and Markov-chain scoring of many stores
//! - **Agents** (`agent`): one store, one plan library and a trigger queue per agent
//!
//! ## Library usage
//!
//! ```no_run
//! use credo::beliefbase::BeliefStore;
//! use credo::term::{Literal, Term, Variable};
//! use credo::unify::{Unifier, UnifyAlgorithm};
//! use credo::unify::Substitution;
//!
//! let mut store = BeliefStore::new();
//! store.add(Literal::new("at", [Term::atom("home")]).unwrap());
//!
//! let x = Variable::named("X");
//! let query = Literal::new("at", [Term::var(&x)]).unwrap();
//! let snapshot = store.snapshot();
//! let unifier = Unifier::new(UnifyAlgorithm::HashIndexed);
//! for substitution in unifier.unify(&query, snapshot.candidates(&query), &Substitution::new()) {
//!     println!("X = {}", substitution.value_of(&x).unwrap());
//! }
//! ```

pub mod agent;
pub mod beliefbase;
pub mod config;
pub mod consistency;
pub mod context;
pub mod document;
pub mod error;
pub mod plan;
pub mod term;
pub mod unify;
