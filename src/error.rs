//! Rich diagnostic error types for credo.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, giving a stable error code and help text. Conditions that are
//! part of normal reasoning (no match, arity or functor mismatch) are never
//! errors: they show up as empty iterators.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type.
///
/// Each variant wraps a subsystem-specific error, preserving its diagnostic
/// code and help text through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CredoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Belief(#[from] BeliefError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}

// ---------------------------------------------------------------------------
// Term errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TermError {
    #[error("empty path: \"{raw}\"")]
    #[diagnostic(
        code(credo::term::empty_path),
        help(
            "Functors and belief paths need at least one non-empty segment. \
             Segments are separated by `/`."
        )
    )]
    EmptyPath { raw: String },
}

// ---------------------------------------------------------------------------
// Binding errors
// ---------------------------------------------------------------------------

/// Refused variable bindings.
///
/// Inside unification a `BindError` only rejects the candidate being tried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BindError {
    #[error("cyclic binding: {var} would be bound to {term}, which contains it")]
    #[diagnostic(
        code(credo::bind::cyclic),
        help("A variable cannot be bound to a term that contains the same variable.")
    )]
    CyclicBinding { var: String, term: String },

    #[error("variable {var} is already bound")]
    #[diagnostic(
        code(credo::bind::already_bound),
        help("Bound variables are compared by value; they are never rebound in a substitution.")
    )]
    AlreadyBound { var: String },

    #[error("conflicting bindings for {var}")]
    #[diagnostic(
        code(credo::bind::conflict),
        help("The two substitutions bind {var} to values that do not unify.")
    )]
    Conflict { var: String },

    #[error("variable {var} is fixed in this context")]
    #[diagnostic(
        code(credo::bind::fixed),
        help(
            "Fixed variables are single-assignment inside a context. \
             Mark the variable relocatable if the context is reused across iterations."
        )
    )]
    FixedRebind { var: String },
}

// ---------------------------------------------------------------------------
// Belief store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BeliefError {
    #[error("no view at path \"{path}\"")]
    #[diagnostic(
        code(credo::beliefs::view_not_found),
        help(
            "Views are created when a belief is added below them or through \
             `BeliefStore::create_view`."
        )
    )]
    ViewNotFound { path: String },
}

// ---------------------------------------------------------------------------
// Selection and rule resolution errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SelectError {
    #[error("rule call {call} exceeded the depth budget of {depth}")]
    #[diagnostic(
        code(credo::select::recursion_budget),
        help(
            "The rule kept calling itself until the depth budget ran out. \
             Add a base case or raise `selector.max_rule_depth`."
        )
    )]
    RecursionBudgetExceeded { call: String, depth: usize },

    #[error("step budget of {steps} exhausted")]
    #[diagnostic(
        code(credo::select::step_budget),
        help("Raise `selector.max_steps`, or set it to 0 for no limit.")
    )]
    StepBudgetExceeded { steps: u64 },

    #[error("evaluation cancelled")]
    #[diagnostic(
        code(credo::select::cancelled),
        help("The cancellation token was triggered; committed belief changes are kept.")
    )]
    Cancelled,

    #[error("no applicable plan for {trigger}")]
    #[diagnostic(
        code(credo::select::no_applicable_plan),
        help(
            "Strict selection treats unhandled triggers as errors. \
             Add a plan for this trigger or set `selector.strict = false`."
        )
    )]
    NoApplicablePlan { trigger: String },
}

// ---------------------------------------------------------------------------
// Consistency errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConsistencyError {
    #[error("invalid metric input: {message}")]
    #[diagnostic(
        code(credo::consistency::invalid_input),
        help("Check the metric, filter and belief annotations used for this scoring call.")
    )]
    InvalidMetricInput { message: String },

    #[error("unknown store \"{name}\"")]
    #[diagnostic(
        code(credo::consistency::unknown_store),
        help("Register the store with `ConsistencyEngine::register` first.")
    )]
    UnknownStore { name: String },

    #[error("compression failed: {source}")]
    #[diagnostic(
        code(credo::consistency::compression),
        help("The in-memory compressor reported an I/O error. This should not happen.")
    )]
    Compression {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(credo::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(credo::config::parse),
        help("Check the TOML syntax and field names. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(credo::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("failed to read document: {path}")]
    #[diagnostic(
        code(credo::document::read),
        help("Ensure the belief document exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse document: {path}")]
    #[diagnostic(
        code(credo::document::parse),
        help("Belief documents are JSON (`.json`) or TOML (any other extension). {message}")
    )]
    Parse { path: String, message: String },

    #[error("invalid term in document: {message}")]
    #[diagnostic(
        code(credo::document::invalid_term),
        help(
            "Terms are numbers, bare names (`Upper` or `_` is a variable, `&Name` is \
             evaluated at use, anything else is an atom), `{{\"str\": ..}}` for strings \
             or `{{\"functor\": .., \"args\": [..], \"negated\": .., \"annotations\": {{..}}}}`."
        )
    )]
    InvalidTerm { message: String },
}

impl From<TermError> for DocumentError {
    fn from(e: TermError) -> Self {
        DocumentError::InvalidTerm {
            message: e.to_string(),
        }
    }
}

pub type TermResult<T> = std::result::Result<T, TermError>;
pub type BeliefResult<T> = std::result::Result<T, BeliefError>;
pub type SelectResult<T> = std::result::Result<T, SelectError>;
pub type ConsistencyResult<T> = std::result::Result<T, ConsistencyError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
