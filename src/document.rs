//! JSON/TOML documents of beliefs and queries.
//!
//! Terms are written the way they read:
//!
//! - numbers are numbers,
//! - a bare string starting with an uppercase letter or `_` is a variable
//!   (`_` alone is anonymous), one starting with `&` is an evaluate-at-use
//!   variable, anything else is an atom,
//! - `{ "str": "..." }` is a string value,
//! - `{ "functor": "...", "args": [...], "negated": bool, "annotations": {...} }`
//!   is a literal.
//!
//! Variable names are scoped to one top-level literal: `X` in two beliefs
//! is two different variables, `X` twice in one query is the same one.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::beliefbase::{BeliefStore, ViewMode};
use crate::config::BeliefsConfig;
use crate::error::{DocumentError, DocumentResult};
use crate::term::{Literal, Path, Term, Variable};

/// One term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermDoc {
    Int(i64),
    Float(f64),
    Name(String),
    Str(StrDoc),
    Literal(LiteralDoc),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrDoc {
    pub str: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralDoc {
    pub functor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TermDoc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, TermDoc>,
}

/// A view to create before the beliefs are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDoc {
    pub path: Path,
    #[serde(default)]
    pub mode: ViewMode,
}

/// A belief file: views, beliefs and queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeliefsDoc {
    pub views: Vec<ViewDoc>,
    pub beliefs: Vec<LiteralDoc>,
    pub queries: Vec<LiteralDoc>,
}

#[derive(Default)]
struct Scope {
    variables: HashMap<String, Variable>,
}

impl Scope {
    fn variable(&mut self, name: &str) -> Variable {
        if name == "_" {
            return Variable::anonymous();
        }
        if let Some(v) = self.variables.get(name) {
            return v.clone();
        }
        let v = match name.strip_prefix('&') {
            Some(stripped) => Variable::evaluate(stripped),
            None => Variable::named(name),
        };
        self.variables.insert(name.to_string(), v.clone());
        v
    }
}

fn is_variable_name(name: &str) -> bool {
    name.starts_with('&')
        || name
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_uppercase())
}

impl TermDoc {
    fn to_term(&self, scope: &mut Scope) -> DocumentResult<Term> {
        Ok(match self {
            TermDoc::Int(i) => Term::int(*i),
            TermDoc::Float(f) => Term::float(*f),
            TermDoc::Name(name) if is_variable_name(name) => Term::var(&scope.variable(name)),
            TermDoc::Name(name) => Term::atom(name),
            TermDoc::Str(s) => Term::string(&s.str),
            TermDoc::Literal(l) => Term::from(l.to_literal_in(scope)?),
        })
    }
}

impl LiteralDoc {
    /// Build the literal with its own variable scope.
    pub fn to_literal(&self) -> DocumentResult<Literal> {
        self.to_literal_in(&mut Scope::default())
    }

    fn to_literal_in(&self, scope: &mut Scope) -> DocumentResult<Literal> {
        let args = self
            .args
            .iter()
            .map(|a| a.to_term(scope))
            .collect::<DocumentResult<Vec<_>>>()?;
        let mut literal = Literal::new(&self.functor, args)?.with_negation(self.negated);
        for (key, value) in &self.annotations {
            literal = literal.with_annotation(key, value.to_term(scope)?);
        }
        Ok(literal)
    }

    /// Parse a single literal from JSON text.
    pub fn from_json(text: &str) -> DocumentResult<Self> {
        serde_json::from_str(text).map_err(|e| DocumentError::InvalidTerm {
            message: e.to_string(),
        })
    }
}

impl BeliefsDoc {
    /// Load by extension: `.json` is JSON, anything else TOML.
    pub fn load(path: &std::path::Path) -> DocumentResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| DocumentError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn literals(&self) -> DocumentResult<Vec<Literal>> {
        self.beliefs.iter().map(LiteralDoc::to_literal).collect()
    }

    pub fn queries(&self) -> DocumentResult<Vec<Literal>> {
        self.queries.iter().map(LiteralDoc::to_literal).collect()
    }

    /// A store holding the document's views and beliefs.
    pub fn to_store(&self, config: &BeliefsConfig) -> DocumentResult<BeliefStore> {
        let mut store = BeliefStore::with_config(config);
        for view in &self.views {
            store.create_view(&view.path, view.mode);
        }
        for literal in self.literals()? {
            store.add(literal);
        }
        Ok(store)
    }
}

/// Load a belief document straight into a store.
pub fn load_store(path: &std::path::Path, config: &BeliefsConfig) -> DocumentResult<BeliefStore> {
    BeliefsDoc::load(path)?.to_store(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::VarKind;

    const JSON: &str = r#"{
        "views": [{ "path": "secret", "mode": "opaque" }],
        "beliefs": [
            { "functor": "at", "args": ["home"] },
            { "functor": "temperature", "args": [21.5], "annotations": { "weight": 2 } },
            { "functor": "secret/code", "args": [{ "str": "1234" }] },
            { "functor": "raining", "negated": true }
        ],
        "queries": [
            { "functor": "edge", "args": ["X", "X", "_", "_"] },
            { "functor": "at", "args": ["Where"] }
        ]
    }"#;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn json_document_builds_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "beliefs.json", JSON);
        let store = load_store(&path, &BeliefsConfig::default()).unwrap();

        assert_eq!(store.len(), 4);
        // the opaque view hides its belief from the root
        assert_eq!(store.snapshot().len(), 3);
        assert!(store.contains(&Literal::new("at", [Term::atom("home")]).unwrap()));
        assert!(store.contains(&Literal::atom("raining").unwrap().negate()));
        assert!(store.contains(&Literal::new("secret/code", [Term::string("1234")]).unwrap()));
    }

    #[test]
    fn variables_are_scoped_per_literal() {
        let doc: BeliefsDoc = serde_json::from_str(JSON).unwrap();
        let queries = doc.queries().unwrap();
        let args = queries[0].args();
        assert_eq!(args[0], args[1]);
        assert_ne!(args[2], args[3]);
        assert!(args[2].as_variable().unwrap().is_anonymous());

        let again = doc.queries().unwrap();
        assert_ne!(queries[1].args()[0], again[1].args()[0]);
    }

    #[test]
    fn evaluate_variables_and_weights() {
        let doc = LiteralDoc::from_json(r#"{ "functor": "f", "args": ["&Now", "atom"] }"#).unwrap();
        let literal = doc.to_literal().unwrap();
        let var = literal.args()[0].as_variable().unwrap();
        assert_eq!(var.kind(), VarKind::Evaluate);
        assert_eq!(literal.args()[1], Term::atom("atom"));

        let doc: BeliefsDoc = serde_json::from_str(JSON).unwrap();
        assert_eq!(doc.literals().unwrap()[1].weight(), Some(2.0));
    }

    #[test]
    fn toml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "beliefs.toml",
            r#"
            [[beliefs]]
            functor = "room/clean"
            args = ["kitchen"]

            [[beliefs]]
            functor = "room/clean"
            args = ["hall"]
            "#,
        );
        let store = load_store(&path, &BeliefsConfig::default()).unwrap();
        assert_eq!(store.query(&Path::parse("room").unwrap()).len(), 2);
    }

    #[test]
    fn errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = BeliefsDoc::load(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(missing, DocumentError::Read { .. }));

        let bad = write(&dir, "bad.json", "{ not json");
        assert!(matches!(BeliefsDoc::load(&bad).unwrap_err(), DocumentError::Parse { .. }));

        let empty_functor = LiteralDoc::from_json(r#"{ "functor": "/" }"#).unwrap();
        assert!(empty_functor.to_literal().is_err());
    }
}
