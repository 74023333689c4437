//! In-memory statement graph and the compact JSON-LD adapter.
//!
//! The graph is a set: inserting the same quad twice keeps one copy.
//! Statements are held in a `BTreeSet`, so iteration order is canonical.
//!
//! ## JSON-LD subset
//!
//! [`Graph::from_json_ld`] accepts a single flat node object:
//!
//! - `@context` is accepted and ignored,
//! - `id` / `@id` names the subject (a blank node is used when absent),
//! - `type` / `@type` produce `rdf:type` statements (compact names expand
//!   into the notifications namespace),
//! - any other key is a predicate; known terms are typed per the vocabulary
//!   table, unknown compact keys become string literals so that validation
//!   can name them,
//! - values may be strings, numbers, booleans, `{"@id": ..}`,
//!   `{"@value": .., "@type": ..}` or arrays of those.
//!
//! [`Graph::from_json_ld_with_base`] additionally resolves relative IRIs
//! (subject, IRI-valued terms, `@id` objects) against the request URL.

use std::collections::BTreeSet;

use serde_json::Value;
use url::Url;

use super::term::{Quad, Term};
use super::vocab::{
    expand_iri, term_kind, TermKind, RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_INTEGER,
};

/// Label of the subject used when a document has no `id`.
pub const DEFAULT_BLANK_LABEL: &str = "b0";

/// Error converting a JSON-LD document into a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonLdError {
    /// Body is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Document root is not a node object.
    #[error("expected a JSON-LD node object")]
    NotAnObject,
    /// A value could not be mapped to a term.
    #[error("unsupported value for `{key}`")]
    UnsupportedValue {
        /// Offending key.
        key: String,
    },
    /// The base IRI is not absolute.
    #[error("invalid base IRI: {0}")]
    InvalidBase(String),
}

/// A set of quads in the default graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    quads: BTreeSet<Quad>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quad; returns `false` if it was already present.
    pub fn insert(&mut self, quad: Quad) -> bool {
        self.quads.insert(quad)
    }

    /// Insert a statement from its parts.
    pub fn add(&mut self, subject: Term, predicate: impl Into<String>, object: Term) -> bool {
        self.insert(Quad::new(subject, predicate, object))
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Iterate statements in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// Objects of `(subject, predicate, ?)`.
    pub fn objects<'a>(&'a self, subject: &'a Term, predicate: &'a str) -> Vec<&'a Term> {
        self.quads
            .iter()
            .filter(|q| &q.subject == subject && q.predicate == predicate)
            .map(|q| &q.object)
            .collect()
    }

    /// Distinct subjects of statements using `predicate`.
    pub fn subjects_with(&self, predicate: &str) -> BTreeSet<&Term> {
        self.quads
            .iter()
            .filter(|q| q.predicate == predicate)
            .map(|q| &q.subject)
            .collect()
    }

    /// Distinct predicates used on `subject`.
    pub fn predicates_of(&self, subject: &Term) -> BTreeSet<&str> {
        self.quads
            .iter()
            .filter(|q| &q.subject == subject)
            .map(|q| q.predicate.as_str())
            .collect()
    }

    /// Parse a JSON-LD body.
    pub fn from_json_ld_str(body: &str) -> Result<Self, JsonLdError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| JsonLdError::InvalidJson(e.to_string()))?;
        Self::from_json_ld(&value)
    }

    /// Convert a compact JSON-LD node object into a graph.
    pub fn from_json_ld(document: &Value) -> Result<Self, JsonLdError> {
        Self::convert(document, None)
    }

    /// Convert a node object, resolving relative IRIs against `base`.
    pub fn from_json_ld_with_base(document: &Value, base: &str) -> Result<Self, JsonLdError> {
        let base = Url::parse(base).map_err(|e| JsonLdError::InvalidBase(e.to_string()))?;
        Self::convert(document, Some(&base))
    }

    fn convert(document: &Value, base: Option<&Url>) -> Result<Self, JsonLdError> {
        let node = match document {
            Value::Object(map) => map,
            Value::Array(items) if items.len() == 1 => {
                items[0].as_object().ok_or(JsonLdError::NotAnObject)?
            }
            _ => return Err(JsonLdError::NotAnObject),
        };

        let subject = match node.get("id").or_else(|| node.get("@id")) {
            Some(Value::String(id)) => Term::named(resolve(base, id)),
            Some(_) => {
                return Err(JsonLdError::UnsupportedValue {
                    key: "id".to_string(),
                })
            }
            None => Term::blank(DEFAULT_BLANK_LABEL),
        };

        let mut graph = Self::new();
        for (key, value) in node {
            match key.as_str() {
                "@context" | "id" | "@id" => {}
                "type" | "@type" => {
                    for item in as_items(value) {
                        let name = item.as_str().ok_or_else(|| JsonLdError::UnsupportedValue {
                            key: "type".to_string(),
                        })?;
                        graph.add(subject.clone(), RDF_TYPE, Term::named(expand_iri(name)));
                    }
                }
                _ => {
                    let predicate = expand_iri(key);
                    let kind = term_kind(key).unwrap_or(TermKind::String);
                    for item in as_items(value) {
                        let object = value_to_term(key, item, kind, base)?;
                        graph.add(subject.clone(), predicate.clone(), object);
                    }
                }
            }
        }
        Ok(graph)
    }
}

impl FromIterator<Quad> for Graph {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        Self {
            quads: iter.into_iter().collect(),
        }
    }
}

fn as_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Resolve `iri` against `base` when it is relative.
fn resolve(base: Option<&Url>, iri: &str) -> String {
    match base {
        Some(base) if Url::parse(iri).is_err() => base
            .join(iri)
            .map(String::from)
            .unwrap_or_else(|_| iri.to_string()),
        _ => iri.to_string(),
    }
}

fn value_to_term(
    key: &str,
    value: &Value,
    kind: TermKind,
    base: Option<&Url>,
) -> Result<Term, JsonLdError> {
    let unsupported = || JsonLdError::UnsupportedValue {
        key: key.to_string(),
    };
    match value {
        Value::String(s) => Ok(match kind.datatype() {
            None => Term::named(resolve(base, s)),
            Some(datatype) => Term::typed(s.clone(), datatype),
        }),
        Value::Bool(b) => Ok(Term::typed(b.to_string(), XSD_BOOLEAN)),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Term::typed(n.to_string(), XSD_INTEGER)),
        Value::Number(n) => Ok(Term::typed(n.to_string(), XSD_DECIMAL)),
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("@id") {
                return Ok(Term::named(resolve(base, id)));
            }
            match (map.get("@value"), map.get("@type")) {
                (Some(Value::String(v)), Some(Value::String(t))) => {
                    Ok(Term::typed(v.clone(), expand_iri(t)))
                }
                (Some(Value::String(v)), None) => Ok(Term::literal(v.clone())),
                _ => Err(unsupported()),
            }
        }
        Value::Null | Value::Array(_) => Err(unsupported()),
    }
}
