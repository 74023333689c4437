//! RDF terms and quads.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vocab::XSD_STRING;

/// An RDF term.
///
/// Implements `Ord` so graphs can keep statements in a canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    /// IRI reference.
    NamedNode(String),
    /// Blank node with a document-local label.
    BlankNode(String),
    /// Literal value with its datatype IRI.
    Literal {
        /// Lexical form.
        value: String,
        /// Datatype IRI.
        datatype: String,
    },
}

impl Term {
    /// Create a named node.
    pub fn named(iri: impl Into<String>) -> Self {
        Self::NamedNode(iri.into())
    }

    /// Create a blank node.
    pub fn blank(label: impl Into<String>) -> Self {
        Self::BlankNode(label.into())
    }

    /// Create an `xsd:string` literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::typed(value, XSD_STRING)
    }

    /// Create a literal with an explicit datatype.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: datatype.into(),
        }
    }

    /// The IRI, if this is a named node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::NamedNode(iri) => Some(iri),
            _ => None,
        }
    }

    /// Lexical form and datatype, if this is a literal.
    pub fn as_literal(&self) -> Option<(&str, &str)> {
        match self {
            Self::Literal { value, datatype } => Some((value, datatype)),
            _ => None,
        }
    }

    /// Short name of the term kind, used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NamedNode(_) => "IRI",
            Self::BlankNode(_) => "blank node",
            Self::Literal { .. } => "literal",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(iri) => write!(f, "<{iri}>"),
            Self::BlankNode(label) => write!(f, "_:{label}"),
            Self::Literal { value, datatype } => write!(f, "{value:?}^^<{datatype}>"),
        }
    }
}

/// A statement in the default graph.
///
/// Ordering is canonical: subject, then predicate, then object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// Subject term.
    pub subject: Term,
    /// Predicate IRI.
    pub predicate: String,
    /// Object term.
    pub object: Term,
}

impl Quad {
    /// Create a new quad.
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}
