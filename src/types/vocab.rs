//! Vocabulary constants and the compact JSON-LD term table.
//!
//! Channel documents use a compact form where every key that is not a
//! JSON-LD keyword is a term of the Solid notifications vocabulary. The
//! table here says how each known term's value is typed in the graph.

/// Solid notifications vocabulary namespace.
pub const NOTIFY: &str = "http://www.w3.org/ns/solid/notifications#";

/// JSON-LD context advertised on every document this crate produces.
pub const NOTIFY_CONTEXT: &str = "https://www.w3.org/ns/solid/notification/v1";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// `xsd:string`.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:dateTime`.
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
/// `xsd:duration`.
pub const XSD_DURATION: &str = "http://www.w3.org/2001/XMLSchema#duration";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:decimal`.
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

/// Compact names of the common channel features.
pub mod feature {
    /// Content negotiation of notification bodies.
    pub const ACCEPT: &str = "accept";
    /// Channel expiry.
    pub const END_AT: &str = "endAt";
    /// Minimum interval between notifications.
    pub const RATE: &str = "rate";
    /// Deferred channel start.
    pub const START_AT: &str = "startAt";
    /// Client-known resource state.
    pub const STATE: &str = "state";

    /// Features every built-in channel type supports.
    pub const DEFAULT_FEATURES: &[&str] = &[ACCEPT, END_AT, RATE, START_AT, STATE];
}

/// How the value of a term is represented in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Named node.
    Iri,
    /// Plain string literal.
    String,
    /// `xsd:dateTime` literal.
    DateTime,
    /// `xsd:duration` literal.
    Duration,
}

impl TermKind {
    /// Datatype IRI of literal kinds.
    pub fn datatype(&self) -> Option<&'static str> {
        match self {
            Self::Iri => None,
            Self::String => Some(XSD_STRING),
            Self::DateTime => Some(XSD_DATE_TIME),
            Self::Duration => Some(XSD_DURATION),
        }
    }
}

const TERMS: &[(&str, TermKind)] = &[
    ("topic", TermKind::Iri),
    ("state", TermKind::String),
    ("startAt", TermKind::DateTime),
    ("endAt", TermKind::DateTime),
    ("rate", TermKind::Duration),
    ("accept", TermKind::String),
    ("receiveFrom", TermKind::Iri),
    ("target", TermKind::Iri),
    ("sender", TermKind::Iri),
];

/// Look up the kind of a known compact term.
pub fn term_kind(term: &str) -> Option<TermKind> {
    TERMS
        .iter()
        .find(|(name, _)| *name == term)
        .map(|(_, kind)| *kind)
}

/// Full IRI of a term in the notifications namespace.
pub fn notify(local: &str) -> String {
    format!("{NOTIFY}{local}")
}

/// Expand a compact term or type name to an IRI.
///
/// Anything containing a `:` is taken to be absolute already.
pub fn expand_iri(value: &str) -> String {
    if value.contains(':') {
        value.to_string()
    } else {
        notify(value)
    }
}

/// Compact an IRI in the notifications namespace to its local name.
pub fn compact_iri(iri: &str) -> &str {
    match iri.strip_prefix(NOTIFY) {
        Some(local) if !local.is_empty() => local,
        _ => iri,
    }
}
