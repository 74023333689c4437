//! Access modes and the access map handed to the authorizer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Permission category evaluated against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read the resource.
    Read,
    /// Add to the resource without removing anything.
    Append,
    /// Modify or delete the resource.
    Write,
    /// Change the resource's access-control policy.
    Control,
}

impl AccessMode {
    /// Parse an access mode from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(Self::Read),
            "append" => Some(Self::Append),
            "write" => Some(Self::Write),
            "control" => Some(Self::Control),
            _ => None,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Append => write!(f, "append"),
            Self::Write => write!(f, "write"),
            Self::Control => write!(f, "control"),
        }
    }
}

/// Resource identifier → access modes required on it.
///
/// Built once by a channel type's `extract_modes` and only read afterwards;
/// the builder methods consume `self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMap(BTreeMap<String, BTreeSet<AccessMode>>);

impl AccessMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map requiring `modes` on a single resource.
    pub fn single(
        resource: impl Into<String>,
        modes: impl IntoIterator<Item = AccessMode>,
    ) -> Self {
        let mut map = BTreeMap::new();
        map.insert(resource.into(), modes.into_iter().collect());
        Self(map)
    }

    /// Add a required mode on a resource.
    pub fn with(mut self, resource: impl Into<String>, mode: AccessMode) -> Self {
        self.0.entry(resource.into()).or_default().insert(mode);
        self
    }

    /// Modes required on a resource, if any.
    pub fn modes_for(&self, resource: &str) -> Option<&BTreeSet<AccessMode>> {
        self.0.get(resource)
    }

    /// Whether `mode` is required on `resource`.
    pub fn requires(&self, resource: &str, mode: AccessMode) -> bool {
        self.modes_for(resource).is_some_and(|modes| modes.contains(&mode))
    }

    /// Iterate `(resource, modes)` in resource order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<AccessMode>)> {
        self.0.iter().map(|(resource, modes)| (resource.as_str(), modes))
    }

    /// Number of resources in the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no access is required at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccessMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (resource, modes) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            let modes: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
            write!(f, "{resource}: {{{}}}", modes.join(", "))?;
        }
        Ok(())
    }
}
