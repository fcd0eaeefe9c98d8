use std::fmt;

use serde::{Serialize, Serializer};

/// A dotted path addressing a (possibly nested) record attribute.
///
/// # Examples
///
/// - `energy` → `["energy"]`
/// - `derived.elements.H` → `["derived", "elements", "H"]`
/// - `cell.0` → `["cell", "0"]` (numeric segments index arrays)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Split a dotted path. Empty segments are dropped, so `"a..b"` and
    /// `"a.b"` address the same attribute.
    pub fn parse(path: &str) -> Self {
        FieldPath(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment, the top-level record key.
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a predicate treats array-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    /// Some value of the field satisfies the predicate (`field`, `any(field)`).
    #[default]
    Any,
    /// The field has at least one element and every element satisfies the
    /// predicate (`all(field)`).
    All,
}

/// A field reference: the path plus its array quantifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldRef {
    pub path: FieldPath,
    pub quantifier: Quantifier,
}

impl FieldRef {
    pub fn new(path: impl Into<FieldPath>) -> Self {
        FieldRef {
            path: path.into(),
            quantifier: Quantifier::Any,
        }
    }

    pub fn all(path: impl Into<FieldPath>) -> Self {
        FieldRef {
            path: path.into(),
            quantifier: Quantifier::All,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantifier {
            Quantifier::Any => write!(f, "{}", self.path),
            Quantifier::All => write!(f, "all({})", self.path),
        }
    }
}
