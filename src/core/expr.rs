//! Substitution expressions and the property bag they evaluate against.
//!
//! Replacement values in a manifest are micro-expressions: a plain string is
//! a literal, a `$`-prefixed string names a property, and `$NewGuid()` is a
//! builtin that yields a fresh identifier on every evaluation. The form is
//! parsed once into a tagged [`Expr`] rather than re-detected by string
//! prefix at each use.

use std::collections::HashMap;

use uuid::Uuid;

/// The one property seeded automatically before any evaluation.
pub const PROJECT_NAME_PROPERTY: &str = "ProjectName";

/// Builtin expression name, compared case-insensitively.
const NEW_GUID_BUILTIN: &str = "NewGuid()";

/// A parsed substitution expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A plain string, returned unchanged.
    Literal(String),
    /// A `$name` reference into the property bag.
    PropertyRef(String),
    /// The `$NewGuid()` builtin; every evaluation yields a fresh v4 UUID.
    NewGuid,
}

impl Expr {
    /// Parse the raw expression form from a manifest.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('$') {
            None => Expr::Literal(raw.to_string()),
            Some(name) if name.eq_ignore_ascii_case(NEW_GUID_BUILTIN) => Expr::NewGuid,
            Some(name) => Expr::PropertyRef(name.to_string()),
        }
    }

    /// Evaluate against a property bag.
    ///
    /// A reference to an absent property evaluates to `None`; it is never an
    /// error.
    pub fn evaluate(&self, properties: &PropertyBag) -> Option<String> {
        match self {
            Expr::Literal(text) => Some(text.clone()),
            Expr::PropertyRef(name) => properties.get(name).map(str::to_string),
            Expr::NewGuid => Some(Uuid::new_v4().to_string()),
        }
    }
}

/// Caller-supplied property values consulted by [`Expr::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    values: HashMap<String, String>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the bag for one instantiation call: the caller's extra
    /// properties, then `ProjectName` overwritten with the project name
    /// argument whenever that argument is non-blank.
    pub fn for_project(extra: &HashMap<String, String>, project_name: &str) -> Self {
        let mut bag = Self {
            values: extra.clone(),
        };
        if !project_name.trim().is_empty() {
            bag.set(PROJECT_NAME_PROPERTY, project_name);
        }
        bag
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
