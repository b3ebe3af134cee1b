//! stencil: create new projects from reusable directory templates.
//!
//! A template is a directory tree plus a manifest describing substitution
//! and rename rules. Instantiation stages the tree in an ephemeral
//! workspace, rewrites placeholder tokens in contents and in file and
//! directory names, and copies the result to the destination, which is only
//! touched at the final step.
//!
//! The pipeline is sequential and unlocked; runs sharing the acquisition
//! cache must not overlap (see [`infrastructure::cache`]).

#![deny(unsafe_code)]

pub mod core;
pub mod infrastructure;

pub use crate::core::catalog::{CatalogDiagnostic, CatalogScan, TemplateCatalog};
pub use crate::core::creator::ProjectCreator;
pub use crate::core::error::{Error, Result};
pub use crate::core::expr::{Expr, PropertyBag, PROJECT_NAME_PROPERTY};
pub use crate::core::resolver::SourceResolver;
pub use crate::core::source::{SourceLocation, TemplateSource};
pub use crate::core::template::{Replacement, Template, TemplateKind};
pub use crate::infrastructure::cache::CacheLayout;
pub use crate::infrastructure::registry::SourceRegistry;
