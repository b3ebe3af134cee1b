//! The template data model: a named project skeleton plus the substitution
//! and rename rules applied when it is instantiated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::expr::{Expr, PropertyBag};
use crate::core::source::TemplateSource;

/// Categorization of templates. Only project templates exist today; the enum
/// keeps the manifest field forward-compatible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Project,
}

/// One substitution rule: find `key`, replace it with the evaluated value
/// expression, falling back to the default expression when the value
/// evaluates blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Literal substring to find. Never empty after manifest validation.
    pub key: String,
    /// Value expression (literal, `$property` or `$NewGuid()`).
    pub value: String,
    /// Fallback expression used when the value evaluates blank.
    pub default_value: Option<String>,
}

impl Replacement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            default_value: None,
        }
    }

    pub fn with_default(
        key: impl Into<String>,
        value: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            default_value: Some(default_value.into()),
        }
    }

    /// The value this rule substitutes, or `None` when the rule contributes
    /// nothing: value expression first, then the default expression, a blank
    /// outcome at both stages leaving the key untouched in the output.
    pub fn effective_value(&self, properties: &PropertyBag) -> Option<String> {
        let primary = Expr::parse(&self.value).evaluate(properties);
        if let Some(value) = primary {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }

        let default_expr = self.default_value.as_deref()?;
        if default_expr.trim().is_empty() {
            return None;
        }
        Expr::parse(default_expr)
            .evaluate(properties)
            .filter(|value| !value.trim().is_empty())
    }
}

/// A named, parameterizable project skeleton.
#[derive(Debug, Clone)]
pub struct Template {
    /// Unique name, the id callers select by.
    pub name: String,
    pub kind: TemplateKind,
    /// Nest the output under `<dest>/<project-name>` instead of writing into
    /// the destination directly.
    pub create_new_folder: bool,
    /// Alternative names accepted by lookup.
    pub aliases: BTreeSet<String>,
    /// Content substitution rules, applied in declaration order.
    pub replacements: Vec<Replacement>,
    /// File/directory rename rules, applied in declaration order.
    pub path_replacements: Vec<Replacement>,
    /// Glob patterns for files that are not part of the template.
    pub excludes: Vec<String>,
    /// Where the template files physically live.
    pub source: TemplateSource,
    /// Absolute path of the defining manifest, set at load time and never
    /// persisted. Empty for templates built programmatically.
    pub manifest_path: PathBuf,
}

impl Template {
    /// Build a project template rooted at a folder, the programmatic
    /// equivalent of the smallest possible manifest.
    pub fn from_folder(name: impl Into<String>, source_folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: TemplateKind::Project,
            create_new_folder: true,
            aliases: BTreeSet::new(),
            replacements: Vec::new(),
            path_replacements: Vec::new(),
            excludes: Vec::new(),
            source: TemplateSource::folder(source_folder),
            manifest_path: PathBuf::new(),
        }
    }

    /// Directory containing the defining manifest; relative source folders
    /// resolve against it.
    pub fn manifest_dir(&self) -> &Path {
        self.manifest_path.parent().unwrap_or(Path::new("."))
    }

    /// Case-insensitive match on the template name or any alias.
    pub fn matches_name(&self, requested: &str) -> bool {
        self.name.eq_ignore_ascii_case(requested)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(requested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bag(pairs: &[(&str, &str)]) -> PropertyBag {
        let mut extra = HashMap::new();
        for (name, value) in pairs {
            extra.insert(name.to_string(), value.to_string());
        }
        PropertyBag::for_project(&extra, "")
    }

    #[test]
    fn test_effective_value_resolves_property() {
        let rule = Replacement::new("WebApiProject", "$ProjectName");
        let properties = bag(&[("ProjectName", "Foo")]);
        assert_eq!(rule.effective_value(&properties), Some("Foo".to_string()));
    }

    #[test]
    fn test_effective_value_falls_back_to_default_expression() {
        let rule = Replacement::with_default("../artifacts", "$Artifacts", "$Fallback");
        let properties = bag(&[("Fallback", "out")]);
        assert_eq!(rule.effective_value(&properties), Some("out".to_string()));
    }

    #[test]
    fn test_effective_value_absent_when_nothing_resolves() {
        let rule = Replacement::with_default("token", "$Missing", "$AlsoMissing");
        assert_eq!(rule.effective_value(&bag(&[])), None);

        let no_default = Replacement::new("token", "$Missing");
        assert_eq!(no_default.effective_value(&bag(&[])), None);
    }

    #[test]
    fn test_effective_value_default_may_be_a_builtin() {
        let rule = Replacement::with_default("guid-token", "$ProjectGuid", "$NewGuid()");
        let value = rule.effective_value(&bag(&[])).unwrap();
        assert!(uuid::Uuid::parse_str(&value).is_ok());
    }

    #[test]
    fn test_matches_name_checks_aliases_case_insensitively() {
        let mut template = Template::from_folder("microsoft.aspnet.web.empty", "/templates/web");
        template.aliases.insert("empty-web".to_string());

        assert!(template.matches_name("MICROSOFT.aspnet.WEB.empty"));
        assert!(template.matches_name("Empty-Web"));
        assert!(!template.matches_name("console"));
    }

    #[test]
    fn test_manifest_dir_defaults_to_current_dir() {
        let template = Template::from_folder("t", "/templates/t");
        assert_eq!(template.manifest_dir(), Path::new("."));
    }
}
