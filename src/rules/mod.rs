//! Extraction rule configuration.
//!
//! A [`RuleConfig`] maps element names to the [`RuleKind`] that classifies
//! them during extraction, optionally conditioned on attribute values, plus
//! two global defaults: exclude-by-default and preserve-whitespace.
//! Whitespace rules live in a separate set so one element can carry both a
//! content rule and a whitespace rule (`pre` is inline in HTML-like configs
//! and also preserves whitespace).
//!
//! Configurations deserialize from YAML:
//!
//! ```yaml
//! exclude_by_default: false
//! preserve_whitespace: false
//! elements:
//!   p: { kind: text_unit }
//!   b: { kind: inline }
//!   script: { kind: excluded }
//!   ph:
//!     kind: inline
//!     conditions:
//!       - { attribute: translate, compare: not_equals, values: ["no"] }
//! preserve_whitespace_elements: [pre]
//! ```

pub mod state;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Classification assigned to a markup element by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Content is opaque skeleton until the matching end tag.
    Excluded,
    /// Exception inside an excluded block: content is extracted normally.
    Included,
    /// The element maps to a group boundary.
    Group,
    /// The element's content is one translatable unit.
    TextUnit,
    /// The element is an in-line code inside a text run.
    Inline,
    /// An in-line code whose content is protected: start tag, content, and
    /// end tag collapse into one code.
    InlineExcluded,
    /// Only the element's attributes need processing.
    AttributesOnly,
    /// The element flips whitespace preservation for its span.
    PreserveWhitespace,
    /// No rule configured for the element.
    #[default]
    NotFound,
}

/// How an attribute condition compares values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareKind {
    /// Attribute value equals one of the listed values (case-insensitive).
    Equals,
    /// Attribute value differs from all listed values (case-insensitive).
    NotEquals,
    /// Attribute value matches one of the listed regular expressions.
    Matches,
}

/// One attribute-value condition attached to an element rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeCondition {
    /// Attribute name the condition reads.
    pub attribute: String,
    /// Comparison applied to the attribute value.
    pub compare: CompareKind,
    /// Values (or patterns) compared against.
    pub values: Vec<String>,
}

impl AttributeCondition {
    /// Evaluates the condition against a tag's attributes.
    ///
    /// Multiple `equals`/`matches` values are OR-ed; `not_equals` values are
    /// AND-ed. A missing attribute fails `equals` and `matches` but passes
    /// `not_equals` (the value differs from everything).
    #[must_use]
    pub fn matches(&self, attributes: &HashMap<String, String>) -> bool {
        let value = attributes.get(&self.attribute);
        match self.compare {
            CompareKind::Equals => value.is_some_and(|value| {
                self.values
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(value))
            }),
            CompareKind::NotEquals => !value.is_some_and(|value| {
                self.values
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(value))
            }),
            CompareKind::Matches => value.is_some_and(|value| {
                self.values.iter().any(|pattern| {
                    regex::Regex::new(&format!("^(?:{pattern})$"))
                        .map(|re| re.is_match(value))
                        .unwrap_or(false)
                })
            }),
        }
    }
}

/// Rule for one element: its kind, optionally gated on attribute conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRule {
    /// Classification when the conditions hold.
    pub kind: RuleKind,
    /// Conditions OR-ed together; empty means the rule always applies.
    #[serde(default)]
    pub conditions: Vec<AttributeCondition>,
}

/// The full rule configuration consumed by extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Everything not explicitly included is skeleton.
    #[serde(default)]
    pub exclude_by_default: bool,
    /// Whitespace is significant unless a rule says otherwise.
    #[serde(default)]
    pub preserve_whitespace: bool,
    /// Element-name to rule mapping; names are matched case-insensitively.
    #[serde(default)]
    pub elements: HashMap<String, ElementRule>,
    /// Elements that flip whitespace preservation, independent of any
    /// content rule they also carry.
    #[serde(default)]
    pub preserve_whitespace_elements: HashSet<String>,
}

impl RuleConfig {
    /// Parses a configuration from its YAML form.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The element's configured kind, ignoring conditions.
    #[must_use]
    pub fn element_kind(&self, name: &str) -> RuleKind {
        self.elements
            .get(&name.to_ascii_lowercase())
            .map_or(RuleKind::NotFound, |rule| rule.kind)
    }

    /// The element's kind after evaluating attribute conditions.
    ///
    /// When a rule's conditions fail, an [`RuleKind::Inline`] element
    /// degrades to [`RuleKind::InlineExcluded`] (the tag, its content, and
    /// the end tag collapse into one protected code); any other kind degrades
    /// to [`RuleKind::NotFound`].
    #[must_use]
    pub fn conditional_element_kind(
        &self,
        name: &str,
        attributes: &HashMap<String, String>,
    ) -> RuleKind {
        let Some(rule) = self.elements.get(&name.to_ascii_lowercase()) else {
            return RuleKind::NotFound;
        };
        if rule.conditions.is_empty()
            || rule.conditions.iter().any(|cond| cond.matches(attributes))
        {
            return rule.kind;
        }
        match rule.kind {
            RuleKind::Inline => RuleKind::InlineExcluded,
            _ => RuleKind::NotFound,
        }
    }

    /// Whether the element carries a whitespace-preservation rule.
    #[must_use]
    pub fn is_preserve_whitespace_element(&self, name: &str) -> bool {
        self.preserve_whitespace_elements
            .contains(&name.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
exclude_by_default: false
preserve_whitespace: false
elements:
  p: { kind: text_unit }
  b: { kind: inline }
  script: { kind: excluded }
  ph:
    kind: inline
    conditions:
      - { attribute: translate, compare: not_equals, values: ["no"] }
preserve_whitespace_elements: [pre]
"#;

    #[test]
    fn parses_yaml_configuration() {
        let config = RuleConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(!config.exclude_by_default);
        assert_eq!(config.element_kind("p"), RuleKind::TextUnit);
        assert_eq!(config.element_kind("B"), RuleKind::Inline);
        assert_eq!(config.element_kind("unknown"), RuleKind::NotFound);
        assert!(config.is_preserve_whitespace_element("pre"));
        assert!(!config.is_preserve_whitespace_element("p"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(RuleConfig::from_yaml_str("elements: [not, a, map]").is_err());
    }

    #[test]
    fn failed_condition_degrades_inline_to_inline_excluded() {
        let config = RuleConfig::from_yaml_str(SAMPLE).unwrap();
        let mut attributes = HashMap::new();
        // Missing attribute passes a not_equals condition.
        assert_eq!(
            config.conditional_element_kind("ph", &attributes),
            RuleKind::Inline
        );
        attributes.insert("translate".to_string(), "no".to_string());
        assert_eq!(
            config.conditional_element_kind("ph", &attributes),
            RuleKind::InlineExcluded
        );
        attributes.insert("translate".to_string(), "yes".to_string());
        assert_eq!(
            config.conditional_element_kind("ph", &attributes),
            RuleKind::Inline
        );
    }

    #[test]
    fn matches_condition_uses_regex() {
        let condition = AttributeCondition {
            attribute: "class".to_string(),
            compare: CompareKind::Matches,
            values: vec!["^note-\\d+$".to_string()],
        };
        let mut attributes = HashMap::new();
        attributes.insert("class".to_string(), "note-12".to_string());
        assert!(condition.matches(&attributes));
        attributes.insert("class".to_string(), "note-".to_string());
        assert!(!condition.matches(&attributes));
    }
}
