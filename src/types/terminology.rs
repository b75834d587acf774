//! Minimal CodeSystem and ValueSet records used for binding validation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystem {
    #[serde(default = "code_system_resource_type")]
    pub resource_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// complete | fragment | example | not-present
    #[serde(default = "complete_content")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<Concept>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Concept {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Nested child concepts of a hierarchical code system.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<Concept>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    #[serde(default = "value_set_resource_type")]
    pub resource_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValueSetCompose {
    #[serde(default)]
    pub include: Vec<ConceptSet>,
}

/// One `compose.include` entry: a whole code system, or an enumerated
/// subset of it when `concept` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<Concept>,
}

fn code_system_resource_type() -> String {
    "CodeSystem".to_string()
}

fn value_set_resource_type() -> String {
    "ValueSet".to_string()
}

fn complete_content() -> String {
    "complete".to_string()
}

impl Concept {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: Some(display.into()),
            concept: Vec::new(),
        }
    }
}

impl CodeSystem {
    pub fn new(url: impl Into<String>, name: impl Into<String>, concept: Vec<Concept>) -> Self {
        Self {
            resource_type: code_system_resource_type(),
            url: url.into(),
            name: Some(name.into()),
            version: None,
            content: complete_content(),
            concept,
        }
    }

    /// Depth-first lookup through nested concepts.
    pub fn find(&self, code: &str) -> Option<&Concept> {
        fn walk<'a>(concepts: &'a [Concept], code: &str) -> Option<&'a Concept> {
            concepts
                .iter()
                .find_map(|c| if c.code == code { Some(c) } else { walk(&c.concept, code) })
        }
        walk(&self.concept, code)
    }

    /// Whether a missing code can be reported as definitely not a member.
    pub fn is_complete(&self) -> bool {
        self.content == "complete"
    }
}

impl ValueSet {
    /// Value set that includes every code of the given code systems.
    pub fn including_systems<I, S>(url: impl Into<String>, name: impl Into<String>, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: value_set_resource_type(),
            url: url.into(),
            name: Some(name.into()),
            compose: Some(ValueSetCompose {
                include: systems
                    .into_iter()
                    .map(|system| ConceptSet {
                        system: Some(system.into()),
                        concept: Vec::new(),
                    })
                    .collect(),
            }),
        }
    }

    pub fn includes(&self) -> &[ConceptSet] {
        self.compose
            .as_ref()
            .map(|c| c.include.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nested_concept() {
        let mut parent = Concept::new("parent", "Parent");
        parent.concept.push(Concept::new("child", "Child"));
        let system = CodeSystem::new("http://example.org/cs", "Example", vec![parent]);

        assert_eq!(system.find("child").and_then(|c| c.display.as_deref()), Some("Child"));
        assert!(system.find("missing").is_none());
        assert!(system.is_complete());
    }
}
