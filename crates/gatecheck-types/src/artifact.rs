//! Deployed artifact descriptors
//!
//! An artifact is one deployed, independently invocable unit of generated
//! functionality. Descriptors are owned by the build process and read-only
//! to verification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One deployed output of a successful build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Artifact name (unique within the build)
    pub name: String,
    /// Invocation address
    pub endpoint: String,
    /// Human-facing description
    pub description: String,
    /// Declared input schema
    pub input_schema: Value,
    /// Declarative result-presentation contract, if any
    pub ui_contract: Option<UiContract>,
    /// Smoke test cases
    pub test_cases: Vec<TestCase>,
}

impl ArtifactDescriptor {
    /// Create a descriptor with no contract or test cases
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            description: description.into(),
            input_schema: Value::Null,
            ui_contract: None,
            test_cases: Vec::new(),
        }
    }

    /// With input schema
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// With UI contract
    #[inline]
    #[must_use]
    pub fn with_contract(mut self, contract: UiContract) -> Self {
        self.ui_contract = Some(contract);
        self
    }

    /// With a test case
    #[inline]
    #[must_use]
    pub fn with_test_case(mut self, case: TestCase) -> Self {
        self.test_cases.push(case);
        self
    }
}

/// One smoke test case: input, expected-output pattern, description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Input payload
    pub input: Value,
    /// Expected-output pattern (subset match with operators)
    pub expected: Value,
    /// Human description of what the case checks
    pub description: String,
}

impl TestCase {
    /// Create a test case
    #[inline]
    #[must_use]
    pub fn new(input: Value, expected: Value, description: impl Into<String>) -> Self {
        Self {
            input,
            expected,
            description: description.into(),
        }
    }
}

/// Declarative result-presentation contract attached to an artifact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiContract {
    /// Result presentation, if declared
    pub display: Option<DisplaySpec>,
    /// Try-it example inputs
    pub example_inputs: Vec<Value>,
    /// Declared input fields
    pub input_fields: Vec<InputField>,
}

impl UiContract {
    /// Create an empty contract
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With display spec
    #[inline]
    #[must_use]
    pub fn with_display(mut self, display: DisplaySpec) -> Self {
        self.display = Some(display);
        self
    }

    /// With an example input
    #[inline]
    #[must_use]
    pub fn with_example(mut self, example: Value) -> Self {
        self.example_inputs.push(example);
        self
    }

    /// With an input field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: InputField) -> Self {
        self.input_fields.push(field);
        self
    }
}

/// Result presentation declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySpec {
    /// Presentation kind
    pub kind: DisplayKind,
    /// Human-readable summary template
    pub summary_template: Option<String>,
    /// Source field for list items (list kind only)
    pub items_field: Option<String>,
    /// Icon identifier, lowercase with underscores
    pub icon: Option<String>,
}

impl DisplaySpec {
    /// Create a display spec of the given kind
    #[inline]
    #[must_use]
    pub fn new(kind: DisplayKind) -> Self {
        Self {
            kind,
            summary_template: None,
            items_field: None,
            icon: None,
        }
    }

    /// With summary template
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, template: impl Into<String>) -> Self {
        self.summary_template = Some(template.into());
        self
    }

    /// With list items source field
    #[inline]
    #[must_use]
    pub fn with_items_field(mut self, field: impl Into<String>) -> Self {
        self.items_field = Some(field.into());
        self
    }

    /// With icon identifier
    #[inline]
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Curated presentation kinds; `Raw` is the unstructured fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Grid of cards
    CardGrid,
    /// Tabular results
    Table,
    /// Prose text
    Text,
    /// Item list
    List,
    /// Raw data dump (rejected by the contract validator)
    Raw,
}

/// Declared input field with its human label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    /// Machine key
    pub key: String,
    /// Human-readable label
    pub label: Option<String>,
}

impl InputField {
    /// Create a field with a label
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: Some(label.into()),
        }
    }

    /// Create a field with no label
    #[inline]
    #[must_use]
    pub fn unlabeled(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_builder() {
        let artifact = ArtifactDescriptor::new("weather", "http://localhost:9001/weather", "Weather lookup")
            .with_schema(json!({"type": "object"}))
            .with_test_case(TestCase::new(
                json!({"city": "Oslo"}),
                json!({"celsius": 20}),
                "Oslo lookup",
            ));

        assert_eq!(artifact.test_cases.len(), 1);
        assert!(artifact.ui_contract.is_none());
    }

    #[test]
    fn contract_builder() {
        let contract = UiContract::new()
            .with_display(DisplaySpec::new(DisplayKind::CardGrid).with_summary("{count} results"))
            .with_example(json!({"city": "Oslo"}))
            .with_field(InputField::new("city", "City"));

        assert_eq!(contract.example_inputs.len(), 1);
        assert_eq!(contract.input_fields[0].key, "city");
    }

    #[test]
    fn display_kind_serde_names() {
        let kind: DisplayKind = serde_json::from_str("\"card_grid\"").unwrap();
        assert_eq!(kind, DisplayKind::CardGrid);
    }
}
