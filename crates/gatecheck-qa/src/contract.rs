//! UI contract validator
//!
//! Deterministic structural lint over an artifact's declarative
//! result-presentation contract. Collects every issue rather than stopping
//! at the first; issues are namespaced by artifact name so multi-artifact
//! reports stay readable.

use gatecheck_types::{ArtifactDescriptor, DisplayKind, UiContract};
use once_cell::sync::Lazy;
use regex::Regex;

/// Icon identifiers are lowercase words joined by underscores
static ICON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-z]+(_[a-z]+)*$").unwrap());

/// Minimum try-it examples a contract must carry
const MIN_EXAMPLES: usize = 2;

/// Validate contracts across all artifacts of a build
#[must_use]
pub fn validate_all(artifacts: &[ArtifactDescriptor]) -> Vec<String> {
    artifacts.iter().flat_map(validate).collect()
}

/// Validate one artifact's contract, returning all issues found
#[must_use]
pub fn validate(artifact: &ArtifactDescriptor) -> Vec<String> {
    let name = &artifact.name;

    let Some(contract) = &artifact.ui_contract else {
        return vec![format!("{name}: missing UI contract")];
    };

    let mut issues = Vec::new();
    check_examples(name, contract, &mut issues);
    check_display(name, contract, &mut issues);
    check_labels(name, contract, &mut issues);
    issues
}

fn check_examples(name: &str, contract: &UiContract, issues: &mut Vec<String>) {
    let found = contract.example_inputs.len();
    if found < MIN_EXAMPLES {
        issues.push(format!(
            "{name}: Needs {MIN_EXAMPLES}+ example inputs, found {found}"
        ));
    }
}

fn check_display(name: &str, contract: &UiContract, issues: &mut Vec<String>) {
    let Some(display) = &contract.display else {
        issues.push(format!("{name}: no result presentation declared"));
        return;
    };

    if display.kind == DisplayKind::Raw {
        issues.push(format!(
            "{name}: raw data dump presentation; declare card_grid, table, text, or list"
        ));
    }

    if display.kind == DisplayKind::List && display.items_field.is_none() {
        issues.push(format!(
            "{name}: list presentation missing an items source field"
        ));
    }

    if display
        .summary_template
        .as_ref()
        .map_or(true, |t| t.trim().is_empty())
    {
        issues.push(format!("{name}: presentation missing a summary template"));
    }

    if let Some(icon) = &display.icon {
        if !ICON_RE.is_match(icon) {
            issues.push(format!(
                "{name}: icon '{icon}' must be lowercase with underscores"
            ));
        }
    }
}

fn check_labels(name: &str, contract: &UiContract, issues: &mut Vec<String>) {
    for field in &contract.input_fields {
        let key = &field.key;
        match &field.label {
            None => issues.push(format!("{name}: input field '{key}' has no human label")),
            Some(label) if label.trim().is_empty() => {
                issues.push(format!("{name}: input field '{key}' has no human label"));
            }
            Some(label) if trivially_machine_cased(label, key) => {
                issues.push(format!(
                    "{name}: input field '{key}' label '{label}' is just the machine key"
                ));
            }
            Some(_) => {}
        }
    }
}

/// Label quality heuristic: the label is the machine key modulo case
///
/// "max_results" and "MAX_RESULTS" are machine-cased for key
/// `max_results`; "Max Results" is a human label and passes.
fn trivially_machine_cased(label: &str, key: &str) -> bool {
    label.trim().to_lowercase() == key.trim().to_lowercase()
}
