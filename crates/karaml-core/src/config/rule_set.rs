// Karaml Rule Sets - compiled output documents
// Complex-modifications files and profile fragments

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Rules of one layer, or of the raw `json` entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRules {
    pub description: String,
    pub manipulators: Vec<Value>,
}

/// Profile name used when the document does not set one
pub const DEFAULT_PROFILE_NAME: &str = "Karaml Profile";

/// The compiled document, layers in priority order
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub title: String,
    pub profile_name: Option<String>,
    pub parameters: IndexMap<String, i64>,
    pub rules: Vec<LayerRules>,
}

#[derive(Serialize)]
struct ComplexModificationsFile<'a> {
    title: &'a str,
    rules: &'a [LayerRules],
}

#[derive(Serialize)]
struct ComplexModifications<'a> {
    #[serde(skip_serializing_if = "no_parameters")]
    parameters: &'a IndexMap<String, i64>,
    rules: &'a [LayerRules],
}

fn no_parameters(parameters: &&IndexMap<String, i64>) -> bool {
    parameters.is_empty()
}

#[derive(Serialize)]
struct Profile<'a> {
    name: &'a str,
    complex_modifications: ComplexModifications<'a>,
}

impl RuleSet {
    /// Number of manipulators across every layer
    pub fn manipulator_count(&self) -> usize {
        self.rules.iter().map(|layer| layer.manipulators.len()).sum()
    }

    /// `{"title": .., "rules": [..]}`, the shape of a file under
    /// `assets/complex_modifications`
    pub fn complex_modifications(&self) -> Result<Value> {
        let file = ComplexModificationsFile {
            title: &self.title,
            rules: &self.rules,
        };
        Ok(serde_json::to_value(file)?)
    }

    /// `{"name": .., "complex_modifications": {"parameters": .., "rules": [..]}}`,
    /// ready to be placed in the `profiles` list of `karabiner.json`
    pub fn profile(&self) -> Result<Value> {
        let profile = Profile {
            name: self.profile_name.as_deref().unwrap_or(DEFAULT_PROFILE_NAME),
            complex_modifications: ComplexModifications {
                parameters: &self.parameters,
                rules: &self.rules,
            },
        };
        Ok(serde_json::to_value(profile)?)
    }
}
