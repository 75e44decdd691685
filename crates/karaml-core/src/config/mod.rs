// Karaml Config - document model
// Reserved top-level keys, layers, and rule-set assembly

pub mod document;
pub mod rule_set;

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::compiler::Compiler;
use crate::error::{ConfigError, Result};
use crate::event::HoldFlavor;
use crate::layer::LayerKey;
use crate::mapping;
use crate::registry::Registry;

pub use document::{parse_document, DocumentFormat};
pub use rule_set::{LayerRules, RuleSet, DEFAULT_PROFILE_NAME};

/// Title used when the document does not set one
pub const DEFAULT_TITLE: &str = "Karaml Rules";

/// Description of the layer holding raw `json` rules
pub const JSON_LAYER_DESCRIPTION: &str = "/JSON/ layer";

/// One layer and its `from: value` mappings, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub layer: LayerKey,
    pub mappings: Map<String, Value>,
}

/// Counts reported by `--check-config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigStats {
    pub layers: usize,
    pub mappings: usize,
}

/// A decoded karaml document
#[derive(Debug, Clone, PartialEq)]
pub struct KaramlConfig {
    pub title: String,
    pub profile_name: Option<String>,
    /// Profile-wide rule parameters, short names expanded
    pub parameters: IndexMap<String, i64>,
    /// Raw rule objects passed through unchanged
    pub json: Vec<Value>,
    pub aliases: IndexMap<String, String>,
    pub templates: IndexMap<String, String>,
    pub layers: Vec<LayerDefinition>,
}

impl KaramlConfig {
    /// Build the document model from a decoded tree.
    ///
    /// The reserved keys are `profile_name`, `title`, `parameters`, `json`,
    /// `aliases` and `templates`; every other top-level key must be a layer
    /// key.
    pub fn from_value(tree: Value) -> Result<Self> {
        let root = match tree {
            Value::Object(root) => root,
            Value::Null => Map::new(),
            other => {
                return Err(ConfigError::InvalidDocument(format!(
                    "expected a mapping at the top level, got {}",
                    type_name(&other)
                )))
            }
        };

        let mut config = KaramlConfig {
            title: DEFAULT_TITLE.to_string(),
            profile_name: None,
            parameters: IndexMap::new(),
            json: Vec::new(),
            aliases: IndexMap::new(),
            templates: IndexMap::new(),
            layers: Vec::new(),
        };

        for (key, value) in root {
            match key.as_str() {
                "profile_name" => config.profile_name = optional_text(&key, &value)?,
                "title" => {
                    if let Some(title) = optional_text(&key, &value)? {
                        config.title = title;
                    }
                }
                "parameters" => config.parameters = mapping::translate_params(&value)?,
                "json" => config.json = json_rules(value)?,
                "aliases" => config.aliases = definitions(&key, value)?,
                "templates" => config.templates = definitions(&key, value)?,
                _ => {
                    let layer = LayerKey::parse(&key)?;
                    let mappings = match value {
                        Value::Object(mappings) => mappings,
                        Value::Null => {
                            warn!("layer '{}' has no mappings", key);
                            Map::new()
                        }
                        other => {
                            return Err(ConfigError::InvalidDocument(format!(
                                "layer '{}' must be a mapping of from-keys, got {}",
                                key,
                                type_name(&other)
                            )))
                        }
                    };
                    config.layers.push(LayerDefinition { layer, mappings });
                }
            }
        }

        debug!(
            "loaded {} layer(s), {} alias(es), {} template(s)",
            config.layers.len(),
            config.aliases.len(),
            config.templates.len()
        );
        Ok(config)
    }

    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self> {
        Self::from_value(parse_document(text, format)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, DocumentFormat::Yaml)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, DocumentFormat::Toml)
    }

    /// Load a document from disk, choosing the format by extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let format = DocumentFormat::from_path(path);
        debug!("reading {} as {:?}", path.display(), format);
        Self::parse(&text, format)
    }

    /// Bootstrap the registry from the document's aliases and templates
    pub fn registry(&self) -> Result<Registry> {
        Registry::builder()
            .aliases(self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())))?
            .templates(self.templates.iter().map(|(k, v)| (k.as_str(), v.as_str())))?
            .build()
    }

    pub fn stats(&self) -> ConfigStats {
        ConfigStats {
            layers: self.layers.len(),
            mappings: self.layers.iter().map(|l| l.mappings.len()).sum(),
        }
    }

    /// Compile every layer into a rule set.
    ///
    /// Layers come out in reverse document order, with the `json` rules
    /// first, so rules of later layers take priority over `/base/`.
    pub fn compile(&self, hold_flavor: HoldFlavor) -> Result<RuleSet> {
        let compiler = Compiler::new(self.registry()?, hold_flavor);

        let mut rules = Vec::with_capacity(self.layers.len() + 1);
        for definition in &self.layers {
            let mut manipulators = Vec::new();
            for (from, value) in &definition.mappings {
                let compiled = compiler.compile_mapping(&definition.layer, from, value)?;
                for rule in &compiled {
                    manipulators.push(rule.to_json()?);
                }
            }
            debug!(
                "{}: {} manipulator(s)",
                definition.layer.key,
                manipulators.len()
            );
            rules.push(LayerRules {
                description: definition.layer.description.clone(),
                manipulators,
            });
        }

        if !self.json.is_empty() {
            rules.push(LayerRules {
                description: JSON_LAYER_DESCRIPTION.to_string(),
                manipulators: self.json.clone(),
            });
        }
        rules.reverse();

        Ok(RuleSet {
            title: self.title.clone(),
            profile_name: self.profile_name.clone(),
            parameters: self.parameters.clone(),
            rules,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

fn optional_text(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(ConfigError::InvalidDocument(format!(
            "'{}' must be a string, got {}",
            key,
            type_name(other)
        ))),
    }
}

fn json_rules(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(rules) => {
            if let Some(bad) = rules.iter().find(|rule| !rule.is_object()) {
                return Err(ConfigError::InvalidDocument(format!(
                    "'json' entries must be rule objects, got {}",
                    type_name(bad)
                )));
            }
            Ok(rules)
        }
        rule @ Value::Object(_) => Ok(vec![rule]),
        other => Err(ConfigError::InvalidDocument(format!(
            "'json' must be a list of rule objects, got {}",
            type_name(&other)
        ))),
    }
}

/// `name: definition` tables for `aliases` and `templates`
fn definitions(key: &str, value: Value) -> Result<IndexMap<String, String>> {
    let entries = match value {
        Value::Null => return Ok(IndexMap::new()),
        Value::Object(entries) => entries,
        other => {
            return Err(ConfigError::InvalidDocument(format!(
                "'{}' must be a mapping, got {}",
                key,
                type_name(&other)
            )))
        }
    };

    let mut out = IndexMap::with_capacity(entries.len());
    for (name, definition) in entries {
        let definition = match definition {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ConfigError::InvalidDocument(format!(
                    "'{}.{}' must be a string, got {}",
                    key,
                    name,
                    type_name(&other)
                )))
            }
        };
        out.insert(name, definition);
    }
    Ok(out)
}
