// Karaml Config Documents - YAML and TOML loaders
// Decodes either format into one generic, order-preserving tree

use std::path::Path;

use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Source format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// `.toml` files are TOML, everything else is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Decode a document into a generic tree
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Yaml => parse_yaml(text),
        DocumentFormat::Toml => parse_toml(text),
    }
}

#[cfg(feature = "yaml-config")]
fn parse_yaml(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::YamlParse(e.to_string()))?;
    yaml_to_tree(yaml)
}

#[cfg(not(feature = "yaml-config"))]
fn parse_yaml(_text: &str) -> Result<Value> {
    Err(ConfigError::InvalidDocument(
        "YAML support is not enabled (feature 'yaml-config')".into(),
    ))
}

#[cfg(feature = "toml-config")]
fn parse_toml(text: &str) -> Result<Value> {
    toml::from_str(text).map_err(|e| ConfigError::TomlParse(e.to_string()))
}

#[cfg(not(feature = "toml-config"))]
fn parse_toml(_text: &str) -> Result<Value> {
    Err(ConfigError::InvalidDocument(
        "TOML support is not enabled (feature 'toml-config')".into(),
    ))
}

/// YAML allows non-string keys (`1: escape`); they become their text form
#[cfg(feature = "yaml-config")]
fn yaml_to_tree(yaml: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_tree)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => {
                        return Err(ConfigError::InvalidDocument(format!(
                            "unsupported mapping key: {:?}",
                            other
                        )))
                    }
                };
                map.insert(key, yaml_to_tree(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_tree(tagged.value)?,
    })
}
