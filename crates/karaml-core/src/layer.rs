// Karaml Core - Layer Keys
// Parses "/nav/ + /sym/ description" layer keys into rule preconditions

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ConfigError, Result};
use crate::rule::Condition;

/// Layer whose mappings apply without any precondition
pub const BASE_LAYER: &str = "base";

/// Suffix of the variable backing a layer
pub const LAYER_VARIABLE_SUFFIX: &str = "_layer";

static LAYER_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/[^/]+/(?:\s*\+\s*/[^/]+/)*)\s*(.*)$").expect("static regex")
});

static LAYER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/\s]+)/$").expect("static regex"));

/// Name of the variable backing a layer: `nav` -> `nav_layer`
pub fn layer_variable(name: &str) -> String {
    format!("{}{}", name, LAYER_VARIABLE_SUFFIX)
}

/// A parsed top-level layer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerKey {
    /// The layer part of the key, e.g. `/nav/ + /sym/`
    pub key: String,
    /// Every layer named in the key, without slashes
    pub names: Vec<String>,
    pub description: String,
}

impl LayerKey {
    /// Parse a layer key such as `/base/`, `/nav/ Navigation` or
    /// `/nav/ + /sym/`.
    ///
    /// # Examples
    /// ```
    /// use karaml_core::layer::LayerKey;
    /// let layer = LayerKey::parse("/nav/ + /sym/").unwrap();
    /// assert_eq!(layer.names, vec!["nav", "sym"]);
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let caps = LAYER_KEY
            .captures(raw)
            .ok_or_else(|| ConfigError::InvalidLayerName(raw.to_string()))?;
        let (layers, rest) = match (caps.get(1), caps.get(2)) {
            (Some(layers), Some(rest)) => (layers.as_str(), rest.as_str()),
            _ => return Err(ConfigError::InvalidLayerName(raw.to_string())),
        };

        if rest.starts_with('+') {
            return Err(ConfigError::InvalidLayerName(raw.to_string()));
        }

        let mut names = Vec::new();
        for part in layers.split('+') {
            let part = part.trim();
            let name = LAYER_NAME
                .captures(part)
                .and_then(|c| c.get(1))
                .ok_or_else(|| ConfigError::InvalidLayerName(part.to_string()))?;
            names.push(name.as_str().to_string());
        }

        let description = if rest.trim().is_empty() {
            format!("{} layer", layers)
        } else {
            rest.trim().to_string()
        };

        Ok(Self {
            key: layers.to_string(),
            names,
            description,
        })
    }

    /// Preconditions for mappings of this layer.
    ///
    /// Each non-base layer requires `{name}_layer == 1`.
    pub fn conditions(&self) -> Vec<Condition> {
        self.names
            .iter()
            .filter(|name| name.as_str() != BASE_LAYER)
            .map(|name| Condition::variable(layer_variable(name), 1))
            .collect()
    }
}
