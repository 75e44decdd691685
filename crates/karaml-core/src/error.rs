// Karaml Core - Configuration Errors
// Every failure the compiler can report is a configuration error

/// Errors raised while loading or compiling a karaml document.
///
/// Low-level variants carry the offending token and the expression it was
/// found in. The compiler wraps them in [`ConfigError::Mapping`] so a
/// diagnostic always names its containing mapping.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("YAML parse error: {0}")]
    YamlParse(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid key code '{key}' in '{expr}'")]
    InvalidKeyCode { key: String, expr: String },

    #[error("Invalid modifier '{modifier}' in '{expr}'")]
    InvalidModifier { modifier: String, expr: String },

    #[error("Invalid optional modifiers '{modifiers}' in '{expr}': {reason}")]
    InvalidOptionalModifiers {
        modifiers: String,
        expr: String,
        reason: &'static str,
    },

    #[error("'optional' not allowed for 'to.modifiers' in '{0}'")]
    OptionalModifierInTo(String),

    #[error("Invalid layer name '{0}'")]
    InvalidLayerName(String),

    #[error("Wrong template arity for '{name}': expected {expected} argument(s), got {got}")]
    TemplateArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid arguments for template '{name}': '{args}' ({reason})")]
    InvalidTemplateArgs {
        name: String,
        args: String,
        reason: String,
    },

    #[error("Invalid template definition '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("Invalid alias '{name}': {reason}")]
    InvalidAlias { name: String, reason: String },

    #[error("Invalid object literal '{literal}': {reason}")]
    InvalidObjectLiteral { literal: String, reason: String },

    #[error("Must map 'to' key for: {0}")]
    MissingTo(String),

    #[error("Invalid 'from' event '{key}' in '{expr}': only key codes, consumer key codes and pointing buttons can be matched")]
    InvalidFromEvent { key: String, expr: String },

    #[error("Invalid mapping definition for '{from}': {reason}")]
    InvalidMapping { from: String, reason: String },

    #[error("Invalid to-event option '{0}': expected lazy, repeat or halt")]
    InvalidOpt(String),

    #[error("Invalid flag '{0}': options must start with '+' or '-'")]
    InvalidFlag(String),

    #[error("Invalid rule parameter '{0}'")]
    InvalidParameter(String),

    #[error("Invalid value for rule parameter '{name}': {value}")]
    InvalidParameterValue { name: String, value: String },

    #[error("Invalid application condition '{0}': expected 'if' or 'unless' followed by bundle identifiers")]
    InvalidAppCondition(String),

    #[error("Layer {layer}, mapping '{from}': {source}")]
    Mapping {
        layer: String,
        from: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Attach the owning layer and from-expression to an error
    pub fn in_mapping(self, layer: &str, from: &str) -> Self {
        match self {
            // Already carries its context
            ConfigError::Mapping { .. } => self,
            other => ConfigError::Mapping {
                layer: layer.to_string(),
                from: from.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping mapping context
    pub fn root(&self) -> &ConfigError {
        match self {
            ConfigError::Mapping { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_context_names_layer_and_from() {
        let err = ConfigError::InvalidKeyCode {
            key: "foo".into(),
            expr: "foo+j".into(),
        }
        .in_mapping("/base/", "caps_lock");

        let msg = err.to_string();
        assert!(msg.contains("/base/"));
        assert!(msg.contains("caps_lock"));
        assert!(msg.contains("Invalid key code 'foo' in 'foo+j'"));
    }

    #[test]
    fn test_mapping_context_is_not_nested_twice() {
        let err = ConfigError::MissingTo("j".into())
            .in_mapping("/nav/", "j")
            .in_mapping("/base/", "k");

        match &err {
            ConfigError::Mapping { layer, from, .. } => {
                assert_eq!(layer, "/nav/");
                assert_eq!(from, "j");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.root(), ConfigError::MissingTo(_)));
    }

    #[test]
    fn test_render_failure_is_a_config_error() {
        let unrenderable = std::collections::BTreeMap::from([((1, 2), 3)]);
        let err: ConfigError = serde_json::to_value(unrenderable).unwrap_err().into();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }
}
