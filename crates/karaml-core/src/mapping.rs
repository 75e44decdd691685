// Karaml Core - Mapping Definitions
// Decodes [tap, hold, after, opts, params] mapping values from the config tree

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::rule::{Condition, ToOpts};

/// Short parameter names and the Karabiner-Elements parameters they stand for
pub const PARAMETERS: &[(&str, &str)] = &[
    ("a", "basic.to_if_alone_timeout_milliseconds"),
    ("h", "basic.to_if_held_down_threshold_milliseconds"),
    ("d", "basic.to_delayed_action_delay_milliseconds"),
    ("s", "basic.simultaneous_threshold_milliseconds"),
    ("m", "mouse_motion_to_scroll.speed"),
];

/// Maximum number of positions in a list-valued mapping
pub const SLOT_COUNT: usize = 5;

static NULL: Value = Value::Null;

/// One mapping: a from-expression and its tap/hold/after/opts/params slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingDefinition {
    pub from: String,
    pub tap: Option<String>,
    pub hold: Option<String>,
    pub after: Option<String>,
    pub opts: ToOpts,
    pub params: IndexMap<String, i64>,
}

impl MappingDefinition {
    /// A mapping with only a tap output
    pub fn tap(from: impl Into<String>, tap: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            tap: Some(tap.into()),
            ..Self::default()
        }
    }

    pub fn with_hold(mut self, hold: impl Into<String>) -> Self {
        self.hold = Some(hold.into());
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Decode a single-string or list mapping value
    pub fn from_value(from: &str, value: &Value) -> Result<Self> {
        let invalid = |reason: String| ConfigError::InvalidMapping {
            from: from.to_string(),
            reason,
        };

        let slots: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => {
                return Err(invalid("application alternatives cannot be nested".into()))
            }
            single => vec![single],
        };
        if slots.len() > SLOT_COUNT {
            return Err(invalid(format!(
                "expected at most {} positions [tap, hold, after, opts, params], got {}",
                SLOT_COUNT,
                slots.len()
            )));
        }

        let slot = |idx: usize| slots.get(idx).copied().unwrap_or(&NULL);
        Ok(Self {
            from: from.to_string(),
            tap: slot_text(from, slot(0))?,
            hold: slot_text(from, slot(1))?,
            after: slot_text(from, slot(2))?,
            opts: parse_opts(slot(3))?,
            params: translate_params(slot(4))?,
        })
    }
}

/// A mapping plus the frontmost-application condition it is limited to
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub definition: MappingDefinition,
    pub app_condition: Option<Condition>,
}

/// Decode the value of one `from: value` entry of a layer.
///
/// An object value holds alternatives keyed by `if <bundle ids>` or
/// `unless <bundle ids>`, each compiled as its own mapping.
pub fn mapping_entries(from: &str, value: &Value) -> Result<Vec<MappingEntry>> {
    match value {
        Value::Object(alternatives) => alternatives
            .iter()
            .map(|(condition, value)| {
                Ok(MappingEntry {
                    definition: MappingDefinition::from_value(from, value)?,
                    app_condition: Some(parse_app_condition(condition)?),
                })
            })
            .collect(),
        other => Ok(vec![MappingEntry {
            definition: MappingDefinition::from_value(from, other)?,
            app_condition: None,
        }]),
    }
}

/// `if com.apple.Safari org.mozilla.firefox` -> frontmost application condition
pub fn parse_app_condition(key: &str) -> Result<Condition> {
    let mut words = key.split_whitespace();
    let unless = match words.next() {
        Some("if") => false,
        Some("unless") => true,
        _ => return Err(ConfigError::InvalidAppCondition(key.to_string())),
    };
    let bundle_identifiers: Vec<String> = words.map(str::to_string).collect();
    if bundle_identifiers.is_empty() {
        return Err(ConfigError::InvalidAppCondition(key.to_string()));
    }
    Ok(Condition::FrontmostApplication {
        unless,
        bundle_identifiers,
    })
}

fn slot_text(from: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(ConfigError::InvalidMapping {
            from: from.to_string(),
            reason: format!("expected a to-expression, got {}", other),
        }),
    }
}

/// Decode the opts slot: a single option or a list of them.
///
/// Integers set `hold_down_milliseconds`; `+lazy`, `-repeat`, `+halt` and so
/// on set the named flag.
pub fn parse_opts(value: &Value) -> Result<ToOpts> {
    let items: Vec<&Value> = match value {
        Value::Null => return Ok(ToOpts::default()),
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut opts = ToOpts::default();
    for item in items {
        match item {
            Value::Number(n) => {
                let ms = n.as_u64().ok_or_else(|| ConfigError::InvalidOpt(n.to_string()))?;
                opts.hold_down_milliseconds = Some(ms);
            }
            Value::String(s) => apply_flag(&mut opts, s.trim())?,
            other => return Err(ConfigError::InvalidOpt(other.to_string())),
        }
    }
    Ok(opts)
}

fn apply_flag(opts: &mut ToOpts, flag: &str) -> Result<()> {
    if let Ok(ms) = flag.parse::<u64>() {
        opts.hold_down_milliseconds = Some(ms);
        return Ok(());
    }

    let mut chars = flag.chars();
    let enabled = match chars.next() {
        Some('+') => true,
        Some('-') => false,
        _ => return Err(ConfigError::InvalidFlag(flag.to_string())),
    };
    let target = match chars.as_str() {
        "lazy" => &mut opts.lazy,
        "repeat" => &mut opts.repeat,
        "halt" => &mut opts.halt,
        _ => return Err(ConfigError::InvalidOpt(flag.to_string())),
    };
    *target = Some(enabled);
    Ok(())
}

/// Translate rule parameters, expanding short names.
///
/// # Examples
/// ```
/// use karaml_core::mapping::translate_params;
/// let params = translate_params(&serde_json::json!({"a": 150})).unwrap();
/// assert_eq!(params["basic.to_if_alone_timeout_milliseconds"], 150);
/// ```
pub fn translate_params(value: &Value) -> Result<IndexMap<String, i64>> {
    let entries = match value {
        Value::Null => return Ok(IndexMap::new()),
        Value::Object(entries) => entries,
        other => return Err(ConfigError::InvalidParameter(other.to_string())),
    };

    let mut params = IndexMap::new();
    for (name, value) in entries {
        let full_name = PARAMETERS
            .iter()
            .find(|(short, full)| *short == name.as_str() || *full == name.as_str())
            .map(|(_, full)| *full)
            .ok_or_else(|| ConfigError::InvalidParameter(name.clone()))?;
        let value = value.as_i64().ok_or_else(|| ConfigError::InvalidParameterValue {
            name: name.clone(),
            value: value.to_string(),
        })?;
        params.insert(full_name.to_string(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_string_is_tap() {
        let def = MappingDefinition::from_value("caps_lock", &json!("escape")).unwrap();
        assert_eq!(def, MappingDefinition::tap("caps_lock", "escape"));
    }

    #[test]
    fn test_list_slots() {
        let def = MappingDefinition::from_value(
            "caps_lock",
            &json!(["escape", "left_control", null, ["+lazy", 100], {"a": 250}]),
        )
        .unwrap();
        assert_eq!(def.tap.as_deref(), Some("escape"));
        assert_eq!(def.hold.as_deref(), Some("left_control"));
        assert_eq!(def.after, None);
        assert_eq!(def.opts.lazy, Some(true));
        assert_eq!(def.opts.hold_down_milliseconds, Some(100));
        assert_eq!(def.params["basic.to_if_alone_timeout_milliseconds"], 250);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let def = MappingDefinition::from_value("j", &json!(["", "/nav/"])).unwrap();
        assert_eq!(def.tap, None);
        assert_eq!(def.hold.as_deref(), Some("/nav/"));
    }

    #[test]
    fn test_numbers_are_key_tokens() {
        let def = MappingDefinition::from_value("f1", &json!(1)).unwrap();
        assert_eq!(def.tap.as_deref(), Some("1"));
    }

    #[test]
    fn test_too_many_slots() {
        let err = MappingDefinition::from_value("j", &json!(["a", "b", "c", null, null, "x"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMapping { .. }));
    }

    #[test]
    fn test_opts_flags() {
        let opts = parse_opts(&json!(["-lazy", "+repeat", "+halt"])).unwrap();
        assert_eq!(opts.lazy, Some(false));
        assert_eq!(opts.repeat, Some(true));
        assert_eq!(opts.halt, Some(true));

        assert_eq!(parse_opts(&json!("+lazy")).unwrap().lazy, Some(true));
        assert!(matches!(parse_opts(&json!("lazy")), Err(ConfigError::InvalidFlag(_))));
        assert!(matches!(parse_opts(&json!("+sloppy")), Err(ConfigError::InvalidOpt(_))));
        assert!(matches!(parse_opts(&json!(-5)), Err(ConfigError::InvalidOpt(_))));
    }

    #[test]
    fn test_params() {
        let params = translate_params(&json!({
            "h": 300,
            "basic.simultaneous_threshold_milliseconds": 50,
            "m": 100
        }))
        .unwrap();
        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "basic.to_if_held_down_threshold_milliseconds",
                "basic.simultaneous_threshold_milliseconds",
                "mouse_motion_to_scroll.speed"
            ]
        );
        assert!(matches!(
            translate_params(&json!({"z": 1})),
            Err(ConfigError::InvalidParameter(_))
        ));
        assert!(matches!(
            translate_params(&json!({"a": "fast"})),
            Err(ConfigError::InvalidParameterValue { .. })
        ));
    }

    #[test]
    fn test_app_alternatives() {
        let entries = mapping_entries(
            "j",
            &json!({"if com.apple.Terminal": "k", "unless com.apple.Safari org.mozilla.firefox": ["l", "m"]}),
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].app_condition,
            Some(Condition::FrontmostApplication {
                unless: false,
                bundle_identifiers: vec!["com.apple.Terminal".into()],
            })
        );
        assert_eq!(entries[1].definition.hold.as_deref(), Some("m"));

        assert!(matches!(
            mapping_entries("j", &json!({"when com.apple.Terminal": "k"})),
            Err(ConfigError::InvalidAppCondition(_))
        ));
        assert!(matches!(
            mapping_entries("j", &json!({"if": "k"})),
            Err(ConfigError::InvalidAppCondition(_))
        ));
    }
}
