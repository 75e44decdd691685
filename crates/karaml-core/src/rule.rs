// Karaml Core - Compiled Rules
// Basic manipulators in the Karabiner-Elements complex modification schema

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::event::{EventAction, KeyEvent, ToVariant};
use crate::modifier::ModifierSpec;

/// Options attached to to-events (`lazy`, `repeat`, `halt`, hold delay)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToOpts {
    pub lazy: Option<bool>,
    pub repeat: Option<bool>,
    pub halt: Option<bool>,
    pub hold_down_milliseconds: Option<u64>,
}

impl ToOpts {
    pub fn is_empty(&self) -> bool {
        *self == ToOpts::default()
    }
}

/// The `from` side of a rule
#[derive(Debug, Clone, PartialEq)]
pub enum FromEvent {
    Single(KeyEvent),
    /// Keys pressed together; their modifiers are merged into one set
    Simultaneous {
        keys: Vec<EventAction>,
        modifiers: ModifierSpec,
    },
}

/// An event in one of the to-variant lists
#[derive(Debug, Clone, PartialEq)]
pub struct ToEvent {
    pub event: KeyEvent,
    pub opts: ToOpts,
}

impl ToEvent {
    pub fn new(event: KeyEvent) -> Self {
        Self {
            event,
            opts: ToOpts::default(),
        }
    }

    pub fn set_variable(name: &str, value: i64) -> Self {
        Self::new(KeyEvent::new(EventAction::SetVariable {
            name: name.to_string(),
            value,
        }))
    }

    /// The variable name if this event sets one
    pub fn variable(&self) -> Option<&str> {
        match &self.event.action {
            EventAction::SetVariable { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A rule precondition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `{"name": .., "type": "variable_if", "value": ..}`
    Variable { name: String, value: i64 },
    /// `{"type": "frontmost_application_if", "bundle_identifiers": [..]}`
    FrontmostApplication {
        unless: bool,
        bundle_identifiers: Vec<String>,
    },
}

impl Condition {
    pub fn variable(name: impl Into<String>, value: i64) -> Self {
        Condition::Variable {
            name: name.into(),
            value,
        }
    }
}

/// A layer toggle switched by tapping a key.
///
/// The toggle rule fires while the variable holds `off_value` and sets it to
/// `on_value`; its companion fires while the variable holds `on_value` and
/// sets it back to `off_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerToggle {
    pub variable: String,
    pub on_value: i64,
    pub off_value: i64,
    /// The to-variant carrying the `set_variable` event
    pub variant: ToVariant,
}

impl LayerToggle {
    pub fn new(variable: impl Into<String>, variant: ToVariant) -> Self {
        Self {
            variable: variable.into(),
            on_value: 1,
            off_value: 0,
            variant,
        }
    }

    /// Precondition of the rule turning the layer on
    pub fn guard(&self) -> Condition {
        Condition::variable(&self.variable, self.off_value)
    }

    /// Event turning the layer on
    pub fn switch_on(&self) -> ToEvent {
        ToEvent::set_variable(&self.variable, self.on_value)
    }

    /// Derive the rule turning the layer back off
    pub fn companion(&self, rule: &CompiledRule) -> CompiledRule {
        let mut off = rule.clone();
        for condition in &mut off.conditions {
            if let Condition::Variable { name, value } = condition {
                if *name == self.variable && *value == self.off_value {
                    *value = self.on_value;
                }
            }
        }
        if let Some(events) = off.to.get_mut(&self.variant) {
            for event in events.iter_mut() {
                if let EventAction::SetVariable { name, value } = &mut event.event.action {
                    if *name == self.variable && *value == self.on_value {
                        *value = self.off_value;
                    }
                }
            }
        }
        off
    }
}

/// One basic manipulator
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub conditions: Vec<Condition>,
    pub from: FromEvent,
    pub to: IndexMap<ToVariant, Vec<ToEvent>>,
    pub parameters: IndexMap<String, i64>,
}

impl CompiledRule {
    pub fn variant(&self, variant: ToVariant) -> Option<&[ToEvent]> {
        self.to.get(&variant).map(Vec::as_slice)
    }

    /// Render the rule as a JSON value
    pub fn to_json(&self) -> crate::error::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

struct FromKeyModifiers<'a>(&'a ModifierSpec);

impl Serialize for FromKeyModifiers<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = self.0;
        let mut map = serializer.serialize_map(None)?;
        if !spec.mandatory.is_empty() {
            map.serialize_entry("mandatory", &spec.mandatory)?;
        }
        if !spec.optional.is_empty() {
            map.serialize_entry("optional", &spec.optional)?;
        }
        map.end()
    }
}

struct BareKey<'a>(&'a EventAction);

impl Serialize for BareKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.kind().as_str(), &self.0.payload())?;
        map.end()
    }
}

impl Serialize for FromEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let modifiers = match self {
            FromEvent::Single(event) => {
                map.serialize_entry(event.kind().as_str(), &event.action.payload())?;
                &event.modifiers
            }
            FromEvent::Simultaneous { keys, modifiers } => {
                let keys: Vec<BareKey<'_>> = keys.iter().map(BareKey).collect();
                map.serialize_entry("simultaneous", &keys)?;
                modifiers
            }
        };
        if !modifiers.is_empty() {
            map.serialize_entry("modifiers", &FromKeyModifiers(modifiers))?;
        }
        map.end()
    }
}

impl Serialize for ToEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.event.kind().as_str(), &self.event.action.payload())?;
        if !self.event.modifiers.mandatory.is_empty() {
            map.serialize_entry("modifiers", &self.event.modifiers.mandatory)?;
        }
        if let Some(lazy) = self.opts.lazy {
            map.serialize_entry("lazy", &lazy)?;
        }
        if let Some(repeat) = self.opts.repeat {
            map.serialize_entry("repeat", &repeat)?;
        }
        if let Some(halt) = self.opts.halt {
            map.serialize_entry("halt", &halt)?;
        }
        if let Some(ms) = self.opts.hold_down_milliseconds {
            map.serialize_entry("hold_down_milliseconds", &ms)?;
        }
        map.end()
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Condition::Variable { name, value } => {
                map.serialize_entry("name", name)?;
                map.serialize_entry("type", "variable_if")?;
                map.serialize_entry("value", value)?;
            }
            Condition::FrontmostApplication {
                unless,
                bundle_identifiers,
            } => {
                let kind = if *unless {
                    "frontmost_application_unless"
                } else {
                    "frontmost_application_if"
                };
                map.serialize_entry("type", kind)?;
                map.serialize_entry("bundle_identifiers", bundle_identifiers)?;
            }
        }
        map.end()
    }
}

impl Serialize for CompiledRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.conditions.is_empty() {
            map.serialize_entry("conditions", &self.conditions)?;
        }
        map.serialize_entry("from", &self.from)?;
        for variant in ToVariant::ALL {
            if let Some(events) = self.to.get(&variant) {
                map.serialize_entry(variant.as_ref(), events)?;
            }
        }
        map.serialize_entry("type", "basic")?;
        if !self.parameters.is_empty() {
            map.serialize_entry("parameters", &self.parameters)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(code: &str) -> KeyEvent {
        KeyEvent::new(EventAction::KeyCode(code.to_string()))
    }

    fn rule(to: Vec<(ToVariant, Vec<ToEvent>)>) -> CompiledRule {
        CompiledRule {
            conditions: Vec::new(),
            from: FromEvent::Single(key("j")),
            to: to.into_iter().collect(),
            parameters: IndexMap::new(),
        }
    }

    #[test]
    fn test_serialize_single_from_with_modifiers() {
        let from = FromEvent::Single(KeyEvent::with_modifiers(
            EventAction::KeyCode("j".into()),
            ModifierSpec {
                mandatory: vec!["left_control".into()],
                optional: vec!["any".into()],
            },
        ));
        assert_eq!(
            serde_json::to_value(&from).unwrap(),
            json!({"key_code": "j", "modifiers": {"mandatory": ["left_control"], "optional": ["any"]}})
        );
    }

    #[test]
    fn test_serialize_simultaneous_from() {
        let from = FromEvent::Simultaneous {
            keys: vec![EventAction::KeyCode("j".into()), EventAction::KeyCode("k".into())],
            modifiers: ModifierSpec::mandatory(["left_shift"]),
        };
        assert_eq!(
            serde_json::to_value(&from).unwrap(),
            json!({
                "simultaneous": [{"key_code": "j"}, {"key_code": "k"}],
                "modifiers": {"mandatory": ["left_shift"]}
            })
        );
    }

    #[test]
    fn test_serialize_to_event_with_opts() {
        let mut event = ToEvent::new(KeyEvent::with_modifiers(
            EventAction::KeyCode("left_control".into()),
            ModifierSpec::mandatory(["left_shift"]),
        ));
        event.opts.lazy = Some(true);
        event.opts.hold_down_milliseconds = Some(200);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "key_code": "left_control",
                "modifiers": ["left_shift"],
                "lazy": true,
                "hold_down_milliseconds": 200
            })
        );
    }

    #[test]
    fn test_serialize_rule_key_order() {
        let mut compiled = rule(vec![
            (ToVariant::ToAfterKeyUp, vec![ToEvent::set_variable("nav_layer", 0)]),
            (ToVariant::To, vec![ToEvent::set_variable("nav_layer", 1)]),
        ]);
        compiled.conditions.push(Condition::variable("sym_layer", 1));
        compiled.parameters.insert("basic.to_if_alone_timeout_milliseconds".into(), 200);

        let text = serde_json::to_string(&compiled).unwrap();
        let keys = ["\"conditions\"", "\"from\"", "\"to\"", "\"to_after_key_up\"", "\"type\"", "\"parameters\""];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_serialize_frontmost_condition() {
        let condition = Condition::FrontmostApplication {
            unless: true,
            bundle_identifiers: vec!["com.apple.Terminal".into()],
        };
        assert_eq!(
            serde_json::to_value(&condition).unwrap(),
            json!({"type": "frontmost_application_unless", "bundle_identifiers": ["com.apple.Terminal"]})
        );
    }

    #[test]
    fn test_companion_flips_toggle_only() {
        let toggle = LayerToggle::new("nav_layer", ToVariant::To);
        let mut on = rule(vec![(
            ToVariant::To,
            vec![toggle.switch_on(), ToEvent::set_variable("other", 1)],
        )]);
        on.conditions = vec![toggle.guard(), Condition::variable("sym_layer", 1)];

        let off = toggle.companion(&on);
        assert_eq!(
            off.conditions,
            vec![Condition::variable("nav_layer", 1), Condition::variable("sym_layer", 1)]
        );
        assert_eq!(
            off.variant(ToVariant::To).unwrap(),
            &[ToEvent::set_variable("nav_layer", 0), ToEvent::set_variable("other", 1)]
        );
        // The source rule is untouched
        assert_eq!(on.conditions[0], Condition::variable("nav_layer", 0));
    }
}
