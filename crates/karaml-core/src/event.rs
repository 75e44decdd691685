// Karaml Core - Key Events
// Resolved events and the to-variants they are emitted under

use serde_json::{json, Map, Value};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::key_codes;
use crate::modifier::ModifierSpec;

/// The kind of a resolved event, named as in the Karabiner-Elements schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    KeyCode,
    ConsumerKeyCode,
    PointingButton,
    Alias,
    Layer,
    ShellCommand,
    SetVariable,
    SelectInputSource,
    MouseKey,
    SetNotificationMessage,
    StickyModifier,
    SoftwareFunction,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Kinds that may produce a visible side effect when fired.
    ///
    /// Only layer references and notifications are exempt; variable changes
    /// and the other pseudo-functions count as chatty.
    pub fn is_chatty(self) -> bool {
        !matches!(
            self,
            EventKind::Layer | EventKind::SetNotificationMessage | EventKind::Alias
        )
    }
}

/// State argument of the `sticky_modifier` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StickyState {
    On,
    Off,
    Toggle,
}

/// What an event does, with its kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    KeyCode(String),
    ConsumerKeyCode(String),
    PointingButton(String),
    /// Layer reference, turned into `set_variable` by the compiler
    Layer(String),
    ShellCommand(String),
    SetVariable { name: String, value: i64 },
    SelectInputSource(Map<String, Value>),
    MouseKey(Map<String, Value>),
    SetNotificationMessage { id: String, text: String },
    StickyModifier { modifier: String, state: StickyState },
    SoftwareFunction(Map<String, Value>),
}

impl EventAction {
    /// Build a key action for a code found in the given reference table
    pub fn key(kind: EventKind, code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        match kind {
            EventKind::KeyCode => Some(EventAction::KeyCode(code)),
            EventKind::ConsumerKeyCode => Some(EventAction::ConsumerKeyCode(code)),
            EventKind::PointingButton => Some(EventAction::PointingButton(code)),
            _ => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventAction::KeyCode(_) => EventKind::KeyCode,
            EventAction::ConsumerKeyCode(_) => EventKind::ConsumerKeyCode,
            EventAction::PointingButton(_) => EventKind::PointingButton,
            EventAction::Layer(_) => EventKind::Layer,
            EventAction::ShellCommand(_) => EventKind::ShellCommand,
            EventAction::SetVariable { .. } => EventKind::SetVariable,
            EventAction::SelectInputSource(_) => EventKind::SelectInputSource,
            EventAction::MouseKey(_) => EventKind::MouseKey,
            EventAction::SetNotificationMessage { .. } => EventKind::SetNotificationMessage,
            EventAction::StickyModifier { .. } => EventKind::StickyModifier,
            EventAction::SoftwareFunction(_) => EventKind::SoftwareFunction,
        }
    }

    /// The key code for key-like actions
    pub fn key_code(&self) -> Option<&str> {
        match self {
            EventAction::KeyCode(code)
            | EventAction::ConsumerKeyCode(code)
            | EventAction::PointingButton(code) => Some(code),
            _ => None,
        }
    }

    /// The value stored under the kind name in the output schema
    pub fn payload(&self) -> Value {
        match self {
            EventAction::KeyCode(code)
            | EventAction::ConsumerKeyCode(code)
            | EventAction::PointingButton(code)
            | EventAction::Layer(code)
            | EventAction::ShellCommand(code) => Value::String(code.clone()),
            EventAction::SetVariable { name, value } => json!({ "name": name, "value": value }),
            EventAction::SelectInputSource(map)
            | EventAction::MouseKey(map)
            | EventAction::SoftwareFunction(map) => Value::Object(map.clone()),
            EventAction::SetNotificationMessage { id, text } => {
                json!({ "id": id, "text": text })
            }
            EventAction::StickyModifier { modifier, state } => {
                let mut map = Map::new();
                map.insert(modifier.clone(), Value::String(state.to_string()));
                Value::Object(map)
            }
        }
    }
}

/// A resolved event plus the modifiers attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub action: EventAction,
    pub modifiers: ModifierSpec,
}

impl KeyEvent {
    pub fn new(action: EventAction) -> Self {
        Self {
            action,
            modifiers: ModifierSpec::default(),
        }
    }

    pub fn with_modifiers(action: EventAction, modifiers: ModifierSpec) -> Self {
        Self { action, modifiers }
    }

    pub fn kind(&self) -> EventKind {
        self.action.kind()
    }

    /// True for events that may be matched in a `from` clause
    pub fn is_key(&self) -> bool {
        self.action.key_code().is_some()
    }

    /// Whether firing this event early would be visible to the user.
    ///
    /// A key code naming a modifier (`left_shift`, `command`, ...) only
    /// changes state, so it is not considered chatty.
    pub fn is_chatty(&self) -> bool {
        match &self.action {
            EventAction::KeyCode(code) => !key_codes::is_modifier_name(code),
            other => other.kind().is_chatty(),
        }
    }
}

/// Names of the to-event lists in a basic manipulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToVariant {
    To,
    ToIfAlone,
    ToIfHeldDown,
    ToAfterKeyUp,
}

impl ToVariant {
    /// Output order of the variants inside a rule
    pub const ALL: [ToVariant; 4] = [
        ToVariant::To,
        ToVariant::ToIfAlone,
        ToVariant::ToIfHeldDown,
        ToVariant::ToAfterKeyUp,
    ];
}

/// Which to-variant carries the hold slot of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldFlavor {
    /// Hold output fires as soon as the key is held with another key
    #[default]
    To,
    /// Hold output fires once the hold threshold elapses
    ToIfHeldDown,
}

impl HoldFlavor {
    pub fn variant(self) -> ToVariant {
        match self {
            HoldFlavor::To => ToVariant::To,
            HoldFlavor::ToIfHeldDown => ToVariant::ToIfHeldDown,
        }
    }
}
