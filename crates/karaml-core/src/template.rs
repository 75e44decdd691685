// Karaml Core - Templates
// Pseudo-functions like app(Safari) or notify(id, text) expanded into events

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{ConfigError, Result};
use crate::event::{EventAction, StickyState};
use crate::key_codes;
use crate::literal::parse_object_literal;

/// Placeholder filled positionally in user templates
pub const PLACEHOLDER: &str = "%s";

const MOUSE_KEYS: &[&str] = &["x", "y", "vertical_wheel", "horizontal_wheel", "speed_multiplier"];
const SHNOTIFY_KEYS: &[&str] = &["msg", "title", "subtitle", "sound"];

/// Templates shipped with karaml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum BuiltinTemplate {
    /// `app(Safari)`: open an application
    #[strum(serialize = "app")]
    App,
    /// `open(https://...)`: open a file or url
    #[strum(serialize = "open")]
    Open,
    /// `shell(cmd)`: run a shell command
    #[strum(serialize = "shell")]
    Shell,
    /// `input(en)`: select an input source
    #[strum(serialize = "input")]
    Input,
    /// `mouse(x, 2000)`: move the pointer or scroll
    #[strum(serialize = "mouse")]
    Mouse,
    /// `mousePos(x, y[, screen])`: warp the pointer
    #[strum(serialize = "mousePos")]
    MousePos,
    /// `notify(id, text)`: show a Karabiner notification
    #[strum(serialize = "notify")]
    Notify,
    /// `notifyOff(id)`: hide a Karabiner notification
    #[strum(serialize = "notifyOff")]
    NotifyOff,
    /// `shnotify(msg, title, subtitle, sound)`: macOS notification
    #[strum(serialize = "shnotify")]
    ShellNotify,
    /// `sfunc({...})`: raw software function
    #[strum(to_string = "sfunc", serialize = "softFunc")]
    SoftwareFunction,
    /// `sticky(left_shift, toggle)`
    #[strum(serialize = "sticky")]
    Sticky,
    /// `var(name, 1)`
    #[strum(serialize = "var")]
    Var,
    /// `string(text)`: type text
    #[strum(serialize = "string")]
    String,
}

/// Result of expanding a built-in template
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    Event(EventAction),
    /// Text to be typed key by key; resolved against the alias table
    Text(String),
}

impl BuiltinTemplate {
    /// Expand the template with its raw argument text
    pub fn expand(self, args: &str) -> Result<Expansion> {
        if args.trim().is_empty() {
            return Err(self.invalid(args, "arguments are required"));
        }

        let action = match self {
            BuiltinTemplate::App => {
                EventAction::ShellCommand(format!("open -a '{}'.app", args.trim()))
            }
            BuiltinTemplate::Open => EventAction::ShellCommand(format!("open {}", args.trim())),
            BuiltinTemplate::Shell => EventAction::ShellCommand(args.trim().to_string()),
            BuiltinTemplate::Input => match parse_object_literal(args)? {
                Some(map) => EventAction::SelectInputSource(map),
                None => {
                    let mut map = Map::new();
                    map.insert("language".into(), Value::String(args.trim().to_string()));
                    EventAction::SelectInputSource(map)
                }
            },
            BuiltinTemplate::Mouse => EventAction::MouseKey(self.mouse_args(args)?),
            BuiltinTemplate::MousePos => self.mouse_position(args)?,
            BuiltinTemplate::Notify => {
                let (id, text) = args.split_once(',').unwrap_or((args, ""));
                self.notification(args, id, text)?
            }
            BuiltinTemplate::NotifyOff => self.notification(args, args, "")?,
            BuiltinTemplate::ShellNotify => self.shell_notification(args)?,
            BuiltinTemplate::SoftwareFunction => match parse_object_literal(args)? {
                Some(map) => EventAction::SoftwareFunction(map),
                None => return Err(self.invalid(args, "expected an object literal")),
            },
            BuiltinTemplate::Sticky => self.sticky(args)?,
            BuiltinTemplate::Var => self.variable(args)?,
            BuiltinTemplate::String => return Ok(Expansion::Text(args.to_string())),
        };

        Ok(Expansion::Event(action))
    }

    fn invalid(self, args: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidTemplateArgs {
            name: self.to_string(),
            args: args.to_string(),
            reason: reason.into(),
        }
    }

    fn mouse_args(self, args: &str) -> Result<Map<String, Value>> {
        if let Some(map) = parse_object_literal(args)? {
            if let Some(key) = map.keys().find(|k| !MOUSE_KEYS.contains(&k.as_str())) {
                return Err(self.invalid(args, format!("unknown mouse_key field '{}'", key)));
            }
            return Ok(map);
        }

        let fields = comma_fields(args);
        if fields.len() % 2 != 0 {
            return Err(self.invalid(args, "expected field, value pairs"));
        }

        let mut map = Map::new();
        for pair in fields.chunks(2) {
            let (field, value) = (pair[0], pair[1]);
            if !MOUSE_KEYS.contains(&field) {
                return Err(self.invalid(args, format!("unknown mouse_key field '{}'", field)));
            }
            let number = parse_number(value)
                .ok_or_else(|| self.invalid(args, format!("'{}' is not a number", value)))?;
            map.insert(field.to_string(), Value::Number(number));
        }
        Ok(map)
    }

    fn mouse_position(self, args: &str) -> Result<EventAction> {
        let fields = comma_fields(args);
        if !(2..=3).contains(&fields.len()) {
            return Err(self.invalid(args, "expected x, y and an optional screen"));
        }

        let mut position = Map::new();
        for (name, value) in ["x", "y", "screen"].iter().zip(&fields) {
            let int = value
                .parse::<u32>()
                .map_err(|_| self.invalid(args, "coordinates must be integers"))?;
            position.insert(name.to_string(), Value::from(int));
        }

        let mut map = Map::new();
        map.insert("set_mouse_cursor_position".into(), Value::Object(position));
        Ok(EventAction::SoftwareFunction(map))
    }

    fn notification(self, args: &str, id: &str, text: &str) -> Result<EventAction> {
        let id = id.trim();
        if id.is_empty() {
            return Err(self.invalid(args, "notification id is required"));
        }
        Ok(EventAction::SetNotificationMessage {
            id: id.to_string(),
            text: text.trim().to_string(),
        })
    }

    fn shell_notification(self, args: &str) -> Result<EventAction> {
        let fields: IndexMap<String, String> = match parse_object_literal(args)? {
            Some(map) => {
                let mut fields = IndexMap::new();
                for (key, value) in map {
                    if !SHNOTIFY_KEYS.contains(&key.as_str()) {
                        return Err(self.invalid(args, format!("unknown field '{}'", key)));
                    }
                    let text = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    fields.insert(key, text);
                }
                fields
            }
            None => {
                let values = comma_fields(args);
                if values.len() > SHNOTIFY_KEYS.len() {
                    return Err(self.invalid(args, "at most msg, title, subtitle and sound"));
                }
                SHNOTIFY_KEYS
                    .iter()
                    .zip(values)
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }
        };

        let msg = fields
            .get("msg")
            .ok_or_else(|| self.invalid(args, "a message is required"))?;
        let mut script = format!("display notification \"{}\"", msg);
        if let Some(title) = fields.get("title") {
            script.push_str(&format!(" with title \"{}\"", title));
        }
        if let Some(subtitle) = fields.get("subtitle") {
            script.push_str(&format!(" subtitle \"{}\"", subtitle));
        }
        if let Some(sound) = fields.get("sound") {
            script.push_str(&format!(" sound name \"{}\"", sound));
        }
        Ok(EventAction::ShellCommand(format!("osascript -e '{}'", script)))
    }

    fn sticky(self, args: &str) -> Result<EventAction> {
        let fields = comma_fields(args);
        let [modifier, state] = fields.as_slice() else {
            return Err(self.invalid(args, "expected a modifier and on, off or toggle"));
        };
        if !key_codes::is_sticky_modifier(modifier) {
            return Err(self.invalid(args, format!("'{}' cannot be sticky", modifier)));
        }
        let state: StickyState = state
            .parse()
            .map_err(|_| self.invalid(args, "state must be on, off or toggle"))?;
        Ok(EventAction::StickyModifier {
            modifier: modifier.to_string(),
            state,
        })
    }

    fn variable(self, args: &str) -> Result<EventAction> {
        let fields = comma_fields(args);
        let [name, value] = fields.as_slice() else {
            return Err(self.invalid(args, "expected a variable name and value"));
        };
        let value = value
            .parse::<i64>()
            .ok()
            .filter(|v| (0..=1).contains(v))
            .ok_or_else(|| self.invalid(args, "value must be 0 or 1"))?;
        if name.is_empty() {
            return Err(self.invalid(args, "variable name is required"));
        }
        Ok(EventAction::SetVariable {
            name: name.to_string(),
            value,
        })
    }
}

fn comma_fields(args: &str) -> Vec<&str> {
    args.split(',').map(str::trim).collect()
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(int.into());
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// A user-defined shell script template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTemplate {
    pub name: String,
    pub script: String,
}

impl UserTemplate {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
        }
    }

    /// Number of `%s` placeholders
    pub fn arity(&self) -> usize {
        self.script.matches(PLACEHOLDER).count()
    }

    /// Fill the placeholders with comma-separated arguments
    pub fn expand(&self, args: &str) -> Result<EventAction> {
        let values: Vec<&str> = if args.trim().is_empty() {
            Vec::new()
        } else {
            comma_fields(args)
        };

        if values.len() != self.arity() {
            return Err(ConfigError::TemplateArity {
                name: self.name.clone(),
                expected: self.arity(),
                got: values.len(),
            });
        }

        let mut pieces = self.script.split(PLACEHOLDER);
        let mut script = pieces.next().unwrap_or_default().to_string();
        for (value, rest) in values.iter().zip(pieces) {
            script.push_str(value);
            script.push_str(rest);
        }
        Ok(EventAction::ShellCommand(script))
    }
}

/// A registered template, built-in or user-defined
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    Builtin(BuiltinTemplate),
    User(UserTemplate),
}

/// Shell command typing `text` through the clipboard, for text that has no
/// key-by-key rendition
pub fn paste_text_command(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "osascript -e 'set temp to the clipboard as string' \
         -e 'set the clipboard to \"{}\"' \
         -e 'tell application \"System Events\" to keystroke \"v\" using command down' \
         -e 'delay 0.1' -e 'set the clipboard to temp'",
        escaped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn expand(name: &str, args: &str) -> Result<EventAction> {
        match BuiltinTemplate::from_str(name).unwrap().expand(args)? {
            Expansion::Event(action) => Ok(action),
            Expansion::Text(text) => panic!("unexpected text expansion: {text}"),
        }
    }

    fn shell(cmd: &str) -> EventAction {
        EventAction::ShellCommand(cmd.to_string())
    }

    #[test]
    fn test_names_round_trip() {
        for template in BuiltinTemplate::iter() {
            assert_eq!(BuiltinTemplate::from_str(&template.to_string()).ok(), Some(template));
        }
        assert_eq!(
            BuiltinTemplate::from_str("softFunc").ok(),
            Some(BuiltinTemplate::SoftwareFunction)
        );
    }

    #[test]
    fn test_shell_templates() {
        assert_eq!(expand("app", "Google Chrome").unwrap(), shell("open -a 'Google Chrome'.app"));
        assert_eq!(expand("open", "https://github.com").unwrap(), shell("open https://github.com"));
        assert_eq!(expand("shell", "cd somedir/").unwrap(), shell("cd somedir/"));
    }

    #[test]
    fn test_empty_arguments_rejected() {
        assert!(matches!(expand("app", ""), Err(ConfigError::InvalidTemplateArgs { .. })));
        assert!(matches!(expand("notify", "  "), Err(ConfigError::InvalidTemplateArgs { .. })));
    }

    #[test]
    fn test_input() {
        assert_eq!(
            expand("input", "en").unwrap(),
            EventAction::SelectInputSource(json!({"language": "en"}).as_object().unwrap().clone())
        );
        assert_eq!(
            expand("input", "{'input_source_id': 'com.apple.keylayout.US'}").unwrap().payload(),
            json!({"input_source_id": "com.apple.keylayout.US"})
        );
    }

    #[test]
    fn test_mouse() {
        assert_eq!(expand("mouse", "x, 2000").unwrap().payload(), json!({"x": 2000}));
        assert_eq!(
            expand("mouse", "vertical_wheel, -60, speed_multiplier, 1.5").unwrap().payload(),
            json!({"vertical_wheel": -60, "speed_multiplier": 1.5})
        );
        assert_eq!(
            expand("mouse", r#"{"x": 2000, "y": 2000, "speed_multiplier": 1.0}"#)
                .unwrap()
                .payload(),
            json!({"x": 2000, "y": 2000, "speed_multiplier": 1.0})
        );
        assert!(expand("mouse", "x").is_err());
        assert!(expand("mouse", "z, 10").is_err());
        assert!(expand("mouse", "x, fast").is_err());
    }

    #[test]
    fn test_mouse_position() {
        assert_eq!(
            expand("mousePos", "1, 2").unwrap(),
            EventAction::SoftwareFunction(
                json!({"set_mouse_cursor_position": {"x": 1, "y": 2}}).as_object().unwrap().clone()
            )
        );
        assert_eq!(
            expand("mousePos", "1, 2, 3").unwrap().payload(),
            json!({"set_mouse_cursor_position": {"x": 1, "y": 2, "screen": 3}})
        );
        assert!(expand("mousePos", "1").is_err());
        assert!(expand("mousePos", "1, 2, 3, 4").is_err());
        assert!(expand("mousePos", "one, two").is_err());
        assert!(expand("mousePos", "1.5, 2").is_err());
    }

    #[test]
    fn test_notifications() {
        assert_eq!(
            expand("notify", " some_id ,some_msg").unwrap(),
            EventAction::SetNotificationMessage {
                id: "some_id".into(),
                text: "some_msg".into()
            }
        );
        assert_eq!(
            expand("notify", "id1,").unwrap().payload(),
            json!({"id": "id1", "text": ""})
        );
        assert_eq!(
            expand("notify", "id1, Hello, world").unwrap().payload(),
            json!({"id": "id1", "text": "Hello, world"})
        );
        assert_eq!(
            expand("notifyOff", "some_id").unwrap().payload(),
            json!({"id": "some_id", "text": ""})
        );
    }

    #[test]
    fn test_shell_notification() {
        assert_eq!(
            expand("shnotify", "message, some title, a subtitle, frog sound").unwrap(),
            shell("osascript -e 'display notification \"message\" with title \"some title\" subtitle \"a subtitle\" sound name \"frog sound\"'")
        );
        assert_eq!(
            expand("shnotify", "{'msg': 'hi', 'sound': 'Frog'}").unwrap(),
            shell("osascript -e 'display notification \"hi\" sound name \"Frog\"'")
        );
        assert!(expand("shnotify", "{'message': 'hi'}").is_err());
        assert!(expand("shnotify", "a, b, c, d, e").is_err());
    }

    #[test]
    fn test_software_function_requires_object() {
        assert_eq!(
            expand("sfunc", "{'iokit_power_management_sleep_system': {}}").unwrap().payload(),
            json!({"iokit_power_management_sleep_system": {}})
        );
        assert!(expand("sfunc", "some_arg").is_err());
        assert!(expand("sfunc", "{bad: 1}").is_err());
    }

    #[test]
    fn test_sticky() {
        for state in ["on", "off", "toggle"] {
            assert_eq!(
                expand("sticky", &format!("left_shift, {state}")).unwrap().payload(),
                json!({"left_shift": state})
            );
        }
        assert!(expand("sticky", "shift, on").is_err());
        assert!(expand("sticky", "left_shift, some_value").is_err());
        assert!(expand("sticky", "left_shift").is_err());
    }

    #[test]
    fn test_var() {
        assert_eq!(
            expand("var", "some_layer, 1").unwrap(),
            EventAction::SetVariable {
                name: "some_layer".into(),
                value: 1
            }
        );
        assert!(expand("var", "some_layer, not_a_number").is_err());
        assert!(expand("var", "some_layer, 2").is_err());
    }

    #[test]
    fn test_string_is_text() {
        assert_eq!(
            BuiltinTemplate::String.expand("Hi there").unwrap(),
            Expansion::Text("Hi there".into())
        );
    }

    #[test]
    fn test_user_template() {
        let template = UserTemplate::new("code", "open -a 'Visual Studio Code' %s --args %s");
        assert_eq!(template.arity(), 2);
        assert_eq!(
            template.expand("~/src, -n").unwrap(),
            shell("open -a 'Visual Studio Code' ~/src --args -n")
        );
        match template.expand("~/src") {
            Err(ConfigError::TemplateArity { expected, got, .. }) => {
                assert_eq!((expected, got), (2, 1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_user_template_without_placeholders() {
        let template = UserTemplate::new("lock", "pmset displaysleepnow");
        assert_eq!(template.expand("").unwrap(), shell("pmset displaysleepnow"));
        assert!(template.expand("x").is_err());
    }

    #[test]
    fn test_paste_text_command_escapes_quotes() {
        let cmd = paste_text_command("say \"hi\"");
        assert!(cmd.contains(r#"set the clipboard to "say \"hi\"""#));
        assert!(cmd.starts_with("osascript -e 'set temp to the clipboard as string'"));
    }
}
