// Karaml Core - Alias Table
// Short tokens standing in for a key code plus implied modifiers

use indexmap::IndexMap;
use log::debug;

use crate::error::{ConfigError, Result};
use crate::event::EventKind;
use crate::expression::{self, Term};
use crate::key_codes;
use crate::modifier::ModifierTable;

const SHIFT: &[&str] = &["shift"];

/// Built-in aliases: (token, key code, implied modifiers)
const BUILTIN_ALIASES: &[(&str, &str, &[&str])] = &[
    // Bare glyphs are the left-hand key
    ("⌘", "left_command", &[]),
    ("‹⌘", "left_command", &[]),
    ("⌘›", "right_command", &[]),
    ("⌥", "left_option", &[]),
    ("‹⌥", "left_option", &[]),
    ("⌥›", "right_option", &[]),
    ("⌃", "left_control", &[]),
    ("‹⌃", "left_control", &[]),
    ("⌃›", "right_control", &[]),
    ("⇧", "left_shift", &[]),
    ("‹⇧", "left_shift", &[]),
    ("⇧›", "right_shift", &[]),
    ("lcmd", "left_command", &[]),
    ("rcmd", "right_command", &[]),
    ("lalt", "left_option", &[]),
    ("ralt", "right_option", &[]),
    ("lctrl", "left_control", &[]),
    ("rctrl", "right_control", &[]),
    ("lshft", "left_shift", &[]),
    ("rshft", "right_shift", &[]),
    ("hyper", "right_shift", &["right_command", "right_control", "right_option"]),
    ("☆", "fn", &["shift", "command", "control", "option"]),
    ("ultra", "right_shift", &["right_command", "right_control", "right_option", "fn"]),
    ("super", "right_shift", &["right_option", "right_control"]),
    ("enter", "return_or_enter", &[]),
    ("cr", "return_or_enter", &[]),
    ("CR", "return_or_enter", &[]),
    ("esc", "escape", &[]),
    ("ESC", "escape", &[]),
    ("⎋", "escape", &[]),
    ("⇥", "tab", &[]),
    ("backspace", "delete_or_backspace", &[]),
    ("bs", "delete_or_backspace", &[]),
    ("BS", "delete_or_backspace", &[]),
    ("delete", "delete_forward", &[]),
    ("DEL", "delete_forward", &[]),
    ("del", "delete_forward", &[]),
    ("space", "spacebar", &[]),
    ("SPC", "spacebar", &[]),
    ("spc", "spacebar", &[]),
    (" ", "spacebar", &[]),
    ("-", "hyphen", &[]),
    ("underscore", "hyphen", SHIFT),
    ("_", "hyphen", SHIFT),
    ("=", "equal_sign", &[]),
    ("plus", "equal_sign", SHIFT),
    ("(", "9", SHIFT),
    (")", "0", SHIFT),
    ("[", "open_bracket", &[]),
    ("{", "open_bracket", SHIFT),
    ("]", "close_bracket", &[]),
    ("}", "close_bracket", SHIFT),
    ("\\", "backslash", &[]),
    ("|", "backslash", SHIFT),
    (";", "semicolon", &[]),
    (":", "semicolon", SHIFT),
    ("'", "quote", &[]),
    ("\"", "quote", SHIFT),
    ("grave", "grave_accent_and_tilde", &[]),
    ("`", "grave_accent_and_tilde", &[]),
    ("~", "grave_accent_and_tilde", SHIFT),
    (",", "comma", &[]),
    ("<", "comma", SHIFT),
    (".", "period", &[]),
    (">", "period", SHIFT),
    ("/", "slash", &[]),
    ("?", "slash", SHIFT),
    ("!", "1", SHIFT),
    ("@", "2", SHIFT),
    ("#", "3", SHIFT),
    ("$", "4", SHIFT),
    ("%", "5", SHIFT),
    ("^", "6", SHIFT),
    ("&", "7", SHIFT),
    ("*", "8", SHIFT),
    ("up", "up_arrow", &[]),
    ("down", "down_arrow", &[]),
    ("left", "left_arrow", &[]),
    ("right", "right_arrow", &[]),
    ("↑", "up_arrow", &[]),
    ("↓", "down_arrow", &[]),
    ("←", "left_arrow", &[]),
    ("→", "right_arrow", &[]),
    ("pgup", "page_up", &[]),
    ("pgdn", "page_down", &[]),
    ("kp-", "keypad_hyphen", &[]),
    ("kpminus", "keypad_hyphen", &[]),
    ("kpplus", "keypad_plus", &[]),
    ("kp*", "keypad_asterisk", &[]),
    ("kp/", "keypad_slash", &[]),
    ("kp=", "keypad_equal_sign", &[]),
    ("kp.", "keypad_period", &[]),
    ("kp,", "keypad_comma", &[]),
    ("kpenter", "keypad_enter", &[]),
    ("kp1", "keypad_1", &[]),
    ("kp2", "keypad_2", &[]),
    ("kp3", "keypad_3", &[]),
    ("kp4", "keypad_4", &[]),
    ("kp5", "keypad_5", &[]),
    ("kp6", "keypad_6", &[]),
    ("kp7", "keypad_7", &[]),
    ("kp8", "keypad_8", &[]),
    ("kp9", "keypad_9", &[]),
    ("kp0", "keypad_0", &[]),
    ("kpnum", "keypad_num_lock", &[]),
];

/// What an alias expands to
#[derive(Debug, Clone, PartialEq)]
pub enum AliasTarget {
    /// A code from one of the reference tables
    Key { kind: EventKind, code: String },
    /// A template call, expanded each time the alias is used
    Template(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub target: AliasTarget,
    /// Appended to the mandatory modifiers of the event using the alias
    pub modifiers: Vec<String>,
}

impl Alias {
    pub fn key(kind: EventKind, code: impl Into<String>, modifiers: Vec<String>) -> Self {
        Self {
            target: AliasTarget::Key {
                kind,
                code: code.into(),
            },
            modifiers,
        }
    }
}

/// Alias lookup table, keyed by trigger token
#[derive(Debug, Clone)]
pub struct AliasTable {
    by_name: IndexMap<String, Alias>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AliasTable {
    pub fn with_defaults() -> Self {
        let mut by_name = IndexMap::new();
        for (token, code, mods) in BUILTIN_ALIASES {
            let modifiers = mods.iter().map(|m| m.to_string()).collect();
            by_name.insert(token.to_string(), Alias::key(EventKind::KeyCode, *code, modifiers));
        }
        // Capital letters type the shifted letter
        for letter in 'A'..='Z' {
            by_name.insert(
                letter.to_string(),
                Alias::key(
                    EventKind::KeyCode,
                    letter.to_ascii_lowercase().to_string(),
                    vec!["shift".to_string()],
                ),
            );
        }
        Self { by_name }
    }

    pub fn get(&self, token: &str) -> Option<&Alias> {
        self.by_name.get(token)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterate over aliases that expand to template calls
    pub fn template_aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name.iter().filter_map(|(name, alias)| match &alias.target {
            AliasTarget::Template(call) => Some((name.as_str(), call.as_str())),
            AliasTarget::Key { .. } => None,
        })
    }

    /// Add a user alias from its definition string.
    ///
    /// The definition is either a template call (`app(Safari)`) or a key with
    /// an optional modifier block (`<cs-j>`, `hyper`). Definitions made only
    /// of modifiers (`s c o`) are also registered in `modifiers`, so the
    /// alias name can be used inside modifier blocks.
    pub fn define(&mut self, name: &str, definition: &str, modifiers: &mut ModifierTable) -> Result<()> {
        let invalid = |reason: &str| ConfigError::InvalidAlias {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let definition = definition.trim();
        if name.trim().is_empty() || name.contains(expression::JOIN) {
            return Err(invalid("alias names cannot be empty or contain '+'"));
        }
        if expression::layer_name(name).is_some() {
            return Err(invalid("alias names cannot use layer syntax"));
        }
        if definition.is_empty() {
            return Err(invalid("empty definition"));
        }

        if let Some((template, _)) = expression::call_parts(definition) {
            if template == "string" {
                return Err(invalid("string() templates cannot be aliased"));
            }
            self.insert(name, Alias {
                target: AliasTarget::Template(definition.to_string()),
                modifiers: Vec::new(),
            });
            return Ok(());
        }

        if let Some(codes) = modifiers.codes_for(definition) {
            debug!("alias '{}' is also a modifier alias: {:?}", name, codes);
            modifiers.add_alias(name, codes)?;
        }

        let (mods, key) = match expression::parse_term(definition) {
            Term::Key { modifiers, key } => (modifiers, key),
            Term::Layer(_) => return Err(invalid("aliases cannot name layers")),
            Term::Call { .. } => return Err(invalid("malformed template call")),
        };

        let mut implied = match mods {
            Some(block) => {
                let spec = modifiers.parse(block, definition)?;
                let mut codes = spec.mandatory;
                codes.extend(spec.optional);
                codes
            }
            None => Vec::new(),
        };

        let has_delimiter = definition.contains(['-', '|']);
        let target = if let Some(existing) = self.by_name.get(key) {
            implied.extend(existing.modifiers.iter().cloned());
            existing.target.clone()
        } else if let Some(code) = single_modifier(key).filter(|_| !has_delimiter) {
            AliasTarget::Key {
                kind: EventKind::KeyCode,
                code: code.to_string(),
            }
        } else if let Some(kind) = key_codes::classify(key) {
            AliasTarget::Key {
                kind,
                code: key.to_string(),
            }
        } else {
            return Err(invalid(&format!("unknown key code '{}'", key)));
        };

        self.insert(name, Alias {
            target,
            modifiers: implied,
        });
        Ok(())
    }

    fn insert(&mut self, name: &str, alias: Alias) {
        if self.by_name.contains_key(name) {
            debug!("user alias '{}' overrides an existing alias", name);
        }
        self.by_name.insert(name.to_string(), alias);
    }
}

/// `s` -> `left_shift`, for single-character modifier names
fn single_modifier(key: &str) -> Option<&'static str> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => key_codes::modifier_char(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define(name: &str, def: &str) -> Result<(AliasTable, ModifierTable)> {
        let mut aliases = AliasTable::with_defaults();
        let mut modifiers = ModifierTable::with_defaults();
        aliases.define(name, def, &mut modifiers)?;
        Ok((aliases, modifiers))
    }

    #[test]
    fn test_builtin_aliases() {
        let table = AliasTable::with_defaults();
        assert_eq!(
            table.get("hyper"),
            Some(&Alias::key(
                EventKind::KeyCode,
                "right_shift",
                vec!["right_command".into(), "right_control".into(), "right_option".into()],
            ))
        );
        assert_eq!(
            table.get("J"),
            Some(&Alias::key(EventKind::KeyCode, "j", vec!["shift".into()]))
        );
        assert_eq!(table.get("⌘›").map(|a| &a.target), Some(&AliasTarget::Key {
            kind: EventKind::KeyCode,
            code: "right_command".into(),
        }));
    }

    #[test]
    fn test_user_alias_with_modifiers() {
        let (aliases, _) = define("sel_word", "<os-left>").unwrap();
        assert_eq!(
            aliases.get("sel_word"),
            Some(&Alias::key(
                EventKind::KeyCode,
                "left_arrow",
                vec!["left_option".into(), "left_shift".into()],
            ))
        );
    }

    #[test]
    fn test_user_alias_keeps_reference_table_kind() {
        let (aliases, _) = define("click", "button1").unwrap();
        assert_eq!(aliases.get("click").map(|a| &a.target), Some(&AliasTarget::Key {
            kind: EventKind::PointingButton,
            code: "button1".into(),
        }));
    }

    #[test]
    fn test_modifier_only_alias() {
        let (aliases, modifiers) = define("meh", "s c o").unwrap();
        assert_eq!(
            aliases.get("meh"),
            Some(&Alias::key(
                EventKind::KeyCode,
                "left_option",
                vec!["left_shift".into(), "left_control".into()],
            ))
        );
        assert_eq!(
            modifiers.get("meh"),
            Some(&["left_shift".to_string(), "left_control".to_string(), "left_option".to_string()][..])
        );
    }

    #[test]
    fn test_single_modifier_definition() {
        let (aliases, _) = define("sft", "s").unwrap();
        assert_eq!(
            aliases.get("sft"),
            Some(&Alias::key(EventKind::KeyCode, "left_shift", vec![]))
        );
        let (aliases, _) = define("ctrl_s", "c-s").unwrap();
        assert_eq!(
            aliases.get("ctrl_s"),
            Some(&Alias::key(EventKind::KeyCode, "s", vec!["left_control".into()]))
        );
    }

    #[test]
    fn test_alias_of_alias_is_snapshotted() {
        let (aliases, _) = define("hyp_j", "<c-hyper>").unwrap();
        let alias = aliases.get("hyp_j").unwrap();
        assert_eq!(
            alias.modifiers,
            vec!["left_control", "right_command", "right_control", "right_option"]
        );
    }

    #[test]
    fn test_template_alias() {
        let (aliases, _) = define("chrome", "app(Google Chrome)").unwrap();
        assert_eq!(
            aliases.get("chrome").map(|a| &a.target),
            Some(&AliasTarget::Template("app(Google Chrome)".into()))
        );
        assert_eq!(aliases.template_aliases().count(), 1);
    }

    #[test]
    fn test_invalid_aliases() {
        assert!(matches!(define("s", "string(hi)"), Err(ConfigError::InvalidAlias { .. })));
        assert!(matches!(define("x", "not_a_key"), Err(ConfigError::InvalidAlias { .. })));
        assert!(matches!(define("a+b", "j"), Err(ConfigError::InvalidAlias { .. })));
        assert!(matches!(define("/nav/", "j"), Err(ConfigError::InvalidAlias { .. })));
        assert!(matches!(define("x", "<z-j>"), Err(ConfigError::InvalidModifier { .. })));
    }
}
