// Karaml Core - Key Resolver
// Resolves tokens into events and combines "a+b" expressions

use log::trace;

use crate::alias::AliasTarget;
use crate::error::{ConfigError, Result};
use crate::event::{EventAction, KeyEvent};
use crate::expression::{self, Term};
use crate::key_codes;
use crate::modifier::ModifierSpec;
use crate::registry::Registry;
use crate::rule::FromEvent;
use crate::template::{self, Expansion, Template};

/// Outcome of looking a bare key token up
enum Lookup<'r> {
    Key(EventAction, &'r [String]),
    Template(&'r str),
}

/// Resolves mapping expressions against a frozen [`Registry`]
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r Registry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Resolve one sub-expression.
    ///
    /// Priority is layer syntax, then template call, then a key looked up in
    /// the alias, key code, consumer key code and pointing button tables.
    /// Most tokens yield one event; `string(...)` yields one per character.
    ///
    /// # Arguments
    /// * `token` - The sub-expression, e.g. `"<cs-j>"` or `"app(Safari)"`
    /// * `expr` - The full expression it came from, for diagnostics
    pub fn resolve(&self, token: &str, expr: &str) -> Result<Vec<KeyEvent>> {
        let token = token.trim();
        let events = match expression::parse_term(token) {
            Term::Layer(name) => vec![KeyEvent::new(EventAction::Layer(name.to_string()))],
            Term::Call { name, args } => match self.registry.template(name) {
                Some(template) => self.expand(&template, args, expr)?,
                // Not a template: a paren key such as `c(x)-)`
                None => {
                    let (modifiers, key) = expression::modifier_split(token);
                    self.resolve_key(modifiers, key, token, expr)?
                }
            },
            Term::Key { modifiers, key } => self.resolve_key(modifiers, key, token, expr)?,
        };
        trace!("'{}' -> {:?}", token, events);
        Ok(events)
    }

    fn resolve_key(
        &self,
        modifiers: Option<&str>,
        key: &str,
        token: &str,
        expr: &str,
    ) -> Result<Vec<KeyEvent>> {
        // Whole-token matches win, so tokens like "kp-" are never split
        if let Some(lookup) = self.lookup(token) {
            return self.finish(lookup, ModifierSpec::default(), token, expr);
        }

        let spec = match modifiers {
            Some(block) => self.registry.modifiers().parse(block, expr)?,
            None => ModifierSpec::default(),
        };
        match self.lookup(key) {
            Some(lookup) => self.finish(lookup, spec, token, expr),
            None => Err(ConfigError::InvalidKeyCode {
                key: key.to_string(),
                expr: expr.to_string(),
            }),
        }
    }

    fn lookup(&self, key: &str) -> Option<Lookup<'r>> {
        if let Some(alias) = self.registry.alias(key) {
            return match &alias.target {
                AliasTarget::Key { kind, code } => {
                    EventAction::key(*kind, code.as_str()).map(|a| Lookup::Key(a, &alias.modifiers))
                }
                AliasTarget::Template(call) => Some(Lookup::Template(call)),
            };
        }
        key_codes::classify(key)
            .and_then(|kind| EventAction::key(kind, key))
            .map(|action| Lookup::Key(action, &[]))
    }

    fn finish(
        &self,
        lookup: Lookup<'r>,
        mut spec: ModifierSpec,
        token: &str,
        expr: &str,
    ) -> Result<Vec<KeyEvent>> {
        match lookup {
            Lookup::Key(action, implied) => {
                spec.mandatory.extend(implied.iter().cloned());
                Ok(vec![KeyEvent::with_modifiers(action, spec)])
            }
            Lookup::Template(call) => {
                if !spec.is_empty() {
                    return Err(ConfigError::InvalidModifier {
                        modifier: token.to_string(),
                        expr: expr.to_string(),
                    });
                }
                let (name, args) =
                    expression::call_parts(call).ok_or_else(|| ConfigError::InvalidKeyCode {
                        key: token.to_string(),
                        expr: expr.to_string(),
                    })?;
                let template =
                    self.registry
                        .template(name)
                        .ok_or_else(|| ConfigError::InvalidKeyCode {
                            key: token.to_string(),
                            expr: expr.to_string(),
                        })?;
                self.expand(&template, args, expr)
            }
        }
    }

    fn expand(&self, template: &Template, args: &str, expr: &str) -> Result<Vec<KeyEvent>> {
        match template {
            Template::User(user) => Ok(vec![KeyEvent::new(user.expand(args)?)]),
            Template::Builtin(builtin) => match builtin.expand(args)? {
                Expansion::Event(action) => Ok(vec![KeyEvent::new(action)]),
                Expansion::Text(text) => {
                    trace!("typing '{}' from '{}'", text, expr);
                    Ok(self.type_text(&text))
                }
            },
        }
    }

    /// Events typing `text` key by key, or one clipboard-paste command when
    /// some character has no key
    fn type_text(&self, text: &str) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        for c in text.chars() {
            let token = c.to_string();
            // Modifier glyphs have no printable key
            if !c.is_ascii() && self.registry.modifiers().get(&token).is_some() {
                continue;
            }
            match self.lookup(&token) {
                Some(Lookup::Key(action, implied)) => events.push(KeyEvent::with_modifiers(
                    action,
                    ModifierSpec::mandatory(implied.iter().cloned()),
                )),
                _ => {
                    return vec![KeyEvent::new(EventAction::ShellCommand(
                        template::paste_text_command(text),
                    ))]
                }
            }
        }
        events
    }

    /// Resolve a from-expression.
    ///
    /// Two or more keys become a simultaneous group whose modifiers are the
    /// union of every key's modifiers.
    pub fn from_event(&self, expr: &str) -> Result<FromEvent> {
        let mut keys = Vec::new();
        for token in expression::sub_expressions(expr) {
            let mut events = self.resolve(token, expr)?;
            let event = match (events.pop(), events.is_empty()) {
                (Some(event), true) if event.is_key() => event,
                _ => {
                    return Err(ConfigError::InvalidFromEvent {
                        key: token.to_string(),
                        expr: expr.to_string(),
                    })
                }
            };
            keys.push(event);
        }

        if keys.len() == 1 {
            if let Some(event) = keys.pop() {
                return Ok(FromEvent::Single(event));
            }
        }

        let mut modifiers = ModifierSpec::default();
        let mut actions = Vec::with_capacity(keys.len());
        for event in keys {
            modifiers.merge(&event.modifiers);
            actions.push(event.action);
        }
        Ok(FromEvent::Simultaneous {
            keys: actions,
            modifiers,
        })
    }

    /// Resolve a to-expression into its ordered events.
    ///
    /// Shell commands are merged into a single command joined with `&&`,
    /// placed where the first one appeared.
    pub fn to_events(&self, expr: &str) -> Result<Vec<KeyEvent>> {
        let mut events = Vec::new();
        for token in expression::sub_expressions(expr) {
            for event in self.resolve(token, expr)? {
                if !event.modifiers.optional.is_empty() {
                    return Err(ConfigError::OptionalModifierInTo(expr.to_string()));
                }
                events.push(event);
            }
        }
        Ok(merge_shell_commands(events))
    }
}

/// Join every shell command into one, keeping the order of everything else.
///
/// The merged command takes the slot of the first shell command, so a
/// command written before a key event still runs before it.
pub fn merge_shell_commands(events: Vec<KeyEvent>) -> Vec<KeyEvent> {
    let commands: Vec<&str> = events
        .iter()
        .filter_map(|e| match &e.action {
            EventAction::ShellCommand(cmd) => Some(cmd.as_str()),
            _ => None,
        })
        .collect();
    if commands.len() < 2 {
        return events;
    }

    let merged = commands.join(" && ");
    let mut placed = false;
    let mut out = Vec::with_capacity(events.len() - commands.len() + 1);
    for event in events {
        if let EventAction::ShellCommand(_) = event.action {
            if !placed {
                out.push(KeyEvent::new(EventAction::ShellCommand(merged.clone())));
                placed = true;
            }
        } else {
            out.push(event);
        }
    }
    out
}
