// Karaml Core - Alias and Template Registry
// Built once from built-ins plus user definitions, read-only afterwards

use std::str::FromStr;

use indexmap::IndexMap;
use log::debug;
use strum::IntoEnumIterator;

use crate::alias::{Alias, AliasTable};
use crate::error::{ConfigError, Result};
use crate::expression;
use crate::modifier::ModifierTable;
use crate::template::{BuiltinTemplate, Template, UserTemplate};

/// Lookup tables used while compiling mappings.
///
/// A registry never changes once built; share it by reference (it is
/// `Send + Sync`) when compiling mappings in parallel.
#[derive(Debug, Clone)]
pub struct Registry {
    aliases: AliasTable,
    modifiers: ModifierTable,
    templates: IndexMap<String, Template>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    /// Registry with only the built-in aliases, modifiers and templates
    pub fn builtin() -> Self {
        let templates = BuiltinTemplate::iter()
            .map(|t| (t.to_string(), Template::Builtin(t)))
            .collect();
        Self {
            aliases: AliasTable::with_defaults(),
            modifiers: ModifierTable::with_defaults(),
            templates,
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn alias(&self, token: &str) -> Option<&Alias> {
        self.aliases.get(token)
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn modifiers(&self) -> &ModifierTable {
        &self.modifiers
    }

    /// Look up a template by call name.
    ///
    /// Built-in templates also answer to their secondary names (`softFunc`).
    pub fn template(&self, name: &str) -> Option<Template> {
        if let Some(template) = self.templates.get(name) {
            return Some(template.clone());
        }
        BuiltinTemplate::from_str(name).ok().map(Template::Builtin)
    }

    pub fn is_template(&self, name: &str) -> bool {
        self.template(name).is_some()
    }
}

/// Builds a [`Registry`] in bootstrap order: built-ins, user aliases, then
/// user templates.
#[derive(Debug)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::builtin(),
        }
    }

    /// Add user aliases (`name -> definition`)
    pub fn aliases<'a, I>(mut self, definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let Registry {
            aliases, modifiers, ..
        } = &mut self.registry;
        let mut count = 0;
        for (name, definition) in definitions {
            aliases.define(name, definition, modifiers)?;
            count += 1;
        }
        debug!("registered {} user alias(es)", count);
        Ok(self)
    }

    /// Add user shell templates (`name -> script with %s placeholders`)
    pub fn templates<'a, I>(mut self, definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, script) in definitions {
            let invalid = |reason: &str| ConfigError::InvalidTemplate {
                name: name.to_string(),
                reason: reason.to_string(),
            };

            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid("names may only contain letters, digits and '_'"));
            }
            if BuiltinTemplate::from_str(name).is_ok() {
                return Err(invalid("name is already used by a built-in template"));
            }
            if script.trim().is_empty() {
                return Err(invalid("empty script"));
            }

            let template = UserTemplate::new(name, script);
            debug!("user template '{}' takes {} argument(s)", name, template.arity());
            self.registry
                .templates
                .insert(name.to_string(), Template::User(template));
        }
        Ok(self)
    }

    /// Finish the bootstrap, checking that template aliases name a template
    pub fn build(self) -> Result<Registry> {
        for (alias, call) in self.registry.aliases.template_aliases() {
            let known = expression::call_parts(call)
                .map(|(name, _)| self.registry.is_template(name))
                .unwrap_or(false);
            if !known {
                return Err(ConfigError::InvalidAlias {
                    name: alias.to_string(),
                    reason: format!("'{}' does not call a known template", call),
                });
            }
        }

        debug!(
            "registry ready: {} aliases, {} templates",
            self.registry.aliases.len(),
            self.registry.templates.len()
        );
        Ok(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTarget;

    #[test]
    fn test_builtin_templates_registered() {
        let registry = Registry::builtin();
        for name in ["app", "mousePos", "notifyOff", "sfunc", "softFunc", "string"] {
            assert!(registry.is_template(name), "{name} should be a template");
        }
        assert!(!registry.is_template("hyper"));
    }

    #[test]
    fn test_user_templates() {
        let registry = Registry::builder()
            .templates([("code", "code %s")])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            registry.template("code"),
            Some(Template::User(UserTemplate::new("code", "code %s")))
        );
    }

    #[test]
    fn test_user_template_cannot_shadow_builtin() {
        let err = Registry::builder().templates([("app", "echo %s")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_alias_to_user_template_resolves_after_bootstrap() {
        let registry = Registry::builder()
            .aliases([("edit", "code(~/notes)")])
            .unwrap()
            .templates([("code", "code %s")])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            registry.alias("edit").map(|a| &a.target),
            Some(&AliasTarget::Template("code(~/notes)".into()))
        );
    }

    #[test]
    fn test_alias_to_unknown_template_rejected() {
        let err = Registry::builder()
            .aliases([("edit", "nope(~/notes)")])
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAlias { .. }));
    }

    #[test]
    fn test_modifier_alias_registered() {
        let registry = Registry::builder().aliases([("meh", "s c o")]).unwrap().build().unwrap();
        assert!(registry.modifiers().get("meh").is_some());
    }
}
