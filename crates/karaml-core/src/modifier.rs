// Karaml Core - Modifier Grammar
// Parses modifier blocks like "cs(x)" or "‹⌘⇧" into mandatory/optional sets

use indexmap::IndexMap;
use log::trace;

use crate::error::{ConfigError, Result};
use crate::key_codes::{MODIFIER_CHARS, MODIFIER_GLYPHS};

/// Mandatory and optional modifiers attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierSpec {
    pub mandatory: Vec<String>,
    pub optional: Vec<String>,
}

impl ModifierSpec {
    pub fn mandatory<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mandatory: codes.into_iter().map(Into::into).collect(),
            optional: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }

    /// Append another spec's modifiers to this one
    pub fn merge(&mut self, other: &ModifierSpec) {
        self.mandatory.extend(other.mandatory.iter().cloned());
        self.optional.extend(other.optional.iter().cloned());
    }
}

/// One lexical unit of a modifier block
#[derive(Debug, Clone, Copy, PartialEq)]
enum ModToken<'a> {
    Open,
    Close,
    Codes(&'a [String]),
}

/// Named modifiers usable inside a modifier block.
///
/// Holds the single-character names, the unicode glyphs and any
/// modifier-only user aliases. Names are matched longest first, so `‹⌘`
/// wins over `⌘` and a user alias like `meh` wins over its letters.
#[derive(Debug, Clone)]
pub struct ModifierTable {
    by_name: IndexMap<String, Vec<String>>,
    longest: usize,
}

impl Default for ModifierTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModifierTable {
    pub fn with_defaults() -> Self {
        let mut table = Self {
            by_name: IndexMap::new(),
            longest: 1,
        };
        for (c, code) in MODIFIER_CHARS {
            table.insert(c.to_string(), vec![code.to_string()]);
        }
        for (glyph, codes) in MODIFIER_GLYPHS {
            table.insert(glyph.to_string(), codes.iter().map(|c| c.to_string()).collect());
        }
        table
    }

    fn insert(&mut self, name: String, codes: Vec<String>) {
        self.longest = self.longest.max(name.chars().count());
        self.by_name.insert(name, codes);
    }

    /// Register a modifier-only alias such as `meh: s c o`
    pub fn add_alias(&mut self, name: &str, codes: Vec<String>) -> Result<()> {
        if name.is_empty() || name.contains(['(', ')']) || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidAlias {
                name: name.to_string(),
                reason: "modifier alias names cannot contain spaces or parentheses".into(),
            });
        }
        self.insert(name.to_string(), codes);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    /// Expand text made only of modifier names, ignoring whitespace.
    ///
    /// Returns `None` if anything in the text is not a modifier.
    pub fn codes_for(&self, text: &str) -> Option<Vec<String>> {
        let tokens = self.tokenize(text, text).ok()?;
        let mut codes = Vec::new();
        for token in tokens {
            match token {
                ModToken::Codes(c) => codes.extend(c.iter().cloned()),
                _ => return None,
            }
        }
        (!codes.is_empty()).then_some(codes)
    }

    fn tokenize<'a>(&'a self, mods: &str, expr: &str) -> Result<Vec<ModToken<'a>>> {
        let chars: Vec<char> = mods.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        'outer: while i < chars.len() {
            match chars[i] {
                c if c.is_whitespace() => {
                    i += 1;
                    continue;
                }
                '(' => {
                    tokens.push(ModToken::Open);
                    i += 1;
                    continue;
                }
                ')' => {
                    tokens.push(ModToken::Close);
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let max = self.longest.min(chars.len() - i);
            for len in (1..=max).rev() {
                let candidate: String = chars[i..i + len].iter().collect();
                if let Some(codes) = self.by_name.get(&candidate) {
                    tokens.push(ModToken::Codes(codes));
                    i += len;
                    continue 'outer;
                }
            }

            return Err(ConfigError::InvalidModifier {
                modifier: chars[i].to_string(),
                expr: expr.to_string(),
            });
        }

        Ok(tokens)
    }

    /// Parse a modifier block into mandatory and optional modifiers.
    ///
    /// Modifiers inside the single parenthesized group are optional, the rest
    /// are mandatory. The group must sit at the start or the end of the block.
    ///
    /// # Arguments
    /// * `mods` - The modifier block, e.g. `"cs(x)"` or `"‹⌘ ⇧"`
    /// * `expr` - The expression the block came from, for diagnostics
    ///
    /// # Examples
    /// ```
    /// use karaml_core::modifier::ModifierTable;
    /// let table = ModifierTable::with_defaults();
    /// let spec = table.parse("cs(x)", "<cs(x)-j>").unwrap();
    /// assert_eq!(spec.mandatory, vec!["left_control", "left_shift"]);
    /// assert_eq!(spec.optional, vec!["any"]);
    /// ```
    pub fn parse(&self, mods: &str, expr: &str) -> Result<ModifierSpec> {
        let tokens = self.tokenize(mods, expr)?;
        let optional_error = |reason: &'static str| ConfigError::InvalidOptionalModifiers {
            modifiers: mods.to_string(),
            expr: expr.to_string(),
            reason,
        };

        let opens: Vec<usize> = positions(&tokens, ModToken::Open);
        let closes: Vec<usize> = positions(&tokens, ModToken::Close);
        if opens.len() != closes.len() {
            return Err(optional_error("unbalanced parentheses"));
        }
        if opens.len() > 1 {
            return Err(optional_error("only one optional group is allowed"));
        }

        let group = match (opens.first(), closes.first()) {
            (Some(&open), Some(&close)) => {
                if open > close {
                    return Err(optional_error("unbalanced parentheses"));
                }
                if close == open + 1 {
                    return Err(optional_error("optional group is empty"));
                }
                if open != 0 && close != tokens.len() - 1 {
                    return Err(optional_error(
                        "optional group must be at the start or the end",
                    ));
                }
                Some((open, close))
            }
            _ => None,
        };

        let mut spec = ModifierSpec::default();
        for (idx, token) in tokens.iter().enumerate() {
            if let ModToken::Codes(codes) = token {
                let optional = group.is_some_and(|(open, close)| idx > open && idx < close);
                let target = if optional {
                    &mut spec.optional
                } else {
                    &mut spec.mandatory
                };
                target.extend(codes.iter().cloned());
            }
        }

        if spec.is_empty() {
            return Err(ConfigError::InvalidModifier {
                modifier: mods.to_string(),
                expr: expr.to_string(),
            });
        }

        trace!("modifiers '{}' -> {:?}", mods, spec);
        Ok(spec)
    }
}

fn positions(tokens: &[ModToken<'_>], wanted: ModToken<'_>) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == wanted)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(mods: &str) -> Result<ModifierSpec> {
        ModifierTable::with_defaults().parse(mods, mods)
    }

    #[test]
    fn test_mandatory_only() {
        let spec = parse("mOs").unwrap();
        assert_eq!(spec.mandatory, vec!["left_command", "right_option", "left_shift"]);
        assert!(spec.optional.is_empty());
    }

    #[test]
    fn test_optional_flush_right() {
        let spec = parse("cs(x)").unwrap();
        assert_eq!(spec.mandatory, vec!["left_control", "left_shift"]);
        assert_eq!(spec.optional, vec!["any"]);
    }

    #[test]
    fn test_optional_flush_left() {
        let spec = parse("(ms)c").unwrap();
        assert_eq!(spec.mandatory, vec!["left_control"]);
        assert_eq!(spec.optional, vec!["left_command", "left_shift"]);
    }

    #[test]
    fn test_optional_only() {
        let spec = parse("(x)").unwrap();
        assert!(spec.mandatory.is_empty());
        assert_eq!(spec.optional, vec!["any"]);
    }

    #[test]
    fn test_optional_in_middle_rejected() {
        let err = parse("c(s)o").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionalModifiers { .. }));
    }

    #[test]
    fn test_two_optional_groups_rejected() {
        let err = parse("(c)s(o)").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionalModifiers { .. }));
    }

    #[test]
    fn test_unbalanced_parens_rejected() {
        assert!(parse("(cs").is_err());
        assert!(parse("c)s(").is_err());
    }

    #[test]
    fn test_invalid_character() {
        let err = parse("cz").unwrap_err();
        match err {
            ConfigError::InvalidModifier { modifier, .. } => assert_eq!(modifier, "z"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_group_rejected() {
        for mods in ["()", "c()", "()s"] {
            assert!(
                matches!(parse(mods), Err(ConfigError::InvalidOptionalModifiers { .. })),
                "{mods} should be rejected"
            );
        }
    }

    #[test]
    fn test_unicode_glyph_sides() {
        let spec = parse("‹⌘⇧›").unwrap();
        assert_eq!(spec.mandatory, vec!["left_command", "right_shift"]);

        let spec = parse("⌘ ⌥").unwrap();
        assert_eq!(spec.mandatory, vec!["command", "option"]);

        let spec = parse("☆").unwrap();
        assert_eq!(spec.mandatory, vec!["command", "option", "control", "shift"]);
    }

    #[test]
    fn test_unicode_optional_group() {
        let spec = parse("⌃(⇧)").unwrap();
        assert_eq!(spec.mandatory, vec!["control"]);
        assert_eq!(spec.optional, vec!["shift"]);
    }

    #[test]
    fn test_user_alias_matched_longest_first() {
        let mut table = ModifierTable::with_defaults();
        table
            .add_alias("meh", vec!["left_shift".into(), "left_control".into(), "left_option".into()])
            .unwrap();
        let spec = table.parse("meh", "<meh-j>").unwrap();
        assert_eq!(spec.mandatory, vec!["left_shift", "left_control", "left_option"]);
    }

    #[test]
    fn test_codes_for() {
        let table = ModifierTable::with_defaults();
        assert_eq!(
            table.codes_for("s c"),
            Some(vec!["left_shift".to_string(), "left_control".to_string()])
        );
        assert_eq!(table.codes_for("‹⌘"), Some(vec!["left_command".to_string()]));
        assert_eq!(table.codes_for("j"), None);
        assert_eq!(table.codes_for("(s)"), None);
    }
}
