// Karaml Core - Mapping Expression Parser
// Splits "a+b+c" expressions and classifies each sub-expression

use smallvec::{smallvec, SmallVec};

/// Sub-expressions of a mapping expression; almost always four or fewer
pub type SubExpressions<'a> = SmallVec<[&'a str; 4]>;

/// Delimiter joining simultaneous keys or sequential to-events
pub const JOIN: char = '+';

/// One sub-expression of a mapping expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term<'a> {
    /// `/name/`
    Layer(&'a str),
    /// `name(args)`; only a template if `name` is registered
    Call { name: &'a str, args: &'a str },
    /// A key token, optionally preceded by a modifier block
    Key {
        modifiers: Option<&'a str>,
        key: &'a str,
    },
}

/// Split an expression on top-level join delimiters.
///
/// A `+` inside a call's parentheses (`shell(a+b)`) does not split.
/// Returns `None` when the expression holds a single sub-expression.
///
/// # Examples
/// ```
/// use karaml_core::expression::split;
/// assert_eq!(split("a + b+c").unwrap().as_slice(), &["a", "b", "c"]);
/// assert!(split("a").is_none());
/// assert!(split("shell(echo 1+1)").is_none());
/// ```
pub fn split(expr: &str) -> Option<SubExpressions<'_>> {
    let mut parts: SubExpressions<'_> = SmallVec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (idx, c) in expr.char_indices() {
        match c {
            // Parentheses only nest after a call name, so "(" alone stays a key
            '(' if depth > 0 || prev.is_some_and(is_name_char) => depth += 1,
            ')' if depth > 0 => depth -= 1,
            JOIN if depth == 0 => {
                parts.push(expr[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
        prev = Some(c);
    }

    if parts.is_empty() {
        return None;
    }
    parts.push(expr[start..].trim());
    Some(parts)
}

/// Every sub-expression of an expression, including the single-term case
pub fn sub_expressions(expr: &str) -> SubExpressions<'_> {
    split(expr).unwrap_or_else(|| smallvec![expr.trim()])
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Classify a single sub-expression.
///
/// Layer syntax wins over a call, which wins over a key token.
pub fn parse_term(token: &str) -> Term<'_> {
    let token = token.trim();

    if let Some(name) = layer_name(token) {
        return Term::Layer(name);
    }

    if let Some((name, args)) = call_parts(token) {
        return Term::Call { name, args };
    }

    let (modifiers, key) = modifier_split(token);
    Term::Key { modifiers, key }
}

/// `/nav/` -> `nav`
pub fn layer_name(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('/')?.strip_suffix('/')?;
    if inner.is_empty() || inner.contains('/') {
        return None;
    }
    Some(inner)
}

/// `app(Safari)` -> `("app", "Safari")`
pub fn call_parts(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let name = &token[..open];
    if name.is_empty() || !name.chars().all(is_name_char) {
        return None;
    }
    let args = token[open + 1..].strip_suffix(')')?;
    Some((name, args))
}

/// Separate a modifier block from its key.
///
/// Accepted forms are `<mods-key>`, `<mods|key>`, `mods-key`, `mods|key` and
/// the whitespace form `mods key` used with unicode glyphs (`‹⌘ ⇧ j`).
pub fn modifier_split(token: &str) -> (Option<&str>, &str) {
    let inner = token
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .filter(|t| !t.is_empty())
        .unwrap_or(token);

    let delimiter = inner
        .char_indices()
        .find(|&(idx, c)| idx > 0 && (c == '-' || c == '|') && idx + 1 < inner.len());
    if let Some((idx, _)) = delimiter {
        let mods = &inner[..idx];
        if !mods.contains('>') {
            return (Some(mods), &inner[idx + 1..]);
        }
    }

    if let Some(idx) = token.rfind(char::is_whitespace) {
        let mods = token[..idx].trim_end();
        let key = token[idx..].trim_start();
        if !mods.is_empty() && !key.is_empty() {
            return (Some(mods), key);
        }
    }

    (None, token)
}
