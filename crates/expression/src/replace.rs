//! Text-level rewriting applied before an expression is parsed.
//!
//! Two passes run in order: `${define}` placeholders are replaced by
//! parenthesized define text, then `${name}` and `${$.path}` references are
//! rewritten into identifiers the parser understands. The rewritten text is
//! what the compile cache is keyed by.

use crate::feature::FeatureContext;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Named expression fragments substituted before parsing.
pub type Defines = BTreeMap<String, String>;

/// Prefix of identifiers that name a feature property.
pub const PROPERTY_PREFIX: &str = "__p_";
/// Prefix of identifiers that name a spliced JSONPath literal.
pub const LITERAL_PREFIX: &str = "__l_";

/// Output of [`replace_variables`].
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub expression: String,
    /// Literal identifiers introduced by `${$.path}` splicing.
    pub literals: Vec<(String, serde_json::Value)>,
}

pub fn replace_defines(text: &str, defines: &Defines) -> String {
    let mut out = text.to_string();
    for (name, value) in defines {
        let placeholder = format!("${{{name}}}");
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &format!("({value})"));
        }
    }
    out
}

/// Rewrites `${...}` references.
///
/// Outside string literals `${name}` becomes a property identifier and
/// `${$.path}` is resolved against the feature document: a single match is
/// spliced as a literal identifier. Inside string literals `${$.path}` is
/// inlined as text and `${name}` is left for interpolation at evaluation
/// time. When a path matches nothing, matches more than once, or does not
/// parse, the rest of the text is returned untouched and the expression
/// fails to parse later on.
pub fn replace_variables(text: &str, feature: Option<&dyn FeatureContext>) -> Substitution {
    let mut out = String::with_capacity(text.len());
    let mut literals = Vec::new();
    let mut quote: Option<char> = None;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '\\' && quote.is_some() {
            let escaped: String = rest.chars().take(2).collect();
            out.push_str(&escaped);
            rest = &rest[escaped.len()..];
            continue;
        }
        if c == '$' && rest.starts_with("${") {
            let Some(end) = placeholder_end(rest) else {
                out.push_str(rest);
                break;
            };
            let name = rest[2..end].trim();
            let after = &rest[end + 1..];
            if name.starts_with('$') {
                match resolve_path(name, feature) {
                    Some(value) => match quote {
                        Some(q) => out.push_str(&escape_in_string(&value, q)),
                        None => {
                            let ident = literal_name(&value);
                            out.push_str(&ident);
                            if !literals.iter().any(|(n, _)| n == &ident) {
                                literals.push((ident, value));
                            }
                        }
                    },
                    None => {
                        out.push_str(rest);
                        break;
                    }
                }
            } else if quote.is_some() {
                out.push_str(&rest[..=end]);
            } else {
                out.push_str(&property_identifier(name));
            }
            rest = after;
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            _ => {}
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Substitution {
        expression: out,
        literals,
    }
}

/// Byte index of the `}` closing a placeholder that starts at index 0.
/// Braces inside quoted JSONPath member names do not count.
fn placeholder_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices().skip(2) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(c),
            (None, '}') => return Some(i),
            _ => {}
        }
    }
    None
}

fn resolve_path(path: &str, feature: Option<&dyn FeatureContext>) -> Option<serde_json::Value> {
    let doc = feature.map(|f| f.document()).unwrap_or(serde_json::Value::Null);
    match layerkit_json_path::query(path, &doc) {
        Ok(matches) if matches.len() == 1 => Some(matches[0].clone()),
        Ok(matches) => {
            tracing::debug!(path, matches = matches.len(), "JSONPath did not resolve to a single value");
            None
        }
        Err(err) => {
            tracing::debug!(path, %err, "invalid JSONPath in expression");
            None
        }
    }
}

fn escape_in_string(value: &serde_json::Value, quote: char) -> String {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => crate::value::Value::from_json(other).to_js_string(),
    };
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Content-addressed so equal splices share one compiled expression.
fn literal_name(value: &serde_json::Value) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in value.to_string().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{LITERAL_PREFIX}{hash:016x}")
}

/// Encodes a property name into an identifier: `_` doubles, any other
/// character outside `[A-Za-z0-9]` becomes `_u<hex>_`.
pub fn property_identifier(name: &str) -> String {
    let mut out = String::from(PROPERTY_PREFIX);
    for c in name.chars() {
        if c == '_' {
            out.push_str("__");
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            let _ = write!(out, "_u{:x}_", c as u32);
        }
    }
    out
}

/// Inverse of [`property_identifier`]. Returns `None` for identifiers that
/// were not produced by it.
pub fn decode_property_identifier(ident: &str) -> Option<String> {
    let encoded = ident.strip_prefix(PROPERTY_PREFIX)?;
    let mut out = String::new();
    let mut chars = encoded.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '_' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '_' => out.push('_'),
            'u' => {
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '_' => break,
                        h => hex.push(h),
                    }
                }
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            _ => return None,
        }
    }
    Some(out)
}
