//! Free-text expression rewriting.
//!
//! Callers sometimes hand over raw expression text (`upper(name) AS label`)
//! instead of a structured column. Bare identifiers in that text are
//! property names of the matched node and must be prefixed with its alias.
//!
//! Left untouched:
//! - qualified references (`u.name`) and property names after a dot
//! - function names (any identifier followed by `(`); their arguments are
//!   still rewritten, so `upper(name)` becomes `upper(n.name)`
//! - keywords, numbers, `$parameters`, `:Labels`, quoted literals
//! - the identifier after `AS`
//!
//! Known limitation: only an expression whose *first* token is already
//! `alias.`-prefixed is returned as-is. A bare reference to the alias itself
//! anywhere else (`count(n)`) is read as a property name and prefixed again
//! (`count(n.n)`) on every pass.

use once_cell::sync::Lazy;
use regex::Regex;

/// Zero-argument builtins that make the whole expression opaque.
static OPAQUE_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(timestamp|date|datetime|localdatetime|localtime|time|rand|randomuuid|pi|e)\s*\(\s*\)",
    )
    .unwrap()
});

/// `<expression> AS <alias>` with the last top-level AS winning.
static ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(.+?)\s+AS\s+([A-Za-z_][A-Za-z0-9_]*|`[^`]+`)\s*$").unwrap()
});

const KEYWORDS: &[&str] = &[
    "true", "false", "null", "and", "or", "not", "xor", "as", "asc", "desc", "ascending",
    "descending", "distinct", "in", "is", "case", "when", "then", "else", "end", "contains",
    "starts", "ends", "with",
];

fn is_keyword(token: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(token))
}

/// Prefix every bare identifier in `expression` with `alias.`.
pub fn prefix_columns(expression: &str, alias: &str) -> String {
    let qualified = format!("{}.", alias);
    if expression.trim_start().starts_with(&qualified) || OPAQUE_CALL_RE.is_match(expression) {
        return expression.to_string();
    }

    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len() + 16);
    let mut i = 0;
    // Last non-whitespace character written
    let mut prev: Option<char> = None;
    let mut after_as = false;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' || c == '`' {
            i = copy_quoted(&chars, i, &mut out);
            prev = Some(c);
            after_as = false;
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                out.push(chars[i]);
                i += 1;
            }
            prev = out.chars().last();
            after_as = false;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            let next = chars.get(i).copied();
            let next_significant = chars[i..].iter().copied().find(|c| !c.is_whitespace());

            let keep = after_as
                || matches!(prev, Some('.') | Some('$') | Some(':'))
                || next == Some('.')
                || next_significant == Some('(')
                || is_keyword(&token);

            if !keep {
                out.push_str(alias);
                out.push('.');
            }
            out.push_str(&token);
            after_as = token.eq_ignore_ascii_case("as");
            prev = token.chars().last();
            continue;
        }

        out.push(c);
        if !c.is_whitespace() {
            prev = Some(c);
            after_as = false;
        }
        i += 1;
    }

    out
}

/// Copy a quoted literal starting at `start`, returning the index after it.
fn copy_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' && quote != '`' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
            continue;
        }
        if c == quote {
            break;
        }
    }
    i
}

/// Split on commas that are not inside parentheses, brackets or quotes.
pub fn split_items(expression: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for c in expression.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None => {}
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                let item = current.trim();
                if !item.is_empty() {
                    items.push(item.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    let item = current.trim();
    if !item.is_empty() {
        items.push(item.to_string());
    }
    items
}

/// Split `expr AS alias` into its parts. The alias is returned verbatim.
pub fn split_alias(item: &str) -> (String, Option<String>) {
    match ALIAS_RE.captures(item) {
        Some(caps) => (caps[1].trim().to_string(), Some(caps[2].to_string())),
        None => (item.trim().to_string(), None),
    }
}
