//! Name and tag grammar for directive-like tags.
//!
//! The first text run of an `LP`-style tag holds its naming part:
//!
//! ```text
//! <#LP subject/name tag1 tag2 # tag3: content#>
//! ```
//!
//! The naming part ends at the first `:`, `{` or `}` outside quotes, or spans
//! the whole run when none is present. Within it, the first word is the
//! subject name and every later word is an added tag name; a lone `#` ends
//! the subject name early (so `# tag` tags the current scope without naming
//! a subject). Names are `/`-delimited; quoted stretches (`"..."` or `'...'`)
//! may contain any delimiter and are kept verbatim.

use crate::items::{Delimiter, Item, Naming};
use once_cell::sync::Lazy;
use regex::Regex;

static NAMES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^((?:[^"':{}]|"[^"]*"?|'[^']*'?)*)([:{}]|\s*$)"#).expect("valid names regex")
});

static NAME_FIRST_IN_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^\S\n]*((?:[^\n#"':{}]|"[^"]*"?|'[^']*'?)*)"#).expect("valid pop name regex")
});

static NAME_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"#|(?:[^#"'\s]|"[^"]*"?|'[^']*'?)+"#).expect("valid name/tag regex")
});

/// Split a naming string into the subject name and added tag names (unparsed)
pub fn parse_names_tags(names: &str) -> (String, Vec<String>) {
    let mut name = String::new();
    let mut tags = Vec::new();
    let mut name_parsed = false;

    for m in NAME_TAG_REGEX.find_iter(names) {
        let word = m.as_str();
        if word == "#" {
            name_parsed = true;
        } else if name_parsed {
            tags.push(word.to_string());
        } else {
            name = word.to_string();
            name_parsed = true;
        }
    }

    (name, tags)
}

/// Parse a name string into segments
///
/// Segments are split on `/` outside quotes and trimmed; a trailing `/` adds
/// no segment. A blank string yields no segments.
pub fn parse_name(name: &str) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in name.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '/' => segments.push(std::mem::take(&mut current).trim().to_string()),
                _ => current.push(c),
            },
        }
    }

    let last = current.trim();
    if !last.is_empty() || segments.is_empty() {
        segments.push(last.to_string());
    }

    segments
}

/// Extract the naming part from the first text run of a directive-like tag
///
/// The consumed prefix is removed from the body; whatever follows the
/// delimiter stays as the first item (possibly an empty string) so the body
/// always starts with a text run afterwards.
pub fn extract_naming(items: &mut Vec<Item>) -> Naming {
    let first = match items.first() {
        Some(Item::Text(_)) => match items.remove(0) {
            Item::Text(text) => text,
            Item::Tag(_) => unreachable!("checked to be text above"),
        },
        _ => String::new(),
    };

    let mut naming = Naming::default();
    let rest = match NAMES_REGEX.captures(&first) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let mut names_unparsed = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
            let mut rest = first[whole..].to_string();
            naming.delimiter = match caps.get(2).map(|m| m.as_str()) {
                Some("{") => Delimiter::Open,
                Some("}") => Delimiter::Close,
                _ => Delimiter::None,
            };

            // `<#LP } name#>`: the pop target follows the brace on the same line
            if naming.delimiter == Delimiter::Close && names_unparsed.trim().is_empty() {
                if let Some(line_caps) = NAME_FIRST_IN_LINE_REGEX.captures(&rest) {
                    let consumed = line_caps.get(0).map(|m| m.end()).unwrap_or(0);
                    names_unparsed = line_caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
                    rest = rest[consumed..].to_string();
                }
            }

            let (subject, tags) = parse_names_tags(&names_unparsed);
            naming.subject = parse_name(&subject);
            naming.added_tags = tags.iter().map(|t| parse_name(t)).collect();
            rest
        }
        None => first,
    };

    items.insert(0, Item::Text(rest));
    naming
}
