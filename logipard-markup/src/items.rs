//! The token tree produced by the tag stream parser.

/// How a directive's name portion ends, which governs scoping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// `{`: open a scope that outlives the tag
    Open,
    /// `}`: pop the scope stack
    Close,
    /// `:` or no delimiter at all: a self-contained digression
    #[default]
    None,
}

/// Subject name, added tag names and delimiter of a directive-like tag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Naming {
    /// Parsed subject name segments, empty when no name was given
    pub subject: Vec<String>,
    /// Parsed added tag names
    pub added_tags: Vec<Vec<String>>,
    pub delimiter: Delimiter,
}

/// A tag occurrence with its nested items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFrame {
    /// Tag name as written, without the `<#` prefix
    pub tag: String,
    pub items: Vec<Item>,
    /// Present for `LP`, `LP-MACRO`, `LP-TAG-ON`, `LP-ALIAS`, `REF` and untagged frames
    pub naming: Option<Naming>,
}

impl TagFrame {
    pub fn new(tag: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            tag: tag.into(),
            items,
            naming: None,
        }
    }

    /// Upper-cased tag name, for case-insensitive directive matching
    pub fn directive(&self) -> String {
        self.tag.to_ascii_uppercase()
    }

    /// The body as a single plain string, if it is exactly that
    pub fn plain_text(&self) -> Option<&str> {
        match self.items.as_slice() {
            [Item::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// True if the body has nothing but (possibly empty) whitespace text
    pub fn is_blank(&self) -> bool {
        match self.items.as_slice() {
            [] => true,
            [Item::Text(text)] => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// One element of a token tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Text(String),
    Tag(TagFrame),
}

impl Item {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Item::Text(text) => Some(text),
            Item::Tag(_) => None,
        }
    }

    pub fn as_tag(&self) -> Option<&TagFrame> {
        match self {
            Item::Tag(frame) => Some(frame),
            Item::Text(_) => None,
        }
    }
}

/// Append text to an item list, merging with a trailing text run
pub(crate) fn push_text(items: &mut Vec<Item>, text: &str) {
    if let Some(Item::Text(last)) = items.last_mut() {
        last.push_str(text);
    } else {
        items.push(Item::Text(text.to_string()));
    }
}
