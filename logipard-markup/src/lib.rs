//! # Logipard markup
//!
//! Turns extracted documentation input (`*.lpinput`) into a tree of text runs
//! and tag frames, ready for compilation into an FDOM.
//!
//! ```text
//! <#LP module/function %api: Does a thing. <#ref module/other#> for more.#>
//! ```
//!
//! Parsing never fails on malformed markup: stray closers, unclosed tags,
//! bad includes and the like are reported to a [`DiagnosticCollector`] and
//! recovered from. Only I/O failures on top-level inputs are errors.

pub mod error;
pub mod include;
pub mod items;
pub mod lexer;
pub mod names;
pub mod parser;

#[cfg(test)]
mod tests;

pub use error::{MarkupError, Result};
pub use include::{
    normalize_path, unify_path, InputLoader, ParsedInput, DEFAULT_LOOKUP_DIR_NAME, INCLUDE_EXT,
    INPUT_EXT,
};
pub use items::{Delimiter, Item, Naming, TagFrame};
pub use lexer::{line_col, tokenize, SpannedToken, TildeRun, Token};
pub use names::{extract_naming, parse_name, parse_names_tags};
pub use parser::parse_markup;

pub use logipard_types::DiagnosticCollector;
