//! # Logipard FDOM
//!
//! The compiled document model: a tree of named nodes carrying tags, text,
//! inline references and custom-tag payloads. Every fact remembers the
//! source file that asserted it, so one file's contributions can be
//! invalidated and recompiled without disturbing the rest.
//!
//! ```ignore
//! let mut fdom = Fdom::new();
//! let node = fdom.node_by_name(&["module".into(), "fn".into()]);
//! let tag = fdom.node_by_name(&["%api".into()]);
//! fdom.add_tag(node, tag, "src/module.lpinput");
//! fdom.add_content(node, "Does a thing.", "src/module.lpinput");
//! fdom.save_to_file(Path::new("fdom.json"))?;
//! ```

pub mod error;
pub mod model;
pub mod reader;
pub mod serialize;
pub mod src_ids;

pub use error::{FdomError, Result};
pub use model::{ContentItem, ContentKind, Fdom, Node, NodeId};
pub use reader::{FdomItem, ReaderContent, ReaderFdom, ReaderNode};
pub use src_ids::SrcIdTable;
