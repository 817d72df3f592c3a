//! Arena-backed document model.
//!
//! Nodes live in a vector and refer to each other by [`NodeId`]. Parent links
//! are plain back-references; tags and inline references point at arbitrary
//! nodes, including detached ones that were only ever materialized by UID.

use crate::src_ids::SrcIdTable;
use indexmap::{IndexMap, IndexSet};
use logipard_types::FdomName;
use std::collections::{HashMap, HashSet};

/// Index of a node in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a content item holds
#[derive(Debug, Clone, PartialEq)]
pub enum ContentKind {
    Text(String),
    Ref { target: NodeId, text: String },
    CustomTag(serde_json::Value),
}

/// A content item with the source file that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub src_file: String,
    pub kind: ContentKind,
}

impl ContentItem {
    fn is_blank_text(&self) -> bool {
        matches!(&self.kind, ContentKind::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub uid: String,
    /// Name segment under the parent, `None` for the root and detached nodes
    pub id: Option<String>,
    pub parent: Option<NodeId>,
    pub members_in_order: Vec<NodeId>,
    pub members_by_id: HashMap<String, NodeId>,
    /// Tag node -> source files asserting it
    pub tags: IndexMap<NodeId, IndexSet<String>>,
    pub content: Vec<ContentItem>,
}

impl Node {
    fn new(uid: String, id: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            uid,
            id,
            parent,
            members_in_order: Vec::new(),
            members_by_id: HashMap::new(),
            tags: IndexMap::new(),
            content: Vec::new(),
        }
    }
}

/// The FDOM: a tree of named, taggable, content-bearing nodes
#[derive(Debug, Clone)]
pub struct Fdom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) nodes_by_uid: HashMap<String, NodeId>,
    pub(crate) nodes_refd_by_source_file: IndexMap<String, IndexSet<NodeId>>,
    pub(crate) src_ids: SrcIdTable,
    pub(crate) root: NodeId,
    uid_base: String,
    uid_counter: u64,
}

impl Default for Fdom {
    fn default() -> Self {
        Self::new()
    }
}

impl Fdom {
    /// Create an empty model with a random UID base
    pub fn new() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self::with_uid_base(&token[..12])
    }

    /// Create an empty model whose new UIDs are `<base>-<counter>`
    ///
    /// New UIDs continue past the largest `<base>-N` of a loaded model. A UID
    /// dropped before the last save can come back under the same base, so
    /// anything but reproducible test output should use [`Fdom::new`].
    pub fn with_uid_base(base: &str) -> Self {
        let mut fdom = Self {
            nodes: Vec::new(),
            nodes_by_uid: HashMap::new(),
            nodes_refd_by_source_file: IndexMap::new(),
            src_ids: SrcIdTable::new(),
            root: NodeId(0),
            uid_base: base.to_string(),
            uid_counter: 0,
        };
        fdom.clear();
        fdom
    }

    /// Reset to an empty model with a fresh root
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes_by_uid.clear();
        self.nodes_refd_by_source_file.clear();
        self.src_ids = SrcIdTable::new();
        let uid = self.new_uid();
        self.root = self.push_node(uid, None, None);
    }

    pub(crate) fn new_uid(&mut self) -> String {
        loop {
            let uid = format!("{}-{}", self.uid_base, self.uid_counter);
            self.uid_counter += 1;
            if !self.nodes_by_uid.contains_key(&uid) {
                return uid;
            }
        }
    }

    /// Move the UID counter past every loaded `<base>-N`
    pub(crate) fn skip_loaded_uids(&mut self) {
        let prefix = format!("{}-", self.uid_base);
        let next = self
            .nodes_by_uid
            .keys()
            .filter_map(|uid| uid.strip_prefix(&prefix)?.parse::<u64>().ok())
            .map(|n| n + 1)
            .max()
            .unwrap_or(0);
        self.uid_counter = self.uid_counter.max(next);
    }

    pub(crate) fn push_node(&mut self, uid: String, id: Option<String>, parent: Option<NodeId>) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        self.nodes_by_uid.insert(uid.clone(), node_id);
        self.nodes.push(Node::new(uid, id, parent));
        node_id
    }

    pub(crate) fn attach_member(&mut self, parent: NodeId, segment: &str, member: NodeId) {
        let node = &mut self.nodes[parent.0];
        node.members_by_id.insert(segment.to_string(), member);
        node.members_in_order.push(member);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Node at a name path, creating missing nodes along the way
    pub fn node_by_name(&mut self, name: &[String]) -> NodeId {
        let mut current = self.root;
        for segment in name {
            current = match self.nodes[current.0].members_by_id.get(segment) {
                Some(&member) => member,
                None => {
                    let uid = self.new_uid();
                    let member = self.push_node(uid, Some(segment.clone()), Some(current));
                    self.attach_member(current, segment, member);
                    member
                }
            };
        }
        current
    }

    /// Node at a name path, if it exists
    pub fn find_node_by_name(&self, name: &[String]) -> Option<NodeId> {
        let mut current = self.root;
        for segment in name {
            current = *self.nodes[current.0].members_by_id.get(segment)?;
        }
        Some(current)
    }

    /// Node with a UID; a missing one is created detached if requested
    pub fn node_by_uid(&mut self, uid: &str, create_if_missing: bool) -> Option<NodeId> {
        if uid.is_empty() {
            return None;
        }
        if let Some(&node) = self.nodes_by_uid.get(uid) {
            return Some(node);
        }
        if !create_if_missing {
            return None;
        }
        Some(self.push_node(uid.to_string(), None, None))
    }

    /// Full name path of a node (empty for the root and detached nodes)
    pub fn full_name(&self, node: NodeId) -> FdomName {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.0];
            if let Some(segment) = &n.id {
                segments.push(segment.clone());
            }
            current = n.parent;
        }
        segments.reverse();
        FdomName(segments)
    }

    fn mark_node_refd(&mut self, node: NodeId, src_file: &str) {
        self.src_ids.get_or_assign(src_file);
        self.nodes_refd_by_source_file
            .entry(src_file.to_string())
            .or_default()
            .insert(node);
    }

    /// Append text, merging with a trailing text item from the same file
    pub fn add_content(&mut self, node: NodeId, text: &str, src_file: &str) {
        self.mark_node_refd(node, src_file);
        let content = &mut self.nodes[node.0].content;
        if let Some(ContentItem {
            src_file: last_src,
            kind: ContentKind::Text(last),
        }) = content.last_mut()
        {
            if last_src == src_file {
                last.push_str(text);
                return;
            }
        }
        let text = if content.is_empty() { text.trim_start() } else { text };
        if !text.is_empty() {
            content.push(ContentItem {
                src_file: src_file.to_string(),
                kind: ContentKind::Text(text.to_string()),
            });
        }
    }

    pub fn add_ref(&mut self, node: NodeId, target: NodeId, text: &str, src_file: &str) {
        self.mark_node_refd(node, src_file);
        self.nodes[node.0].content.push(ContentItem {
            src_file: src_file.to_string(),
            kind: ContentKind::Ref {
                target,
                text: text.to_string(),
            },
        });
    }

    pub fn add_custom_tag(&mut self, node: NodeId, payload: serde_json::Value, src_file: &str) {
        self.mark_node_refd(node, src_file);
        self.nodes[node.0].content.push(ContentItem {
            src_file: src_file.to_string(),
            kind: ContentKind::CustomTag(payload),
        });
    }

    pub fn add_tag(&mut self, node: NodeId, tag: NodeId, src_file: &str) {
        self.mark_node_refd(node, src_file);
        self.nodes[node.0]
            .tags
            .entry(tag)
            .or_default()
            .insert(src_file.to_string());
    }

    /// Remove every tag source and content item contributed by a file
    pub fn invalidate_source_file(&mut self, src_file: &str) {
        let Some(nodes) = self.nodes_refd_by_source_file.shift_remove(src_file) else {
            return;
        };
        for node in nodes {
            let n = &mut self.nodes[node.0];
            n.tags.retain(|_, sources| {
                sources.shift_remove(src_file);
                !sources.is_empty()
            });
            n.content.retain(|item| item.src_file != src_file);
        }
    }

    /// Source files that currently have facts in the model
    pub fn source_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.nodes_refd_by_source_file.keys().cloned().collect();
        files.sort();
        files
    }

    /// Nodes that are a tag or a reference target of some node in the tree
    pub(crate) fn tagged_or_refd(&self) -> HashSet<NodeId> {
        let mut marked = HashSet::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let node = &self.nodes[id.0];
            marked.extend(node.tags.keys().copied());
            for item in &node.content {
                if let ContentKind::Ref { target, .. } = item.kind {
                    marked.insert(target);
                }
            }
            pending.extend(node.members_in_order.iter().copied());
        }
        marked
    }

    /// Prune dead nodes bottom-up
    ///
    /// A node is dead when it has no members, no tags, is not a tag or ref
    /// target, and has no content besides whitespace text.
    pub fn cleanup_model(&mut self) {
        let marked = self.tagged_or_refd();
        self.cleanup_node(self.root, &marked);
    }

    fn cleanup_node(&mut self, id: NodeId, marked: &HashSet<NodeId>) -> bool {
        let empty_content = self.nodes[id.0].content.iter().all(ContentItem::is_blank_text);
        if empty_content {
            self.nodes[id.0].content.clear();
        }

        let members = self.nodes[id.0].members_in_order.clone();
        for member in members {
            if self.cleanup_node(member, marked) {
                let node = &mut self.nodes[id.0];
                node.members_in_order.retain(|&m| m != member);
                if let Some(segment) = self.nodes[member.0].id.clone() {
                    self.nodes[id.0].members_by_id.remove(&segment);
                }
                self.nodes[member.0].parent = None;
                tracing::debug!("Pruned empty node {}", self.nodes[member.0].uid);
            }
        }

        let node = &self.nodes[id.0];
        node.members_in_order.is_empty() && node.tags.is_empty() && !marked.contains(&id) && empty_content
    }
}
