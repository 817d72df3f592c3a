//! Read-only view of a compiled model, as consumed by generators.

use crate::model::{ContentKind, Fdom, NodeId};
use logipard_types::FdomName;
use std::collections::{HashMap, HashSet};

/// Flattened content of a reader node
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderContent {
    Text(String),
    /// Marks that following content comes from this source file
    SrcFile(String),
    Ref { target: NodeId, text: String },
    CustomTag(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct ReaderNode {
    pub uid: String,
    pub id: Option<String>,
    pub parent: Option<NodeId>,
    /// Non-null members in first-use order
    pub members_in_order: Vec<NodeId>,
    pub members_by_id: HashMap<String, NodeId>,
    pub tags: Vec<NodeId>,
    pub tagged_to: Vec<NodeId>,
    pub content: Vec<ReaderContent>,
    pub is_null: bool,
}

/// Reader-optimized model produced by [`Fdom::transform_for_reader`]
#[derive(Debug, Clone)]
pub struct ReaderFdom {
    nodes: Vec<ReaderNode>,
    by_uid: HashMap<String, NodeId>,
    root: NodeId,
}

impl Fdom {
    /// Compact the model into its reader form
    ///
    /// Runs cleanup first. With `with_source_annotations`, content carries a
    /// [`ReaderContent::SrcFile`] marker wherever the source file changes.
    pub fn transform_for_reader(mut self, with_source_annotations: bool) -> ReaderFdom {
        self.cleanup_model();

        let mut nodes: Vec<ReaderNode> = self
            .nodes
            .iter()
            .map(|node| {
                let mut content = Vec::new();
                let mut current_src: Option<&str> = None;
                for item in &node.content {
                    if with_source_annotations && current_src != Some(item.src_file.as_str()) {
                        content.push(ReaderContent::SrcFile(item.src_file.clone()));
                        current_src = Some(&item.src_file);
                    }
                    content.push(match &item.kind {
                        ContentKind::Text(text) => ReaderContent::Text(text.clone()),
                        ContentKind::Ref { target, text } => ReaderContent::Ref {
                            target: *target,
                            text: text.clone(),
                        },
                        ContentKind::CustomTag(payload) => ReaderContent::CustomTag(payload.clone()),
                    });
                }
                ReaderNode {
                    uid: node.uid.clone(),
                    id: node.id.clone(),
                    parent: node.parent,
                    members_in_order: node.members_in_order.clone(),
                    members_by_id: node.members_by_id.clone(),
                    tags: node.tags.keys().copied().collect(),
                    tagged_to: Vec::new(),
                    content,
                    is_null: false,
                }
            })
            .collect();

        // back-references, computed over the whole tree before null marking
        let mut reachable = Vec::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            reachable.push(id);
            pending.extend(self.nodes[id.0].members_in_order.iter().rev().copied());
        }
        for &id in &reachable {
            for tag in nodes[id.0].tags.clone() {
                nodes[tag.0].tagged_to.push(id);
            }
        }

        let nodes_ref = &nodes;
        let ref_targets: HashSet<NodeId> = reachable
            .iter()
            .flat_map(move |id| nodes_ref[id.0].content.iter())
            .filter_map(|item| match item {
                ReaderContent::Ref { target, .. } => Some(*target),
                _ => None,
            })
            .collect();

        mark_null(&mut nodes, self.root, &ref_targets);
        nodes[self.root.0].is_null = false;

        // pruned or UID-only nodes outside the tree
        let in_tree: HashSet<NodeId> = reachable.into_iter().collect();
        for (index, node) in nodes.iter_mut().enumerate() {
            let id = NodeId(index);
            if !in_tree.contains(&id) {
                node.is_null = node.tagged_to.is_empty() && !ref_targets.contains(&id);
            }
        }

        let by_uid = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.uid.clone(), NodeId(index)))
            .collect();

        ReaderFdom {
            nodes,
            by_uid,
            root: self.root,
        }
    }
}

/// Bottom-up: a node with nothing in it and nothing pointing at it is null
fn mark_null(nodes: &mut [ReaderNode], id: NodeId, ref_targets: &HashSet<NodeId>) -> bool {
    let members = nodes[id.0].members_in_order.clone();
    let mut kept = Vec::with_capacity(members.len());
    for member in members {
        if !mark_null(nodes, member, ref_targets) {
            kept.push(member);
        }
    }

    let node = &mut nodes[id.0];
    node.members_in_order = kept;
    node.is_null = node.members_in_order.is_empty()
        && node.tags.is_empty()
        && node.tagged_to.is_empty()
        && node.content.is_empty()
        && !ref_targets.contains(&id);
    node.is_null
}

/// Handle to a node of a [`ReaderFdom`]
#[derive(Debug, Clone, Copy)]
pub struct FdomItem<'a> {
    fdom: &'a ReaderFdom,
    id: NodeId,
}

impl ReaderFdom {
    pub fn root(&self) -> FdomItem<'_> {
        self.get(self.root)
    }

    pub fn get(&self, id: NodeId) -> FdomItem<'_> {
        FdomItem { fdom: self, id }
    }

    /// Item at a `/`-separated name, null items included
    pub fn item(&self, name: &str) -> Option<FdomItem<'_>> {
        let mut current = self.root;
        for segment in FdomName::from_path(name).segments() {
            current = *self.nodes[current.0].members_by_id.get(segment)?;
        }
        Some(self.get(current))
    }

    pub fn item_by_uid(&self, uid: &str) -> Option<FdomItem<'_>> {
        self.by_uid.get(uid).map(|&id| self.get(id))
    }
}

impl<'a> FdomItem<'a> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a ReaderNode {
        &self.fdom.nodes[self.id.0]
    }

    pub fn uid(&self) -> &'a str {
        &self.node().uid
    }

    /// Short name segment, empty for the root
    pub fn short_name(&self) -> &'a str {
        self.node().id.as_deref().unwrap_or("")
    }

    pub fn name(&self) -> FdomName {
        let mut segments = Vec::new();
        let mut current = Some(*self);
        while let Some(item) = current {
            if let Some(segment) = &item.node().id {
                segments.push(segment.clone());
            }
            current = item.parent();
        }
        segments.reverse();
        FdomName(segments)
    }

    pub fn parent(&self) -> Option<FdomItem<'a>> {
        self.node().parent.map(|id| self.fdom.get(id))
    }

    pub fn is_null(&self) -> bool {
        self.node().is_null
    }

    pub fn members(&self) -> impl Iterator<Item = FdomItem<'a>> + 'a {
        let fdom = self.fdom;
        self.node().members_in_order.iter().map(move |&id| fdom.get(id))
    }

    pub fn member(&self, segment: &str) -> Option<FdomItem<'a>> {
        self.node().members_by_id.get(segment).map(|&id| self.fdom.get(id))
    }

    pub fn tags(&self) -> impl Iterator<Item = FdomItem<'a>> + 'a {
        let fdom = self.fdom;
        self.node().tags.iter().map(move |&id| fdom.get(id))
    }

    pub fn tagged_to(&self) -> impl Iterator<Item = FdomItem<'a>> + 'a {
        let fdom = self.fdom;
        self.node().tagged_to.iter().map(move |&id| fdom.get(id))
    }

    pub fn is_tagged_with(&self, tag: &FdomItem<'_>) -> bool {
        self.node().tags.contains(&tag.id)
    }

    pub fn content(&self) -> &'a [ReaderContent] {
        &self.node().content
    }

    /// Concatenated text content, refs rendered as their display text
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for item in self.content() {
            match item {
                ReaderContent::Text(value) => text.push_str(value),
                ReaderContent::Ref { text: display, .. } => text.push_str(display),
                ReaderContent::SrcFile(_) | ReaderContent::CustomTag(_) => {}
            }
        }
        text
    }
}
