//! JSON persistence of the model.
//!
//! ```json
//! {
//!   "rootNode": {
//!     "uid": "...",
//!     "members": { "segment": { ... } },
//!     "membersInOrder": ["segment"],
//!     "tags": { "tagUid": ["s0"] },
//!     "content": [{ "srcFile": "s0", "value": "text" }]
//!   },
//!   "srcFiles": { "file.lpinput": "s0" }
//! }
//! ```

use crate::error::{FdomError, Result};
use crate::model::{ContentKind, Fdom, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerializedModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_node: Option<SerializedNode>,
    #[serde(default)]
    src_files: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerializedNode {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    members: BTreeMap<String, SerializedNode>,
    #[serde(default)]
    members_in_order: Vec<String>,
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    content: Vec<SerializedContent>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerializedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    src_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    ref_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_tag: Option<serde_json::Value>,
}

const UNKNOWN_SOURCE: &str = "unknown";

impl Fdom {
    /// Serialize the model to pretty JSON
    ///
    /// Only source ids still in use are written; ids are never renumbered.
    pub fn to_json_string(&self) -> Result<String> {
        let mut in_progress = HashSet::new();
        let mut used_sources = BTreeSet::new();
        let root = self.serialize_node(self.root, &mut in_progress, &mut used_sources);

        let src_files = self
            .src_ids
            .iter()
            .filter(|(name, _)| used_sources.contains(*name))
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect();

        let model = SerializedModel {
            root_node: Some(root),
            src_files,
        };
        Ok(serde_json::to_string_pretty(&model)?)
    }

    fn serialize_node(
        &self,
        id: NodeId,
        in_progress: &mut HashSet<NodeId>,
        used_sources: &mut BTreeSet<String>,
    ) -> SerializedNode {
        let node = self.node(id);
        let mut out = SerializedNode {
            uid: Some(node.uid.clone()),
            ..Default::default()
        };
        if !in_progress.insert(id) {
            tracing::warn!(
                "Recursive serialization of node {} ({}), truncated",
                node.uid,
                node.id.as_deref().unwrap_or("")
            );
            return out;
        }

        for &member in &node.members_in_order {
            let Some(segment) = self.node(member).id.clone() else {
                continue;
            };
            let sub = self.serialize_node(member, in_progress, used_sources);
            out.members.insert(segment.clone(), sub);
            out.members_in_order.push(segment);
        }

        for item in &node.content {
            used_sources.insert(item.src_file.clone());
            let mut piece = SerializedContent {
                src_file: self.src_ids.id_of(&item.src_file).map(str::to_string),
                ..Default::default()
            };
            match &item.kind {
                ContentKind::Text(value) => piece.value = Some(value.clone()),
                ContentKind::Ref { target, text } => {
                    piece.ref_uid = Some(self.node(*target).uid.clone());
                    piece.text = Some(text.clone());
                }
                ContentKind::CustomTag(payload) => piece.custom_tag = Some(payload.clone()),
            }
            out.content.push(piece);
        }

        for (tag, sources) in &node.tags {
            let ids = sources
                .iter()
                .map(|src| {
                    used_sources.insert(src.clone());
                    self.src_ids.id_of(src).unwrap_or(UNKNOWN_SOURCE).to_string()
                })
                .collect();
            out.tags.insert(self.node(*tag).uid.clone(), ids);
        }

        in_progress.remove(&id);
        out
    }

    /// Write the model to a file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| FdomError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| FdomError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Saved model to {:?}", path);
        Ok(())
    }

    /// Replace the model with one loaded from a file
    ///
    /// With `no_file_means_empty`, a missing file yields an empty model.
    pub fn load_from_file(&mut self, path: &Path, no_file_means_empty: bool) -> Result<()> {
        match fs::read_to_string(path) {
            Ok(json) => self.load_from_str(&json),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && no_file_means_empty => {
                tracing::debug!("No model file at {:?}, starting empty", path);
                self.clear();
                Ok(())
            }
            Err(source) => Err(FdomError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Replace the model with one parsed from JSON
    pub fn load_from_str(&mut self, json: &str) -> Result<()> {
        let model: SerializedModel = serde_json::from_str(json)?;
        self.clear();

        for (name, id) in &model.src_files {
            self.src_ids.put(name, id);
        }

        let Some(root) = &model.root_node else {
            return Ok(());
        };

        // structure first, so tags and refs to any tree node find it by UID
        if let Some(uid) = root.uid.as_deref().filter(|uid| !uid.is_empty()) {
            let old_root = self.root;
            self.nodes_by_uid.remove(&self.nodes[old_root.0].uid);
            self.nodes[old_root.0].uid = uid.to_string();
            self.nodes_by_uid.insert(uid.to_string(), old_root);
        }
        let mut order = vec![(self.root, root)];
        self.scan_structure(self.root, root, &mut order);

        for (id, src_node) in order {
            self.read_facts(id, src_node);
        }
        self.skip_loaded_uids();
        Ok(())
    }

    fn scan_structure<'a>(
        &mut self,
        parent: NodeId,
        src_node: &'a SerializedNode,
        order: &mut Vec<(NodeId, &'a SerializedNode)>,
    ) {
        for segment in &src_node.members_in_order {
            let Some(sub) = src_node.members.get(segment) else {
                continue;
            };
            if self.node(parent).members_by_id.contains_key(segment) {
                continue;
            }
            let uid = match sub.uid.as_deref().filter(|uid| !uid.is_empty()) {
                Some(uid) => {
                    if self.nodes_by_uid.contains_key(uid) {
                        tracing::warn!("UID {} already occupied, ignoring this node", uid);
                        continue;
                    }
                    uid.to_string()
                }
                None => self.new_uid(),
            };
            let member = self.push_node(uid, Some(segment.clone()), Some(parent));
            self.attach_member(parent, segment, member);
            order.push((member, sub));
            self.scan_structure(member, sub, order);
        }
    }

    fn read_facts(&mut self, id: NodeId, src_node: &SerializedNode) {
        for (tag_uid, src_ids) in &src_node.tags {
            let Some(tag) = self.node_by_uid(tag_uid, true) else {
                continue;
            };
            for src_id in src_ids {
                let src = self.source_name(Some(src_id));
                self.add_tag(id, tag, &src);
            }
        }

        for piece in &src_node.content {
            let src = self.source_name(piece.src_file.as_deref());
            if let Some(ref_uid) = &piece.ref_uid {
                match self.node_by_uid(ref_uid, true) {
                    Some(target) => {
                        let text = piece.text.clone().unwrap_or_default();
                        self.add_ref(id, target, &text, &src);
                    }
                    None => tracing::warn!("Reference with an empty target UID ignored"),
                }
            } else if let Some(payload) = &piece.custom_tag {
                self.add_custom_tag(id, payload.clone(), &src);
            } else {
                self.add_content(id, piece.value.as_deref().unwrap_or(""), &src);
            }
        }
    }

    fn source_name(&self, src_id: Option<&str>) -> String {
        src_id
            .and_then(|id| self.src_ids.name_of(id))
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string()
    }
}
