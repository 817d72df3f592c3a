//! The name-usage tree: what each canonical name has been used for so far
//! during one compile job.

use logipard_markup::TagFrame;
use std::collections::HashMap;
use std::rc::Rc;

/// Index of a node in the name-usage tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameId(usize);

/// Usage state of a name
#[derive(Debug, Clone)]
pub enum NameKind {
    /// Materialized by a lookup, nothing else yet
    New,
    /// Appeared as a path segment or tag on the way to something else
    Referenced,
    /// Has been a current scope
    Used,
    /// Stored item list, expanded in place where the name is a subject
    Macro(Rc<TagFrame>),
    /// Redirect to another name
    Alias(NameId),
}

impl NameKind {
    pub fn label(&self) -> &'static str {
        match self {
            NameKind::New => "new",
            NameKind::Referenced => "referenced",
            NameKind::Used => "used",
            NameKind::Macro(_) => "macro",
            NameKind::Alias(_) => "alias",
        }
    }
}

#[derive(Debug)]
struct NameNode {
    kind: NameKind,
    /// Alias-resolved full name
    full_name: Vec<String>,
    members: HashMap<String, NameId>,
}

#[derive(Debug)]
pub struct NameTree {
    nodes: Vec<NameNode>,
}

impl Default for NameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![NameNode {
                kind: NameKind::Referenced,
                full_name: Vec::new(),
                members: HashMap::new(),
            }],
        }
    }

    pub fn root(&self) -> NameId {
        NameId(0)
    }

    /// Node for a canonical name, following aliases
    ///
    /// Missing nodes are created `referenced` if `reference_on_new` is set or
    /// they are intermediate, `new` otherwise. With `resolve_last_alias`
    /// unset, an alias in the last position is returned as itself.
    pub fn lookup(&mut self, name: &[String], reference_on_new: bool, resolve_last_alias: bool) -> NameId {
        let mut node = self.root();
        let last = name.len().saturating_sub(1);

        for (i, segment) in name.iter().enumerate() {
            let member = match self.nodes[node.0].members.get(segment) {
                Some(&member) => member,
                None => {
                    let mut full_name = self.nodes[node.0].full_name.clone();
                    full_name.push(segment.clone());
                    let kind = if reference_on_new || i < last {
                        NameKind::Referenced
                    } else {
                        NameKind::New
                    };
                    let member = NameId(self.nodes.len());
                    self.nodes.push(NameNode {
                        kind,
                        full_name,
                        members: HashMap::new(),
                    });
                    self.nodes[node.0].members.insert(segment.clone(), member);
                    member
                }
            };

            node = match self.nodes[member.0].kind {
                NameKind::Alias(target) if resolve_last_alias || i != last => target,
                _ => member,
            };
        }

        node
    }

    pub fn kind(&self, id: NameId) -> &NameKind {
        &self.nodes[id.0].kind
    }

    pub fn set_kind(&mut self, id: NameId, kind: NameKind) {
        self.nodes[id.0].kind = kind;
    }

    pub fn full_name(&self, id: NameId) -> &[String] {
        &self.nodes[id.0].full_name
    }

    /// Mark a node as used, unless it is a macro or alias
    pub fn mark_used(&mut self, id: NameId) {
        let node = &mut self.nodes[id.0];
        if matches!(node.kind, NameKind::New | NameKind::Referenced) {
            node.kind = NameKind::Used;
        }
    }

    pub fn macro_frame(&self, id: NameId) -> Option<Rc<TagFrame>> {
        match &self.nodes[id.0].kind {
            NameKind::Macro(frame) => Some(Rc::clone(frame)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_and_referenced() {
        let mut tree = NameTree::new();
        let c = tree.lookup(&name(&["a", "b", "c"]), false, true);
        assert_eq!(tree.kind(c).label(), "new");
        let b = tree.lookup(&name(&["a", "b"]), false, true);
        assert_eq!(tree.kind(b).label(), "referenced");

        let t = tree.lookup(&name(&["%tag"]), true, true);
        assert_eq!(tree.kind(t).label(), "referenced");

        tree.mark_used(c);
        assert_eq!(tree.kind(c).label(), "used");
        assert_eq!(tree.full_name(c), name(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn test_alias_redirects() {
        let mut tree = NameTree::new();
        let target = tree.lookup(&name(&["real", "place"]), false, true);
        let alias = tree.lookup(&name(&["short"]), false, false);
        tree.set_kind(alias, NameKind::Alias(target));

        assert_eq!(tree.lookup(&name(&["short"]), false, true), target);
        assert_eq!(tree.lookup(&name(&["short"]), false, false), alias);

        let child = tree.lookup(&name(&["short", "x"]), false, true);
        assert_eq!(tree.full_name(child), name(&["real", "place", "x"]).as_slice());
    }

    #[test]
    fn test_root_lookup() {
        let mut tree = NameTree::new();
        assert_eq!(tree.lookup(&[], false, true), tree.root());
        assert!(tree.full_name(tree.root()).is_empty());
    }
}
