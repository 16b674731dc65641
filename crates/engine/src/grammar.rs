//! Command grammar tree.
//!
//! The grammar is an arena of nodes addressed by stable [`NodeId`] indices:
//! children are held as an insertion-ordered map from literal token text to
//! node id, and `parent` is an optional id, which sidesteps the reference
//! cycle a child→parent→child pointer graph would otherwise create. The
//! tree is built once at startup and never mutated afterwards.
//!
//! Construction is two-pass: the literal skeleton (subcommand groups and
//! leaves, with flags as plain children) is laid down first, then
//! [`GrammarTree::find_all_named`] locates every occurrence of each flag —
//! the same flag recurs under multiple subcommands — and
//! [`GrammarTree::attach_value_slot`] retrofits a synthetic "any value"
//! child onto each, marking the flag node itself. This keeps a flag's
//! definition in one place instead of repeating it per subcommand.

use std::collections::HashSet;

use indexmap::IndexMap;

/// Prefix that marks a token as a named flag.
pub const FLAG_MARKER: &str = "--";

/// Token text of the synthetic value-slot child under each flag. Never
/// offered as a literal completion and never expected to match typed input.
pub const VALUE_SLOT_TOKEN: &str = "<value>";

/// Stable index of a node within its [`GrammarTree`] arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(usize);

/// A single grammar node: a literal subcommand, a flag, or a value slot.
#[derive(Clone, Debug)]
pub struct GrammarNode {
    /// Literal text this node matches; `None` only for the root.
    pub token: Option<String>,
    /// Ordered children keyed by literal token text.
    children: IndexMap<String, NodeId>,
    /// Back-reference used to pop up past a flag's value slot.
    pub parent: Option<NodeId>,
    /// The token following this node is a value, not a further literal.
    pub is_flag: bool,
    /// Synthetic placeholder for "any dynamically-supplied value".
    pub is_value_slot: bool,
}

impl GrammarNode {
    fn new(token: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            token,
            children: IndexMap::new(),
            parent,
            is_flag: false,
            is_value_slot: false,
        }
    }
}

/// Arena-backed grammar tree with a single root.
#[derive(Clone, Debug)]
pub struct GrammarTree {
    nodes: Vec<GrammarNode>,
}

impl Default for GrammarTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarTree {
    /// Tree containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![GrammarNode::new(None, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id.0]
    }

    /// Add a literal child under `parent`, or return the existing child of
    /// the same token — child keys are unique within a node.
    pub fn add_child(&mut self, parent: NodeId, token: &str) -> NodeId {
        if let Some(existing) = self.child(parent, token) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(GrammarNode::new(Some(token.to_string()), Some(parent)));
        self.nodes[parent.0].children.insert(token.to_string(), id);
        id
    }

    /// Look up a child of `id` by literal token text.
    pub fn child(&self, id: NodeId, token: &str) -> Option<NodeId> {
        self.nodes[id.0].children.get(token).copied()
    }

    /// Every node in the tree whose token equals `token`, in depth-first
    /// order. Flags recur under multiple subcommands, so this usually
    /// returns more than one node.
    pub fn find_all_named(&self, token: &str) -> Vec<NodeId> {
        let mut matches = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.token.as_deref() == Some(token) {
                matches.push(id);
            }
            for child in node.children.values().rev() {
                stack.push(*child);
            }
        }
        matches
    }

    /// Mark `flag` as a flag and give it a synthetic value-slot child.
    /// Idempotent; refuses to turn a value slot into a flag.
    pub fn attach_value_slot(&mut self, flag: NodeId) {
        if self.nodes[flag.0].is_value_slot {
            return;
        }
        self.nodes[flag.0].is_flag = true;
        if self.child(flag, VALUE_SLOT_TOKEN).is_some() {
            return;
        }
        let slot = self.add_child(flag, VALUE_SLOT_TOKEN);
        self.nodes[slot.0].is_value_slot = true;
    }

    /// Literal child tokens of `id` in insertion order, excluding value-slot
    /// placeholders.
    pub fn literal_children(&self, id: NodeId) -> Vec<String> {
        self.nodes[id.0]
            .children
            .iter()
            .filter(|(_, child)| !self.nodes[child.0].is_value_slot)
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Tokens of every flag node in the tree.
    pub fn flag_names(&self) -> HashSet<String> {
        self.nodes
            .iter()
            .filter(|node| node.is_flag)
            .filter_map(|node| node.token.clone())
            .collect()
    }
}

/// Build the console's command grammar.
///
/// Surface: `td table|fn sample|schema --coll --name` for entity
/// inspection, and `tdserver status|start|stop|delete --instance` for
/// server lifecycle.
pub fn build_grammar() -> GrammarTree {
    let mut tree = GrammarTree::new();
    let root = tree.root();

    let td = tree.add_child(root, "td");
    for group in ["table", "fn"] {
        let group_id = tree.add_child(td, group);
        for leaf in ["sample", "schema"] {
            let leaf_id = tree.add_child(group_id, leaf);
            tree.add_child(leaf_id, "--coll");
            tree.add_child(leaf_id, "--name");
        }
    }

    let tdserver = tree.add_child(root, "tdserver");
    for leaf in ["status", "start", "stop", "delete"] {
        let leaf_id = tree.add_child(tdserver, leaf);
        tree.add_child(leaf_id, "--instance");
    }

    for flag in ["--coll", "--name", "--instance"] {
        for id in tree.find_all_named(flag) {
            tree.attach_value_slot(id);
        }
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_levels_are_reachable() {
        let tree = build_grammar();
        let root = tree.root();
        assert_eq!(tree.literal_children(root), vec!["td", "tdserver"]);

        let td = tree.child(root, "td").unwrap();
        assert_eq!(tree.literal_children(td), vec!["table", "fn"]);

        let table = tree.child(td, "table").unwrap();
        assert_eq!(tree.literal_children(table), vec!["sample", "schema"]);
    }

    #[test]
    fn flags_are_retrofitted_everywhere_they_occur() {
        let tree = build_grammar();
        let colls = tree.find_all_named("--coll");
        assert_eq!(colls.len(), 4, "--coll under table/fn x sample/schema");
        for id in colls {
            let node = tree.node(id);
            assert!(node.is_flag);
            assert!(!node.is_value_slot);
            let slot = tree.child(id, VALUE_SLOT_TOKEN).unwrap();
            assert!(tree.node(slot).is_value_slot);
            assert!(!tree.node(slot).is_flag);
        }
        assert_eq!(tree.find_all_named("--instance").len(), 4);
    }

    #[test]
    fn value_slots_are_not_offered_as_literals() {
        let tree = build_grammar();
        let root = tree.root();
        let td = tree.child(root, "td").unwrap();
        let table = tree.child(td, "table").unwrap();
        let sample = tree.child(table, "sample").unwrap();
        let coll = tree.child(sample, "--coll").unwrap();
        assert!(tree.literal_children(coll).is_empty());
    }

    #[test]
    fn duplicate_children_collapse_to_one_node() {
        let mut tree = GrammarTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "a");
        let b = tree.add_child(root, "a");
        assert_eq!(a, b);
        assert_eq!(tree.literal_children(root).len(), 1);
    }

    #[test]
    fn flag_names_cover_the_whole_surface() {
        let names = build_grammar().flag_names();
        assert_eq!(
            names,
            ["--coll", "--name", "--instance"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn parents_link_back_to_the_owning_level() {
        let tree = build_grammar();
        let root = tree.root();
        let td = tree.child(root, "td").unwrap();
        assert_eq!(tree.node(td).parent, Some(root));
        let table = tree.child(td, "table").unwrap();
        let sample = tree.child(table, "sample").unwrap();
        let coll = tree.child(sample, "--coll").unwrap();
        let slot = tree.child(coll, VALUE_SLOT_TOKEN).unwrap();
        assert_eq!(tree.node(slot).parent, Some(coll));
        assert_eq!(tree.node(coll).parent, Some(sample));
    }
}
