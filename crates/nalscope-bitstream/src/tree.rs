//! Annotated syntax tree
//!
//! Nodes live in an arena owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. Children are kept in read order. The root (id 0) is created
//! with the tree and is never removed.

use std::fmt::Write as _;

/// Handle of a node inside a [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One decoded symbol (or a grouping node)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Symbol name
    pub name: String,
    /// Decoded value as text
    pub value: String,
    /// Coding descriptor, e.g. `ue(v) -> u(5)`
    pub coding: String,
    /// Raw bits consumed for this symbol
    pub code: String,
    /// Semantic meaning of the value
    pub meaning: String,
    /// Set when the symbol failed validation or could not be read
    pub error: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SyntaxNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn symbol(
        name: impl Into<String>,
        value: impl Into<String>,
        coding: impl Into<String>,
        code: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            coding: coding.into(),
            code: code.into(),
            meaning: meaning.into(),
            ..Default::default()
        }
    }

    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed tree of decoded symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new("root")
    }
}

impl SyntaxTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SyntaxNode::group(root_name)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Append `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.add_child(parent, SyntaxNode::group(name))
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First child of `parent` with the given name
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    /// Depth-first search for the first node with the given name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.node(id).name == name)
    }

    /// All nodes below `id` in depth-first read order (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(|node| node.error)
    }

    /// Drop everything except the root
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
    }

    /// Indented text rendering, one line per node
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let _ = write!(out, "{:indent$}{}", "", node.name, indent = depth * 2);
        if !node.value.is_empty() {
            let _ = write!(out, " = {}", node.value);
        }
        if !node.coding.is_empty() {
            let _ = write!(out, " [{}]", node.coding);
        }
        if !node.code.is_empty() {
            let _ = write!(out, " {}", node.code);
        }
        if !node.meaning.is_empty() {
            let _ = write!(out, " ({})", node.meaning);
        }
        if node.error {
            out.push_str(" !");
        }
        out.push('\n');

        for &child in self.children(id) {
            self.render_node(child, depth + 1, out);
        }
    }
}

#[cfg(feature = "serialize")]
mod serialize {
    use super::{NodeId, SyntaxTree};
    use serde::ser::{Serialize, SerializeStruct, Serializer};

    struct NodeView<'a> {
        tree: &'a SyntaxTree,
        id: NodeId,
    }

    struct ChildrenView<'a> {
        tree: &'a SyntaxTree,
        id: NodeId,
    }

    impl Serialize for NodeView<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let node = self.tree.node(self.id);
            let mut state = serializer.serialize_struct("SyntaxNode", 7)?;
            state.serialize_field("name", &node.name)?;
            state.serialize_field("value", &node.value)?;
            state.serialize_field("coding", &node.coding)?;
            state.serialize_field("code", &node.code)?;
            state.serialize_field("meaning", &node.meaning)?;
            state.serialize_field("error", &node.error)?;
            state.serialize_field(
                "children",
                &ChildrenView {
                    tree: self.tree,
                    id: self.id,
                },
            )?;
            state.end()
        }
    }

    impl Serialize for ChildrenView<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.tree.children(self.id).iter().map(|&id| NodeView {
                tree: self.tree,
                id,
            }))
        }
    }

    impl Serialize for SyntaxTree {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            NodeView {
                tree: self,
                id: self.root(),
            }
            .serialize(serializer)
        }
    }
}
