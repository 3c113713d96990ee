//! Defines the contract for a navigable, read-only node tree.

use std::hash::Hash;

use crate::types::AtomicValue;

/// A node name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

/// The kind of a node, aligned with the XDM node taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The universal contract for a node in a read-only, hierarchical tree.
///
/// The parser and evaluator are written exclusively against this trait, so
/// any document representation (XML DOM, JSON VDOM, UI trees) that
/// implements it can be queried.
///
/// `'a` is the lifetime of the underlying document storage.
pub trait XdmNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    /// The kind of the node (Element, Text, Attribute, etc.).
    fn node_kind(&self) -> NodeKind;

    /// The name of the node. Returns `None` for unnamed kinds such as text
    /// or root nodes. For a processing-instruction, this is its target.
    fn name(&self) -> Option<NodeName<'a>>;

    /// The string value of the node.
    /// - For a text node, this is its content.
    /// - For an element, the concatenation of the string values of all its
    ///   descendant text nodes in document order.
    /// - For an attribute, its value.
    /// - For a comment or processing instruction, its content.
    fn string_value(&self) -> String;

    /// An iterator over the attribute nodes of this node.
    /// Empty for non-element nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// An iterator over the child nodes of this node.
    /// Empty for leaf nodes (text, attributes).
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. `None` for the root or detached attributes.
    fn parent(&self) -> Option<Self>;

    /// The pre-computed typed value of a schema-validated node, if the
    /// backing representation carries one. Untyped trees return `None` and
    /// atomization falls back to the string value.
    fn typed_value(&self) -> Option<AtomicValue> {
        None
    }

    /// The declared atomic type name of a validated node, if any. Used by
    /// atomization when no pre-computed typed value exists.
    fn type_name(&self) -> Option<&'a str> {
        None
    }
}

// Test utilities - publicly available for integration testing in
// downstream crates.
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData<'a> {
        kind: NodeKind,
        name: Option<NodeName<'a>>,
        value: String,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    #[derive(Debug, Default)]
    pub struct MockTree<'a> {
        nodes: HashMap<usize, MockNodeData<'a>>,
        parent_map: HashMap<usize, usize>,
    }

    /// A simple in-memory node that holds a reference to its tree so it can
    /// navigate itself.
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree<'a>,
    }

    impl<'a> PartialEq for MockNode<'a> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl<'a> Eq for MockNode<'a> {}

    impl<'a> PartialOrd for MockNode<'a> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl<'a> Ord for MockNode<'a> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl<'a> Hash for MockNode<'a> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> XdmNode<'a> for MockNode<'a> {
        fn node_kind(&self) -> NodeKind {
            self.tree.nodes[&self.id].kind
        }

        fn name(&self) -> Option<NodeName<'a>> {
            self.tree.nodes[&self.id].name
        }

        fn string_value(&self) -> String {
            let data = &self.tree.nodes[&self.id];
            match data.kind {
                NodeKind::Element | NodeKind::Root => {
                    let mut out = String::new();
                    collect_text(self.tree, self.id, &mut out);
                    out
                }
                _ => data.value.clone(),
            }
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[&self.id].attributes.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[&self.id].children.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn parent(&self) -> Option<Self> {
            self.tree.parent_map.get(&self.id).map(|&pid| MockNode {
                id: pid,
                tree: self.tree,
            })
        }
    }

    fn collect_text(tree: &MockTree<'_>, id: usize, out: &mut String) {
        let data = &tree.nodes[&id];
        match data.kind {
            NodeKind::Text => out.push_str(&data.value),
            NodeKind::Element | NodeKind::Root => {
                for &child in &data.children {
                    collect_text(tree, child, out);
                }
            }
            _ => {}
        }
    }

    impl<'a> MockTree<'a> {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_node(
            &mut self,
            id: usize,
            kind: NodeKind,
            name: Option<NodeName<'a>>,
            value: &str,
        ) {
            self.nodes.insert(
                id,
                MockNodeData {
                    kind,
                    name,
                    value: value.to_string(),
                    children: Vec::new(),
                    attributes: Vec::new(),
                },
            );
        }

        pub fn add_child(&mut self, parent: usize, child: usize) {
            self.nodes.get_mut(&parent).map(|n| n.children.push(child));
            self.parent_map.insert(child, parent);
        }

        pub fn add_attribute(&mut self, element: usize, attribute: usize) {
            self.nodes
                .get_mut(&element)
                .map(|n| n.attributes.push(attribute));
            self.parent_map.insert(attribute, element);
        }

        pub fn node(&'a self, id: usize) -> MockNode<'a> {
            MockNode { id, tree: self }
        }
    }

    /// Builds a small document for tests:
    ///
    /// ```text
    /// <root>                      <!-- id 0 -->
    ///   <item kind="a">one</item> <!-- ids 1, 10 (attr), 2 (text) -->
    ///   <item kind="b">two</item> <!-- ids 3, 11 (attr), 4 (text) -->
    ///   <empty/>                  <!-- id 5 -->
    ///   <wrap><inner/></wrap>     <!-- ids 6, 7 -->
    /// </root>
    /// ```
    pub fn sample_tree() -> MockTree<'static> {
        let mut tree = MockTree::new();
        let el = |local| {
            Some(NodeName {
                prefix: None,
                local_part: local,
            })
        };
        tree.add_node(0, NodeKind::Root, None, "");
        tree.add_node(1, NodeKind::Element, el("item"), "");
        tree.add_node(2, NodeKind::Text, None, "one");
        tree.add_node(3, NodeKind::Element, el("item"), "");
        tree.add_node(4, NodeKind::Text, None, "two");
        tree.add_node(5, NodeKind::Element, el("empty"), "");
        tree.add_node(6, NodeKind::Element, el("wrap"), "");
        tree.add_node(7, NodeKind::Element, el("inner"), "");
        tree.add_node(10, NodeKind::Attribute, el("kind"), "a");
        tree.add_node(11, NodeKind::Attribute, el("kind"), "b");
        tree.add_child(0, 1);
        tree.add_child(0, 3);
        tree.add_child(0, 5);
        tree.add_child(0, 6);
        tree.add_child(1, 2);
        tree.add_child(3, 4);
        tree.add_child(6, 7);
        tree.add_attribute(1, 10);
        tree.add_attribute(3, 11);
        tree
    }
}
