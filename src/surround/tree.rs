//! The forest: an owned snapshot of the part of a [`crate::dom::Dom`] an operation restructures.
//!
//! Every node that stands for a live node carries that node's [`NodeId`], so the restructured forest can be committed
//! back to the live tree by identity.
use crate::dom::{ElementData, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeNode {
    Text(TextNode),
    Element(ElementNode),
    Block(BlockNode),
    Formatting(FormattingNode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNode {
    pub id: NodeId,
    pub content: String,
    pub inside_range: bool,
}

/// An inline element that doesn't carry the format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementNode {
    pub id: NodeId,
    pub data: ElementData,
    /// For a childless element, whether it's selected; for any other, whether all of its children are.
    pub inside_range: bool,
    pub children: Vec<TreeNode>,
}

/// A block element. Formatting never extends across one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockNode {
    pub id: NodeId,
    pub data: ElementData,
    pub children: Vec<TreeNode>,
}

/// Content that carries the format.
///
/// In a freshly built forest, this is a matched element of the live tree. After
/// [extend-and-merge](crate::surround::extend_merge), it's one maximal run of formatted content, which becomes exactly
/// one wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattingNode {
    /// The matched live elements this content came from, outermost and earliest first.
    pub origins: Vec<Origin>,
    /// Set when the matched element stays in the tree with the format cleared from its attributes.
    pub retained: Option<Retained>,
    pub inside_range: bool,
    pub children: Vec<TreeNode>,
}

/// A matched live element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    pub id: NodeId,
    /// The element as it was before the format was cleared from it.
    pub snapshot: ElementData,
    /// Whether the element stays in the tree (with the format cleared) rather than being removed. An element that
    /// stays can't be reused as a wrapper.
    pub kept: bool,
}

/// A matched element that keeps its place in the tree once the format is cleared from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Retained {
    pub id: NodeId,
    pub data: ElementData,
}

impl TreeNode {
    pub fn inside_range(&self) -> bool {
        match self {
            TreeNode::Text(text) => text.inside_range,
            TreeNode::Element(element) => element.inside_range,
            TreeNode::Block(block) => all_inside_range(&block.children),
            TreeNode::Formatting(formatting) => formatting.inside_range,
        }
    }
}

/// Whether there's at least one node, and all of them are inside the range.
pub fn all_inside_range(nodes: &[TreeNode]) -> bool {
    !nodes.is_empty() && nodes.iter().all(TreeNode::inside_range)
}

#[cfg(test)]
pub(crate) use sketching::sketch;

#[cfg(test)]
mod sketching {
    use super::*;
    use crate::util::utils_for_test::*;

    variants_checker!(TREE_NODE_CHECKER = TreeNode {
        Text(_),
        Element(_),
        Block(_),
        Formatting(_),
    });

    /// A compact rendering of a forest, for tests.
    ///
    /// Text renders as its content, wrapped in `{...}` when it's inside the range. Elements and blocks render as HTML
    /// tags, and formatting renders as `[...]` (or `[<tag>...</tag>]` for a retained element).
    pub(crate) fn sketch(nodes: &[TreeNode]) -> String {
        let mut out = String::new();
        for node in nodes {
            sketch_node(node, &mut out);
        }
        out
    }

    fn sketch_node(node: &TreeNode, out: &mut String) {
        TREE_NODE_CHECKER.see(node);
        match node {
            TreeNode::Text(text) => {
                if text.inside_range {
                    out.push('{');
                    out.push_str(&text.content);
                    out.push('}');
                } else {
                    out.push_str(&text.content);
                }
            }
            TreeNode::Element(ElementNode { data, children, .. }) | TreeNode::Block(BlockNode { data, children, .. }) => {
                sketch_element(data, children, out)
            }
            TreeNode::Formatting(formatting) => {
                out.push('[');
                match &formatting.retained {
                    Some(retained) => sketch_element(&retained.data, &formatting.children, out),
                    None => {
                        for child in &formatting.children {
                            sketch_node(child, out);
                        }
                    }
                }
                out.push(']');
            }
        }
    }

    fn sketch_element(data: &ElementData, children: &[TreeNode], out: &mut String) {
        out.push('<');
        out.push_str(data.tag());
        out.push('>');
        for child in children {
            sketch_node(child, out);
        }
        out.push_str("</");
        out.push_str(data.tag());
        out.push('>');
    }
}
