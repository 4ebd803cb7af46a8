use crate::dom::{Dom, NodeId};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A boundary point: a position between two chars of a text node, or between two children of an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub node: NodeId,
    /// Chars within a text node, or child index within an element.
    pub offset: usize,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point just before `node`, within its parent.
    pub fn before(dom: &Dom, node: NodeId) -> Result<Self, InvalidRange> {
        let parent = dom.parent(node).ok_or(InvalidRange::NoParent(node))?;
        let idx = dom.index_in_parent(node).ok_or(InvalidRange::NoParent(node))?;
        Ok(Self::new(parent, idx))
    }

    /// The point just after `node`, within its parent.
    pub fn after(dom: &Dom, node: NodeId) -> Result<Self, InvalidRange> {
        let Self { node: parent, offset } = Self::before(dom, node)?;
        Ok(Self::new(parent, offset + 1))
    }
}

/// A selection between two boundary points, in the manner of a DOM `Range`.
///
/// The start is inclusive and the end is exclusive. A range whose start and end are equal is collapsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

/// Why a [`Range`] can't be used.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidRange {
    /// The node has been freed.
    NotLive(NodeId),
    /// The node isn't within the root the operation was given.
    OutsideRoot(NodeId),
    OffsetOutOfBounds { node: NodeId, offset: usize, length: usize },
    /// The start is after the end.
    Backwards,
    /// A point was requested before or after a node that has no parent.
    NoParent(NodeId),
    /// The root is a text node. Formatting it would mean restructuring its parent, which is outside the root.
    TextRoot(NodeId),
}

impl Display for InvalidRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidRange::NotLive(node) => write!(f, "node {node} is no longer in the document"),
            InvalidRange::OutsideRoot(node) => write!(f, "node {node} is outside of the root"),
            InvalidRange::OffsetOutOfBounds { node, offset, length } => {
                write!(f, "offset {offset} is out of bounds for node {node} (length {length})")
            }
            InvalidRange::Backwards => f.write_str("range starts after it ends"),
            InvalidRange::NoParent(node) => write!(f, "node {node} has no parent"),
            InvalidRange::TextRoot(node) => write!(f, "root {node} is a text node"),
        }
    }
}

impl std::error::Error for InvalidRange {}

impl Range {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// A range that selects the node itself, from just before it to just after it.
    pub fn select_node(dom: &Dom, node: NodeId) -> Result<Self, InvalidRange> {
        Ok(Self::new(Point::before(dom, node)?, Point::after(dom, node)?))
    }

    /// A range that selects everything within the node (all of a text node's chars, or all of an element's
    /// children).
    pub fn select_node_contents(dom: &Dom, node: NodeId) -> Self {
        Self::new(Point::new(node, 0), Point::new(node, dom.node_length(node)))
    }

    pub fn set_start_before(&mut self, dom: &Dom, node: NodeId) -> Result<(), InvalidRange> {
        self.start = Point::before(dom, node)?;
        Ok(())
    }

    pub fn set_start_after(&mut self, dom: &Dom, node: NodeId) -> Result<(), InvalidRange> {
        self.start = Point::after(dom, node)?;
        Ok(())
    }

    pub fn set_end_before(&mut self, dom: &Dom, node: NodeId) -> Result<(), InvalidRange> {
        self.end = Point::before(dom, node)?;
        Ok(())
    }

    pub fn set_end_after(&mut self, dom: &Dom, node: NodeId) -> Result<(), InvalidRange> {
        self.end = Point::after(dom, node)?;
        Ok(())
    }

    /// Checks that both points are live, within `root`, and in bounds, and that the start isn't after the end.
    pub fn validate(&self, dom: &Dom, root: NodeId) -> Result<(), InvalidRange> {
        for point in [self.start, self.end] {
            if !dom.is_live(point.node) {
                return Err(InvalidRange::NotLive(point.node));
            }
            if !dom.is_inclusive_ancestor(root, point.node) {
                return Err(InvalidRange::OutsideRoot(point.node));
            }
            let length = dom.node_length(point.node);
            if point.offset > length {
                return Err(InvalidRange::OffsetOutOfBounds {
                    node: point.node,
                    offset: point.offset,
                    length,
                });
            }
        }
        if compare_points(dom, self.start, self.end) == Ordering::Greater {
            return Err(InvalidRange::Backwards);
        }
        Ok(())
    }

    /// The selected text, like the DOM's `Range.toString()`.
    pub fn text(&self, dom: &Dom) -> String {
        let Some(ancestor) = dom.lowest_common_ancestor(self.start.node, self.end.node) else {
            return String::new();
        };
        let mut out = String::new();
        for node in dom.descendants(ancestor) {
            let Some(content) = dom.text(node) else {
                continue;
            };
            let node_start = Point::new(node, 0);
            let node_end = Point::new(node, content.chars().count());
            let from = if compare_points(dom, self.start, node_start) == Ordering::Greater {
                self.start
            } else {
                node_start
            };
            let to = if compare_points(dom, self.end, node_end) == Ordering::Less {
                self.end
            } else {
                node_end
            };
            if from.node != node || to.node != node || from.offset >= to.offset {
                continue;
            }
            out.extend(content.chars().skip(from.offset).take(to.offset - from.offset));
        }
        out
    }
}

/// Compares two points in document order.
///
/// The points must be in the same tree. A point within an element that sits right before a child is ordered
/// before any point within that child.
pub fn compare_points(dom: &Dom, a: Point, b: Point) -> Ordering {
    point_key(dom, a).cmp(&point_key(dom, b))
}

/// The chain of child indexes from the top of the point's tree, followed by the point's offset. Lexicographic
/// ordering of these keys is document order.
fn point_key(dom: &Dom, point: Point) -> Vec<usize> {
    let mut key = vec![point.offset];
    let mut current = point.node;
    while let Some(idx) = dom.index_in_parent(current) {
        key.push(idx);
        // index_in_parent being Some means there's a parent
        match dom.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    key.reverse();
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    fn fixture() -> Dom {
        unwrap!(parse_fragment("11<b>22<i>33</i></b>44"), Ok(dom));
        dom
    }

    #[test]
    fn compare_same_node() {
        let dom = fixture();
        let text = dom.children(dom.root())[0];
        assert_eq!(compare_points(&dom, Point::new(text, 0), Point::new(text, 1)), Ordering::Less);
        assert_eq!(compare_points(&dom, Point::new(text, 1), Point::new(text, 1)), Ordering::Equal);
    }

    #[test]
    fn compare_ancestor_and_descendant() {
        let dom = fixture();
        let root = dom.root();
        let bold = dom.children(root)[1];
        let inner = dom.children(bold)[0];
        // (root, 1) is just before <b>, so before anything inside it
        assert_eq!(compare_points(&dom, Point::new(root, 1), Point::new(inner, 0)), Ordering::Less);
        // (root, 2) is just after <b>
        assert_eq!(compare_points(&dom, Point::new(root, 2), Point::new(inner, 2)), Ordering::Greater);
        assert_eq!(compare_points(&dom, Point::new(inner, 2), Point::new(root, 2)), Ordering::Less);
    }

    #[test]
    fn compare_siblings() {
        let dom = fixture();
        let children = dom.children(dom.root());
        assert_eq!(
            compare_points(&dom, Point::new(children[2], 0), Point::new(children[0], 2)),
            Ordering::Greater
        );
    }

    #[test]
    fn select_node() {
        let dom = fixture();
        let bold = dom.children(dom.root())[1];
        unwrap!(Range::select_node(&dom, bold), Ok(range));
        assert_eq!(range.start, Point::new(dom.root(), 1));
        assert_eq!(range.end, Point::new(dom.root(), 2));
        assert_eq!(range.text(&dom), "2233");
    }

    #[test]
    fn select_root_fails() {
        let dom = fixture();
        assert_eq!(
            Range::select_node(&dom, dom.root()),
            Err(InvalidRange::NoParent(dom.root()))
        );
    }

    #[test]
    fn partial_text() {
        let dom = fixture();
        let root = dom.root();
        let first = dom.children(root)[0];
        let last = dom.children(root)[2];
        let range = Range::new(Point::new(first, 1), Point::new(last, 1));
        assert_eq!(range.text(&dom), "122334");
        let range = Range::new(Point::new(first, 1), Point::new(first, 2));
        assert_eq!(range.text(&dom), "1");
    }

    #[test]
    fn setters() {
        let dom = fixture();
        let root = dom.root();
        let children = dom.children(root).to_vec();
        let mut range = Range::collapsed(Point::new(root, 0));
        unwrap!(range.set_start_after(&dom, children[0]), Ok(()));
        unwrap!(range.set_end_before(&dom, children[2]), Ok(()));
        assert_eq!(range, Range::new(Point::new(root, 1), Point::new(root, 2)));
        unwrap!(range.set_start_before(&dom, children[0]), Ok(()));
        unwrap!(range.set_end_after(&dom, children[2]), Ok(()));
        assert_eq!(range.text(&dom), "11223344");
    }

    #[test]
    fn validate() {
        let mut dom = fixture();
        let root = dom.root();
        let bold = dom.children(root)[1];
        let first = dom.children(root)[0];

        assert_eq!(Range::select_node_contents(&dom, root).validate(&dom, root), Ok(()));
        assert_eq!(
            Range::new(Point::new(first, 3), Point::new(first, 3)).validate(&dom, root),
            Err(InvalidRange::OffsetOutOfBounds {
                node: first,
                offset: 3,
                length: 2
            })
        );
        assert_eq!(
            Range::new(Point::new(root, 2), Point::new(root, 1)).validate(&dom, root),
            Err(InvalidRange::Backwards)
        );
        assert_eq!(
            Range::select_node_contents(&dom, root).validate(&dom, bold),
            Err(InvalidRange::OutsideRoot(root))
        );
        dom.free_subtree(first);
        assert_eq!(
            Range::new(Point::new(first, 0), Point::new(root, 1)).validate(&dom, root),
            Err(InvalidRange::NotLive(first))
        );
    }

    use crate::util::utils_for_test::*;
}
