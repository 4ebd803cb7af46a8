use std::fmt::{Display, Formatter};

/// Opaque identity token for a node in a [`Dom`].
///
/// Ids are stable for the lifetime of the node: restructuring the tree (moving a node under a new parent, wrapping
/// it, unwrapping its parent) never changes a node's id. An id only becomes invalid once its node is freed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element's tag and attributes, without its children.
///
/// Tags are stored ASCII-lowercased. Attribute order is preserved, and attribute names are compared
/// case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        let mut tag = tag.into();
        tag.make_ascii_lowercase();
        Self {
            tag,
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing the value in place if it already exists (so that ordering is stable).
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, existing_value)) => *existing_value = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self
            .attributes
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(idx).1)
    }

    /// The `style` attribute, split into `(property, value)` declarations.
    ///
    /// Properties are lowercased and both halves are trimmed. Malformed declarations (without a `:`) are dropped.
    pub fn style_declarations(&self) -> Vec<(String, String)> {
        let Some(style) = self.attr("style") else {
            return Vec::new();
        };
        style
            .split(';')
            .filter_map(|decl| {
                let (property, value) = decl.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                if property.is_empty() {
                    return None;
                }
                Some((property, value.trim().to_string()))
            })
            .collect()
    }

    /// Replaces the `style` attribute with the given declarations. An empty list removes the attribute entirely.
    pub fn set_style_declarations(&mut self, declarations: &[(String, String)]) {
        if declarations.is_empty() {
            self.remove_attr("style");
            return;
        }
        let style = declarations
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr("style", style);
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    Text(String),
    Element { data: ElementData, children: Vec<NodeId> },
}

#[derive(Clone, Debug)]
struct Slot {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// A live, mutable document tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Each node stores its parent link, and elements store
/// their ordered children. Every `Dom` starts out with a single `body` element as its [root](Dom::root); other
/// nodes are created detached and then attached with [`Dom::append_child`] or [`Dom::insert_child`].
///
/// Accessors panic when given the id of a freed node; use [`Dom::is_live`] to check first when an id comes from an
/// untrusted source.
///
/// Freed slots are never reused, so a stale id (say, in a [`Range`](crate::location::Range) kept from before an
/// edit) stays dead instead of silently pointing at some newer node. The arena only grows; reparse the fragment to
/// compact a long-lived, heavily edited `Dom`.
#[derive(Clone, Debug)]
pub struct Dom {
    slots: Vec<Option<Slot>>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            slots: Vec::with_capacity(16), // arbitrary guess
            root: NodeId(0),
        };
        dom.root = dom.create_element(ElementData::new("body"));
        dom
    }

    /// The `body` element every document starts with.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(content.into()))
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.alloc(NodeKind::Element {
            data,
            children: Vec::new(),
        })
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(Slot { parent: None, kind }));
        id
    }

    fn slot(&self, id: NodeId) -> &Slot {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("node {id} is not live"))
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("node {id} is not live"))
    }

    fn children_vec_mut(&mut self, id: NodeId) -> &mut Vec<NodeId> {
        match &mut self.slot_mut(id).kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) => panic!("text node {id} can't have children"),
        }
    }

    /// Whether the id refers to a node that hasn't been freed.
    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Some(_)))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    /// The node's children. Text nodes have none.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.slot(id).kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Text(_))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).kind {
            NodeKind::Text(content) => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.slot(id).kind {
            NodeKind::Element { data, .. } => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.slot_mut(id).kind {
            NodeKind::Element { data, .. } => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    /// The DOM "length" of a node: the number of chars in a text node, or the number of children of an element.
    ///
    /// This is the largest valid offset of a boundary point within the node.
    pub fn node_length(&self, id: NodeId) -> usize {
        match &self.slot(id).kind {
            NodeKind::Text(content) => content.chars().count(),
            NodeKind::Element { children, .. } => children.len(),
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        idx.checked_sub(1).map(|prev| self.children(parent)[prev])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    /// Iterates from the node's parent up to the top of its tree.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// The deepest node that is an inclusive ancestor of both `a` and `b`, if they share a tree.
    pub fn lowest_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| self.is_inclusive_ancestor(candidate, b))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.push_text_content(id, &mut out);
        out
    }

    fn push_text_content(&self, id: NodeId, out: &mut String) {
        match &self.slot(id).kind {
            NodeKind::Text(content) => out.push_str(content),
            NodeKind::Element { children, .. } => {
                for &child in children {
                    self.push_text_content(child, out);
                }
            }
        }
    }

    /// Appends `child` as the last child of `parent`, detaching it from its current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Inserts `child` at `index` within `parent`'s children, detaching it from its current parent first.
    ///
    /// If `child` was already a child of `parent` at a lower index, `index` refers to the position after it was
    /// removed.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        assert!(
            !self.is_inclusive_ancestor(child, parent),
            "inserting {child} under {parent} would create a cycle"
        );
        self.detach(child);
        let children = self.children_vec_mut(parent);
        let index = index.min(children.len());
        children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);
    }

    /// Replaces all of `parent`'s children.
    ///
    /// Former children that aren't in `new_children` are left detached (but not freed). Each new child is detached
    /// from wherever it was before.
    pub fn replace_children(&mut self, parent: NodeId, new_children: Vec<NodeId>) {
        let old_children = std::mem::take(self.children_vec_mut(parent));
        for old in old_children {
            self.slot_mut(old).parent = None;
        }
        for &child in &new_children {
            assert!(
                !self.is_inclusive_ancestor(child, parent),
                "inserting {child} under {parent} would create a cycle"
            );
            self.detach(child);
            self.slot_mut(child).parent = Some(parent);
        }
        *self.children_vec_mut(parent) = new_children;
    }

    /// Removes the node from its parent. It stays live, and can be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.slot(id).parent else {
            return;
        };
        self.children_vec_mut(parent).retain(|&child| child != id);
        self.slot_mut(id).parent = None;
    }

    /// Detaches the node and frees it along with its entire subtree. Their ids become invalid.
    pub fn free_subtree(&mut self, id: NodeId) {
        self.detach(id);
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(slot) = self.slots[current.0 as usize].take() {
                if let NodeKind::Element { children, .. } = slot.kind {
                    pending.extend(children);
                }
            }
        }
    }

    /// Splits a text node at a char offset.
    ///
    /// The original node keeps the chars before `offset`; a new text node holding the rest is inserted right after
    /// it (if the original node has a parent), and returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId {
        let NodeKind::Text(content) = &mut self.slot_mut(id).kind else {
            panic!("node {id} is not a text node");
        };
        let byte_offset = content
            .char_indices()
            .nth(offset)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(content.len());
        let tail = content.split_off(byte_offset);
        let new_id = self.create_text(tail);
        if let (Some(parent), Some(idx)) = (self.parent(id), self.index_in_parent(id)) {
            self.insert_child(parent, idx + 1, new_id);
        }
        new_id
    }

    /// Appends the content of text node `tail` to text node `head`, and frees `tail`. This undoes a
    /// [`Dom::split_text`].
    pub fn join_text(&mut self, head: NodeId, tail: NodeId) {
        let Some(tail_content) = self.text(tail).map(str::to_string) else {
            return;
        };
        if let NodeKind::Text(content) = &mut self.slot_mut(head).kind {
            content.push_str(&tail_content);
            self.free_subtree(tail);
        }
    }

    /// All nodes within `scope`, in document (pre-)order. `scope` itself is included.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![scope];
        while let Some(current) = pending.pop() {
            out.push(current);
            pending.extend(self.children(current).iter().rev());
        }
        out
    }

    /// The leaves within `scope` (text nodes and childless elements), in document order.
    ///
    /// `scope` itself is never counted as a leaf.
    pub fn leaves(&self, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .skip(1)
            .filter(|&id| self.children(id).is_empty())
            .collect()
    }

    /// The first leaf of `id`'s subtree in document order (`id` itself, if it has no children).
    pub fn first_leaf_in(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(&first) = self.children(current).first() {
            current = first;
        }
        current
    }

    /// The first leaf that follows `id`'s entire subtree, without leaving `scope`.
    pub fn next_leaf_after(&self, id: NodeId, scope: NodeId) -> Option<NodeId> {
        let mut current = id;
        while current != scope {
            if let Some(next) = self.next_sibling(current) {
                return Some(self.first_leaf_in(next));
            }
            current = self.parent(current)?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold_fixture() -> (Dom, NodeId, NodeId, NodeId) {
        // <body>11<b>22</b></body>
        let mut dom = Dom::new();
        let root = dom.root();
        let text = dom.create_text("11");
        dom.append_child(root, text);
        let bold = dom.create_element(ElementData::new("B"));
        dom.append_child(root, bold);
        let inner = dom.create_text("22");
        dom.append_child(bold, inner);
        (dom, text, bold, inner)
    }

    #[test]
    fn tags_are_lowercased() {
        let (dom, _, bold, _) = bold_fixture();
        assert_eq!(dom.element(bold).map(ElementData::tag), Some("b"));
    }

    #[test]
    fn parent_links() {
        let (dom, text, bold, inner) = bold_fixture();
        assert_eq!(dom.parent(text), Some(dom.root()));
        assert_eq!(dom.parent(inner), Some(bold));
        assert_eq!(dom.index_in_parent(bold), Some(1));
        assert_eq!(dom.ancestors(inner).collect::<Vec<_>>(), vec![bold, dom.root()]);
    }

    #[test]
    fn lowest_common_ancestor() {
        let (dom, text, bold, inner) = bold_fixture();
        assert_eq!(dom.lowest_common_ancestor(text, inner), Some(dom.root()));
        assert_eq!(dom.lowest_common_ancestor(bold, inner), Some(bold));
        assert_eq!(dom.lowest_common_ancestor(inner, inner), Some(inner));
    }

    #[test]
    fn split_text_inserts_sibling() {
        let (mut dom, text, _, _) = bold_fixture();
        let tail = dom.split_text(text, 1);
        assert_eq!(dom.text(text), Some("1"));
        assert_eq!(dom.text(tail), Some("1"));
        assert_eq!(dom.index_in_parent(tail), Some(1));
        assert_eq!(dom.text_content(dom.root()), "1122");
    }

    #[test]
    fn split_text_counts_chars() {
        let mut dom = Dom::new();
        let text = dom.create_text("héllo");
        dom.append_child(dom.root(), text);
        let tail = dom.split_text(text, 2);
        assert_eq!(dom.text(text), Some("hé"));
        assert_eq!(dom.text(tail), Some("llo"));
        assert_eq!(dom.node_length(text), 2);
    }

    #[test]
    fn join_text_undoes_split() {
        let (mut dom, text, _, _) = bold_fixture();
        let tail = dom.split_text(text, 1);
        dom.join_text(text, tail);
        assert_eq!(dom.text(text), Some("11"));
        assert!(!dom.is_live(tail));
        assert_eq!(dom.children(dom.root()).len(), 2);
    }

    #[test]
    fn replace_children_detaches_old() {
        let (mut dom, text, bold, inner) = bold_fixture();
        let root = dom.root();
        dom.replace_children(root, vec![inner, text]);
        assert_eq!(dom.children(root), &[inner, text]);
        assert_eq!(dom.parent(bold), None);
        assert!(dom.children(bold).is_empty());
    }

    #[test]
    fn free_subtree_invalidates_ids() {
        let (mut dom, _, bold, inner) = bold_fixture();
        dom.free_subtree(bold);
        assert!(!dom.is_live(bold));
        assert!(!dom.is_live(inner));
        assert_eq!(dom.children(dom.root()).len(), 1);
    }

    #[test]
    fn freed_ids_are_not_reused() {
        let (mut dom, text, bold, inner) = bold_fixture();
        dom.free_subtree(bold);
        let fresh_text = dom.create_text("new");
        let fresh_element = dom.create_element(ElementData::new("i"));
        for fresh in [fresh_text, fresh_element] {
            assert!(![text, bold, inner].contains(&fresh));
        }
        assert!(!dom.is_live(bold));
        assert!(!dom.is_live(inner));
        assert!(dom.is_live(text));
    }

    #[test]
    fn leaves_in_document_order() {
        let (mut dom, text, bold, inner) = bold_fixture();
        let br = dom.create_element(ElementData::new("br"));
        dom.append_child(bold, br);
        assert_eq!(dom.leaves(dom.root()), vec![text, inner, br]);
        assert_eq!(dom.first_leaf_in(bold), inner);
        assert_eq!(dom.next_leaf_after(text, dom.root()), Some(inner));
        assert_eq!(dom.next_leaf_after(bold, dom.root()), None);
    }

    #[test]
    fn style_declarations() {
        let mut data = ElementData::new("span").with_attr("style", "font-weight: bold;COLOR:red; ;broken");
        assert_eq!(
            data.style_declarations(),
            vec![
                ("font-weight".to_string(), "bold".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
        data.set_style_declarations(&[("color".to_string(), "red".to_string())]);
        assert_eq!(data.attr("style"), Some("color: red;"));
        data.set_style_declarations(&[]);
        assert!(!data.has_attributes());
    }

    #[test]
    #[should_panic(expected = "would create a cycle")]
    fn no_cycles() {
        let (mut dom, _, bold, _) = bold_fixture();
        let root = dom.root();
        dom.append_child(bold, root);
    }
}
