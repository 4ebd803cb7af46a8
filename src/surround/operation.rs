use crate::dom::{Dom, NodeId};
use crate::location::{InvalidRange, Point, Range};
use crate::surround::apply::{apply, commit};
use crate::surround::build::{build_forest, ClassificationCache};
use crate::surround::extend_merge::extend_and_merge;
use crate::surround::{Error, SurroundFormat};
use std::collections::HashSet;

/// The three ways of applying a [`SurroundFormat`] to a range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Make the selection carry the format.
    Surround,
    /// Make the selection stop carrying the format.
    Unsurround,
    /// Replace the format's wrappers in the selection with freshly constructed ones.
    Reformat,
}

impl Operation {
    /// Whether a leaf should carry the format after this operation. `matched` is whether it carries it now.
    pub(crate) fn wants_format(self, matched: bool, inside_range: bool) -> bool {
        match self {
            Operation::Surround => matched || inside_range,
            Operation::Unsurround => matched && !inside_range,
            Operation::Reformat => matched,
        }
    }

    /// Formatted content can only share a wrapper with content of the same key.
    pub(crate) fn run_key(self, inside_range: bool) -> bool {
        match self {
            Operation::Surround | Operation::Unsurround => true,
            Operation::Reformat => inside_range,
        }
    }

    /// Applies the operation to `range`, restructuring the document in place.
    ///
    /// Only the subtree under `root` is ever touched. The returned range covers the same content as `range` did, in
    /// the restructured tree. Collapsed ranges, and ranges that don't contain any text or childless elements, are a
    /// no-op: the document isn't changed, and `range` is returned as-is.
    ///
    /// Empty wrappers (matched elements with no children) anywhere in the rebuilt subtree are removed. If the range
    /// held nothing else, the returned range is collapsed where they were.
    ///
    /// `root` must be an element; a text root is an [`InvalidRange::TextRoot`].
    pub fn apply(self, dom: &mut Dom, range: Range, root: NodeId, format: &SurroundFormat) -> Result<Range, Error> {
        range.validate(dom, root)?;
        if dom.is_text(root) {
            return Err(InvalidRange::TextRoot(root).into());
        }
        if self != Operation::Unsurround && format.construct().is_none() {
            return Err(Error::MissingConstructor);
        }
        if range.is_collapsed() {
            return Ok(range);
        }

        let mut cache = ClassificationCache::new(format);
        let scope = find_scope(dom, &range, root, &mut cache);

        let mut splits = Vec::with_capacity(2);
        let end_leaf = boundary_leaf(dom, range.end, scope, &mut splits);
        let start_leaf = boundary_leaf(dom, range.start, scope, &mut splits);
        let leaves = dom.leaves(scope);
        let position = |leaf: Option<NodeId>| {
            leaf.and_then(|leaf| leaves.iter().position(|&l| l == leaf))
                .unwrap_or(leaves.len())
        };
        let selected = leaves
            .get(position(start_leaf)..position(end_leaf))
            .unwrap_or_default();
        if selected.is_empty() {
            log::debug!("{self:?}: range contains no leaves; nothing to do");
            undo_splits(dom, splits);
            return Ok(range);
        }
        log::debug!(
            "{self:?} under {scope}: {} of {} leaves selected",
            selected.len(),
            leaves.len()
        );
        let in_range: HashSet<NodeId> = selected.iter().copied().collect();

        let forest = match build_forest(dom, scope, &mut cache, &in_range) {
            Ok(forest) => forest,
            Err(err) => {
                undo_splits(dom, splits);
                return Err(err);
            }
        };
        let shapes = match apply(extend_and_merge(forest, self), self, format) {
            Ok(shapes) => shapes,
            Err(err) => {
                undo_splits(dom, splits);
                return Err(err);
            }
        };
        commit(dom, scope, shapes);

        // Selected empty wrappers are gone now; the range is reconciled against the leaves that are left.
        let survivors: Vec<NodeId> = selected.iter().copied().filter(|&leaf| dom.is_live(leaf)).collect();
        match (survivors.first(), survivors.last()) {
            (Some(&first), Some(&last)) => reconcile(dom, root, first, last),
            _ => {
                let following = leaves
                    .get(position(end_leaf)..)
                    .unwrap_or_default()
                    .iter()
                    .copied()
                    .find(|&leaf| dom.is_live(leaf));
                let point = match following {
                    Some(leaf) => boundary_point(dom, root, leaf, false)?,
                    None => Point::new(scope, dom.children(scope).len()),
                };
                Ok(Range::collapsed(point))
            }
        }
    }
}

/// Surrounds the selection with the format. See [`Operation::apply`].
pub fn surround(dom: &mut Dom, range: Range, root: NodeId, format: &SurroundFormat) -> Result<Range, Error> {
    Operation::Surround.apply(dom, range, root, format)
}

/// Removes the format from the selection. See [`Operation::apply`].
pub fn unsurround(dom: &mut Dom, range: Range, root: NodeId, format: &SurroundFormat) -> Result<Range, Error> {
    Operation::Unsurround.apply(dom, range, root, format)
}

/// Replaces the format within the selection with the format's own wrapper. See [`Operation::apply`].
pub fn reformat(dom: &mut Dom, range: Range, root: NodeId, format: &SurroundFormat) -> Result<Range, Error> {
    Operation::Reformat.apply(dom, range, root, format)
}

/// Finds the node whose subtree gets rebuilt.
///
/// This starts at the lowest common ancestor of the range's endpoints, lifts it above the outermost matched
/// ancestor (so that the whole of any format the selection is in is visible), and then up to the nearest block or to
/// `root`.
fn find_scope(dom: &Dom, range: &Range, root: NodeId, cache: &mut ClassificationCache) -> NodeId {
    let mut lca = dom
        .lowest_common_ancestor(range.start.node, range.end.node)
        .unwrap_or(root);
    if lca != root && dom.is_text(lca) {
        lca = dom.parent(lca).unwrap_or(root);
    }

    let mut base = lca;
    let mut current = lca;
    while current != root {
        let Some(parent) = dom.parent(current) else {
            break;
        };
        if let Some(data) = dom.element(current) {
            let classification = cache.classify(current, data);
            if classification.result.is_match() && !classification.is_block {
                base = parent;
            }
        }
        current = parent;
    }

    let mut scope = base;
    while scope != root {
        let is_block = dom
            .element(scope)
            .is_some_and(|data| cache.classify(scope, data).is_block);
        if is_block {
            break;
        }
        match dom.parent(scope) {
            Some(parent) => scope = parent,
            None => break,
        }
    }
    log::trace!("common ancestor {lca}, lifted to {base}, scope {scope}");
    scope
}

/// The first leaf at or after `point`, within `scope`; `None` means the end of `scope`.
///
/// If the point is strictly inside a text node, the text node is split there first, and the split is recorded in
/// `splits`.
fn boundary_leaf(dom: &mut Dom, point: Point, scope: NodeId, splits: &mut Vec<(NodeId, NodeId)>) -> Option<NodeId> {
    let Point { node, offset } = point;
    if dom.is_text(node) {
        let length = dom.node_length(node);
        return if offset == 0 {
            Some(node)
        } else if offset >= length {
            dom.next_leaf_after(node, scope)
        } else {
            let tail = dom.split_text(node, offset);
            splits.push((node, tail));
            Some(tail)
        };
    }
    match dom.children(node).get(offset) {
        Some(&child) => Some(dom.first_leaf_in(child)),
        None => dom.next_leaf_after(node, scope),
    }
}

/// Puts split text nodes back together, latest split first.
fn undo_splits(dom: &mut Dom, splits: Vec<(NodeId, NodeId)>) {
    for (head, tail) in splits.into_iter().rev() {
        dom.join_text(head, tail);
    }
}

/// The range covering the same leaves as before, in the restructured tree.
fn reconcile(dom: &Dom, root: NodeId, first: NodeId, last: NodeId) -> Result<Range, Error> {
    let start = boundary_point(dom, root, first, false)?;
    let end = boundary_point(dom, root, last, true)?;
    Ok(Range::new(start, end))
}

fn boundary_point(dom: &Dom, root: NodeId, leaf: NodeId, after: bool) -> Result<Point, Error> {
    if !dom.is_live(leaf) || !dom.is_inclusive_ancestor(root, leaf) {
        return Err(Error::UnreconcilableBoundary(leaf));
    }
    if dom.is_text(leaf) {
        let offset = if after { dom.node_length(leaf) } else { 0 };
        return Ok(Point::new(leaf, offset));
    }
    let point = if after {
        Point::after(dom, leaf)
    } else {
        Point::before(dom, leaf)
    };
    point.map_err(|_| Error::UnreconcilableBoundary(leaf))
}
