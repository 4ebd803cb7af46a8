use crate::dom::{Dom, ElementData, NodeId};
use crate::surround::tree::{BlockNode, ElementNode, FormattingNode, Origin, TreeNode};
use crate::surround::{Error, Operation, SurroundFormat};
use std::collections::HashSet;

/// The final shape of a restructured subtree, ready to be committed to the live tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    Text(NodeId),
    /// An element. Without an id, it's a new element.
    Element {
        id: Option<NodeId>,
        data: ElementData,
        children: Vec<Shape>,
    },
}

/// Turns each formatting run of a merged forest into a wrapper (or, for content that should no longer carry the
/// format, nothing).
pub(crate) fn apply(forest: Vec<TreeNode>, operation: Operation, format: &SurroundFormat) -> Result<Vec<Shape>, Error> {
    let mut applier = Applier {
        operation,
        format,
        used: HashSet::new(),
    };
    applier.apply_all(forest)
}

struct Applier<'a> {
    operation: Operation,
    format: &'a SurroundFormat,
    /// Origins that have already been reused as a wrapper.
    used: HashSet<NodeId>,
}

impl Applier<'_> {
    fn apply_all(&mut self, nodes: Vec<TreeNode>) -> Result<Vec<Shape>, Error> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                TreeNode::Text(text) => out.push(Shape::Text(text.id)),
                TreeNode::Element(ElementNode { id, data, children, .. }) | TreeNode::Block(BlockNode { id, data, children }) => {
                    out.push(Shape::Element {
                        id: Some(id),
                        data,
                        children: self.apply_all(children)?,
                    })
                }
                TreeNode::Formatting(formatting) => {
                    if let Some(shape) = self.wrap(formatting)? {
                        out.push(shape);
                    }
                }
            }
        }
        Ok(out)
    }

    fn wrap(&mut self, formatting: FormattingNode) -> Result<Option<Shape>, Error> {
        let FormattingNode {
            origins,
            inside_range,
            children,
            ..
        } = formatting;
        let reconstructing = self.operation == Operation::Reformat && inside_range;

        // A run that's nothing but an element the format was cleared from: put the format back on it.
        if let [TreeNode::Element(only)] = children.as_slice() {
            let restorable = origins.iter().find(|origin| origin.kept && origin.id == only.id);
            if let (Some(origin), false) = (restorable, reconstructing) {
                let snapshot = origin.snapshot.clone();
                log::trace!(target: "surround::apply", "restoring format on {}", only.id);
                let Some(TreeNode::Element(only)) = children.into_iter().next() else {
                    return Ok(None);
                };
                return Ok(Some(Shape::Element {
                    id: Some(only.id),
                    data: snapshot,
                    children: self.apply_all(only.children)?,
                }));
            }
        }

        let children = self.apply_all(children)?;
        if children.is_empty() {
            return Ok(None);
        }
        let (id, data) = match self.operation {
            Operation::Surround => self.reused_or_constructed(&origins)?,
            Operation::Reformat if reconstructing => {
                let data = self.format.construct().ok_or(Error::MissingConstructor)?;
                (self.claim_removable(&origins).map(|origin| origin.id), data)
            }
            Operation::Unsurround | Operation::Reformat => self.original(&origins)?,
        };
        log::trace!(
            target: "surround::apply",
            "wrapping {} nodes in <{}> ({})",
            children.len(),
            data.tag(),
            id.map(|id| id.to_string()).unwrap_or_else(|| "new".to_string())
        );
        Ok(Some(Shape::Element { id, data, children }))
    }

    /// Claims the first origin that's being removed (rather than kept) and hasn't been reused yet.
    fn claim_removable<'o>(&mut self, origins: &'o [Origin]) -> Option<&'o Origin> {
        let origin = origins
            .iter()
            .find(|origin| !origin.kept && !self.used.contains(&origin.id))?;
        self.used.insert(origin.id);
        Some(origin)
    }

    /// A wrapper for new formatting: an existing matched element if there's one to spare, or a new one.
    fn reused_or_constructed(&mut self, origins: &[Origin]) -> Result<(Option<NodeId>, ElementData), Error> {
        if let Some(origin) = self.claim_removable(origins) {
            return Ok((Some(origin.id), origin.snapshot.clone()));
        }
        let data = self.format.construct().ok_or(Error::MissingConstructor)?;
        Ok((None, data))
    }

    /// A wrapper that puts back the formatting the content originally had: the outermost matched element it came
    /// from, or a copy of it once that element has been used.
    fn original(&mut self, origins: &[Origin]) -> Result<(Option<NodeId>, ElementData), Error> {
        let Some(origin) = origins.first() else {
            return self.reused_or_constructed(origins);
        };
        if origin.kept {
            let data = self.format.construct().unwrap_or_else(|| origin.snapshot.clone());
            return Ok((None, data));
        }
        let id = self.used.insert(origin.id).then_some(origin.id);
        Ok((id, origin.snapshot.clone()))
    }
}

/// Makes the live tree under `scope` match `shapes`.
///
/// Existing nodes are moved (and their element data updated) by identity; new elements are created. Anything that
/// was under `scope` before and isn't part of the new shape is freed.
pub(crate) fn commit(dom: &mut Dom, scope: NodeId, shapes: Vec<Shape>) {
    let before: Vec<NodeId> = dom.descendants(scope).into_iter().skip(1).collect();
    let mut kept = HashSet::with_capacity(before.len());
    let mut created = 0usize;
    let top = commit_all(dom, shapes, &mut kept, &mut created);
    dom.replace_children(scope, top);

    let mut freed = 0usize;
    for id in before {
        if dom.is_live(id) && !kept.contains(&id) {
            dom.free_subtree(id);
            freed += 1;
        }
    }
    log::debug!(target: "surround::apply", "committed under {scope}: {created} elements created, {freed} freed");
}

fn commit_all(dom: &mut Dom, shapes: Vec<Shape>, kept: &mut HashSet<NodeId>, created: &mut usize) -> Vec<NodeId> {
    let mut ids = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let id = match shape {
            Shape::Text(id) => id,
            Shape::Element { id, data, children } => {
                let child_ids = commit_all(dom, children, kept, created);
                let id = match id {
                    Some(id) => {
                        if let Some(existing) = dom.element_mut(id) {
                            if *existing != data {
                                *existing = data;
                            }
                        }
                        id
                    }
                    None => {
                        *created += 1;
                        dom.create_element(data)
                    }
                };
                dom.replace_children(id, child_ids);
                id
            }
        };
        kept.insert(id);
        ids.push(id);
    }
    ids
}
