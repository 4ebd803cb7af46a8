//! Extend-and-merge: decide which content ends up formatted, and group it into as few wrappers as possible.
//!
//! Every leaf gets a [`Coverage`]. Matched wrappers are dissolved (their content keeps track of where it came from),
//! ordinary inline elements whose content is entirely formatted are absorbed whole, and then each maximal run of
//! formatted content within a level becomes a single [`FormattingNode`]. Blocks break runs; their contents are
//! grouped on their own.
use crate::surround::tree::{BlockNode, ElementNode, FormattingNode, Origin, Retained, TreeNode};
use crate::surround::Operation;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Coverage {
    /// Content that should carry the format. Runs only join content with the same key.
    Formatted { key: bool },
    /// Content that doesn't care either way: it never starts or ends a run, but can sit inside one.
    Neutral,
    /// Content that must not carry the format.
    Unformatted,
}

struct Piece {
    node: TreeNode,
    coverage: Coverage,
    inside_range: bool,
    /// The matched elements whose format this content was carrying, outermost first.
    origins: Vec<Origin>,
}

pub(crate) fn extend_and_merge(forest: Vec<TreeNode>, operation: Operation) -> Vec<TreeNode> {
    let merger = Merger { operation };
    let pieces = merger.flatten(forest, &[]);
    let merged = merger.group(pieces);
    log::debug!(
        target: "surround::merge",
        "{operation:?}: {} top-level nodes after merging, {} of them formatted",
        merged.len(),
        merged.iter().filter(|node| matches!(node, TreeNode::Formatting(_))).count()
    );
    merged
}

struct Merger {
    operation: Operation,
}

impl Merger {
    fn leaf_coverage(&self, matched: bool, inside_range: bool) -> Coverage {
        if self.operation.wants_format(matched, inside_range) {
            Coverage::Formatted {
                key: self.operation.run_key(inside_range),
            }
        } else {
            Coverage::Unformatted
        }
    }

    /// Turns a level of the forest into pieces, dissolving matched wrappers into the level. `origins` are the
    /// wrappers dissolved so far on the way down; content is matched if there are any.
    fn flatten(&self, nodes: Vec<TreeNode>, origins: &[Origin]) -> Vec<Piece> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                TreeNode::Text(text) => {
                    let coverage = if text.content.is_empty() {
                        Coverage::Neutral
                    } else {
                        self.leaf_coverage(!origins.is_empty(), text.inside_range)
                    };
                    out.push(Piece {
                        coverage,
                        inside_range: text.inside_range,
                        origins: origins.to_vec(),
                        node: TreeNode::Text(text),
                    });
                }
                TreeNode::Element(element) => out.push(self.flatten_element(element, origins)),
                TreeNode::Block(BlockNode { id, data, children }) => {
                    let children = self.group(self.flatten(children, origins));
                    out.push(Piece {
                        coverage: Coverage::Unformatted,
                        inside_range: false,
                        origins: Vec::new(),
                        node: TreeNode::Block(BlockNode { id, data, children }),
                    });
                }
                TreeNode::Formatting(FormattingNode {
                    origins: own_origins,
                    retained,
                    inside_range,
                    children,
                }) => {
                    let mut nested = origins.to_vec();
                    nested.extend(own_origins);
                    match retained {
                        Some(Retained { id, data }) => {
                            let element = ElementNode {
                                id,
                                data,
                                inside_range,
                                children,
                            };
                            out.push(self.flatten_element(element, &nested));
                        }
                        None => out.extend(self.flatten(children, &nested)),
                    }
                }
            }
        }
        out
    }

    fn flatten_element(&self, element: ElementNode, origins: &[Origin]) -> Piece {
        let ElementNode {
            id,
            data,
            inside_range,
            children,
        } = element;
        if children.is_empty() {
            return Piece {
                coverage: Coverage::Neutral,
                inside_range,
                origins: origins.to_vec(),
                node: TreeNode::Element(ElementNode {
                    id,
                    data,
                    inside_range,
                    children,
                }),
            };
        }

        let pieces = self.flatten(children, origins);
        let any_inside = pieces.iter().any(|piece| piece.inside_range);
        match absorbable_key(&pieces) {
            Some(key) => {
                log::trace!(target: "surround::merge", "absorbing {id} <{}> whole", data.tag());
                let origins = merged_origins(&pieces);
                Piece {
                    coverage: Coverage::Formatted { key },
                    inside_range: any_inside,
                    origins,
                    node: TreeNode::Element(ElementNode {
                        id,
                        data,
                        inside_range,
                        children: pieces.into_iter().map(|piece| piece.node).collect(),
                    }),
                }
            }
            None => {
                let coverage = if pieces.iter().all(|piece| piece.coverage == Coverage::Neutral) {
                    Coverage::Neutral
                } else {
                    Coverage::Unformatted
                };
                Piece {
                    coverage,
                    inside_range: any_inside,
                    origins: origins.to_vec(),
                    node: TreeNode::Element(ElementNode {
                        id,
                        data,
                        inside_range,
                        children: self.group(pieces),
                    }),
                }
            }
        }
    }

    /// Groups each maximal run of formatted pieces (possibly with neutral pieces between them) into one
    /// [`FormattingNode`]. Neutral pieces at the edges of a run stay outside of it.
    fn group(&self, pieces: Vec<Piece>) -> Vec<TreeNode> {
        let mut out = Vec::with_capacity(pieces.len());
        let mut pending: Vec<Piece> = Vec::new();
        let mut run_key: Option<bool> = None;
        for piece in pieces {
            match (piece.coverage, run_key) {
                (Coverage::Formatted { key }, Some(current)) if key == current => pending.push(piece),
                (Coverage::Neutral, Some(_)) => pending.push(piece),
                (Coverage::Formatted { key }, _) => {
                    flush_run(&mut pending, &mut out);
                    run_key = Some(key);
                    pending.push(piece);
                }
                (Coverage::Neutral | Coverage::Unformatted, _) => {
                    flush_run(&mut pending, &mut out);
                    run_key = None;
                    out.push(piece.node);
                }
            }
        }
        flush_run(&mut pending, &mut out);
        out
    }
}

/// If every piece is formatted or neutral, with at least one formatted and all formatted pieces sharing a key,
/// returns that key.
fn absorbable_key(pieces: &[Piece]) -> Option<bool> {
    let mut found = None;
    for piece in pieces {
        match piece.coverage {
            Coverage::Formatted { key } => match found {
                Some(existing) if existing != key => return None,
                _ => found = Some(key),
            },
            Coverage::Neutral => {}
            Coverage::Unformatted => return None,
        }
    }
    found
}

fn merged_origins(pieces: &[Piece]) -> Vec<Origin> {
    let mut out: Vec<Origin> = Vec::new();
    for origin in pieces.iter().flat_map(|piece| &piece.origins) {
        if !out.iter().any(|existing| existing.id == origin.id) {
            out.push(origin.clone());
        }
    }
    out
}

/// Moves the pending run into `out` as a formatting node, leaving any trailing neutral pieces after it.
fn flush_run(pending: &mut Vec<Piece>, out: &mut Vec<TreeNode>) {
    let Some(last_formatted) = pending
        .iter()
        .rposition(|piece| matches!(piece.coverage, Coverage::Formatted { .. }))
    else {
        out.extend(pending.drain(..).map(|piece| piece.node));
        return;
    };
    let trailing = pending.split_off(last_formatted + 1);
    let run = std::mem::take(pending);
    let origins = merged_origins(&run);
    let inside_range = run
        .iter()
        .any(|piece| piece.inside_range && matches!(piece.coverage, Coverage::Formatted { .. }));
    out.push(TreeNode::Formatting(FormattingNode {
        origins,
        retained: None,
        inside_range,
        children: run.into_iter().map(|piece| piece.node).collect(),
    }));
    out.extend(trailing.into_iter().map(|piece| piece.node));
}
