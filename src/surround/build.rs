use crate::dom::{Dom, ElementData, NodeId};
use crate::surround::tree::{
    all_inside_range, BlockNode, ElementNode, FormattingNode, Origin, Retained, TextNode, TreeNode,
};
use crate::surround::{Classification, Error, MatchResult, SurroundFormat};
use std::collections::{HashMap, HashSet};

/// Classifies each element at most once per operation (plus one re-check, see
/// [`ClassificationCache::classify_for_build`]).
pub(crate) struct ClassificationCache<'f> {
    format: &'f SurroundFormat,
    seen: HashMap<NodeId, Classification>,
}

impl<'f> ClassificationCache<'f> {
    pub(crate) fn new(format: &'f SurroundFormat) -> Self {
        Self {
            format,
            seen: HashMap::new(),
        }
    }

    /// Classifies an element, reusing an earlier classification if there is one.
    pub(crate) fn classify(&mut self, id: NodeId, data: &ElementData) -> Classification {
        if let Some(existing) = self.seen.get(&id) {
            return existing.clone();
        }
        let classification = self.format.classify(data);
        log::trace!(target: "surround::build", "classified {id} <{}>: {classification:?}", data.tag());
        self.seen.insert(id, classification.clone());
        classification
    }

    /// Classifies an element for the forest build.
    ///
    /// Elements the ancestor walk already classified are classified again, and the two answers must agree.
    pub(crate) fn classify_for_build(&mut self, id: NodeId, data: &ElementData) -> Result<Classification, Error> {
        let fresh = self.format.classify(data);
        if let Some(existing) = self.seen.get(&id) {
            if !existing.consistent_with(&fresh) {
                log::debug!(
                    target: "surround::build",
                    "matcher was inconsistent for {id}: {existing:?} then {fresh:?}"
                );
                return Err(Error::MatcherInconsistency(id));
            }
        }
        self.seen.insert(id, fresh.clone());
        Ok(fresh)
    }
}

/// Snapshots everything under `scope` (but not `scope` itself) into a forest.
///
/// `scope` must not have any matched ancestors below the operation's root; otherwise the formatting they carry
/// would be invisible to the forest. Leaves in `in_range` are marked as inside the range.
pub(crate) fn build_forest(
    dom: &Dom,
    scope: NodeId,
    cache: &mut ClassificationCache,
    in_range: &HashSet<NodeId>,
) -> Result<Vec<TreeNode>, Error> {
    let mut builder = ForestBuilder { dom, cache, in_range };
    let mut unused_origins = Vec::new();
    let forest = builder.build_children(scope, false, &mut unused_origins)?;
    log::debug!(target: "surround::build", "built forest of {} top-level nodes under {scope}", forest.len());
    Ok(forest)
}

struct ForestBuilder<'a, 'f> {
    dom: &'a Dom,
    cache: &'a mut ClassificationCache<'f>,
    in_range: &'a HashSet<NodeId>,
}

impl ForestBuilder<'_, '_> {
    /// Builds the children of `parent`.
    ///
    /// When `within_format` is set, some enclosing node is already a [`FormattingNode`]. Matched elements then don't
    /// get their own formatting node: their children are spliced in their place, and their origin is added to
    /// `enclosing_origins`.
    fn build_children(
        &mut self,
        parent: NodeId,
        within_format: bool,
        enclosing_origins: &mut Vec<Origin>,
    ) -> Result<Vec<TreeNode>, Error> {
        let dom = self.dom;
        let mut out = Vec::with_capacity(dom.children(parent).len());
        for &child in dom.children(parent) {
            if let Some(content) = dom.text(child) {
                out.push(TreeNode::Text(TextNode {
                    id: child,
                    content: content.to_string(),
                    inside_range: self.in_range.contains(&child),
                }));
                continue;
            }
            let Some(data) = dom.element(child) else {
                continue;
            };
            let data = data.clone();
            let Classification { is_block, result } = self.cache.classify_for_build(child, &data)?;

            if is_block {
                if result.is_match() {
                    log::trace!(target: "surround::build", "{child} matched, but is a block; leaving it as-is");
                }
                let children = self.build_children(child, within_format, enclosing_origins)?;
                out.push(TreeNode::Block(BlockNode {
                    id: child,
                    data,
                    children,
                }));
                continue;
            }

            let retained = match result {
                MatchResult::NoMatch => {
                    let children = self.build_children(child, within_format, enclosing_origins)?;
                    let inside_range = if children.is_empty() {
                        self.in_range.contains(&child)
                    } else {
                        all_inside_range(&children)
                    };
                    out.push(TreeNode::Element(ElementNode {
                        id: child,
                        data,
                        inside_range,
                        children,
                    }));
                    continue;
                }
                MatchResult::Remove => None,
                MatchResult::Clear(clear) => {
                    let mut cleared = data.clone();
                    clear(&mut cleared);
                    if cleared.is_tag("span") && !cleared.has_attributes() {
                        None
                    } else {
                        Some(Retained { id: child, data: cleared })
                    }
                }
            };

            // A matched element with nothing in it is an empty wrapper. It's dropped from the forest (and so freed on
            // commit), unless clearing it left something behind, in which case it stays as a plain element.
            if dom.children(child).is_empty() {
                match retained {
                    None => log::trace!(target: "surround::build", "{child} is an empty wrapper; dropping it"),
                    Some(Retained { id, data }) => out.push(TreeNode::Element(ElementNode {
                        id,
                        data,
                        inside_range: self.in_range.contains(&id),
                        children: Vec::new(),
                    })),
                }
                continue;
            }

            let origin = Origin {
                id: child,
                snapshot: data,
                kept: retained.is_some(),
            };

            if within_format {
                enclosing_origins.push(origin);
                let children = self.build_children(child, true, enclosing_origins)?;
                match retained {
                    Some(Retained { id, data }) => out.push(TreeNode::Element(ElementNode {
                        id,
                        data,
                        inside_range: all_inside_range(&children),
                        children,
                    })),
                    None => out.extend(children),
                }
            } else {
                let mut origins = vec![origin];
                let children = self.build_children(child, true, &mut origins)?;
                out.push(TreeNode::Formatting(FormattingNode {
                    origins,
                    retained,
                    inside_range: all_inside_range(&children),
                    children,
                }));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;
    use crate::surround::tree::sketch;
    use crate::surround::{StyleMatcher, TagMatcher};
    use std::cell::Cell;
    use std::rc::Rc;

    fn bold() -> SurroundFormat {
        SurroundFormat::new(ElementData::new("b"), TagMatcher::new(["b"]))
    }

    /// Builds the forest for the whole fragment, with the leaves whose text is in `selected` in range.
    fn build(html: &str, format: &SurroundFormat, selected: &[&str]) -> Result<Vec<TreeNode>, Error> {
        unwrap!(parse_fragment(html), Ok(dom));
        let root = dom.root();
        let in_range = dom
            .leaves(root)
            .into_iter()
            .filter(|&leaf| selected.contains(&dom.text(leaf).unwrap_or("")))
            .collect();
        build_forest(&dom, root, &mut ClassificationCache::new(format), &in_range)
    }

    #[test]
    fn plain_text() {
        let forest = build("111222", &bold(), &["111222"]).unwrap();
        assert_eq!(sketch(&forest), "{111222}");
    }

    #[test]
    fn matched_element_becomes_formatting() {
        let forest = build("11<b>22</b><i>33</i>", &bold(), &["22"]).unwrap();
        assert_eq!(sketch(&forest), "11[{22}]<i>33</i>");
        let formatting = unwrap_formatting(&forest[1]);
        assert!(formatting.inside_range);
        assert_eq!(formatting.origins.len(), 1);
        assert!(!formatting.origins[0].kept);
    }

    #[test]
    fn nested_match_is_delayered() {
        let forest = build("111<b>222<b>333<b>444</b></b></b>555", &bold(), &["555"]).unwrap();
        assert_eq!(sketch(&forest), "111[222333444]{555}");
        let formatting = unwrap_formatting(&forest[1]);
        assert_eq!(formatting.origins.len(), 3);
    }

    #[test]
    fn match_under_ordinary_element_is_delayered() {
        let forest = build("<b>1<i>2<b>3</b></i></b>", &bold(), &[]).unwrap();
        assert_eq!(sketch(&forest), "[1<i>23</i>]");
        assert_eq!(unwrap_formatting(&forest[0]).origins.len(), 2);
    }

    #[test]
    fn blocks() {
        let forest = build("Before<br><ul><li>First</li></ul>", &bold(), &["First"]).unwrap();
        assert_eq!(sketch(&forest), "Before<br></br><ul><li>{First}</li></ul>");
        unwrap!(&forest[2], TreeNode::Block(_));
    }

    #[test]
    fn matched_block_stays_a_block() {
        let format = SurroundFormat::new(ElementData::new("b"), TagMatcher::new(["b", "p"]));
        let forest = build("<p>x</p>", &format, &[]).unwrap();
        assert_eq!(sketch(&forest), "<p>x</p>");
    }

    #[test]
    fn cleared_span_without_attributes_is_removed() {
        let format = style_bold();
        let forest = build(r#"<span style="font-weight: bold">x</span>"#, &format, &[]).unwrap();
        assert_eq!(sketch(&forest), "[x]");
        let formatting = unwrap_formatting(&forest[0]);
        assert_eq!(formatting.retained, None);
        assert_eq!(formatting.origins[0].snapshot.attr("style"), Some("font-weight: bold"));
    }

    #[test]
    fn cleared_element_with_attributes_is_retained() {
        let format = style_bold();
        let forest = build(r#"<span style="font-weight: bold; color: red">x</span>"#, &format, &[]).unwrap();
        assert_eq!(sketch(&forest), "[<span>x</span>]");
        let formatting = unwrap_formatting(&forest[0]);
        unwrap!(&formatting.retained, Some(retained));
        assert_eq!(retained.data.attr("style"), Some("color: red;"));
        assert!(formatting.origins[0].kept);
    }

    #[test]
    fn empty_match_is_dropped() {
        let forest = build("a<b></b>c<b>d<b></b></b>", &bold(), &[]).unwrap();
        assert_eq!(sketch(&forest), "ac[d]");
        assert_eq!(unwrap_formatting(&forest[2]).origins.len(), 1);
    }

    #[test]
    fn empty_cleared_element_with_attributes_is_kept() {
        let format = style_bold();
        let forest = build(r#"a<span style="font-weight: bold; color: red"></span>"#, &format, &[]).unwrap();
        assert_eq!(sketch(&forest), "a<span></span>");
        unwrap!(&forest[1], TreeNode::Element(element));
        assert_eq!(element.data.attr("style"), Some("color: red;"));
        assert!(element.children.is_empty());
    }

    #[test]
    fn inconsistent_matcher() {
        struct Flaky(Rc<Cell<bool>>);
        impl crate::surround::Matcher for Flaky {
            fn classify(&self, _: &ElementData) -> Classification {
                let matched = self.0.get();
                self.0.set(!matched);
                Classification {
                    is_block: false,
                    result: if matched { MatchResult::Remove } else { MatchResult::NoMatch },
                }
            }
        }
        let flip = Rc::new(Cell::new(true));
        let format = SurroundFormat::new(ElementData::new("b"), Flaky(Rc::clone(&flip)));

        unwrap!(parse_fragment("<i>x</i>"), Ok(dom));
        let root = dom.root();
        let italic = dom.children(root)[0];
        let mut cache = ClassificationCache::new(&format);
        let first = cache.classify(italic, unwrap_element(&dom, italic));
        unwrap!(first.result, MatchResult::Remove);
        assert_eq!(
            build_forest(&dom, root, &mut cache, &HashSet::new()),
            Err(Error::MatcherInconsistency(italic))
        );
    }

    fn style_bold() -> SurroundFormat {
        let style = StyleMatcher::new("font-weight", fancy_regex::Regex::new("^bold$").unwrap());
        SurroundFormat::new(ElementData::new("b"), style)
    }

    fn unwrap_formatting(node: &TreeNode) -> &FormattingNode {
        unwrap!(node, TreeNode::Formatting(formatting));
        formatting
    }

    fn unwrap_element(dom: &Dom, id: NodeId) -> &ElementData {
        unwrap!(dom.element(id), Some(data));
        data
    }

    use crate::util::utils_for_test::*;
}
