use crate::dom::{Dom, NodeId};
use crate::location::{range_coordinates, Range, RangeCoordinates};
use crate::output::inner_html;
use serde::Serialize;

/// The outcome of an operation, in a form that implements [`Serialize`]: the root's new inner HTML, and the
/// resulting range as coordinates relative to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SerializableResult {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeCoordinates>,
}

impl SerializableResult {
    pub fn new(dom: &Dom, root: NodeId, range: &Range) -> Self {
        Self {
            html: inner_html(dom, root),
            range: range_coordinates(dom, range, root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;
    use crate::location::Point;

    #[test]
    fn json_shape() {
        unwrap!(parse_fragment("11<b>22</b>"), Ok(dom));
        let root = dom.root();
        let bold = dom.children(root)[1];
        let text = dom.children(bold)[0];
        let range = Range::new(Point::new(text, 0), Point::new(text, 2));

        let result = SerializableResult::new(&dom, root, &range);
        unwrap!(serde_json::to_value(&result), Ok(json));
        assert_eq!(
            json,
            serde_json::json!({
                "html": "11<b>22</b>",
                "range": {
                    "start": {"path": [1, 0], "offset": 0},
                    "end": {"path": [1, 0], "offset": 2}
                }
            })
        );
    }

    use crate::util::utils_for_test::*;
}
