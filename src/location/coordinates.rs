use crate::dom::{Dom, NodeId};
use crate::location::{InvalidRange, Point, Range};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A boundary point described by position rather than identity, so that it can be saved and later restored against
/// a re-parsed (or otherwise rebuilt) document.
///
/// The textual form is the path's child indexes joined by `.`, then `:` and the offset. For example, `1.0:3` is
/// offset 3 within the first child of the root's second child. The empty path is the root itself (`:3`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointCoordinates {
    pub path: Vec<usize>,
    pub offset: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeCoordinates {
    pub start: PointCoordinates,
    pub end: PointCoordinates,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CoordinatesError {
    /// The text isn't of the form `1.2:3`.
    Syntax(String),
    /// No node exists at the path.
    NoSuchNode(Vec<usize>),
    Range(InvalidRange),
}

impl Display for CoordinatesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatesError::Syntax(text) => {
                write!(f, "invalid coordinates {text:?}: expected a form like \"1.0:3\"")
            }
            CoordinatesError::NoSuchNode(path) => {
                write!(f, "no node at path {}", FormattedPath(path))
            }
            CoordinatesError::Range(err) => Display::fmt(err, f),
        }
    }
}

impl std::error::Error for CoordinatesError {}

impl From<InvalidRange> for CoordinatesError {
    fn from(value: InvalidRange) -> Self {
        Self::Range(value)
    }
}

struct FormattedPath<'a>(&'a [usize]);

impl Display for FormattedPath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Display for PointCoordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", FormattedPath(&self.path), self.offset)
    }
}

impl FromStr for PointCoordinates {
    type Err = CoordinatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax_err = || CoordinatesError::Syntax(s.to_string());
        let (path_str, offset_str) = s.trim().rsplit_once(':').ok_or_else(syntax_err)?;
        let offset = offset_str.parse().map_err(|_| syntax_err())?;
        let path = if path_str.is_empty() {
            Vec::new()
        } else {
            path_str
                .split('.')
                .map(|segment| segment.parse().map_err(|_| syntax_err()))
                .collect::<Result<_, _>>()?
        };
        Ok(Self { path, offset })
    }
}

impl PointCoordinates {
    pub fn resolve(&self, dom: &Dom, root: NodeId) -> Result<Point, CoordinatesError> {
        let node = find_node_from_coordinates(dom, root, &self.path)
            .ok_or_else(|| CoordinatesError::NoSuchNode(self.path.clone()))?;
        Ok(Point::new(node, self.offset))
    }
}

impl RangeCoordinates {
    /// Turns the coordinates back into a range against `root`, checking that the range is valid.
    pub fn resolve(&self, dom: &Dom, root: NodeId) -> Result<Range, CoordinatesError> {
        let range = Range::new(self.start.resolve(dom, root)?, self.end.resolve(dom, root)?);
        range.validate(dom, root)?;
        Ok(range)
    }
}

/// The chain of child indexes leading from `root` down to `node`, or `None` if `node` isn't within `root`.
pub fn node_coordinates(dom: &Dom, node: NodeId, root: NodeId) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node;
    while current != root {
        path.push(dom.index_in_parent(current)?);
        current = dom.parent(current)?;
    }
    path.reverse();
    Some(path)
}

pub fn find_node_from_coordinates(dom: &Dom, root: NodeId, path: &[usize]) -> Option<NodeId> {
    path.iter()
        .try_fold(root, |current, &idx| dom.children(current).get(idx).copied())
}

pub fn point_coordinates(dom: &Dom, point: Point, root: NodeId) -> Option<PointCoordinates> {
    Some(PointCoordinates {
        path: node_coordinates(dom, point.node, root)?,
        offset: point.offset,
    })
}

pub fn range_coordinates(dom: &Dom, range: &Range, root: NodeId) -> Option<RangeCoordinates> {
    Some(RangeCoordinates {
        start: point_coordinates(dom, range.start, root)?,
        end: point_coordinates(dom, range.end, root)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn node_round_trip() {
        unwrap!(parse_fragment("11<b>22<i>33</i></b>44"), Ok(dom));
        let root = dom.root();
        let bold = dom.children(root)[1];
        let italic_text = dom.children(dom.children(bold)[1])[0];

        unwrap!(node_coordinates(&dom, italic_text, root), Some(path));
        assert_eq!(path, vec![1, 1, 0]);
        assert_eq!(find_node_from_coordinates(&dom, root, &path), Some(italic_text));
        assert_eq!(node_coordinates(&dom, root, root), Some(vec![]));
        assert_eq!(node_coordinates(&dom, root, bold), None);
        assert_eq!(find_node_from_coordinates(&dom, root, &[5]), None);
    }

    #[test]
    fn parse_text_form() {
        assert_eq!(
            "1.0:3".parse::<PointCoordinates>(),
            Ok(PointCoordinates {
                path: vec![1, 0],
                offset: 3
            })
        );
        assert_eq!(
            ":2".parse::<PointCoordinates>(),
            Ok(PointCoordinates {
                path: vec![],
                offset: 2
            })
        );
        assert_eq!(
            "1.x:3".parse::<PointCoordinates>(),
            Err(CoordinatesError::Syntax("1.x:3".to_string()))
        );
        assert_eq!(
            "3".parse::<PointCoordinates>(),
            Err(CoordinatesError::Syntax("3".to_string()))
        );
    }

    #[test]
    fn display_text_form() {
        let coords = PointCoordinates {
            path: vec![1, 0],
            offset: 3,
        };
        assert_eq!(coords.to_string(), "1.0:3");
        assert_eq!(PointCoordinates::default().to_string(), ":0");
    }

    #[test]
    fn range_round_trip_across_documents() {
        unwrap!(parse_fragment("11<b>22</b>33"), Ok(original));
        let root = original.root();
        let bold = original.children(root)[1];
        unwrap!(Range::select_node(&original, bold), Ok(range));
        unwrap!(range_coordinates(&original, &range, root), Some(coords));

        unwrap!(parse_fragment("11<b>22</b>33"), Ok(reparsed));
        unwrap!(coords.resolve(&reparsed, reparsed.root()), Ok(restored));
        assert_eq!(restored.text(&reparsed), "22");
    }

    #[test]
    fn resolve_out_of_bounds() {
        unwrap!(parse_fragment("11"), Ok(dom));
        let coords = RangeCoordinates {
            start: PointCoordinates {
                path: vec![0],
                offset: 0,
            },
            end: PointCoordinates {
                path: vec![0],
                offset: 5,
            },
        };
        unwrap!(
            coords.resolve(&dom, dom.root()),
            Err(CoordinatesError::Range(InvalidRange::OffsetOutOfBounds { .. }))
        );
        let coords = RangeCoordinates {
            start: PointCoordinates {
                path: vec![3],
                offset: 0,
            },
            end: PointCoordinates::default(),
        };
        assert_eq!(
            coords.resolve(&dom, dom.root()),
            Err(CoordinatesError::NoSuchNode(vec![3]))
        );
    }

    use crate::util::utils_for_test::*;
}
