use crate::dom::NodeId;
use crate::location::InvalidRange;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The range can't be used. Nothing was changed.
    InvalidRange(InvalidRange),
    /// After the document was restructured, a leaf at the edge of the selection was no longer within the root.
    UnreconcilableBoundary(NodeId),
    /// The matcher gave different answers for the same element.
    MatcherInconsistency(NodeId),
    /// Surround or reformat needs to create wrappers, but the format can't construct them.
    MissingConstructor,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidRange(err) => write!(f, "invalid range: {err}"),
            Error::UnreconcilableBoundary(node) => {
                write!(f, "couldn't find selection boundary {node} after applying the format")
            }
            Error::MatcherInconsistency(node) => {
                write!(f, "matcher classified {node} inconsistently")
            }
            Error::MissingConstructor => f.write_str("format can only be removed, not applied"),
        }
    }
}

impl std::error::Error for Error {}

impl From<InvalidRange> for Error {
    fn from(value: InvalidRange) -> Self {
        Self::InvalidRange(value)
    }
}
