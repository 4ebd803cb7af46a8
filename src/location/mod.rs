//! Boundary points and ranges over a [`crate::dom::Dom`].
//!
//! [`Range`] is identity-based: its points refer to nodes by [`crate::dom::NodeId`]. [`RangeCoordinates`] is the
//! position-based equivalent, which survives re-parsing a document and is what the CLI reads and writes.
mod coordinates;
mod range;

pub use coordinates::*;
pub use range::*;
