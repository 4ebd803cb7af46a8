//! Surround a selection with an inline format, or remove the format from it, normalizing the tree as it goes.
//!
//! An operation rebuilds a single subtree of the document:
//!
//! 1. **Build:** the subtree is snapshotted into a forest of [`TreeNode`]s. Elements the format's [`Matcher`]
//!    recognizes become formatting nodes, blocks become block nodes, and text is split at the selection's edges.
//! 2. **Extend and merge:** each leaf is marked as wanting the format or not. Matched wrappers are dissolved, inline
//!    elements whose content all wants the format are absorbed whole, and each maximal run of formatted content is
//!    grouped for a single wrapper.
//! 3. **Apply:** each run gets its wrapper. Existing matched elements are reused (by identity) before new ones are
//!    constructed.
//! 4. **Commit:** the live tree is rearranged to match, and anything no longer needed is freed. The returned range
//!    is found again by the identity of the leaves it covered.
//!
//! ```
//! use surround::dom::{parse_fragment, ElementData};
//! use surround::location::Range;
//! use surround::output::inner_html;
//! use surround::surround::{surround, SurroundFormat, TagMatcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dom = parse_fragment("before<u><b>after</b></u>")?;
//! let root = dom.root();
//! let before = dom.children(root)[0];
//!
//! let bold = SurroundFormat::new(ElementData::new("b"), TagMatcher::new(["b"]));
//! let selection = Range::select_node(&dom, before)?;
//! let range = surround(&mut dom, selection, root, &bold)?;
//!
//! assert_eq!(inner_html(&dom, root), "<b>before<u>after</u></b>");
//! assert_eq!(range.text(&dom), "before");
//! # Ok(())
//! # }
//! ```
mod apply;
mod build;
mod error;
mod extend_merge;
mod format;
mod matcher;
mod operation;
pub mod tree;

pub use error::*;
pub use format::*;
pub use matcher::*;
pub use operation::*;
pub use tree::TreeNode;
