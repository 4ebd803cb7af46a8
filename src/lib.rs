//! Surround a selection of an HTML fragment with inline formatting, or remove formatting from it, in place.
//!
//! The engine works on a small arena-backed document tree ([`dom::Dom`]). Given a [`location::Range`] within it and
//! a [`surround::SurroundFormat`] (a wrapper element, plus a [`surround::Matcher`] that recognizes existing instances
//! of it), the operations in [`surround`] restructure the tree so that exactly the intended content carries the
//! format, with no redundant nesting, no adjacent duplicate wrappers, and no empty wrappers left behind.
//!
//! ```
//! use surround::dom::{parse_fragment, ElementData};
//! use surround::location::{Point, Range};
//! use surround::output::inner_html;
//! use surround::surround::{unsurround, SurroundFormat, TagMatcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dom = parse_fragment("<b>112233</b>")?;
//! let root = dom.root();
//! let bold = dom.children(root)[0];
//! let text = dom.children(bold)[0];
//!
//! let format = SurroundFormat::new(ElementData::new("b"), TagMatcher::new(["b", "strong"]));
//! let range = unsurround(&mut dom, Range::new(Point::new(text, 2), Point::new(text, 4)), root, &format)?;
//!
//! assert_eq!(inner_html(&dom, root), "<b>11</b>22<b>33</b>");
//! assert_eq!(range.text(&dom), "22");
//! # Ok(())
//! # }
//! ```
//!
//! The [`run`] module drives all of this end to end, the way the `surround` CLI does.
pub mod dom;
pub mod location;
pub mod output;
pub mod run;
pub mod surround;
