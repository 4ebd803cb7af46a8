//! The live document the surround engine operates on.
//!
//! A [`Dom`] is a small, arena-backed stand-in for a browser DOM: text nodes and elements, each with a stable
//! [`NodeId`] and a parent link. [`parse_fragment`] builds one from an HTML fragment, and
//! [`crate::output::inner_html`] serializes it back.
mod html;
mod node;

pub use html::*;
pub use node::*;
