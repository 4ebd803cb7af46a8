//! Writing a document back out: as HTML, or as a JSON result that also carries the selection's coordinates.
mod fmt_html;
mod output_adapter;
mod serde_result;

pub use fmt_html::*;
pub use output_adapter::*;
pub use serde_result::*;
