use crate::dom::{Dom, NodeId};
use std::fmt;
use std::fmt::Write;

/// Elements that are written without a closing tag (and can't have children).
const VOID_TAGS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// The HTML of the node's children, like the DOM's `innerHTML`.
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    // Writing to a String never fails.
    let _ = write_inner_html(dom, id, &mut out);
    out
}

/// The HTML of the node itself, like the DOM's `outerHTML`.
pub fn outer_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    let _ = write_outer_html(dom, id, &mut out);
    out
}

pub fn write_inner_html<W: Write>(dom: &Dom, id: NodeId, out: &mut W) -> fmt::Result {
    for &child in dom.children(id) {
        write_outer_html(dom, child, out)?;
    }
    Ok(())
}

pub fn write_outer_html<W: Write>(dom: &Dom, id: NodeId, out: &mut W) -> fmt::Result {
    if let Some(text) = dom.text(id) {
        return write_escaped(out, text, Escape::Text);
    }
    let Some(data) = dom.element(id) else {
        return Ok(());
    };
    out.write_char('<')?;
    out.write_str(data.tag())?;
    for (name, value) in data.attributes() {
        out.write_char(' ')?;
        out.write_str(name)?;
        out.write_str("=\"")?;
        write_escaped(out, value, Escape::Attribute)?;
        out.write_char('"')?;
    }
    out.write_char('>')?;
    if is_void_tag(data.tag()) && dom.children(id).is_empty() {
        return Ok(());
    }
    write_inner_html(dom, id, out)?;
    out.write_str("</")?;
    out.write_str(data.tag())?;
    out.write_char('>')
}

#[derive(Copy, Clone)]
enum Escape {
    Text,
    Attribute,
}

fn write_escaped<W: Write>(out: &mut W, mut text: &str, escape: Escape) -> fmt::Result {
    loop {
        let next = match escape {
            Escape::Text => memchr::memchr3(b'&', b'<', b'>', text.as_bytes()),
            Escape::Attribute => memchr::memchr2(b'&', b'"', text.as_bytes()),
        };
        let Some(idx) = next else {
            return out.write_str(text);
        };
        out.write_str(&text[..idx])?;
        out.write_str(match text.as_bytes()[idx] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            _ => "&quot;",
        })?;
        text = &text[idx + 1..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;

    #[test]
    fn escapes_text() {
        let mut dom = Dom::new();
        let text = dom.create_text("a < b & c > d \"e\"");
        dom.append_child(dom.root(), text);
        assert_eq!(inner_html(&dom, dom.root()), "a &lt; b &amp; c &gt; d \"e\"");
    }

    #[test]
    fn escapes_attributes() {
        let mut dom = Dom::new();
        let span = dom.create_element(ElementData::new("span").with_attr("title", "a \"b\" & <c>"));
        dom.append_child(dom.root(), span);
        assert_eq!(
            inner_html(&dom, dom.root()),
            r#"<span title="a &quot;b&quot; &amp; <c>"></span>"#
        );
    }

    #[test]
    fn outer_includes_self() {
        let mut dom = Dom::new();
        let b = dom.create_element(ElementData::new("b"));
        dom.append_child(dom.root(), b);
        let br = dom.create_element(ElementData::new("br"));
        dom.append_child(b, br);
        assert_eq!(outer_html(&dom, b), "<b><br></b>");
        assert_eq!(outer_html(&dom, dom.root()), "<body><b><br></b></body>");
    }
}
