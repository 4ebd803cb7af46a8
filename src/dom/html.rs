use crate::dom::{Dom, ElementData, NodeId};
use pest::Parser;
use pest_derive::Parser;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Parser)]
#[grammar = "dom/html.pest"] // relative to src
struct HtmlPairs;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// An error from parsing an HTML fragment, with the span rendering from pest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HtmlParseError {
    pest_error: Rc<pest::error::Error<Rule>>,
}

impl Display for HtmlParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.pest_error, f)
    }
}

impl std::error::Error for HtmlParseError {}

impl From<pest::error::Error<Rule>> for HtmlParseError {
    fn from(value: pest::error::Error<Rule>) -> Self {
        Self {
            pest_error: Rc::new(value),
        }
    }
}

/// Parses an HTML fragment into a new [`Dom`], under its root.
pub fn parse_fragment(html: &str) -> Result<Dom, HtmlParseError> {
    let mut dom = Dom::new();
    let root = dom.root();
    parse_into(&mut dom, root, html)?;
    Ok(dom)
}

/// Parses an HTML fragment, appending its top-level nodes to `parent`.
///
/// Comments are dropped. Entities are decoded in text and attribute values.
pub fn parse_into(dom: &mut Dom, parent: NodeId, html: &str) -> Result<(), HtmlParseError> {
    let mut fragment = HtmlPairs::parse(Rule::fragment, html).map_err(format_err)?;
    let Some(fragment) = fragment.next() else {
        return Ok(());
    };
    for pair in fragment.into_inner() {
        append_node(dom, parent, pair);
    }
    Ok(())
}

fn format_err(err: pest::error::Error<Rule>) -> HtmlParseError {
    let renamed = err.renamed_rules(|rule| {
        match rule {
            Rule::EOI => "end of input",
            Rule::fragment => "HTML fragment",
            Rule::comment => "comment",
            Rule::element | Rule::void_element | Rule::self_closing | Rule::paired_element => "element",
            Rule::void_tag_name | Rule::tag_name => "tag name",
            Rule::attribute | Rule::attr_name => "attribute",
            Rule::double_quoted | Rule::single_quoted | Rule::unquoted => "attribute value",
            Rule::text => "text",
            _ => "valid HTML",
        }
        .to_string()
    });
    HtmlParseError::from(renamed)
}

fn append_node(dom: &mut Dom, parent: NodeId, pair: Pair) {
    match pair.as_rule() {
        Rule::text => {
            let text = dom.create_text(decode_entities(pair.as_str()));
            dom.append_child(parent, text);
        }
        Rule::element => {
            for inner in pair.into_inner() {
                append_element(dom, parent, inner);
            }
        }
        _ => {}
    }
}

fn append_element(dom: &mut Dom, parent: NodeId, pair: Pair) {
    let mut element: Option<NodeId> = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::void_tag_name | Rule::tag_name => {
                let id = dom.create_element(ElementData::new(inner.as_str()));
                dom.append_child(parent, id);
                element = Some(id);
            }
            Rule::attribute => {
                if let Some(data) = element.and_then(|id| dom.element_mut(id)) {
                    let (name, value) = read_attribute(inner);
                    data.set_attr(name, value);
                }
            }
            _ => {
                if let Some(id) = element {
                    append_node(dom, id, inner);
                }
            }
        }
    }
}

fn read_attribute(pair: Pair) -> (String, String) {
    let mut name = String::new();
    let mut value = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_name => name = inner.as_str().to_ascii_lowercase(),
            _ => value = decode_entities(inner.as_str()).into_owned(),
        }
    }
    (name, value)
}

/// Decodes the character references this parser understands: the common named ones, plus decimal and hex numeric
/// references. Anything else (including a reference without its closing `;`) is left as-is.
pub(crate) fn decode_entities(text: &str) -> Cow<str> {
    let Some(first_amp) = memchr::memchr(b'&', text.as_bytes()) else {
        return Cow::Borrowed(text);
    };
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..first_amp]);
    let mut remaining = &text[first_amp..];
    while let Some(amp) = memchr::memchr(b'&', remaining.as_bytes()) {
        out.push_str(&remaining[..amp]);
        remaining = &remaining[amp..];
        match decode_one(remaining) {
            Some((ch, consumed)) => {
                out.push(ch);
                remaining = &remaining[consumed..];
            }
            None => {
                out.push('&');
                remaining = &remaining[1..];
            }
        }
    }
    out.push_str(remaining);
    Cow::Owned(out)
}

/// Given text that starts with `&`, decodes the reference at its start. Returns the char and how many bytes of
/// `text` the reference took up.
fn decode_one(text: &str) -> Option<(char, usize)> {
    let semi = text.find(';')?;
    let body = &text[1..semi];
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?
        }
    };
    Some((ch, semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::inner_html;

    fn round_trip(html: &str) -> String {
        unwrap!(parse_fragment(html), Ok(dom));
        inner_html(&dom, dom.root())
    }

    #[test]
    fn plain_text() {
        unwrap!(parse_fragment("111222"), Ok(dom));
        let root = dom.root();
        let text = get_only(dom.children(root));
        assert_eq!(dom.text(*text), Some("111222"));
    }

    #[test]
    fn empty_fragment() {
        unwrap!(parse_fragment(""), Ok(dom));
        assert!(dom.children(dom.root()).is_empty());
    }

    #[test]
    fn nested_elements() {
        let html = "11<b>22<i>33</i></b>44";
        assert_eq!(round_trip(html), html);
        unwrap!(parse_fragment(html), Ok(dom));
        let root_children = dom.children(dom.root());
        assert_eq!(root_children.len(), 3);
        assert_eq!(dom.element(root_children[1]).map(ElementData::tag), Some("b"));
    }

    #[test]
    fn void_elements() {
        assert_eq!(round_trip("before<br>after"), "before<br>after");
        assert_eq!(round_trip("before<BR/>after"), "before<br>after");
        assert_eq!(round_trip("<img src=a.png>"), r#"<img src="a.png">"#);
    }

    #[test]
    fn self_closing_non_void() {
        assert_eq!(round_trip("<span/>x"), "<span></span>x");
    }

    #[test]
    fn attributes() {
        unwrap!(
            parse_fragment(r#"<span style="font-weight: bold" data-x='a"b' hidden>x</span>"#),
            Ok(dom)
        );
        let span = *get_only(dom.children(dom.root()));
        unwrap!(dom.element(span), Some(data));
        assert_eq!(data.attr("style"), Some("font-weight: bold"));
        assert_eq!(data.attr("data-x"), Some("a\"b"));
        assert_eq!(data.attr("hidden"), Some(""));
    }

    #[test]
    fn entities() {
        unwrap!(parse_fragment("a &lt;b&gt; &amp; &#65;&#x42; &bogus; &amp"), Ok(dom));
        assert_eq!(dom.text_content(dom.root()), "a <b> & AB &bogus; &amp");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        unwrap!(parse_fragment("1 < 2"), Ok(dom));
        assert_eq!(dom.text_content(dom.root()), "1 < 2");
    }

    #[test]
    fn comments_dropped() {
        assert_eq!(round_trip("a<!-- hi -->b"), "ab");
    }

    #[test]
    fn mismatched_close_tag() {
        unwrap!(parse_fragment("<b>x</i>"), Err(err));
        assert!(err.to_string().contains("1:"), "{err}");
    }

    #[test]
    fn unclosed_tag() {
        unwrap!(parse_fragment("<b>x"), Err(_));
    }

    use crate::util::utils_for_test::*;
}
