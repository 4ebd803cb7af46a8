use crate::dom::ElementData;
use fancy_regex::Regex;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// A continuation that finishes un-formatting an element by editing its attributes, rather than removing it.
pub type ClearFn = Rc<dyn Fn(&mut ElementData)>;

/// What a matched element means for the format.
#[derive(Clone)]
pub enum MatchResult {
    /// The element doesn't carry the format.
    NoMatch,
    /// The element carries the format, and is nothing but the format: removing the format means removing the
    /// element (keeping its children).
    Remove,
    /// The element carries the format as part of its attributes. Removing the format means applying the function
    /// to the element. If that leaves a `span` with no attributes at all, the element is removed as with
    /// [`MatchResult::Remove`]; otherwise it stays.
    Clear(ClearFn),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    /// Whether two results are the same kind of match. Two `Clear`s are always considered the same, since their
    /// functions can't be compared.
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Debug for MatchResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::NoMatch => f.write_str("NoMatch"),
            MatchResult::Remove => f.write_str("Remove"),
            MatchResult::Clear(_) => f.write_str("Clear(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Classification {
    /// Whether the element is a block. Formatting never extends across blocks.
    pub is_block: bool,
    pub result: MatchResult,
}

impl Classification {
    pub fn consistent_with(&self, other: &Self) -> bool {
        self.is_block == other.is_block && self.result.same_kind(&other.result)
    }
}

/// Recognizes existing instances of a format.
///
/// Classification must be a pure function of the element's tag and attributes: the engine assumes that classifying
/// the same element twice gives the same answer.
pub trait Matcher {
    fn classify(&self, element: &ElementData) -> Classification;
}

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.iter().any(|block| block.eq_ignore_ascii_case(tag))
}

/// Matches elements by tag name, removing them when unsurrounding.
#[derive(Clone, Debug)]
pub struct TagMatcher {
    tags: Vec<String>,
}

impl TagMatcher {
    pub fn new<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for TagMatcher {
    fn classify(&self, element: &ElementData) -> Classification {
        let result = if self.tags.iter().any(|tag| element.is_tag(tag)) {
            MatchResult::Remove
        } else {
            MatchResult::NoMatch
        };
        Classification {
            is_block: is_block_tag(element.tag()),
            result,
        }
    }
}

/// Matches elements whose inline `style` has a declaration for a property, with a value that matches a regex.
///
/// Unsurrounding clears that declaration from the element.
#[derive(Clone, Debug)]
pub struct StyleMatcher {
    property: String,
    value: Regex,
}

impl StyleMatcher {
    pub fn new(property: impl Into<String>, value: Regex) -> Self {
        let mut property = property.into();
        property.make_ascii_lowercase();
        Self { property, value }
    }

    fn matches_value(&self, value: &str) -> bool {
        match self.value.is_match(value) {
            Ok(matched) => matched,
            Err(err) => {
                log::warn!("couldn't evaluate style regex {:?} against {value:?}: {err}", self.value.as_str());
                false
            }
        }
    }
}

impl Matcher for StyleMatcher {
    fn classify(&self, element: &ElementData) -> Classification {
        let matched = element
            .style_declarations()
            .iter()
            .any(|(property, value)| property == &self.property && self.matches_value(value));
        let result = if matched {
            let property = self.property.clone();
            MatchResult::Clear(Rc::new(move |element: &mut ElementData| {
                let mut declarations = element.style_declarations();
                declarations.retain(|(existing, _)| existing != &property);
                element.set_style_declarations(&declarations);
            }))
        } else {
            MatchResult::NoMatch
        };
        Classification {
            is_block: is_block_tag(element.tag()),
            result,
        }
    }
}

/// Combines several matchers: an element is a block if any of them says so, and its match result is the first one
/// that isn't [`MatchResult::NoMatch`].
#[derive(Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn push(&mut self, matcher: impl Matcher + 'static) {
        self.matchers.push(Box::new(matcher));
    }
}

impl Matcher for AnyMatcher {
    fn classify(&self, element: &ElementData) -> Classification {
        let mut combined = Classification {
            is_block: false,
            result: MatchResult::NoMatch,
        };
        for matcher in &self.matchers {
            let Classification { is_block, result } = matcher.classify(element);
            combined.is_block |= is_block;
            if !combined.result.is_match() {
                combined.result = result;
            }
        }
        combined
    }
}
