use crate::dom::ElementData;
use crate::surround::{Classification, Matcher};
use std::fmt::{Debug, Formatter};

/// Describes a format: how to recognize it, and (optionally) how to create it.
///
/// ```
/// use surround::dom::ElementData;
/// use surround::surround::{SurroundFormat, TagMatcher};
///
/// let bold = SurroundFormat::new(ElementData::new("b"), TagMatcher::new(["b", "strong"]));
/// assert_eq!(bold.construct().map(|e| e.tag().to_string()), Some("b".to_string()));
///
/// let any_bold = SurroundFormat::unsurround_only(TagMatcher::new(["b", "strong"]));
/// assert!(any_bold.construct().is_none());
/// ```
pub struct SurroundFormat {
    template: Option<ElementData>,
    matcher: Box<dyn Matcher>,
}

impl SurroundFormat {
    pub fn new(template: ElementData, matcher: impl Matcher + 'static) -> Self {
        Self {
            template: Some(template),
            matcher: Box::new(matcher),
        }
    }

    /// A format that can only be removed. Surrounding or reformatting with it fails with
    /// [`crate::surround::Error::MissingConstructor`].
    pub fn unsurround_only(matcher: impl Matcher + 'static) -> Self {
        Self {
            template: None,
            matcher: Box::new(matcher),
        }
    }

    /// A fresh wrapper element for this format.
    pub fn construct(&self) -> Option<ElementData> {
        self.template.clone()
    }

    pub fn classify(&self, element: &ElementData) -> Classification {
        self.matcher.classify(element)
    }
}

impl Debug for SurroundFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurroundFormat")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}
