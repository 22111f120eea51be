use crate::error::SvgTextError;

use super::xml::{SvgDocument, XmlEvent};

pub const SYSTEM_LANGUAGE: &str = "systemLanguage";

/// Event range of one element: `start` is its `Start`/`Empty` event, `end` its `End`
/// event (equal to `start` for empty elements).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementSpan {
    pub start: usize,
    pub end: usize,
}

impl ElementSpan {
    pub fn is_empty_element(&self) -> bool {
        self.start == self.end
    }
}

/// Start-to-end index over a document's event list.
pub struct ElementIndex {
    end_of: Vec<usize>,
}

impl ElementIndex {
    pub fn build(doc: &SvgDocument) -> Self {
        let mut end_of: Vec<usize> = (0..doc.events.len()).collect();
        let mut stack: Vec<usize> = Vec::new();
        for (idx, ev) in doc.events.iter().enumerate() {
            match ev {
                XmlEvent::Start { .. } => stack.push(idx),
                XmlEvent::End { .. } => {
                    if let Some(open) = stack.pop() {
                        end_of[open] = idx;
                    }
                }
                _ => {}
            }
        }
        Self { end_of }
    }

    pub fn span(&self, start: usize) -> ElementSpan {
        ElementSpan {
            start,
            end: self.end_of[start],
        }
    }

    /// All elements with local name `local`, in document order.
    pub fn descendants(&self, doc: &SvgDocument, local: &str) -> Vec<ElementSpan> {
        doc.events
            .iter()
            .enumerate()
            .filter(|(_, ev)| matches!(ev, XmlEvent::Start { .. } | XmlEvent::Empty { .. }))
            .filter(|(_, ev)| ev.element_name().map(local_name) == Some(local))
            .map(|(idx, _)| self.span(idx))
            .collect()
    }

    /// Direct child elements of `parent` with local name `local`, in document order.
    pub fn children(&self, doc: &SvgDocument, parent: ElementSpan, local: &str) -> Vec<ElementSpan> {
        let mut out = Vec::new();
        if parent.is_empty_element() {
            return out;
        }
        let mut i = parent.start + 1;
        while i < parent.end {
            let ev = &doc.events[i];
            match ev {
                XmlEvent::Start { .. } | XmlEvent::Empty { .. } => {
                    let span = self.span(i);
                    if ev.element_name().map(local_name) == Some(local) {
                        out.push(span);
                    }
                    i = span.end + 1;
                }
                _ => i += 1,
            }
        }
        out
    }
}

/// `svg:text` -> `text`.
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// The non-empty `systemLanguage` of the element starting at `span`.
pub fn language_tag(doc: &SvgDocument, span: ElementSpan) -> Option<String> {
    doc.events[span.start]
        .attr(SYSTEM_LANGUAGE)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Character data directly inside `span` (not inside child elements).
pub fn direct_text(doc: &SvgDocument, index: &ElementIndex, span: ElementSpan) -> String {
    let mut text = String::new();
    if span.is_empty_element() {
        return text;
    }
    let mut i = span.start + 1;
    while i < span.end {
        match &doc.events[i] {
            XmlEvent::Text { text: t } | XmlEvent::CData { text: t } => {
                text.push_str(t);
                i += 1;
            }
            XmlEvent::Start { .. } => i = index.span(i).end + 1,
            _ => i += 1,
        }
    }
    text
}

/// Raw text fragments of a `<text>` element: one per direct `<tspan>` child, or the
/// element's own character data when it has no tspans.
///
/// A tspan nested inside another tspan cannot be aligned by position and is reported
/// as [`SvgTextError::NestedTspans`].
pub fn extract_text_from_node(
    doc: &SvgDocument,
    index: &ElementIndex,
    text_elem: ElementSpan,
) -> Result<Vec<String>, SvgTextError> {
    let tspans = index.children(doc, text_elem, "tspan");
    if tspans.is_empty() {
        return Ok(vec![direct_text(doc, index, text_elem)]);
    }
    let mut fragments = Vec::with_capacity(tspans.len());
    for tspan in tspans {
        if !index.children(doc, tspan, "tspan").is_empty() {
            return Err(SvgTextError::NestedTspans {
                element: doc.events[tspan.start].attr("id"),
            });
        }
        fragments.push(direct_text(doc, index, tspan));
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::xml::parse_svg;

    fn doc(xml: &str) -> SvgDocument {
        parse_svg("t.svg", xml.as_bytes()).expect("parse svg")
    }

    #[test]
    fn children_and_descendants_by_local_name() {
        let d = doc(r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:switch><svg:text systemLanguage="de">a</svg:text><svg:g><svg:text>n</svg:text></svg:g><svg:text>b</svg:text></svg:switch></svg:svg>"#);
        let idx = ElementIndex::build(&d);
        let switches = idx.descendants(&d, "switch");
        assert_eq!(switches.len(), 1);
        let texts = idx.children(&d, switches[0], "text");
        assert_eq!(texts.len(), 2);
        assert_eq!(language_tag(&d, texts[0]).as_deref(), Some("de"));
        assert_eq!(language_tag(&d, texts[1]), None);
        assert_eq!(idx.descendants(&d, "text").len(), 3);
    }

    #[test]
    fn fragments_follow_tspans_in_order() {
        let d = doc(r#"<svg><text> <tspan>One</tspan> <tspan/> <tspan>Two <a>x</a>!</tspan></text></svg>"#);
        let idx = ElementIndex::build(&d);
        let text = idx.descendants(&d, "text")[0];
        let fragments = extract_text_from_node(&d, &idx, text).expect("fragments");
        assert_eq!(fragments, vec!["One", "", "Two !"]);
    }

    #[test]
    fn text_without_tspans_is_one_fragment() {
        let d = doc(r#"<svg><text>Plain</text><text/></svg>"#);
        let idx = ElementIndex::build(&d);
        let texts = idx.descendants(&d, "text");
        assert_eq!(extract_text_from_node(&d, &idx, texts[0]).expect("plain"), vec!["Plain"]);
        assert_eq!(extract_text_from_node(&d, &idx, texts[1]).expect("empty"), vec![""]);
    }

    #[test]
    fn nested_tspans_are_reported() {
        let d = doc(r#"<svg><text><tspan id="outer">a<tspan>b</tspan></tspan></text></svg>"#);
        let idx = ElementIndex::build(&d);
        let text = idx.descendants(&d, "text")[0];
        let err = extract_text_from_node(&d, &idx, text).expect_err("nested");
        assert!(matches!(err, SvgTextError::NestedTspans { element: Some(ref id) } if id == "outer"));
    }
}
