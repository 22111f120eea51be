use std::borrow::Cow;
use std::path::Path;

use anyhow::{anyhow, Context};
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::bytes::Regex;

static DECL_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:\-]+)["']"#).expect("decl regex")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlEvent {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    PI {
        content: String,
    },
    DocType {
        text: String,
    },
}

impl XmlEvent {
    /// Qualified element name for `Start`, `Empty` and `End` events.
    pub fn element_name(&self) -> Option<&str> {
        match self {
            XmlEvent::Start { name, .. } | XmlEvent::Empty { name, .. } | XmlEvent::End { name } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    pub fn attrs(&self) -> Option<&[(String, String)]> {
        match self {
            XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } => Some(attrs.as_slice()),
            _ => None,
        }
    }

    /// Unescaped value of attribute `key` on a start-like event.
    pub fn attr(&self, key: &str) -> Option<String> {
        let (_, raw) = self.attrs()?.iter().find(|(k, _)| k == key)?;
        Some(
            quick_xml::escape::unescape(raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.clone()),
        )
    }

    /// Sets attribute `key` to the (unescaped) `value`, appending it when absent.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        if let XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } = self {
            let escaped = quick_xml::escape::escape(value).into_owned();
            for (k, v) in attrs.iter_mut() {
                if k == key {
                    *v = escaped;
                    return;
                }
            }
            attrs.push((key.to_string(), escaped));
        }
    }
}

/// A parsed SVG file kept as a flat, lossless event list.
#[derive(Clone, Debug)]
pub struct SvgDocument {
    pub name: String,
    pub events: Vec<XmlEvent>,
}

pub fn read_svg(path: &Path) -> anyhow::Result<SvgDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("read svg: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_svg(&name, &bytes).with_context(|| format!("parse svg: {}", path.display()))
}

pub fn parse_svg(name: &str, bytes: &[u8]) -> anyhow::Result<SvgDocument> {
    let (text, transcoded) = decode_svg_bytes(bytes)?;
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(false);

    let mut events = Vec::new();
    let mut open: Vec<String> = Vec::new();
    loop {
        let event = match reader.read_event().context("read xml event")? {
            Event::Eof => break,
            other => lift_event(other, transcoded)?,
        };
        match &event {
            XmlEvent::Start { name, .. } => open.push(name.clone()),
            XmlEvent::End { .. } => {
                open.pop();
            }
            _ => {}
        }
        events.push(event);
    }

    if let Some(unclosed) = open.last() {
        return Err(anyhow!("<{unclosed}> is never closed in {name}"));
    }
    if !events.iter().any(|ev| ev.attrs().is_some()) {
        return Err(anyhow!("no root element in {name}"));
    }

    Ok(SvgDocument {
        name: name.to_string(),
        events,
    })
}

/// Converts one reader event into the owned form kept in [`SvgDocument`].
fn lift_event(event: Event<'_>, transcoded: bool) -> anyhow::Result<XmlEvent> {
    let lifted = match event {
        Event::Decl(decl) => {
            // Transcoded input is written back as UTF-8, so its declaration must say so.
            let encoding = if transcoded {
                Some("UTF-8".to_string())
            } else {
                decl.encoding().and_then(Result::ok).map(lossy)
            };
            XmlEvent::Decl {
                version: lossy(decl.version().context("xml declaration without version")?),
                encoding,
                standalone: decl.standalone().and_then(Result::ok).map(lossy),
            }
        }
        Event::Start(start) => XmlEvent::Start {
            name: lossy(start.name().as_ref()),
            attrs: raw_attrs(&start)?,
        },
        Event::Empty(start) => XmlEvent::Empty {
            name: lossy(start.name().as_ref()),
            attrs: raw_attrs(&start)?,
        },
        Event::End(end) => XmlEvent::End {
            name: lossy(end.name().as_ref()),
        },
        Event::Text(text) => XmlEvent::Text {
            text: text.unescape().context("unescape text")?.into_owned(),
        },
        Event::CData(data) => XmlEvent::CData {
            text: lossy(data.into_inner()),
        },
        Event::Comment(comment) => XmlEvent::Comment {
            text: lossy(comment.into_inner()),
        },
        Event::PI(pi) => XmlEvent::PI {
            content: lossy(pi.into_inner()),
        },
        Event::DocType(doctype) => XmlEvent::DocType {
            text: lossy(doctype.into_inner()),
        },
        Event::Eof => return Err(anyhow!("unexpected end of input")),
    };
    Ok(lifted)
}

/// Decodes raw file bytes to UTF-8. Returns whether a non-UTF-8 source was transcoded.
fn decode_svg_bytes(bytes: &[u8]) -> anyhow::Result<(String, bool)> {
    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(anyhow!("invalid {} byte sequence", enc.name()));
        }
        return Ok((text.into_owned(), enc != UTF_8));
    }

    let head = &bytes[..bytes.len().min(256)];
    let declared = DECL_ENCODING_RE
        .captures(head)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()));
    match declared {
        Some(enc) if enc != UTF_8 => {
            let (text, had_errors) = enc.decode_without_bom_handling(bytes);
            if had_errors {
                return Err(anyhow!("invalid {} byte sequence", enc.name()));
            }
            Ok((text.into_owned(), true))
        }
        _ => {
            let text = std::str::from_utf8(bytes).context("svg is not valid UTF-8")?;
            Ok((text.to_string(), false))
        }
    }
}

/// Attributes in document order with their values still escaped, so untouched
/// attributes are written back byte for byte.
fn raw_attrs(start: &BytesStart<'_>) -> anyhow::Result<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.context("malformed attribute")?;
            Ok((lossy(attr.key.as_ref()), lossy(attr.value.as_ref())))
        })
        .collect()
}

fn lossy(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

impl XmlEvent {
    /// Appends the markup for this event to `out`.
    fn write_markup(&self, out: &mut String) {
        match self {
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => {
                out.push_str("<?xml version=\"");
                out.push_str(version);
                out.push('"');
                if let Some(encoding) = encoding {
                    out.push_str(" encoding=\"");
                    out.push_str(encoding);
                    out.push('"');
                }
                if let Some(standalone) = standalone {
                    out.push_str(" standalone=\"");
                    out.push_str(standalone);
                    out.push('"');
                }
                out.push_str("?>");
            }
            XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                out.push_str(if matches!(self, XmlEvent::Empty { .. }) { "/>" } else { ">" });
            }
            XmlEvent::End { name } => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            XmlEvent::Text { text } => out.push_str(&partial_escape(text)),
            XmlEvent::CData { text } => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            XmlEvent::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            XmlEvent::PI { content } => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
            XmlEvent::DocType { text } => {
                out.push_str("<!DOCTYPE");
                out.push_str(text);
                out.push('>');
            }
        }
    }
}

/// Serializes `doc` as UTF-8 markup. Text nodes are re-escaped, attribute values are
/// emitted as stored.
pub fn write_svg(doc: &SvgDocument) -> String {
    let mut out = String::new();
    for event in &doc.events {
        event.write_markup(&mut out);
    }
    out
}

pub fn save_svg(doc: &SvgDocument, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, write_svg(doc)).with_context(|| format!("write svg: {}", path.display()))
}
