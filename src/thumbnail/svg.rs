//! SVG cover repair: isolate the root, inline class styles, fix name case.
//!
//! The rasterizer downstream does not evaluate `<style>` sheets, so class
//! rules are resolved into inline `style` attributes on geometry elements and
//! the sheets are removed. Markup produced by case-insensitive HTML tooling
//! loses camel case in SVG names (`viewbox`, `lineargradient`); those are
//! restored from a fixed list.
//!
//! All passes stream through `quick-xml`, which preserves name case.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesEnd, BytesStart, Event};

use super::css::{self, Stylesheet};
use crate::error::{ThumbnailError, ThumbnailResult};

/// Elements that carry visible geometry and receive inlined styles.
pub const GEOMETRY_ELEMENTS: &[&str] = &[
    "rect", "path", "polygon", "circle", "ellipse", "line", "polyline",
];

/// Camel-cased SVG attribute names that case-folding tools lowercase.
pub const CASE_SENSITIVE_ATTRIBUTES: &[&str] = &[
    "viewBox",
    "baseProfile",
    "preserveAspectRatio",
    "gradientUnits",
    "gradientTransform",
    "patternUnits",
    "patternContentUnits",
    "patternTransform",
    "clipPathUnits",
    "maskUnits",
    "maskContentUnits",
    "markerWidth",
    "markerHeight",
    "markerUnits",
    "refX",
    "refY",
    "stdDeviation",
    "textLength",
    "lengthAdjust",
    "spreadMethod",
    "xChannelSelector",
    "yChannelSelector",
];

/// Camel-cased SVG element names that case-folding tools lowercase.
pub const CASE_SENSITIVE_ELEMENTS: &[&str] = &[
    "linearGradient",
    "radialGradient",
    "clipPath",
    "textPath",
    "foreignObject",
    "feBlend",
    "feColorMatrix",
    "feComposite",
    "feFlood",
    "feGaussianBlur",
    "feMerge",
    "feMergeNode",
    "feOffset",
];

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Result of [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedSvg {
    pub markup: String,
    /// Class rules found in embedded stylesheets.
    pub rules: usize,
    /// Elements that received an inline style.
    pub styled_elements: usize,
}

/// Run all repair passes over a fetched SVG document.
///
/// `source` names the document in error messages.
pub fn normalize(markup: &str, source: &str) -> ThumbnailResult<NormalizedSvg> {
    let root = isolate_root(markup, source)?;
    let sheet = collect_stylesheet(&root, source)?;
    let (markup, styled_elements) = rewrite(&root, &sheet, source)?;
    Ok(NormalizedSvg {
        markup,
        rules: sheet.rules.len(),
        styled_elements,
    })
}

fn svg_error(source: &str, message: impl std::fmt::Display) -> ThumbnailError {
    ThumbnailError::Svg {
        url: source.to_string(),
        message: message.to_string(),
    }
}

fn is_svg_root(e: &BytesStart) -> bool {
    e.local_name().as_ref().eq_ignore_ascii_case(b"svg")
}

/// Re-serialize the first `<svg>` element and its subtree on its own,
/// dropping the prolog, doctype, and anything outside the root.
pub fn isolate_root(markup: &str, source: &str) -> ThumbnailResult<String> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| svg_error(source, e))?;
        match &event {
            Event::Eof => break,
            Event::Start(e) if depth == 0 => {
                if !is_svg_root(e) {
                    continue;
                }
                depth = 1;
            }
            Event::Empty(e) if depth == 0 => {
                if !is_svg_root(e) {
                    continue;
                }
            }
            _ if depth == 0 => continue,
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            _ => {}
        }
        writer.write_event(event).map_err(|e| svg_error(source, e))?;
        if depth == 0 {
            return String::from_utf8(writer.into_inner()).map_err(|e| svg_error(source, e));
        }
    }

    Err(svg_error(source, "no <svg> root element"))
}

/// Gather the class rules of every `<style>` element, in document order.
pub fn collect_stylesheet(markup: &str, source: &str) -> ThumbnailResult<Stylesheet> {
    let mut reader = Reader::from_str(markup);
    let mut sheet = Stylesheet::default();
    let mut css_text: Option<String> = None;

    loop {
        match reader.read_event().map_err(|e| svg_error(source, e))? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                css_text = Some(String::new());
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => {
                if let Some(text) = css_text.take() {
                    sheet.extend(Stylesheet::parse(&text));
                }
            }
            Event::Text(t) => {
                if let Some(buf) = css_text.as_mut() {
                    buf.push_str(&unescaped(&String::from_utf8_lossy(&t)));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(buf) = css_text.as_mut() {
                    let entity = format!("&{};", String::from_utf8_lossy(&r));
                    buf.push_str(&unescape(&entity).unwrap_or_default());
                }
            }
            Event::CData(c) => {
                if let Some(buf) = css_text.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            _ => {}
        }
    }

    Ok(sheet)
}

/// Apply inline styles and name repairs, dropping `<style>` elements.
///
/// Returns the rewritten markup and the number of styled elements.
fn rewrite(markup: &str, sheet: &Stylesheet, source: &str) -> ThumbnailResult<(String, usize)> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Vec::new());
    let mut style_depth = 0usize;
    let mut seen_root = false;
    let mut styled = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| svg_error(source, e))?;
        let out = match event {
            Event::Eof => break,
            Event::Start(_) if style_depth > 0 => {
                style_depth += 1;
                continue;
            }
            Event::End(_) if style_depth > 0 => {
                style_depth -= 1;
                continue;
            }
            _ if style_depth > 0 => continue,
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                style_depth = 1;
                continue;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"style" => continue,
            Event::Start(e) => {
                let (element, was_styled) = rewrite_element(&e, sheet, !seen_root, source)?;
                seen_root = true;
                styled += usize::from(was_styled);
                Event::Start(element)
            }
            Event::Empty(e) => {
                let (element, was_styled) = rewrite_element(&e, sheet, !seen_root, source)?;
                seen_root = true;
                styled += usize::from(was_styled);
                Event::Empty(element)
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                Event::End(BytesEnd::new(repair_element_name(&name)))
            }
            other => other,
        };
        writer.write_event(out).map_err(|e| svg_error(source, e))?;
    }

    let markup = String::from_utf8(writer.into_inner()).map_err(|e| svg_error(source, e))?;
    Ok((markup, styled))
}

/// Rebuild one start tag. Attribute values stay in their escaped form except
/// for the generated `style`.
fn rewrite_element(
    e: &BytesStart,
    sheet: &Stylesheet,
    is_root: bool,
    source: &str,
) -> ThumbnailResult<(BytesStart<'static>, bool)> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| svg_error(source, err))?;
        attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }

    repair_attribute_case(&mut attrs);

    if is_root {
        ensure_attribute(&mut attrs, "xmlns", SVG_NAMESPACE);
        if attrs.iter().any(|(k, _)| k.starts_with("xlink:")) {
            ensure_attribute(&mut attrs, "xmlns:xlink", XLINK_NAMESPACE);
        }
    }

    let mut styled = false;
    if !sheet.is_empty() && GEOMETRY_ELEMENTS.contains(&local.as_str()) {
        styled = inline_class_style(&local, &mut attrs, sheet);
    }

    let mut element = BytesStart::new(repair_element_name(&name));
    for (key, value) in &attrs {
        element.push_attribute((key.as_bytes(), value.as_bytes()));
    }
    Ok((element, styled))
}

/// Resolve class rules into the element's `style` attribute. Declarations
/// already present inline take precedence over stylesheet rules.
fn inline_class_style(local: &str, attrs: &mut Vec<(String, String)>, sheet: &Stylesheet) -> bool {
    let Some(class_attr) = attrs.iter().find(|(k, _)| k == "class").map(|(_, v)| unescaped(v)) else {
        return false;
    };
    let classes: Vec<&str> = class_attr.split_whitespace().collect();
    let mut decls = sheet.declarations_for(local, &classes);
    if decls.is_empty() {
        return false;
    }

    let style_pos = attrs.iter().position(|(k, _)| k == "style");
    if let Some(pos) = style_pos {
        for decl in css::parse_inline_style(&unescaped(&attrs[pos].1)) {
            css::merge_declaration(&mut decls, decl);
        }
    }

    let style = escape(css::to_inline_style(&decls).as_str()).into_owned();
    match style_pos {
        Some(pos) => attrs[pos].1 = style,
        None => attrs.push(("style".to_string(), style)),
    }
    true
}

fn unescaped(raw: &str) -> String {
    unescape(raw).map(|v| v.into_owned()).unwrap_or_else(|_| raw.to_string())
}

fn ensure_attribute(attrs: &mut Vec<(String, String)>, key: &str, value: &str) {
    if !attrs.iter().any(|(k, _)| k == key) {
        attrs.insert(0, (key.to_string(), value.to_string()));
    }
}

/// Move lowercased values back onto their camel-cased keys.
///
/// When both spellings are present the lowercased value wins, since that is
/// the one the upstream tool last wrote.
pub fn repair_attribute_case(attrs: &mut Vec<(String, String)>) {
    for &name in CASE_SENSITIVE_ATTRIBUTES {
        let lower = name.to_ascii_lowercase();
        if !attrs.iter().any(|(k, _)| *k == lower) {
            continue;
        }
        attrs.retain(|(k, _)| k != name);
        if let Some(entry) = attrs.iter_mut().find(|(k, _)| *k == lower) {
            entry.0 = name.to_string();
        }
    }
}

/// Restore the camel case of a known element name, keeping any prefix.
pub fn repair_element_name(name: &str) -> String {
    let (prefix, local) = match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    };
    let repaired = CASE_SENSITIVE_ELEMENTS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(local))
        .map_or(local, |known| *known);
    match prefix {
        Some(prefix) => format!("{prefix}:{repaired}"),
        None => repaired.to_string(),
    }
}
