use thiserror::Error;
use xml::{
    escape::{escape_str_attribute, escape_str_pcdata},
    reader::{Error as ReaderError, EventReader, ParserConfig, XmlEvent},
    writer::{EmitterConfig, Error as EmitterError},
};
use xmltree::{Element, XMLNode};

use crate::sanitizer::rules::is_void_element;

pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8' standalone='no'?>\n";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Malformed(#[from] ReaderError),
    #[error("document has no root element")]
    NoRoot,
    #[error("unexpected end tag </{0}>")]
    UnbalancedEnd(String),
}

/// Parse into an xmltree [`Element`], keeping whitespace-only text and CDATA sections.
/// `Element::parse` drops whitespace-only text, but the gap between two tags inside a
/// description is content.
pub fn parse_document(text: &str) -> Result<Element, DocumentError> {
    let config = ParserConfig::new()
        .whitespace_to_characters(true)
        .cdata_to_characters(false)
        .ignore_comments(false);
    let mut reader = EventReader::new_with_config(text.as_bytes(), config);

    let mut open: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        let node = match reader.next()? {
            XmlEvent::StartElement {
                name,
                attributes,
                namespace,
            } => {
                let mut element = Element::new(&name.local_name);
                element.prefix = name.prefix;
                element.namespace = name.namespace;
                if !namespace.is_essentially_empty() {
                    element.namespaces = Some(namespace);
                }
                for attr in attributes {
                    element.attributes.insert(attr.name.local_name, attr.value);
                }
                open.push(element);
                continue;
            }
            XmlEvent::EndElement { name } => {
                let element = open
                    .pop()
                    .ok_or(DocumentError::UnbalancedEnd(name.local_name))?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(XMLNode::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {}
                }
                continue;
            }
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) => XMLNode::Text(text),
            XmlEvent::CData(text) => XMLNode::CData(text),
            XmlEvent::Comment(text) => XMLNode::Comment(text),
            XmlEvent::ProcessingInstruction { name, data } => {
                XMLNode::ProcessingInstruction(name, data)
            }
            XmlEvent::StartDocument { .. } => continue,
            XmlEvent::EndDocument => break,
        };
        // nodes outside the root element are not kept
        if let Some(parent) = open.last_mut() {
            parent.children.push(node);
        }
    }

    root.ok_or(DocumentError::NoRoot)
}

pub fn is_layout_whitespace(node: &XMLNode) -> bool {
    matches!(node, XMLNode::Text(text) if text.trim().is_empty())
}

/// Tag name without `{namespace-uri}` or `prefix:` qualification.
pub fn local_name(name: &str) -> &str {
    let name = name.rsplit_once('}').map(|(_, local)| local).unwrap_or(name);
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

pub fn has_local_name(element: &Element, expected: &str) -> bool {
    local_name(&element.name).eq_ignore_ascii_case(expected)
}

/// Everything between the element's tags as one HTML string: text and CDATA verbatim,
/// child elements rendered as HTML, each followed by its trailing text.
pub fn inner_markup(element: &Element) -> String {
    let mut out = String::new();
    for child in &element.children {
        match child {
            XMLNode::Text(text) | XMLNode::CData(text) => out.push_str(text),
            XMLNode::Element(child) => write_html(child, &mut out),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn write_html(element: &Element, out: &mut String) {
    let name = local_name(&element.name);
    out.push('<');
    out.push_str(name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(local_name(key));
        out.push_str("=\"");
        out.push_str(&escape_str_attribute(value));
        out.push('"');
    }
    out.push('>');
    if element.children.is_empty() && is_void_element(name) {
        return;
    }
    for child in &element.children {
        match child {
            XMLNode::Text(text) | XMLNode::CData(text) => out.push_str(&escape_str_pcdata(text)),
            XMLNode::Element(child) => write_html(child, out),
            _ => {}
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Serialize with an explicit `standalone='no'` declaration and indentation.
pub fn write_document(root: &Element) -> Result<Vec<u8>, EmitterError> {
    let mut out = XML_DECLARATION.as_bytes().to_vec();
    let config = EmitterConfig::new()
        .perform_indent(true)
        .write_document_declaration(false)
        .normalize_empty_elements(false);
    root.write_with_config(&mut out, config)?;
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_strips_qualification() {
        assert_eq!(local_name("SHOPITEM"), "SHOPITEM");
        assert_eq!(local_name("h:SHOPITEM"), "SHOPITEM");
        assert_eq!(local_name("{http://www.zbozi.cz/ns/offer/1.0}SHOPITEM"), "SHOPITEM");
    }

    #[test]
    fn inner_markup_keeps_text_children_and_tails() {
        let element =
            parse_document("<DESCRIPTION> Intro <b class=\"x\">bold</b> middle<br/>tail </DESCRIPTION>")
                .unwrap();
        assert_eq!(
            inner_markup(&element),
            "Intro <b class=\"x\">bold</b> middle<br>tail"
        );
    }

    #[test]
    fn inner_markup_reads_cdata_verbatim() {
        let element =
            parse_document("<DESCRIPTION><![CDATA[<p>Ahoj &amp; čau</p>]]></DESCRIPTION>").unwrap();
        assert_eq!(inner_markup(&element), "<p>Ahoj &amp; čau</p>");
    }

    #[test]
    fn inner_markup_reads_escaped_html_as_markup() {
        let element = parse_document("<DESCRIPTION>&lt;p&gt;Hi&lt;/p&gt;</DESCRIPTION>").unwrap();
        assert_eq!(inner_markup(&element), "<p>Hi</p>");
    }

    #[test]
    fn document_has_standalone_declaration() {
        let root = parse_document("<SHOP><SHOPITEM><ID>1</ID></SHOPITEM></SHOP>").unwrap();
        let bytes = write_document(&root).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version='1.0' encoding='UTF-8' standalone='no'?>\n<SHOP>"));
        assert!(text.contains("\n  <SHOPITEM>"));
    }

    #[test]
    fn space_between_child_elements_survives() {
        let element = parse_document("<DESCRIPTION><b>a</b> <i>b</i>\n<br/></DESCRIPTION>").unwrap();
        assert_eq!(inner_markup(&element), "<b>a</b> <i>b</i>\n<br>");
    }

    #[test]
    fn prefixed_names_keep_their_parts() {
        let root = parse_document(r#"<h:SHOP xmlns:h="urn:heureka" id="7"><h:ITEM/></h:SHOP>"#).unwrap();
        assert_eq!(root.name, "SHOP");
        assert_eq!(root.prefix.as_deref(), Some("h"));
        assert_eq!(root.attributes.get("id").map(String::as_str), Some("7"));
        assert!(has_local_name(root.children[0].as_element().unwrap(), "item"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            parse_document("<SHOP><ITEM></SHOP>"),
            Err(DocumentError::Malformed(_))
        ));
    }
}
