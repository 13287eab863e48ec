//! Product feed transformer.
//!
//! Finds every `SHOPITEM` record regardless of namespace, cleans its `DESCRIPTION` and
//! `LONG_DESCRIPTION` fields through the sanitizer, and writes the document back as UTF-8.

pub mod decode;
pub mod xml;

use encoding_rs::{Encoding, WINDOWS_1250};
use thiserror::Error;
use tracing::{debug, info};
use xmltree::{Element, XMLNode};

use self::{
    decode::{decode_feed, strip_prolog},
    xml::{has_local_name, inner_markup, is_layout_whitespace, parse_document, write_document},
};
use crate::sanitizer::sanitize;

pub const ITEM_TAG: &str = "SHOPITEM";
pub const DESCRIPTION_TAGS: &[&str] = &["DESCRIPTION", "LONG_DESCRIPTION"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid XML: {0}")]
    Syntax(String),
    #[error("no SHOPITEM element found in XML")]
    NoItems,
    #[error("failed to write XML: {0}")]
    Serialize(String),
}

/// Cleaned document together with what was done to it.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub xml: Vec<u8>,
    pub items: usize,
    pub fields_cleaned: usize,
    pub fields_skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedTransformer {
    legacy_encoding: &'static Encoding,
}

impl Default for FeedTransformer {
    fn default() -> Self {
        Self {
            legacy_encoding: WINDOWS_1250,
        }
    }
}

impl FeedTransformer {
    /// Use another single-byte fallback code page, given by its WHATWG label.
    /// Multi-byte encodings and UTF-16 are refused.
    pub fn with_legacy_encoding(label: &str) -> Option<Self> {
        let legacy_encoding = Encoding::for_label(label.trim().as_bytes())
            .filter(|encoding| encoding.is_single_byte())?;
        Some(Self { legacy_encoding })
    }

    pub fn legacy_encoding(&self) -> &'static Encoding {
        self.legacy_encoding
    }

    pub fn transform(&self, xml_bytes: &[u8]) -> Result<Vec<u8>, ValidationError> {
        self.transform_report(xml_bytes).map(|report| report.xml)
    }

    pub fn transform_report(&self, xml_bytes: &[u8]) -> Result<TransformReport, ValidationError> {
        let text = decode_feed(xml_bytes, self.legacy_encoding);
        let mut root = parse_document(strip_prolog(&text).trim())
            .map_err(|err| ValidationError::Syntax(err.to_string()))?;

        let mut report = TransformReport {
            xml: Vec::new(),
            items: 0,
            fields_cleaned: 0,
            fields_skipped: 0,
        };
        visit(&mut root, &mut report);

        if report.items == 0 {
            return Err(ValidationError::NoItems);
        }

        report.xml =
            write_document(&root).map_err(|err| ValidationError::Serialize(err.to_string()))?;

        info!(
            items = report.items,
            cleaned = report.fields_cleaned,
            skipped = report.fields_skipped,
            bytes = report.xml.len(),
            "feed transformed"
        );
        Ok(report)
    }
}

/// Clean a feed with the default fallback code page.
pub fn transform(xml_bytes: &[u8]) -> Result<Vec<u8>, ValidationError> {
    FeedTransformer::default().transform(xml_bytes)
}

fn visit(element: &mut Element, report: &mut TransformReport) {
    let is_item = has_local_name(element, ITEM_TAG);
    if is_item {
        report.items += 1;
    }

    // pure indentation is regenerated on output; mixed content keeps its spaces
    let has_elements = element.children.iter().any(|node| node.as_element().is_some());
    let only_layout_text = element
        .children
        .iter()
        .all(|node| !matches!(node, XMLNode::Text(_)) || is_layout_whitespace(node));
    if has_elements && only_layout_text {
        element.children.retain(|node| !is_layout_whitespace(node));
    }

    for child in element.children.iter_mut() {
        let XMLNode::Element(child) = child else {
            continue;
        };
        if is_item && is_description_field(child) {
            clean_field(child, report);
        } else {
            visit(child, report);
        }
    }
}

fn is_description_field(element: &Element) -> bool {
    DESCRIPTION_TAGS
        .iter()
        .any(|tag| has_local_name(element, tag))
}

fn clean_field(field: &mut Element, report: &mut TransformReport) {
    let markup = inner_markup(field);
    if markup.is_empty() {
        report.fields_skipped += 1;
        return;
    }

    let cleaned = sanitize(&markup);
    debug!(
        field = %field.name,
        before = markup.len(),
        after = cleaned.len(),
        "description cleaned"
    );
    field.children = vec![XMLNode::Text(cleaned)];
    report.fields_cleaned += 1;
}
