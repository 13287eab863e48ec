//! Fragment parsing
//!
//! The html5ever tree builder is tried first. It always produces a full document, so the
//! `html`/`head`/`body` scaffolding is dropped while converting into a [`Fragment`]. If it
//! fails, a permissive tokenizer that never rejects input builds the fragment instead.

use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{
    rules::is_void_element,
    tree::{Fragment, NodeId},
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read markup: {0}")]
    Read(#[from] std::io::Error),
    #[error("parsed document has no <html> element")]
    MissingDocumentElement,
}

pub trait FragmentParser {
    fn name(&self) -> &'static str;

    fn parse(&self, markup: &str) -> Result<Fragment, ParseError>;
}

/// Try every parser in order and return the first fragment produced.
pub fn parse_fragment(markup: &str) -> Option<Fragment> {
    let parsers: [&dyn FragmentParser; 2] = [&Html5everParser, &LenientParser];
    for parser in parsers {
        match parser.parse(markup) {
            Ok(fragment) => return Some(fragment),
            Err(err) => {
                tracing::debug!(parser = parser.name(), error = %err, "fragment parser failed");
            }
        }
    }
    None
}

/// Standards-compliant HTML5 parsing through html5ever and RcDom.
pub struct Html5everParser;

impl FragmentParser for Html5everParser {
    fn name(&self) -> &'static str {
        "html5ever"
    }

    fn parse(&self, markup: &str) -> Result<Fragment, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut markup.as_bytes())?;

        let html = dom
            .document
            .children
            .borrow()
            .iter()
            .find(|child| element_name(child).as_deref() == Some("html"))
            .cloned()
            .ok_or(ParseError::MissingDocumentElement)?;

        let mut fragment = Fragment::new();
        for section in html.children.borrow().iter() {
            match element_name(section).as_deref() {
                Some("head") | Some("body") => {
                    for child in section.children.borrow().iter() {
                        convert_node(child, &mut fragment, NodeId::ROOT);
                    }
                }
                _ => convert_node(section, &mut fragment, NodeId::ROOT),
            }
        }
        Ok(fragment)
    }
}

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        RcNodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

/// Copy `handle` and its subtree under `parent`. Uses an explicit work list so deeply
/// nested markup cannot exhaust the thread stack.
fn convert_node(handle: &Handle, fragment: &mut Fragment, parent: NodeId) {
    let mut pending: Vec<(Handle, NodeId)> = vec![(handle.clone(), parent)];
    while let Some((handle, parent)) = pending.pop() {
        match &handle.data {
            RcNodeData::Text { contents } => {
                let id = fragment.create_text(&contents.borrow());
                fragment.append_child(parent, id);
            }
            RcNodeData::Element { name, attrs, .. } => {
                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                let id = fragment.create_element(&name.local, attrs);
                fragment.append_child(parent, id);
                pending.extend(
                    handle
                        .children
                        .borrow()
                        .iter()
                        .rev()
                        .map(|child| (child.clone(), id)),
                );
            }
            // Comments, doctypes and processing instructions never reach the output.
            _ => {}
        }
    }
}

/// Forgiving tag scanner used when the tree builder gives up.
pub struct LenientParser;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl FragmentParser for LenientParser {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn parse(&self, markup: &str) -> Result<Fragment, ParseError> {
        let mut fragment = Fragment::new();
        let mut open = vec![NodeId::ROOT];
        let mut rest = markup;

        while !rest.is_empty() {
            let current = *open.last().unwrap_or(&NodeId::ROOT);
            let Some(start) = rest.find('<') else {
                push_text(&mut fragment, current, rest);
                break;
            };
            if start > 0 {
                push_text(&mut fragment, current, &rest[..start]);
                rest = &rest[start..];
            }

            if let Some(after) = rest.strip_prefix("<!--") {
                rest = after.find("-->").map(|end| &after[end + 3..]).unwrap_or("");
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                rest = skip_past_gt(rest);
            } else if let Some(after) = rest.strip_prefix("</") {
                let (name, tail) = take_name(after);
                if name.is_empty() {
                    push_text(&mut fragment, current, "</");
                    rest = after;
                    continue;
                }
                rest = skip_past_gt(tail);
                close_element(&mut open, &fragment, &name);
            } else {
                let (name, tail) = take_name(&rest[1..]);
                if name.is_empty() {
                    push_text(&mut fragment, current, "<");
                    rest = &rest[1..];
                    continue;
                }
                let (attrs, self_closing, tail) = take_attributes(tail);
                rest = tail;

                if matches!(name.as_str(), "p" | "li") && fragment.tag_name(current) == Some(name.as_str()) {
                    open.pop();
                }
                let parent = *open.last().unwrap_or(&NodeId::ROOT);
                let id = fragment.create_element(&name, attrs);
                fragment.append_child(parent, id);

                if self_closing || is_void_element(&name) {
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    let closing = format!("</{name}");
                    let end = rest
                        .to_ascii_lowercase()
                        .find(&closing)
                        .unwrap_or(rest.len());
                    if end > 0 {
                        let text = fragment.create_text(&rest[..end]);
                        fragment.append_child(id, text);
                    }
                    rest = skip_past_gt(&rest[end..]);
                } else {
                    open.push(id);
                }
            }
        }

        Ok(fragment)
    }
}

fn push_text(fragment: &mut Fragment, parent: NodeId, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let id = fragment.create_text(&decode_entities(raw));
    fragment.append_child(parent, id);
}

fn skip_past_gt(input: &str) -> &str {
    input.find('>').map(|end| &input[end + 1..]).unwrap_or("")
}

fn take_name(input: &str) -> (String, &str) {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return (String::new(), input);
    }
    let end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(input.len());
    (input[..end].to_ascii_lowercase(), &input[end..])
}

fn take_attributes(mut input: &str) -> (Vec<(String, String)>, bool, &str) {
    let mut attrs = Vec::new();
    loop {
        input = input.trim_start();
        if input.is_empty() {
            return (attrs, false, input);
        }
        if let Some(tail) = input.strip_prefix("/>") {
            return (attrs, true, tail);
        }
        if let Some(tail) = input.strip_prefix('>') {
            return (attrs, false, tail);
        }

        let end = input
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
            .unwrap_or(input.len());
        if end == 0 {
            // stray '=' or '/', step over it
            let step = input.chars().next().map(char::len_utf8).unwrap_or(1);
            input = &input[step..];
            continue;
        }
        let name = input[..end].to_ascii_lowercase();
        input = input[end..].trim_start();

        let mut value = String::new();
        if let Some(tail) = input.strip_prefix('=') {
            let tail = tail.trim_start();
            if let Some(quote) = tail.chars().next().filter(|c| *c == '"' || *c == '\'') {
                let body = &tail[1..];
                let close = body.find(quote).unwrap_or(body.len());
                value = decode_entities(&body[..close]);
                input = body.get(close + 1..).unwrap_or("");
            } else {
                let close = tail
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(tail.len());
                value = decode_entities(&tail[..close]);
                input = &tail[close..];
            }
        }
        attrs.push((name, value));
    }
}

fn close_element(open: &mut Vec<NodeId>, fragment: &Fragment, name: &str) {
    if let Some(position) = open
        .iter()
        .rposition(|&id| fragment.tag_name(id) == Some(name))
    {
        open.truncate(position);
    }
}

/// Decode the character references people actually type into descriptions.
fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
