use super::{
    rules::is_void_element,
    tree::{Fragment, NodeData, NodeId},
};

enum Step {
    Enter(NodeId),
    Close(NodeId),
}

/// Render the fragment's top-level nodes as HTML without any document wrapper.
pub fn render(fragment: &Fragment) -> String {
    let mut out = String::new();
    let mut steps: Vec<Step> = fragment
        .children(NodeId::ROOT)
        .iter()
        .rev()
        .map(|&id| Step::Enter(id))
        .collect();

    while let Some(step) = steps.pop() {
        match step {
            Step::Enter(id) => open_node(fragment, id, &mut steps, &mut out),
            Step::Close(id) => {
                if let Some(name) = fragment.tag_name(id) {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
    out
}

fn open_node(fragment: &Fragment, id: NodeId, steps: &mut Vec<Step>, out: &mut String) {
    let Some(node) = fragment.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Root => {}
        NodeData::Text(text) => escape_into(text, false, out),
        NodeData::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            steps.push(Step::Close(id));
            steps.extend(node.children.iter().rev().map(|&child| Step::Enter(child)));
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
