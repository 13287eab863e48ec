//! Fragment tree (arena-based allocation)
//!
//! Nodes live in a single `Vec` and are addressed by `NodeId`. Detaching a node only
//! unlinks it from its parent, so ids stay stable for the whole sanitizer run and two
//! structurally equal nodes at different positions are always distinguishable.

use crate::util::text::join_trimmed;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The virtual container every fragment hangs from.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0:?} does not exist")]
    Missing(NodeId),
    #[error("node {0:?} is already detached")]
    Detached(NodeId),
    #[error("the fragment root cannot be removed")]
    Root,
}

/// An HTML fragment: a virtual root with ordered element and text descendants.
#[derive(Debug)]
pub struct Fragment {
    nodes: Vec<Node>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Append `child` as the last child of `parent`. Adjacent text is merged.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let merge = match &self.nodes[child.index()].data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        };
        if let Some(text) = merge {
            if let Some(&last) = self.nodes[parent.index()].children.last() {
                if let NodeData::Text(existing) = &mut self.nodes[last.index()].data {
                    existing.push_str(&text);
                    return;
                }
            }
        }
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    /// True when walking parents from `id` reaches the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Number of element ancestors between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == NodeId::ROOT {
                break;
            }
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Attached descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Attached elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// Visible text: every descendant text node trimmed, empties dropped, joined by spaces.
    pub fn text_content(&self, id: NodeId) -> String {
        let texts = self.descendants(id);
        join_trimmed(texts.iter().filter_map(|&node| match &self.get(node)?.data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }))
    }

    /// Nearest preceding sibling that is an element, skipping text.
    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&sibling| sibling == id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    /// Nearest following sibling that is an element, skipping text.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&sibling| sibling == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    /// Unlink `id` and its whole subtree from the fragment.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let (parent, position) = self.locate(id)?;
        self.nodes[parent.index()].children.remove(position);
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    /// Replace `id` with its children, keeping their order at the vacated position.
    pub fn unwrap(&mut self, id: NodeId) -> Result<(), TreeError> {
        let (parent, position) = self.locate(id)?;
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()]
            .children
            .splice(position..=position, children);
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    fn locate(&self, id: NodeId) -> Result<(NodeId, usize), TreeError> {
        if id == NodeId::ROOT {
            return Err(TreeError::Root);
        }
        let node = self.get(id).ok_or(TreeError::Missing(id))?;
        let parent = node.parent.ok_or(TreeError::Detached(id))?;
        let position = self
            .children(parent)
            .iter()
            .position(|&child| child == id)
            .ok_or(TreeError::Detached(id))?;
        Ok((parent, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Fragment, NodeId, NodeId, NodeId) {
        // <div>a<span>b</span><p>c</p></div>
        let mut tree = Fragment::new();
        let div = tree.create_element("DIV", Vec::new());
        tree.append_child(NodeId::ROOT, div);
        let a = tree.create_text("a");
        tree.append_child(div, a);
        let span = tree.create_element("span", Vec::new());
        tree.append_child(div, span);
        let b = tree.create_text("b");
        tree.append_child(span, b);
        let p = tree.create_element("p", Vec::new());
        tree.append_child(div, p);
        let c = tree.create_text("c");
        tree.append_child(p, c);
        (tree, div, span, p)
    }

    #[test]
    fn names_are_lowercased() {
        let (tree, div, _, _) = sample();
        assert_eq!(tree.tag_name(div), Some("div"));
    }

    #[test]
    fn text_content_joins_with_spaces() {
        let (tree, div, _, _) = sample();
        assert_eq!(tree.text_content(div), "a b c");
    }

    #[test]
    fn element_siblings_skip_text() {
        let (tree, _, span, p) = sample();
        assert_eq!(tree.previous_element_sibling(span), None);
        assert_eq!(tree.next_element_sibling(span), Some(p));
        assert_eq!(tree.previous_element_sibling(p), Some(span));
    }

    #[test]
    fn depth_counts_element_ancestors() {
        let (tree, div, span, _) = sample();
        assert_eq!(tree.depth(div), 0);
        assert_eq!(tree.depth(span), 1);
    }

    #[test]
    fn detach_twice_reports_detached() {
        let (mut tree, div, span, _) = sample();
        tree.detach(span).unwrap();
        assert_eq!(tree.detach(span), Err(TreeError::Detached(span)));
        assert_eq!(tree.text_content(div), "a c");
        assert!(!tree.is_attached(span));
    }

    #[test]
    fn detached_ancestor_detaches_descendants() {
        let (mut tree, div, _, p) = sample();
        tree.detach(div).unwrap();
        assert!(!tree.is_attached(p));
        assert!(tree.is_empty());
    }

    #[test]
    fn unwrap_splices_children_in_place() {
        let (mut tree, div, span, p) = sample();
        tree.unwrap(div).unwrap();
        let root_children = tree.children(NodeId::ROOT).to_vec();
        assert_eq!(root_children.len(), 3);
        assert_eq!(root_children[1], span);
        assert_eq!(root_children[2], p);
        assert_eq!(tree.parent(span), Some(NodeId::ROOT));
    }

    #[test]
    fn adjacent_text_is_merged_on_append() {
        let mut tree = Fragment::new();
        let first = tree.create_text("Hel");
        tree.append_child(NodeId::ROOT, first);
        let second = tree.create_text("lo");
        tree.append_child(NodeId::ROOT, second);
        assert_eq!(tree.children(NodeId::ROOT).len(), 1);
        assert_eq!(tree.text_content(NodeId::ROOT), "Hello");
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = Fragment::new();
        assert_eq!(tree.detach(NodeId::ROOT), Err(TreeError::Root));
    }
}
