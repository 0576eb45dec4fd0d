//! Arena-backed DOM tree with shadow roots
//!
//! Nodes live in a single `Vec` and link to each other by [`NodeId`], which
//! keeps parent/child/host back-references free of reference cycles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{DomNode, SiblingIndex};
use crate::{RecorderError, Result};

/// Node identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node every tree starts with
    pub const DOCUMENT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    /// Current value for form controls
    pub value: Option<String>,
    pub shadow_root: Option<NodeId>,
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    ShadowRoot { host: NodeId, mode: ShadowRootMode },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }
}

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(RecorderError::UnknownNode(id))
    }

    fn node_checked(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(RecorderError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, the document node is never removed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeData::Element(ElementData {
            tag: tag.into(),
            attrs: Vec::new(),
            value: None,
            shadow_root: None,
        })))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeData::Text(content.into())))
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        match element.attrs.iter().position(|a| a.name == name) {
            Some(index) => element.attrs[index].value = value.to_string(),
            None => element.attrs.push(Attribute::new(name, value)),
        }
        Ok(())
    }

    /// Set the current value of a form control
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> Result<()> {
        self.element_mut(id)?.value = Some(value.into());
        Ok(())
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        self.get_mut(id)?.as_element_mut().ok_or_else(|| {
            RecorderError::InvalidTreeOperation(format!("{id:?} is not an element"))
        })
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node_checked(parent)?;
        if matches!(parent_node.data, NodeData::Text(_)) {
            return Err(RecorderError::InvalidTreeOperation(format!(
                "text node {parent:?} cannot have children"
            )));
        }

        let child_node = self.node_checked(child)?;
        match child_node.data {
            NodeData::Document | NodeData::ShadowRoot { .. } => {
                return Err(RecorderError::InvalidTreeOperation(format!(
                    "{child:?} cannot be inserted as a child"
                )));
            }
            _ => {}
        }
        if child_node.parent.is_some() {
            return Err(RecorderError::InvalidTreeOperation(format!(
                "{child:?} is already attached"
            )));
        }
        if parent == child || self.composed_ancestry(parent).any(|id| id == child) {
            return Err(RecorderError::InvalidTreeOperation(format!(
                "appending {child:?} to {parent:?} would create a cycle"
            )));
        }

        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Attach a shadow root to `host` and return it
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<NodeId> {
        if self.element_mut(host)?.shadow_root.is_some() {
            return Err(RecorderError::InvalidTreeOperation(format!(
                "{host:?} already hosts a shadow root"
            )));
        }
        let root = self.push(Node::new(NodeData::ShadowRoot { host, mode }));
        self.element_mut(host)?.shadow_root = Some(root);
        debug!(?host, ?root, ?mode, "attached shadow root");
        Ok(root)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.get(host)?.as_element()?.shadow_root
    }

    /// Element children of `id`, in order
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(move |child| self.get(*child).is_some_and(Node::is_element))
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|_| NodeRef { tree: self, id })
    }

    /// Propagation path of an event fired at `target`, as a document-level
    /// listener observes it: the target, every ancestor, each shadow root
    /// followed by its host, ending at the document.
    ///
    /// Nodes inside a closed shadow tree are hidden from such a listener, so
    /// the path then starts at the outermost closed host.
    pub fn composed_path(&self, target: NodeId) -> Result<Vec<NodeRef<'_>>> {
        self.node_checked(target)?;
        let full: Vec<NodeId> = std::iter::once(target)
            .chain(self.composed_ancestry(target))
            .collect();
        let visible_from = full
            .iter()
            .rposition(|id| {
                matches!(
                    self.get(*id).map(|n| &n.data),
                    Some(NodeData::ShadowRoot {
                        mode: ShadowRootMode::Closed,
                        ..
                    })
                )
            })
            .map_or(0, |closed_root| closed_root + 1);
        Ok(full[visible_from..]
            .iter()
            .map(|id| NodeRef { tree: self, id: *id })
            .collect())
    }

    /// Ancestors of `id` in composed order, excluding `id` itself
    fn composed_ancestry(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| {
            let node = self.get(*current)?;
            match (&node.data, node.parent) {
                (_, Some(parent)) => Some(parent),
                (NodeData::ShadowRoot { host, .. }, None) => Some(*host),
                _ => None,
            }
        })
        .skip(1)
    }
}

/// Borrowed handle to a node of a [`DomTree`]
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DomTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a Node {
        // NodeRef is only handed out for ids present in the arena, which never shrinks
        &self.tree.nodes[self.id.index()]
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl DomNode for NodeRef<'_> {
    fn tag(&self) -> Option<&str> {
        self.node().as_element().map(|e| e.tag.as_str())
    }

    fn attributes(&self) -> Vec<(&str, &str)> {
        self.node()
            .as_element()
            .map(|e| {
                e.attrs
                    .iter()
                    .map(|a| (a.name.as_str(), a.value.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self) -> Option<Self> {
        self.node().parent.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    fn shadow_host(&self) -> Option<Self> {
        match self.node().data {
            NodeData::ShadowRoot { host, .. } => Some(NodeRef {
                tree: self.tree,
                id: host,
            }),
            _ => None,
        }
    }

    fn sibling_index(&self) -> Option<SiblingIndex> {
        let parent = self.node().parent?;
        let mut count = 0;
        let mut position = None;
        for child in self.tree.element_children(parent) {
            count += 1;
            if child == self.id {
                position = Some(count);
            }
        }
        position.map(|position| SiblingIndex { position, count })
    }

    fn value(&self) -> Option<&str> {
        self.node().as_element()?.value.as_deref()
    }
}
