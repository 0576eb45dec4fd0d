//! Read-only view of a DOM node.
//!
//! The locator and encoder only ever see a node through [`DomNode`], so the
//! same capture code runs over a live page bridge or the in-memory
//! [`DomTree`](crate::DomTree) used by tests and the CLI.

/// Position of an element among its parent's element children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingIndex {
    /// 1-based position among the parent's element children
    pub position: usize,
    /// Number of element children the parent has, this node included
    pub count: usize,
}

/// Capability set the capture pipeline needs from a DOM node.
pub trait DomNode: Sized {
    /// Tag name as the page reports it. `None` for documents, shadow roots
    /// and text nodes.
    fn tag(&self) -> Option<&str>;

    /// Attributes in document order, `id` and `class` included.
    fn attributes(&self) -> Vec<(&str, &str)>;

    /// The `parentNode` link. A shadow root's parent is `None`.
    fn parent(&self) -> Option<Self>;

    /// Host element when this node is a shadow root.
    fn shadow_host(&self) -> Option<Self>;

    /// Position among the parent's element children, `None` without a parent.
    fn sibling_index(&self) -> Option<SiblingIndex>;

    /// Current value of a form control.
    fn value(&self) -> Option<&str> {
        None
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .into_iter()
            .find(|(attr, _)| *attr == name)
            .map(|(_, value)| value)
    }

    fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Raw `class` attribute, empty when absent.
    fn class_name(&self) -> &str {
        self.attribute("class").unwrap_or("")
    }

    /// Class tokens split on spaces, with whitespace-only tokens dropped.
    fn class_tokens(&self) -> Vec<&str> {
        self.class_name()
            .split(' ')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    fn is_element(&self) -> bool {
        self.tag().is_some()
    }
}
