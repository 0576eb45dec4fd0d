//! Serializable DOM snapshots
//!
//! A snapshot is the nested JSON form of a page fragment. Building it yields a
//! [`DomTree`] plus a lookup from the snapshot's `ref` labels to node ids, so
//! scripted interactions can name their targets.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{Attribute, DomTree, NodeId, ShadowRootMode};
use crate::{RecorderError, Result};

/// Top-level children of the document, usually a single `html` element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub children: Vec<ElementSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,

    /// Label used by scripts and the CLI to address this element
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Leading text content, stored as a text node before the children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowSnapshot {
    #[serde(default)]
    pub mode: ShadowRootMode,
    #[serde(default)]
    pub children: Vec<ElementSnapshot>,
}

/// A tree built from a snapshot together with its ref labels
#[derive(Debug, Clone, Default)]
pub struct BuiltDom {
    pub tree: DomTree,
    refs: HashMap<String, NodeId>,
}

impl BuiltDom {
    /// Resolve a `ref` label to its node
    pub fn resolve(&self, reference: &str) -> Result<NodeId> {
        self.refs
            .get(reference)
            .copied()
            .ok_or_else(|| RecorderError::UnknownRef(reference.to_string()))
    }

    pub fn refs(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.refs.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl DomSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Materialize the snapshot into a fresh tree
    pub fn build(&self) -> Result<BuiltDom> {
        let mut built = BuiltDom::default();
        let document = built.tree.document();
        for child in &self.children {
            build_element(&mut built, document, child)?;
        }
        debug!(
            nodes = built.tree.len(),
            refs = built.refs.len(),
            "built DOM from snapshot"
        );
        Ok(built)
    }
}

fn build_element(built: &mut BuiltDom, parent: NodeId, spec: &ElementSnapshot) -> Result<NodeId> {
    let tree = &mut built.tree;
    let id = tree.create_element(spec.tag.clone());
    for attr in &spec.attributes {
        tree.set_attribute(id, &attr.name, &attr.value)?;
    }
    if let Some(value) = &spec.value {
        tree.set_value(id, value.clone())?;
    }
    if let Some(text) = &spec.text {
        let text = tree.create_text(text.clone());
        tree.append_child(id, text)?;
    }
    tree.append_child(parent, id)?;

    if let Some(reference) = &spec.reference {
        if built.refs.insert(reference.clone(), id).is_some() {
            return Err(RecorderError::InvalidTreeOperation(format!(
                "duplicate ref '{reference}'"
            )));
        }
    }

    if let Some(shadow) = &spec.shadow {
        let root = built.tree.attach_shadow(id, shadow.mode)?;
        for child in &shadow.children {
            build_element(built, root, child)?;
        }
    }
    for child in &spec.children {
        build_element(built, id, child)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomNode;

    const PAGE: &str = r#"{
        "children": [{
            "tag": "HTML",
            "children": [{
                "tag": "BODY",
                "children": [
                    {"tag": "H1", "text": "Title"},
                    {
                        "tag": "MY-FORM",
                        "shadow": {
                            "mode": "closed",
                            "children": [{"tag": "INPUT", "ref": "field", "value": "abc"}]
                        }
                    }
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_build_resolves_refs_inside_shadow() {
        let built = DomSnapshot::from_json(PAGE).unwrap().build().unwrap();
        let field = built.resolve("field").unwrap();
        let node = built.tree.node(field).unwrap();

        assert_eq!(node.tag(), Some("INPUT"));
        assert_eq!(node.value(), Some("abc"));
        let root = node.parent().unwrap();
        let host = root.shadow_host().unwrap();
        assert_eq!(host.tag(), Some("MY-FORM"));
        assert_eq!(built.tree.shadow_root(host.node_id()), Some(root.node_id()));
    }

    #[test]
    fn test_refs_lists_every_label() {
        let json = r#"{"children": [
            {"tag": "A", "ref": "first"},
            {"tag": "B", "children": [{"tag": "I", "ref": "second"}]}
        ]}"#;
        let built = DomSnapshot::from_json(json).unwrap().build().unwrap();

        let mut refs: Vec<(&str, NodeId)> = built.refs().collect();
        refs.sort();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], ("first", built.resolve("first").unwrap()));
        assert_eq!(refs[1], ("second", built.resolve("second").unwrap()));
    }

    #[test]
    fn test_unknown_ref() {
        let built = DomSnapshot::from_json(PAGE).unwrap().build().unwrap();
        assert!(matches!(
            built.resolve("missing"),
            Err(RecorderError::UnknownRef(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_ref_rejected() {
        let json = r#"{"children": [
            {"tag": "A", "ref": "x"},
            {"tag": "B", "ref": "x"}
        ]}"#;
        let result = DomSnapshot::from_json(json).unwrap().build();
        assert!(matches!(result, Err(RecorderError::InvalidTreeOperation(_))));
    }
}
