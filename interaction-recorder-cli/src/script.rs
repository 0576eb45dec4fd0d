use anyhow::{Context, Result};
use interaction_recorder::{BuiltDom, InteractionKind, NodeRef, RawInteraction};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One scripted interaction, addressed by a snapshot `ref`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedInteraction {
    pub kind: InteractionKind,
    pub target: String,
    pub timestamp: f64,

    /// Character code delivered with a keypress
    #[serde(rename = "charCode", default)]
    pub char_code: u32,

    /// Value the target holds when the event fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptedInteraction>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid script {}", path.display()))
}

impl ScriptedInteraction {
    /// Apply the step's value to the tree, then build the event as the page
    /// would dispatch it.
    pub fn prepare<'a>(&self, dom: &'a mut BuiltDom) -> Result<RawInteraction<NodeRef<'a>>> {
        let target = dom
            .resolve(&self.target)
            .with_context(|| format!("Script step targets unknown ref '{}'", self.target))?;
        if let Some(value) = &self.value {
            dom.tree.set_value(target, value.clone())?;
        }

        let path = dom.tree.composed_path(target)?;
        Ok(match self.kind {
            InteractionKind::Click => RawInteraction::click(self.timestamp, path),
            InteractionKind::Keypress => {
                RawInteraction::keypress(self.timestamp, path, self.char_code)
            }
            InteractionKind::Input => RawInteraction::input(self.timestamp, path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction_recorder::{DomNode, DomSnapshot};

    #[test]
    fn test_prepare_applies_value() {
        let mut dom = DomSnapshot::from_json(
            r#"{"children": [{"tag": "INPUT", "ref": "q"}]}"#,
        )
        .unwrap()
        .build()
        .unwrap();
        let step: ScriptedInteraction = serde_json::from_str(
            r#"{"kind": "keypress", "target": "q", "timestamp": 3.0, "charCode": 65, "value": "A"}"#,
        )
        .unwrap();

        let raw = step.prepare(&mut dom).unwrap();
        assert_eq!(raw.kind, InteractionKind::Keypress);
        assert_eq!(raw.char_code, 65);
        assert_eq!(raw.target().unwrap().value(), Some("A"));
    }

    #[test]
    fn test_unknown_target() {
        let mut dom = DomSnapshot::default().build().unwrap();
        let step: ScriptedInteraction =
            serde_json::from_str(r#"{"kind": "click", "target": "nope", "timestamp": 0.0}"#)
                .unwrap();
        assert!(step.prepare(&mut dom).is_err());
    }
}
