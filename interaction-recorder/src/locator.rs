use tracing::{instrument, trace};

use crate::dom::DomNode;

/// Separator between ancestor fragments in a selector path
pub const PATH_SEPARATOR: &str = ">";

/// Single-level selector for `node`.
///
/// Built in a fixed order: lowercase tag, `#id`, `.class` per distinct class
/// token, `[name="value"]` for every other attribute in document order, then
/// `:nth-child(k)` when the parent has more than one element child.
///
/// The position counts all element siblings, not only those sharing the tag,
/// so `:nth-child` can go stale when a sibling of another type is inserted.
pub fn fragment_for<N: DomNode>(node: &N) -> String {
    let mut fragment = node.tag().unwrap_or_default().to_lowercase();

    if let Some(id) = node.id().filter(|id| !id.is_empty()) {
        fragment.push('#');
        fragment.push_str(id);
    }

    let mut seen: Vec<&str> = Vec::new();
    for token in node.class_tokens() {
        if seen.contains(&token) {
            continue;
        }
        seen.push(token);
        fragment.push('.');
        fragment.push_str(token);
    }

    for (name, value) in node.attributes() {
        if name == "id" || name == "class" {
            continue;
        }
        fragment.push_str(&format!("[{name}=\"{value}\"]"));
    }

    if let Some(index) = node.sibling_index().filter(|index| index.count > 1) {
        fragment.push_str(&format!(":nth-child({})", index.position));
    }

    fragment
}

/// Fragments from the outermost ancestor down to `node`.
///
/// Walks `parent` links. An ancestor without a tag is followed to its shadow
/// host when it has one; otherwise it ends the walk.
pub fn path_segments<N: DomNode>(node: &N) -> Vec<String> {
    let mut segments = vec![fragment_for(node)];
    let mut current = node.parent();

    while let Some(mut ancestor) = current {
        if !ancestor.is_element() {
            match ancestor.shadow_host() {
                Some(host) => {
                    trace!("crossing shadow root to host <{}>", host.tag().unwrap_or_default());
                    ancestor = host;
                }
                None => break,
            }
        }
        segments.push(fragment_for(&ancestor));
        current = ancestor.parent();
    }

    segments.reverse();
    segments
}

/// Root-relative selector path for `node`, fragments joined by `>`.
#[instrument(level = "trace", skip(node))]
pub fn path_for<N: DomNode>(node: &N) -> String {
    path_segments(node).join(PATH_SEPARATOR)
}
