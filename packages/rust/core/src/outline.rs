//! Outline tree construction.
//!
//! The manifest's `tocYml` is a flat sequence of level-tagged entries; this
//! module reconstructs the nested group/document tree from the level numbers
//! alone, with a single left-to-right pass over an explicit stack (no
//! language-level recursion, so nesting depth is bounded predictably).

use tracing::debug;

use lakeport_shared::{DocNode, GroupNode, Node, OutlineEntry, OutlineKind, UNTITLED};

/// Build the ordered list of top-level nodes from flat outline entries.
///
/// The stack holds the currently open ancestor chain as `(level, group)`
/// pairs. Each entry first closes every open group whose level is greater
/// than or equal to its own (a group cannot contain an entry at or above its
/// own level), then attaches to the top of the stack — or to the root list
/// when the stack is empty. Consecutive entries at the same level become
/// siblings in original order.
pub fn build_tree(entries: impl IntoIterator<Item = OutlineEntry>) -> Vec<Node> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<(u32, GroupNode)> = Vec::new();

    for entry in entries {
        match entry.kind {
            OutlineKind::Ignored => continue,
            OutlineKind::Group => {
                close_groups(entry.level, &mut stack, &mut root);
                stack.push((entry.level, GroupNode::new(node_title(&entry), entry.level)));
            }
            OutlineKind::Doc => {
                close_groups(entry.level, &mut stack, &mut root);
                let doc = DocNode::new(node_title(&entry), entry.level, entry.uuid, entry.url);
                attach(Node::Doc(doc), &mut stack, &mut root);
            }
        }
    }

    // Close everything still open at end of input.
    while let Some((_, group)) = stack.pop() {
        attach(Node::Group(group), &mut stack, &mut root);
    }

    debug!(top_level = root.len(), "outline tree built");
    root
}

fn node_title(entry: &OutlineEntry) -> String {
    if entry.title.is_empty() {
        UNTITLED.to_string()
    } else {
        entry.title.clone()
    }
}

/// Pop (and attach) every open group that cannot contain a node at `level`.
fn close_groups(level: u32, stack: &mut Vec<(u32, GroupNode)>, root: &mut Vec<Node>) {
    while stack.last().is_some_and(|(open, _)| *open >= level) {
        let (_, group) = stack.pop().expect("stack checked non-empty");
        attach(Node::Group(group), stack, root);
    }
}

/// Attach a finished node to the innermost open group, or to the root list.
fn attach(node: Node, stack: &mut [(u32, GroupNode)], root: &mut Vec<Node>) {
    match stack.last_mut() {
        Some((_, parent)) => parent.children.push(node),
        None => root.push(node),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
