//! Relative output path assignment.
//!
//! Walks the built tree once, pre-order, and gives every document a unique,
//! sanitized path stem under its group prefix. The used-name bookkeeping is
//! an explicit map keyed by prefix, threaded through the walk, so sibling
//! groups never interfere with each other's document naming.

use std::collections::{HashMap, HashSet};

use lakeport_shared::{Node, UNTITLED};

/// How many identifier characters the unique-suffix mode appends.
const UNIQUE_SUFFIX_LEN: usize = 8;

/// Replace illegal filesystem characters with underscores.
///
/// Blank results fall back to a placeholder. Idempotent: sanitizing an
/// already-sanitized name returns it unchanged.
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Assign `rel_path_stem` to every document in the tree.
///
/// Default mode resolves collisions per prefix with `_1`, `_2`, …;
/// unique-suffix mode appends a fixed-length slice of the document's
/// identifier instead and ignores collisions (identifiers are globally
/// unique in an export). Deterministic for identical input order.
pub fn assign_paths(nodes: &mut [Node], unique_suffix: bool) {
    let mut used: HashMap<String, HashSet<String>> = HashMap::new();
    assign_under_prefix(nodes, "", &mut used, unique_suffix);
}

fn assign_under_prefix(
    nodes: &mut [Node],
    prefix: &str,
    used: &mut HashMap<String, HashSet<String>>,
    unique_suffix: bool,
) {
    for node in nodes {
        match node {
            Node::Group(group) => {
                let dir = sanitize_name(&group.title);
                let child_prefix = format!("{prefix}{dir}/");
                assign_under_prefix(&mut group.children, &child_prefix, used, unique_suffix);
            }
            Node::Doc(doc) => {
                let base = sanitize_name(&doc.title);
                let stem = if unique_suffix {
                    let id = if doc.uuid.is_empty() { &doc.url } else { &doc.uuid };
                    let short: String = id.chars().take(UNIQUE_SUFFIX_LEN).collect();
                    if short.is_empty() {
                        base
                    } else {
                        format!("{base}_{short}")
                    }
                } else {
                    let taken = used.entry(prefix.to_string()).or_default();
                    let mut candidate = base.clone();
                    let mut n = 0;
                    while taken.contains(&candidate) {
                        n += 1;
                        candidate = format!("{base}_{n}");
                    }
                    taken.insert(candidate.clone());
                    candidate
                };
                doc.rel_path_stem = format!("{prefix}{stem}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
