//! Path classification: how a member path maps onto the units the walk visits.

use std::collections::HashSet;

use tracing::warn;

use crate::config::Layout;

/// Splits `path` into segments and applies architecture folding.
///
/// `arch/x86/kernel/bar.o` becomes `["arch/x86", "kernel", "bar.o"]`. When the third
/// segment is one of the layout's arch exceptions it joins the first unit too:
/// `arch/x86/lib/foo.o` becomes `["arch/x86/lib", "foo.o"]`.
///
/// The exception only applies to a directory. For a member path that means a further
/// segment must follow; pass `names_directory = true` when `path` itself names a
/// directory (exclusion paths do).
pub fn fold_segments(path: &str, layout: &Layout, names_directory: bool) -> Vec<String> {
    let mut raw = path.split('/').filter(|s| !s.is_empty());
    let Some(first) = raw.next() else {
        return Vec::new();
    };
    let rest: Vec<&str> = raw.collect();

    if first != layout.arch_root || rest.is_empty() {
        let mut segments = vec![first.to_string()];
        segments.extend(rest.into_iter().map(String::from));
        return segments;
    }

    let mut unit = format!("{first}/{}", rest[0]);
    let mut consumed = 1;
    if let Some(third) = rest.get(1) {
        let is_directory = names_directory || rest.len() > 2;
        if is_directory && layout.arch_exceptions.iter().any(|e| e == third) {
            unit.push('/');
            unit.push_str(third);
            consumed = 2;
        }
    }

    let mut segments = vec![unit];
    segments.extend(rest[consumed..].iter().map(|s| s.to_string()));
    segments
}

/// Reduces a listing to the ordered set of keys one level below `depth`.
///
/// Keys keep first-occurrence order. Members listed verbatim in `standalone` are
/// skipped, as are members too shallow to have a segment at `depth`.
pub fn next_level_keys(
    members: &[String],
    depth: usize,
    layout: &Layout,
    standalone: &HashSet<&str>,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keys = Vec::new();
    for member in members {
        if standalone.contains(member.as_str()) {
            continue;
        }
        let mut segments = fold_segments(member, layout, false);
        if segments.len() <= depth {
            warn!(member = %member, depth, "Member shallower than traversal depth, skipping");
            continue;
        }
        let key = segments.swap_remove(depth);
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}

/// Whether a next-level key names a single object rather than a directory.
pub fn is_object_key(key: &str, layout: &Layout) -> bool {
    key.ends_with(&layout.object_suffix)
}

/// Name used for a unit inside the mirrored output tree: folded units such as
/// `arch/x86` become `arch_x86` so they stay one path component.
pub fn flat_name(key: &str) -> String {
    key.replace('/', "_")
}

/// File name part of a slash-delimited path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
