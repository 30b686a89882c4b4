//! Exclusion paths: subtrees kept out of bitcode conversion.
//!
//! An exclusion path is parsed once, folded the same way member paths are, and then
//! narrowed on every descent so that a recursive call only ever sees the paths whose
//! prefix still matches its own base directory.

use std::fmt;

use crate::classify::fold_segments;
use crate::config::Layout;

/// One excluded subtree. `id` is its position in the original request and is used to
/// report paths that never matched anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPath {
    pub id: usize,
    pub segments: Vec<String>,
}

impl ExclusionPath {
    pub fn parse(id: usize, raw: &str, layout: &Layout) -> Option<Self> {
        let segments = fold_segments(raw, layout, true);
        if segments.is_empty() {
            return None;
        }
        Some(Self { id, segments })
    }

    pub fn segment(&self, depth: usize) -> Option<&str> {
        self.segments.get(depth).map(String::as_str)
    }
}

impl fmt::Display for ExclusionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// How a next-level key relates to the exclusion paths still in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionMatch {
    /// No exclusion touches this key.
    Clear,
    /// An exclusion names exactly this node; carries that exclusion's id.
    Full(usize),
    /// Exclusions continue below this node; carries them, narrowed.
    Partial(ExclusionSet),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    paths: Vec<ExclusionPath>,
}

impl ExclusionSet {
    /// Parses the raw `dir/sub/dir` strings. Empty entries are dropped.
    pub fn parse<S: AsRef<str>>(raw: &[S], layout: &Layout) -> Self {
        let paths = raw
            .iter()
            .enumerate()
            .filter_map(|(id, r)| ExclusionPath::parse(id, r.as_ref(), layout))
            .collect();
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[ExclusionPath] {
        &self.paths
    }

    /// Keys at `depth` touched by at least one exclusion.
    pub fn roots(&self, depth: usize) -> Vec<&str> {
        let mut roots: Vec<&str> = Vec::new();
        for root in self.paths.iter().filter_map(|p| p.segment(depth)) {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }

    /// Classifies `key`, a child of a node at `depth` whose own path every
    /// remaining exclusion already shares.
    pub fn classify(&self, depth: usize, key: &str) -> ExclusionMatch {
        let touching: Vec<&ExclusionPath> = self
            .paths
            .iter()
            .filter(|p| p.segment(depth) == Some(key))
            .collect();
        if touching.is_empty() {
            return ExclusionMatch::Clear;
        }
        if let Some(full) = touching.iter().find(|p| p.segments.len() == depth + 1) {
            return ExclusionMatch::Full(full.id);
        }
        ExclusionMatch::Partial(ExclusionSet {
            paths: touching.into_iter().cloned().collect(),
        })
    }
}
