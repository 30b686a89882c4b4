//! Recursive plan builder.
//!
//! Walks the archive tree top-down starting from the root aggregate archive. Every
//! node reduces its listing to next-level keys and sends each key down one of four
//! routes:
//!
//! - leaf object: extract, stage, recompile, link;
//! - directory: extract the directory's aggregate, pass assembly-only members through
//!   untouched and recompile the rest;
//! - fully excluded subtree: convert the thin archive and link it whole;
//! - partially excluded subtree: recurse with the narrowed exclusions.
//!
//! The order in which keys are visited is the order of the link-argument list, so the
//! walk is strictly sequential.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{file_name, flat_name, fold_segments, is_object_key, next_level_keys};
use crate::config::{Layout, PlanConfig};
use crate::contract::{BitcodeExtractor, MemberLister};
use crate::error::{ListingError, PlanError};
use crate::exclusion::{ExclusionMatch, ExclusionSet};
use crate::plan::{in_build_home, BuildPlan};

/// Counters collected during a walk, reported alongside the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub nodes: usize,
    /// Nodes whose listing came from the parent because they have no archive.
    pub inherited_listings: usize,
    pub leaf_objects: usize,
    pub directories: usize,
    /// Directories that produced neither bitcode nor assembly objects.
    pub skipped_directories: usize,
    pub assembly_objects: usize,
    pub excluded_subtrees: usize,
}

pub struct PlanBuilder<'a, L: ?Sized, E: ?Sized> {
    config: &'a PlanConfig,
    lister: &'a L,
    extractor: &'a E,
    standalone: HashSet<&'a str>,
    plan: BuildPlan,
    matched: HashSet<usize>,
    stats: WalkStats,
}

impl<'a, L, E> PlanBuilder<'a, L, E>
where
    L: MemberLister + ?Sized,
    E: BitcodeExtractor + ?Sized,
{
    pub fn new(config: &'a PlanConfig, lister: &'a L, extractor: &'a E) -> Self {
        Self {
            config,
            lister,
            extractor,
            standalone: config.standalone_objects.iter().map(String::as_str).collect(),
            plan: BuildPlan::new(),
            matched: HashSet::new(),
            stats: WalkStats::default(),
        }
    }

    /// Walks the whole tree from the root.
    pub fn walk(&mut self, excluded: &ExclusionSet) -> Result<(), PlanError> {
        info!(exclusions = excluded.paths().len(), "Walking archive tree");
        self.build(excluded, 0, "", &[])?;
        info!(
            nodes = self.stats.nodes,
            link_args = self.plan.link_args().len(),
            "Archive tree walk complete"
        );
        Ok(())
    }

    /// Ids of exclusion paths that named a visited node.
    pub fn matched_exclusions(&self) -> &HashSet<usize> {
        &self.matched
    }

    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    pub fn into_parts(self) -> (BuildPlan, WalkStats, HashSet<usize>) {
        (self.plan, self.stats, self.matched)
    }

    /// Plans one node. `inherited` is the parent's listing, used when this node has
    /// no aggregate archive of its own.
    pub fn build(
        &mut self,
        excluded: &ExclusionSet,
        depth: usize,
        base_dir: &str,
        inherited: &[String],
    ) -> Result<(), PlanError> {
        self.stats.nodes += 1;
        let config = self.config;
        let layout = &config.layout;
        self.plan
            .mkdir(&in_build_home(&format!("{}/{base_dir}", layout.output_dir)));

        let members = match self.lister.list_members(base_dir) {
            Ok(members) => members,
            Err(ListingError::Unavailable { archive }) if depth == 0 => {
                warn!(
                    archive = %archive,
                    "Root aggregate archive missing, the walk plans nothing"
                );
                self.stats.inherited_listings += 1;
                Vec::new()
            }
            Err(ListingError::Unavailable { archive }) => {
                warn!(
                    base_dir,
                    archive = %archive,
                    "No aggregate archive, falling back to the parent listing"
                );
                self.stats.inherited_listings += 1;
                members_under(inherited, base_dir, depth, layout)
            }
            Err(source) => {
                return Err(PlanError::Listing {
                    dir: base_dir.to_string(),
                    source,
                })
            }
        };

        let keys = next_level_keys(&members, depth, layout, &self.standalone);
        debug!(
            base_dir,
            depth,
            members = members.len(),
            keys = keys.len(),
            roots = ?excluded.roots(depth),
            "Classified node"
        );

        for key in &keys {
            match excluded.classify(depth, key) {
                ExclusionMatch::Clear if is_object_key(key, layout) => {
                    self.leaf_object(base_dir, key);
                }
                ExclusionMatch::Clear => self.directory(base_dir, key)?,
                ExclusionMatch::Full(id) => {
                    self.matched.insert(id);
                    self.excluded_subtree(base_dir, key);
                }
                ExclusionMatch::Partial(narrowed) => {
                    debug!(base_dir, key = %key, "Descending into partially excluded subtree");
                    let child = format!("{base_dir}{key}/");
                    self.build(&narrowed, depth + 1, &child, &members)?;
                }
            }
        }
        Ok(())
    }

    fn leaf_object(&mut self, base_dir: &str, key: &str) {
        let config = self.config;
        let layout = &config.layout;
        let toolchain = &config.toolchain;
        let source = format!("{base_dir}{key}");
        let mirrored = format!("{}/{base_dir}", layout.output_dir);
        let staging = format!("{mirrored}{}", layout.staging_dir);
        let output = format!("{mirrored}{key}");
        let bitcode = format!("{key}{}", toolchain.bitcode_suffix);

        self.plan.command(toolchain.extract_command(&source));
        self.plan.mkdir(&in_build_home(&staging));
        self.plan.copy(
            &format!("{source}{}", toolchain.bitcode_suffix),
            &in_build_home(&staging),
        );
        self.plan.command(toolchain.compile_command(
            &in_build_home(&output),
            &in_build_home(&format!("{staging}/{bitcode}")),
        ));
        self.plan.blank();
        self.plan.link(output);
        self.stats.leaf_objects += 1;
        debug!(object = %source, "Planned leaf object");
    }

    fn directory(&mut self, base_dir: &str, key: &str) -> Result<(), PlanError> {
        let config = self.config;
        let layout = &config.layout;
        let toolchain = &config.toolchain;
        let archive = layout.aggregate_of(&format!("{base_dir}{key}"));
        let outcome = self.extractor.extract(&archive)?;
        self.stats.directories += 1;

        if outcome.is_empty() {
            self.stats.skipped_directories += 1;
            debug!(archive = %archive, "Nothing extracted, skipping directory");
            return Ok(());
        }

        let mirrored = format!("{}/{base_dir}{}", layout.output_dir, flat_name(key));

        if !outcome.assembly_objects.is_empty() {
            self.plan.mkdir(&in_build_home(&mirrored));
        }
        for object in &outcome.assembly_objects {
            self.plan.copy(object, &in_build_home(&mirrored));
            self.plan.link(format!("{mirrored}/{}", file_name(object)));
            self.stats.assembly_objects += 1;
            debug!(object = %object, "Passing assembly-only object through");
        }

        if let Some(bitcode) = &outcome.aggregate_bitcode {
            let staged = format!("{mirrored}bi.o{}", toolchain.bitcode_suffix);
            let output = format!("{mirrored}bibc.o");
            self.plan.copy(bitcode, &in_build_home(&staged));
            self.plan.command(
                toolchain.compile_command(&in_build_home(&output), &in_build_home(&staged)),
            );
            self.plan.blank();
            self.plan.link(output);
        }
        debug!(
            archive = %archive,
            assembly_objects = outcome.assembly_objects.len(),
            bitcode = outcome.aggregate_bitcode.is_some(),
            "Planned directory"
        );
        Ok(())
    }

    fn excluded_subtree(&mut self, base_dir: &str, key: &str) {
        let config = self.config;
        let layout = &config.layout;
        let toolchain = &config.toolchain;
        let archive = layout.aggregate_of(&format!("{base_dir}{key}"));
        let output = format!("{}/{base_dir}{}bi.o", layout.output_dir, flat_name(key));

        self.plan.command(toolchain.convert_command(&archive));
        self.plan.copy(
            &format!("{archive}{}", toolchain.converted_suffix),
            &in_build_home(&output),
        );
        self.plan.blank();
        self.plan.link(output);
        self.stats.excluded_subtrees += 1;
        info!(archive = %archive, "Linking excluded subtree as a converted archive");
    }
}

/// Members of `inherited` that belong to the node at `base_dir`: their folded units up
/// to `depth` must be the node's own. A raw prefix test is not enough, since
/// `arch/x86/lib/foo.o` starts with `arch/x86/` but belongs to the `arch/x86/lib` unit.
fn members_under(
    inherited: &[String],
    base_dir: &str,
    depth: usize,
    layout: &Layout,
) -> Vec<String> {
    let node = fold_segments(base_dir, layout, true);
    inherited
        .iter()
        .filter(|m| {
            let units = fold_segments(m, layout, false);
            units.len() > depth && units[..depth] == node[..]
        })
        .cloned()
        .collect()
}
