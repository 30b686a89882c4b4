//! Per-folder segment plan.
//!
//! A companion to the full walk, used when bisecting which directories of one
//! top-level folder survive bitcode conversion. Every directory is both converted to
//! a native archive and extracted to bitcode, and the link list picks one of the two
//! per directory. Which one is controlled by [`SegmentOptions::bitcode_cutoff`] and
//! [`SegmentOptions::native_positions`], nothing else.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlanConfig;
use crate::plan::{in_build_home, BuildPlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOptions {
    /// Value exported as `build_home` at the top of the script.
    pub build_home: String,
    /// Keys dropped from the front of the listing.
    pub skip_leading: usize,
    /// Keys dropped from the back of the listing.
    pub skip_trailing: usize,
    /// Last directory ordinal (0-based, counting directories only) linked from
    /// bitcode. Later directories are linked from their native archive. `None` links
    /// every directory from bitcode.
    pub bitcode_cutoff: Option<usize>,
    /// Directory ordinals always linked from their native archive.
    pub native_positions: Vec<usize>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            build_home: "$HOME/standalone-build".to_string(),
            skip_leading: 2,
            skip_trailing: 1,
            bitcode_cutoff: None,
            native_positions: Vec::new(),
        }
    }
}

impl SegmentOptions {
    fn links_bitcode(&self, ordinal: usize) -> bool {
        let within_cutoff = self.bitcode_cutoff.map_or(true, |cutoff| ordinal <= cutoff);
        within_cutoff && !self.native_positions.contains(&ordinal)
    }
}

/// Builds the segment plan for `folder` from the members of its aggregate archive.
pub fn segment_plan(
    folder: &str,
    members: &[String],
    options: &SegmentOptions,
    config: &PlanConfig,
) -> BuildPlan {
    let layout = &config.layout;
    let toolchain = &config.toolchain;

    let mut seen = HashSet::new();
    let keys: Vec<&str> = members
        .iter()
        .filter_map(|m| m.split('/').next())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(*k))
        .collect();
    let end = keys.len().saturating_sub(options.skip_trailing);
    let selected: &[&str] = if options.skip_leading < end {
        &keys[options.skip_leading..end]
    } else {
        &[]
    };
    info!(
        folder,
        keys = keys.len(),
        selected = selected.len(),
        "Building segment plan"
    );

    let mirrored = format!("{}/{folder}", layout.output_dir);
    let staging = in_build_home(&format!("{mirrored}/{}", layout.staging_dir));
    let mut plan = BuildPlan::new();
    plan.command(format!("export build_home={}", options.build_home));

    for key in selected {
        if key.ends_with(&layout.object_suffix) {
            plan.command(toolchain.extract_command(key));
            plan.copy(&format!("{key}{}", toolchain.bitcode_suffix), &staging);
            plan.copy(key, &staging);
        } else {
            let archive = layout.aggregate_of(key);
            plan.command(toolchain.convert_command(&archive));
            plan.command(toolchain.extract_command(&archive));
            plan.copy(
                &format!("{archive}.a{}", toolchain.bitcode_suffix),
                &in_build_home(&format!("{mirrored}/{key}bi.o{}", toolchain.bitcode_suffix)),
            );
            plan.copy(
                &format!("{archive}{}", toolchain.converted_suffix),
                &in_build_home(&format!("{mirrored}/{key}bi.o")),
            );
        }
        plan.blank();
    }

    let mut ordinal = 0;
    for key in selected {
        let entry = match key.strip_suffix(layout.object_suffix.as_str()) {
            Some(stem) => format!("{mirrored}/{}/{stem}bc.o", layout.staging_dir),
            None => {
                let suffix = if options.links_bitcode(ordinal) {
                    "bibc.o"
                } else {
                    "bi.o"
                };
                ordinal += 1;
                format!("{mirrored}/{key}{suffix}")
            }
        };
        debug!(entry = %entry, "Segment link entry");
        plan.link(entry);
    }
    plan
}

/// Folder a listing file belongs to: the name of the directory holding it, so
/// `drivers/arbi` and `/home/u/linux/drivers/arbi` both give `drivers`. A bare file
/// name with no directory gives itself.
pub fn folder_of(listing_path: &str) -> &str {
    let mut components = listing_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .rev();
    let file = components.next();
    components.next().or(file).unwrap_or(listing_path)
}
